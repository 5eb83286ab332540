//! The usurping gate: only functions flagged usurping may return exclusive
//! (Hijacked) tokens, and no other scoped token ever escapes by return.

use forge_analyzer::AnalyzerState;
use forge_ast::{
    AccessKind, AstFactory, ClassDecl, Decl, DeclKind, FunctionDecl, Program, TypeExpr,
};
use forge_common::diagnostics::ErrorKind;
use forge_common::options::AnalyzerOptions;
use forge_common::span::Span;

fn analyze(program: &Program) -> AnalyzerState {
    let mut analyzer = AnalyzerState::new("test.fr", AnalyzerOptions::default());
    analyzer.analyze_program(program);
    analyzer
}

fn error_kinds(analyzer: &AnalyzerState) -> Vec<ErrorKind> {
    analyzer.diagnostics().iter().map(|d| d.kind).collect()
}

fn class_decl(f: &mut AstFactory, name: &str) -> Decl {
    f.decl(DeclKind::Class(ClassDecl {
        name: name.to_string(),
        generics: vec![],
        features: vec![],
        members: vec![],
    }))
}

/// A function taking one `Point` parameter with the given body and return
/// type, to exercise return-site rules.
fn point_fn(
    f: &mut AstFactory,
    name: &str,
    return_type: &str,
    body: forge_ast::Block,
) -> FunctionDecl {
    let param = f.param("p", TypeExpr::named("Point", Span::DUMMY));
    f.function(
        name,
        vec![param],
        Some(TypeExpr::named(return_type, Span::DUMMY)),
        body,
    )
}

#[test]
fn returning_hijacked_without_the_flag_is_a_usurping_violation() {
    let mut f = AstFactory::new();
    let body = f.block(vec![]);
    let func = point_fn(&mut f, "grab", "Hijacked<Point>", body);
    let decls = vec![
        class_decl(&mut f, "Point"),
        f.decl(DeclKind::Function(func)),
    ];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::UsurpingViolation]);
}

#[test]
fn the_usurping_flag_permits_a_hijacked_return_type() {
    let mut f = AstFactory::new();
    let body = f.block(vec![]);
    let mut func = point_fn(&mut f, "grab", "Hijacked<Point>", body);
    func.is_usurping = true;
    let decls = vec![
        class_decl(&mut f, "Point"),
        f.decl(DeclKind::Function(func)),
    ];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert!(analyzer.diagnostics().is_empty(), "got {:?}", error_kinds(&analyzer));
}

#[test]
fn name_heuristic_still_marks_usurping_functions() {
    let mut f = AstFactory::new();
    let body = f.block(vec![]);
    let func = point_fn(&mut f, "usurping_grab", "Hijacked<Point>", body);
    let decls = vec![
        class_decl(&mut f, "Point"),
        f.decl(DeclKind::Function(func)),
    ];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert!(analyzer.diagnostics().is_empty(), "got {:?}", error_kinds(&analyzer));
}

#[test]
fn usurping_function_may_return_its_hijacked_token() {
    let mut f = AstFactory::new();
    let h_ref = f.ident("h");
    let ret = f.ret(Some(h_ref));
    let inner = f.block(vec![ret]);
    let p_src = f.ident("p");
    let hijacking = f.scoped_access(AccessKind::Hijack, p_src, "h", inner);
    let body = f.block(vec![hijacking]);

    let mut func = point_fn(&mut f, "grab", "Hijacked<Point>", body);
    func.is_usurping = true;
    let decls = vec![
        class_decl(&mut f, "Point"),
        f.decl(DeclKind::Function(func)),
    ];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert!(analyzer.diagnostics().is_empty(), "got {:?}", error_kinds(&analyzer));
}

#[test]
fn non_usurping_function_cannot_return_a_hijacked_token() {
    let mut f = AstFactory::new();
    let h_ref = f.ident("h");
    let ret = f.ret(Some(h_ref));
    let inner = f.block(vec![ret]);
    let p_src = f.ident("p");
    let hijacking = f.scoped_access(AccessKind::Hijack, p_src, "h", inner);
    let body = f.block(vec![hijacking]);

    let func = point_fn(&mut f, "grab", "Hijacked<Point>", body);
    let decls = vec![
        class_decl(&mut f, "Point"),
        f.decl(DeclKind::Function(func)),
    ];
    let analyzer = analyze(&Program::from_declarations(decls));

    // Once at the declaration (Hijacked return without the flag), once at
    // the return site.
    assert_eq!(
        error_kinds(&analyzer),
        vec![ErrorKind::UsurpingViolation, ErrorKind::UsurpingViolation]
    );
}

#[test]
fn even_usurping_functions_cannot_return_other_scoped_tokens() {
    let mut f = AstFactory::new();
    let v_ref = f.ident("v");
    let ret = f.ret(Some(v_ref));
    let inner = f.block(vec![ret]);
    let p_src = f.ident("p");
    let viewing = f.scoped_access(AccessKind::View, p_src, "v", inner);
    let body = f.block(vec![viewing]);

    let mut func = point_fn(&mut f, "peek", "Viewed<Point>", body);
    func.is_usurping = true;
    let decls = vec![
        class_decl(&mut f, "Point"),
        f.decl(DeclKind::Function(func)),
    ];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::UsurpingViolation]);
}

#[test]
fn inline_hijack_token_cannot_be_returned() {
    let mut f = AstFactory::new();
    let p_ref = f.ident("p");
    let hijack = f.member_call(p_ref, "hijack", vec![]);
    let ret = f.ret(Some(hijack));
    let body = f.block(vec![ret]);

    let mut func = point_fn(&mut f, "grab", "Hijacked<Point>", body);
    func.is_usurping = true;
    let decls = vec![
        class_decl(&mut f, "Point"),
        f.decl(DeclKind::Function(func)),
    ];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::InlineTokenEscape]);
}
