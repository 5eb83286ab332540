//! The scoped-access protocol: borrow-for-the-block semantics, policy
//! preconditions on `inspecting`/`seizing`, and token non-escape.

use forge_analyzer::AnalyzerState;
use forge_ast::{AccessKind, AstFactory, ClassDecl, Decl, DeclKind, Program, Stmt, TypeExpr};
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

fn consume_fn(f: &mut AstFactory) -> Decl {
    let param = f.param("value", TypeExpr::named("Point", Span::DUMMY));
    let body = f.block(vec![]);
    let func = f.function("consume", vec![param], None, body);
    f.decl(DeclKind::Function(func))
}

fn main_fn(f: &mut AstFactory, stmts: Vec<Stmt>) -> Decl {
    let body = f.block(stmts);
    let func = f.function("main", vec![], None, body);
    f.decl(DeclKind::Function(func))
}

fn new_point(f: &mut AstFactory) -> forge_ast::Expr {
    f.constructor(TypeExpr::named("Point", Span::DUMMY), vec![])
}

/// Declare `obj`, then share it with the given policy under the name `x`.
fn shared_object(f: &mut AstFactory, policy: &str) -> Vec<Stmt> {
    let ctor = new_point(f);
    let obj_decl = f.var_decl("obj", None, Some(ctor));
    let obj_ref = f.ident("obj");
    let policy_arg = f.ident(policy);
    let share = f.member_call(obj_ref, "share", vec![policy_arg]);
    let x_decl = f.var_decl("x", None, Some(share));
    vec![obj_decl, x_decl]
}

#[test]
fn source_is_restored_after_a_viewing_block() {
    let mut f = AstFactory::new();
    let ctor = new_point(&mut f);
    let obj_decl = f.var_decl("obj", None, Some(ctor));

    let v_ref = f.ident("v");
    let field = f.member(v_ref, "field");
    let field_stmt = f.expr_stmt(field);
    let body = f.block(vec![field_stmt]);
    let obj_src = f.ident("obj");
    let viewing = f.scoped_access(AccessKind::View, obj_src, "v", body);

    let obj_use = f.ident("obj");
    let consume = f.call_named("consume", vec![obj_use]);
    let use_stmt = f.expr_stmt(consume);

    let decls = vec![
        class_decl(&mut f, "Point"),
        consume_fn(&mut f),
        main_fn(&mut f, vec![obj_decl, viewing, use_stmt]),
    ];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert!(analyzer.diagnostics().is_empty(), "got {:?}", error_kinds(&analyzer));
    assert!(!analyzer.is_scoped_token("v"));
}

#[test]
fn source_is_unreadable_inside_its_own_viewing_block() {
    let mut f = AstFactory::new();
    let ctor = new_point(&mut f);
    let obj_decl = f.var_decl("obj", None, Some(ctor));

    let obj_use = f.ident("obj");
    let consume = f.call_named("consume", vec![obj_use]);
    let use_stmt = f.expr_stmt(consume);
    let body = f.block(vec![use_stmt]);
    let obj_src = f.ident("obj");
    let viewing = f.scoped_access(AccessKind::View, obj_src, "v", body);

    let decls = vec![
        class_decl(&mut f, "Point"),
        consume_fn(&mut f),
        main_fn(&mut f, vec![obj_decl, viewing]),
    ];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::UseAfterInvalidation]);
}

#[test]
fn hijacking_block_behaves_like_viewing_for_restoration() {
    let mut f = AstFactory::new();
    let ctor = new_point(&mut f);
    let obj_decl = f.var_decl("obj", None, Some(ctor));

    let body = f.block(vec![]);
    let obj_src = f.ident("obj");
    let hijacking = f.scoped_access(AccessKind::Hijack, obj_src, "h", body);

    let obj_use = f.ident("obj");
    let consume = f.call_named("consume", vec![obj_use]);
    let use_stmt = f.expr_stmt(consume);

    let decls = vec![
        class_decl(&mut f, "Point"),
        consume_fn(&mut f),
        main_fn(&mut f, vec![obj_decl, hijacking, use_stmt]),
    ];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert!(analyzer.diagnostics().is_empty(), "got {:?}", error_kinds(&analyzer));
}

#[test]
fn inspecting_requires_the_multi_read_lock_policy() {
    let mut f = AstFactory::new();
    let mut stmts = shared_object(&mut f, "Mutex");

    let body = f.block(vec![]);
    let x_src = f.ident("x");
    stmts.push(f.scoped_access(AccessKind::Inspect, x_src, "h", body));

    let decls = vec![class_decl(&mut f, "Point"), main_fn(&mut f, stmts)];
    let analyzer = analyze(&Program::from_declarations(decls));

    // One policy error; the block itself still type-checks.
    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::TypeError]);
    let message = &analyzer.diagnostics()[0].message;
    assert!(message.contains("MultiReadLock"), "message: {message}");
}

#[test]
fn inspecting_a_multi_read_lock_share_is_accepted() {
    let mut f = AstFactory::new();
    let mut stmts = shared_object(&mut f, "MultiReadLock");

    let h_ref = f.ident("h");
    let field = f.member(h_ref, "field");
    let field_stmt = f.expr_stmt(field);
    let body = f.block(vec![field_stmt]);
    let x_src = f.ident("x");
    stmts.push(f.scoped_access(AccessKind::Inspect, x_src, "h", body));

    let decls = vec![class_decl(&mut f, "Point"), main_fn(&mut f, stmts)];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert!(analyzer.diagnostics().is_empty(), "got {:?}", error_kinds(&analyzer));
}

#[test]
fn seizing_a_reject_edit_share_is_rejected() {
    let mut f = AstFactory::new();
    let mut stmts = shared_object(&mut f, "RejectEdit");

    let body = f.block(vec![]);
    let x_src = f.ident("x");
    stmts.push(f.scoped_access(AccessKind::Seize, x_src, "s", body));

    let decls = vec![class_decl(&mut f, "Point"), main_fn(&mut f, stmts)];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::TypeError]);
}

#[test]
fn seizing_a_mutex_share_is_accepted() {
    let mut f = AstFactory::new();
    let mut stmts = shared_object(&mut f, "Mutex");

    let body = f.block(vec![]);
    let x_src = f.ident("x");
    stmts.push(f.scoped_access(AccessKind::Seize, x_src, "s", body));

    let decls = vec![class_decl(&mut f, "Point"), main_fn(&mut f, stmts)];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert!(analyzer.diagnostics().is_empty(), "got {:?}", error_kinds(&analyzer));
}

#[test]
fn seizing_a_plain_object_requires_a_shared_wrapper() {
    let mut f = AstFactory::new();
    let ctor = new_point(&mut f);
    let obj_decl = f.var_decl("obj", None, Some(ctor));

    let body = f.block(vec![]);
    let obj_src = f.ident("obj");
    let seizing = f.scoped_access(AccessKind::Seize, obj_src, "s", body);

    let decls = vec![class_decl(&mut f, "Point"), main_fn(&mut f, vec![obj_decl, seizing])];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::ThreadSafetyViolation]);
}

#[test]
fn token_cannot_be_stored_in_a_variable() {
    let mut f = AstFactory::new();
    let ctor = new_point(&mut f);
    let obj_decl = f.var_decl("obj", None, Some(ctor));

    let v_ref = f.ident("v");
    let w_decl = f.var_decl("w", None, Some(v_ref));
    let body = f.block(vec![w_decl]);
    let obj_src = f.ident("obj");
    let viewing = f.scoped_access(AccessKind::View, obj_src, "v", body);

    let decls = vec![class_decl(&mut f, "Point"), main_fn(&mut f, vec![obj_decl, viewing])];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::InlineTokenEscape]);
}

#[test]
fn token_cannot_be_assigned_to_a_variable() {
    let mut f = AstFactory::new();
    let ctor = new_point(&mut f);
    let obj_decl = f.var_decl("obj", None, Some(ctor));
    let slot_ty = TypeExpr::named("Point", Span::DUMMY);
    let slot_decl = f.var_decl("slot", Some(slot_ty), None);

    let slot_ref = f.ident("slot");
    let v_ref = f.ident("v");
    let assign = f.assign(slot_ref, v_ref);
    let body = f.block(vec![assign]);
    let obj_src = f.ident("obj");
    let viewing = f.scoped_access(AccessKind::View, obj_src, "v", body);

    let decls = vec![
        class_decl(&mut f, "Point"),
        main_fn(&mut f, vec![obj_decl, slot_decl, viewing]),
    ];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert!(
        error_kinds(&analyzer).contains(&ErrorKind::InlineTokenEscape),
        "got {:?}",
        error_kinds(&analyzer)
    );
}

#[test]
fn token_cannot_be_pushed_into_a_container() {
    let mut f = AstFactory::new();
    let ctor = new_point(&mut f);
    let obj_decl = f.var_decl("obj", None, Some(ctor));
    let list_ty = TypeExpr::generic(
        "List",
        vec![TypeExpr::named("Point", Span::DUMMY)],
        Span::DUMMY,
    );
    let list_decl = f.var_decl("list", Some(list_ty), None);

    let list_ref = f.ident("list");
    let v_ref = f.ident("v");
    let push = f.member_call(list_ref, "push", vec![v_ref]);
    let push_stmt = f.expr_stmt(push);
    let body = f.block(vec![push_stmt]);
    let obj_src = f.ident("obj");
    let viewing = f.scoped_access(AccessKind::View, obj_src, "v", body);

    let decls = vec![
        class_decl(&mut f, "Point"),
        main_fn(&mut f, vec![obj_decl, list_decl, viewing]),
    ];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::InlineTokenEscape]);
}

#[test]
fn view_token_cannot_initialize_a_variable() {
    let mut f = AstFactory::new();
    let ctor = new_point(&mut f);
    let obj_decl = f.var_decl("obj", None, Some(ctor));

    let obj_ref = f.ident("obj");
    let view = f.member_call(obj_ref, "view", vec![]);
    let v_decl = f.var_decl("v", None, Some(view));

    let decls = vec![class_decl(&mut f, "Point"), main_fn(&mut f, vec![obj_decl, v_decl])];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::InlineTokenEscape]);
}

#[test]
fn inline_view_token_may_be_passed_to_an_ordinary_call() {
    let mut f = AstFactory::new();
    let ctor = new_point(&mut f);
    let obj_decl = f.var_decl("obj", None, Some(ctor));

    let obj_ref = f.ident("obj");
    let view = f.member_call(obj_ref, "view", vec![]);
    let show = f.call_named("show", vec![view]);
    let show_stmt = f.expr_stmt(show);

    let param_ty = TypeExpr::named("Viewed<Point>", Span::DUMMY);
    let param = f.param("value", param_ty);
    let body = f.block(vec![]);
    let show_fn = f.function("show", vec![param], None, body);
    let show_decl = f.decl(DeclKind::Function(show_fn));

    let decls = vec![
        class_decl(&mut f, "Point"),
        show_decl,
        main_fn(&mut f, vec![obj_decl, show_stmt]),
    ];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert!(analyzer.diagnostics().is_empty(), "got {:?}", error_kinds(&analyzer));
}
