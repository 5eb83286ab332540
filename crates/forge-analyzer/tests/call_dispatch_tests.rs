//! The call dispatcher: conversions, constructions, error intrinsics,
//! danger-only functions, fallible lock operations, overloads, duplicate
//! exclusive operands, and thread-safety checks.

use forge_analyzer::AnalyzerState;
use forge_ast::{AstFactory, ClassDecl, Decl, DeclKind, Pattern, Program, Stmt, TypeExpr};
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

fn main_fn(f: &mut AstFactory, stmts: Vec<Stmt>) -> Decl {
    let body = f.block(stmts);
    let func = f.function("main", vec![], None, body);
    f.decl(DeclKind::Function(func))
}

fn new_point(f: &mut AstFactory) -> forge_ast::Expr {
    f.constructor(TypeExpr::named("Point", Span::DUMMY), vec![])
}

#[test]
fn failable_conversion_types_as_the_target() {
    let mut f = AstFactory::new();
    let x = f.lit_float(1.5);
    let x_decl = f.var_decl("x", None, Some(x));

    let x_ref = f.ident("x");
    let conv = f.call_named("s32!", vec![x_ref]);
    let conv_id = conv.id;
    let y_decl = f.var_decl("y", None, Some(conv));

    let decls = vec![main_fn(&mut f, vec![x_decl, y_decl])];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert!(analyzer.diagnostics().is_empty(), "got {:?}", error_kinds(&analyzer));
    assert_eq!(
        analyzer.type_of(conv_id).map(|ty| ty.name.clone()),
        Some("s32".to_string())
    );
}

#[test]
fn conversion_to_an_unknown_type_is_an_ordinary_unknown_call() {
    let mut f = AstFactory::new();
    let x = f.lit_int(1);
    let conv = f.call_named("Mystery!", vec![x]);
    let stmt = f.expr_stmt(conv);

    let decls = vec![main_fn(&mut f, vec![stmt])];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::TypeError]);
}

#[test]
fn construction_returns_the_constructed_type() {
    let mut f = AstFactory::new();
    let call = f.call_named("Point", vec![]);
    let call_id = call.id;
    let p_decl = f.var_decl("p", None, Some(call));

    let decls = vec![class_decl(&mut f, "Point"), main_fn(&mut f, vec![p_decl])];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert!(analyzer.diagnostics().is_empty());
    assert_eq!(
        analyzer.type_of(call_id).map(|ty| ty.name.clone()),
        Some("Point".to_string())
    );
}

#[test]
fn verify_requires_a_boolean_condition() {
    let mut f = AstFactory::new();
    let ok = f.lit_bool(true);
    let good = f.call_named("verify!", vec![ok]);
    let good_stmt = f.expr_stmt(good);

    let bad_arg = f.lit_int(5);
    let bad = f.call_named("verify!", vec![bad_arg]);
    let bad_stmt = f.expr_stmt(bad);

    let decls = vec![main_fn(&mut f, vec![good_stmt, bad_stmt])];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::TypeError]);
}

#[test]
fn stop_and_breach_accept_a_message() {
    let mut f = AstFactory::new();
    let msg = f.lit_text("unreachable");
    let stop = f.call_named("stop!", vec![msg]);
    let stop_stmt = f.expr_stmt(stop);

    let msg2 = f.lit_text("bad state");
    let breach = f.call_named("breach!", vec![msg2]);
    let breach_stmt = f.expr_stmt(breach);

    let decls = vec![main_fn(&mut f, vec![stop_stmt, breach_stmt])];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert!(analyzer.diagnostics().is_empty());
}

#[test]
fn address_of_requires_an_escape_block() {
    let mut f = AstFactory::new();
    let x = f.lit_int(1);
    let x_decl = f.var_decl("x", None, Some(x));

    let x_ref = f.ident("x");
    let addr = f.call_named("address_of", vec![x_ref]);
    let addr_stmt = f.expr_stmt(addr);

    let decls = vec![main_fn(&mut f, vec![x_decl, addr_stmt])];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::DangerBlockViolation]);
}

#[test]
fn address_of_types_as_uaddr_inside_an_escape_block() {
    let mut f = AstFactory::new();
    let x = f.lit_int(1);
    let x_decl = f.var_decl("x", None, Some(x));

    let x_ref = f.ident("x");
    let addr = f.call_named("address_of", vec![x_ref]);
    let addr_id = addr.id;
    let addr_stmt = f.expr_stmt(addr);
    let danger_body = f.block(vec![addr_stmt]);
    let danger = f.danger(danger_body);

    let decls = vec![main_fn(&mut f, vec![x_decl, danger])];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert!(analyzer.diagnostics().is_empty());
    assert_eq!(
        analyzer.type_of(addr_id).map(|ty| ty.name.clone()),
        Some("uaddr".to_string())
    );
}

#[test]
fn sizeof_is_a_compile_time_intrinsic() {
    let mut f = AstFactory::new();
    let size = f.intrinsic("sizeof", vec![TypeExpr::named("s64", Span::DUMMY)], vec![]);
    let size_id = size.id;
    let stmt = f.expr_stmt(size);

    let decls = vec![main_fn(&mut f, vec![stmt])];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert!(analyzer.diagnostics().is_empty());
    assert_eq!(
        analyzer.type_of(size_id).map(|ty| ty.name.clone()),
        Some("uaddr".to_string())
    );
}

#[test]
fn bit_cast_requires_an_escape_block_and_returns_the_target() {
    let mut f = AstFactory::new();
    let x = f.lit_int(1);
    let outside = f.intrinsic("bit_cast", vec![TypeExpr::named("u32", Span::DUMMY)], vec![x]);
    let outside_stmt = f.expr_stmt(outside);

    let y = f.lit_int(2);
    let inside = f.intrinsic("bit_cast", vec![TypeExpr::named("u32", Span::DUMMY)], vec![y]);
    let inside_id = inside.id;
    let inside_stmt = f.expr_stmt(inside);
    let danger_body = f.block(vec![inside_stmt]);
    let danger = f.danger(danger_body);

    let decls = vec![main_fn(&mut f, vec![outside_stmt, danger])];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::DangerBlockViolation]);
    assert_eq!(
        analyzer.type_of(inside_id).map(|ty| ty.name.clone()),
        Some("u32".to_string())
    );
}

#[test]
fn native_calls_are_escape_only() {
    let mut f = AstFactory::new();
    let native = f.native("memmove", vec![]);
    let stmt = f.expr_stmt(native);

    let decls = vec![main_fn(&mut f, vec![stmt])];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::DangerBlockViolation]);
}

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
fn try_seize_must_be_a_when_scrutinee() {
    let mut f = AstFactory::new();
    let mut stmts = shared_object(&mut f, "Mutex");

    let x_ref = f.ident("x");
    let seize = f.member_call(x_ref, "try_seize", vec![]);
    stmts.push(f.expr_stmt(seize));

    let decls = vec![class_decl(&mut f, "Point"), main_fn(&mut f, stmts)];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::FallibleLockOutsideWhen]);
}

#[test]
fn try_seize_as_when_scrutinee_types_the_seized_payload() {
    let mut f = AstFactory::new();
    let mut stmts = shared_object(&mut f, "Mutex");

    let x_ref = f.ident("x");
    let seize = f.member_call(x_ref, "try_seize", vec![]);
    let h_use = f.ident("h");
    let h_stmt = f.expr_stmt(h_use);
    let arm_body = f.block(vec![h_stmt]);
    let arm = f.when_arm(Pattern::Binding("h".to_string()), arm_body);
    stmts.push(f.when(seize, vec![arm]));

    let decls = vec![class_decl(&mut f, "Point"), main_fn(&mut f, stmts)];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert!(analyzer.diagnostics().is_empty(), "got {:?}", error_kinds(&analyzer));
}

#[test]
fn try_inspect_requires_the_multi_read_lock_policy() {
    let mut f = AstFactory::new();
    let mut stmts = shared_object(&mut f, "Mutex");

    let x_ref = f.ident("x");
    let inspect = f.member_call(x_ref, "try_inspect", vec![]);
    let arm_body = f.block(vec![]);
    let arm = f.when_arm(Pattern::Wildcard, arm_body);
    stmts.push(f.when(inspect, vec![arm]));

    let decls = vec![class_decl(&mut f, "Point"), main_fn(&mut f, stmts)];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::TypeError]);
}

#[test]
fn fallible_locks_require_a_shared_object() {
    let mut f = AstFactory::new();
    let ctor = new_point(&mut f);
    let a_decl = f.var_decl("a", None, Some(ctor));

    let a_ref = f.ident("a");
    let seize = f.member_call(a_ref, "try_seize", vec![]);
    let arm_body = f.block(vec![]);
    let arm = f.when_arm(Pattern::Wildcard, arm_body);
    let when = f.when(seize, vec![arm]);

    let decls = vec![class_decl(&mut f, "Point"), main_fn(&mut f, vec![a_decl, when])];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::ThreadSafetyViolation]);
}

#[test]
fn duplicate_hijacked_operands_are_rejected() {
    let mut f = AstFactory::new();
    let ctor = new_point(&mut f);
    let a_decl = f.var_decl("a", None, Some(ctor));

    let a_ref = f.ident("a");
    let hijack = f.member_call(a_ref, "hijack", vec![]);
    let h_decl = f.var_decl("h", None, Some(hijack));

    let h1 = f.ident("h");
    let h2 = f.ident("h");
    let call = f.call_named("swap", vec![h1, h2]);
    let call_stmt = f.expr_stmt(call);

    let hij_ty = || TypeExpr::named("Hijacked<Point>", Span::DUMMY);
    let p1 = f.param("first", hij_ty());
    let p2 = f.param("second", hij_ty());
    let body = f.block(vec![]);
    let swap_fn = f.function("swap", vec![p1, p2], None, body);
    let swap_decl = f.decl(DeclKind::Function(swap_fn));

    let decls = vec![
        class_decl(&mut f, "Point"),
        swap_decl,
        main_fn(&mut f, vec![a_decl, h_decl, call_stmt]),
    ];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::DuplicateHijackInCall]);
}

#[test]
fn retained_argument_cannot_fill_a_shared_parameter() {
    let mut f = AstFactory::new();
    let ctor = new_point(&mut f);
    let a_decl = f.var_decl("a", None, Some(ctor));

    let a_ref = f.ident("a");
    let retain = f.member_call(a_ref, "retain", vec![]);
    let r_decl = f.var_decl("r", None, Some(retain));

    let r_ref = f.ident("r");
    let call = f.call_named("publish", vec![r_ref]);
    let call_stmt = f.expr_stmt(call);

    let shared_ty = TypeExpr::named("Shared<Point, Mutex>", Span::DUMMY);
    let param = f.param("value", shared_ty);
    let body = f.block(vec![]);
    let publish_fn = f.function("publish", vec![param], None, body);
    let publish_decl = f.decl(DeclKind::Function(publish_fn));

    let decls = vec![
        class_decl(&mut f, "Point"),
        publish_decl,
        main_fn(&mut f, vec![a_decl, r_decl, call_stmt]),
    ];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::ThreadSafetyViolation]);
}

#[test]
fn overloads_resolve_by_arity() {
    let mut f = AstFactory::new();

    let p1 = f.param("a", TypeExpr::named("s32", Span::DUMMY));
    let body1 = f.block(vec![]);
    let one = f.function("emit", vec![p1], None, body1);

    let p2 = f.param("a", TypeExpr::named("s32", Span::DUMMY));
    let p3 = f.param("b", TypeExpr::named("s32", Span::DUMMY));
    let body2 = f.block(vec![]);
    let two = f.function("emit", vec![p2, p3], None, body2);

    let x1 = f.lit_int(1);
    let x2 = f.lit_int(2);
    let good = f.call_named("emit", vec![x1, x2]);
    let good_stmt = f.expr_stmt(good);

    let y1 = f.lit_int(1);
    let y2 = f.lit_int(2);
    let y3 = f.lit_int(3);
    let bad = f.call_named("emit", vec![y1, y2, y3]);
    let bad_stmt = f.expr_stmt(bad);

    let one_decl = f.decl(DeclKind::Function(one));
    let two_decl = f.decl(DeclKind::Function(two));
    let decls = vec![one_decl, two_decl, main_fn(&mut f, vec![good_stmt, bad_stmt])];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert_eq!(error_kinds(&analyzer), vec![ErrorKind::TypeError]);
}

#[test]
fn memory_operation_nodes_dispatch_like_member_calls() {
    let mut f = AstFactory::new();
    let ctor = new_point(&mut f);
    let a_decl = f.var_decl("a", None, Some(ctor));

    let a_ref = f.ident("a");
    let retain = f.memory_op(a_ref, "retain", vec![]);
    let retain_id = retain.id;
    let r_decl = f.var_decl("r", None, Some(retain));

    let decls = vec![
        class_decl(&mut f, "Point"),
        main_fn(&mut f, vec![a_decl, r_decl]),
    ];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert!(analyzer.diagnostics().is_empty(), "got {:?}", error_kinds(&analyzer));
    assert_eq!(
        analyzer.type_of(retain_id).map(|ty| ty.name.clone()),
        Some("Retained<Point>".to_string())
    );
}

#[test]
fn qualified_namespace_functions_resolve() {
    let mut f = AstFactory::new();

    let body = f.block(vec![]);
    let clamp = f.function(
        "clamp",
        vec![],
        Some(TypeExpr::named("s32", Span::DUMMY)),
        body,
    );
    let clamp_decl = f.decl(DeclKind::Function(clamp));
    let ns = f.decl(DeclKind::Namespace {
        name: "math".to_string(),
        declarations: vec![clamp_decl],
    });

    let math_ref = f.ident("math");
    let call = f.member_call(math_ref, "clamp", vec![]);
    let call_id = call.id;
    let call_stmt = f.expr_stmt(call);

    let decls = vec![ns, main_fn(&mut f, vec![call_stmt])];
    let analyzer = analyze(&Program::from_declarations(decls));

    assert!(analyzer.diagnostics().is_empty(), "got {:?}", error_kinds(&analyzer));
    assert_eq!(
        analyzer.type_of(call_id).map(|ty| ty.name.clone()),
        Some("s32".to_string())
    );
}
