//! Variant-generator behavior end to end: the generated set per failure
//! signal combination, name and return-type synthesis, and body rewrites.

use forge_ast::{
    AstFactory, Block, Decl, DeclKind, ExprKind, FunctionDecl, Literal, Program, Stmt, StmtKind,
    TypeExpr,
};
use forge_common::span::Span;
use forge_variants::VariantGenerator;

fn generate(factory: &mut AstFactory, program: &Program) -> Vec<Decl> {
    VariantGenerator::new(factory).generate(program)
}

fn function_names(decls: &[Decl]) -> Vec<String> {
    decls
        .iter()
        .filter_map(|decl| match &decl.kind {
            DeclKind::Function(func) => Some(func.name.clone()),
            _ => None,
        })
        .collect()
}

fn function<'a>(decls: &'a [Decl], name: &str) -> &'a FunctionDecl {
    decls
        .iter()
        .find_map(|decl| match &decl.kind {
            DeclKind::Function(func) if func.name == name => Some(func),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no generated function named {name}"))
}

/// A failable `parse!` whose body is the given statements.
fn failable_program(f: &mut AstFactory, body: Block) -> Program {
    let func = f.function(
        "parse!",
        vec![],
        Some(TypeExpr::named("s32", Span::DUMMY)),
        body,
    );
    Program::from_declarations(vec![f.decl(DeclKind::Function(func))])
}

fn fail_stmt(f: &mut AstFactory) -> Stmt {
    let err = f.ident("error");
    f.throw(err)
}

#[test]
fn fail_only_generates_try_and_check() {
    let mut f = AstFactory::new();
    let fail = fail_stmt(&mut f);
    let body = f.block(vec![fail]);
    let program = failable_program(&mut f, body);

    let generated = generate(&mut f, &program);
    assert_eq!(function_names(&generated), vec!["try_parse", "check_parse"]);
}

#[test]
fn absent_only_generates_try() {
    let mut f = AstFactory::new();
    let absent = f.absent();
    let body = f.block(vec![absent]);
    let program = failable_program(&mut f, body);

    let generated = generate(&mut f, &program);
    assert_eq!(function_names(&generated), vec!["try_parse"]);
}

#[test]
fn fail_and_absent_generate_try_and_find() {
    let mut f = AstFactory::new();
    let fail = fail_stmt(&mut f);
    let absent = f.absent();
    let body = f.block(vec![fail, absent]);
    let program = failable_program(&mut f, body);

    let generated = generate(&mut f, &program);
    assert_eq!(function_names(&generated), vec!["try_parse", "find_parse"]);
}

#[test]
fn infallible_bodies_generate_nothing() {
    let mut f = AstFactory::new();
    let v = f.lit_int(1);
    let ret = f.ret(Some(v));
    let body = f.block(vec![ret]);
    let program = failable_program(&mut f, body);

    let generated = generate(&mut f, &program);
    assert!(generated.is_empty());
}

#[test]
fn return_types_wrap_the_source_return() {
    let mut f = AstFactory::new();
    let fail = fail_stmt(&mut f);
    let absent = f.absent();
    let body = f.block(vec![fail, absent]);
    let program = failable_program(&mut f, body);

    let generated = generate(&mut f, &program);
    let try_fn = function(&generated, "try_parse");
    assert_eq!(try_fn.return_type.as_ref().unwrap().name, "Maybe<s32>");
    let find_fn = function(&generated, "find_parse");
    assert_eq!(find_fn.return_type.as_ref().unwrap().name, "Lookup<s32>");
}

#[test]
fn check_return_type_is_result() {
    let mut f = AstFactory::new();
    let fail = fail_stmt(&mut f);
    let body = f.block(vec![fail]);
    let program = failable_program(&mut f, body);

    let generated = generate(&mut f, &program);
    let check_fn = function(&generated, "check_parse");
    assert_eq!(check_fn.return_type.as_ref().unwrap().name, "Result<s32>");
}

#[test]
fn try_rewrites_fail_to_return_none() {
    let mut f = AstFactory::new();
    let fail = fail_stmt(&mut f);
    let body = f.block(vec![fail]);
    let program = failable_program(&mut f, body);

    let generated = generate(&mut f, &program);
    let try_fn = function(&generated, "try_parse");
    match &try_fn.body.statements[0].kind {
        StmtKind::Return(Some(value)) => {
            assert!(matches!(&value.kind, ExprKind::Literal(Literal::None)));
        }
        other => panic!("expected return, got {other:?}"),
    }
}

#[test]
fn check_rewrites_fail_to_return_the_error() {
    let mut f = AstFactory::new();
    let fail = fail_stmt(&mut f);
    let body = f.block(vec![fail]);
    let program = failable_program(&mut f, body);

    let generated = generate(&mut f, &program);
    let check_fn = function(&generated, "check_parse");
    match &check_fn.body.statements[0].kind {
        StmtKind::Return(Some(value)) => match &value.kind {
            ExprKind::Identifier(name) => assert_eq!(name, "error"),
            other => panic!("expected the failed value, got {other:?}"),
        },
        other => panic!("expected return, got {other:?}"),
    }
}

#[test]
fn rewrites_reach_into_nested_blocks() {
    let mut f = AstFactory::new();
    let cond = f.lit_bool(true);
    let fail = fail_stmt(&mut f);
    let then_block = f.block(vec![fail]);
    let if_stmt = f.if_stmt(cond, then_block, None);
    let v = f.lit_int(7);
    let ret = f.ret(Some(v));
    let body = f.block(vec![if_stmt, ret]);
    let program = failable_program(&mut f, body);

    let generated = generate(&mut f, &program);
    let try_fn = function(&generated, "try_parse");
    match &try_fn.body.statements[0].kind {
        StmtKind::If { then_block, .. } => match &then_block.statements[0].kind {
            StmtKind::Return(Some(value)) => {
                assert!(matches!(&value.kind, ExprKind::Literal(Literal::None)));
            }
            other => panic!("expected rewritten return, got {other:?}"),
        },
        other => panic!("expected if, got {other:?}"),
    }
    // The trailing plain return is preserved.
    match &try_fn.body.statements[1].kind {
        StmtKind::Return(Some(value)) => {
            assert!(matches!(&value.kind, ExprKind::Literal(Literal::Integer(7))));
        }
        other => panic!("expected return, got {other:?}"),
    }
}

#[test]
fn dunder_names_are_unwrapped() {
    let mut f = AstFactory::new();
    let fail = fail_stmt(&mut f);
    let body = f.block(vec![fail]);
    let func = f.function("__divide__!", vec![], None, body);
    let program = Program::from_declarations(vec![f.decl(DeclKind::Function(func))]);

    let generated = generate(&mut f, &program);
    assert_eq!(function_names(&generated), vec!["try_divide", "check_divide"]);
}

#[test]
fn type_qualifiers_are_preserved() {
    let mut f = AstFactory::new();
    let fail = fail_stmt(&mut f);
    let body = f.block(vec![fail]);
    let mut func = f.function("parse!", vec![], None, body);
    func.type_qualifier = Some("Text".to_string());
    let program = Program::from_declarations(vec![f.decl(DeclKind::Function(func))]);

    let generated = generate(&mut f, &program);
    let try_fn = function(&generated, "try_parse");
    assert_eq!(try_fn.type_qualifier.as_deref(), Some("Text"));
}

#[test]
fn non_failable_functions_are_skipped_even_with_fail_statements() {
    let mut f = AstFactory::new();
    let fail = fail_stmt(&mut f);
    let body = f.block(vec![fail]);
    let func = f.function("parse", vec![], None, body);
    let program = Program::from_declarations(vec![f.decl(DeclKind::Function(func))]);

    let generated = generate(&mut f, &program);
    assert!(generated.is_empty());
}

#[test]
fn crash_only_functions_are_skipped() {
    let mut f = AstFactory::new();
    let fail = fail_stmt(&mut f);
    let body = f.block(vec![fail]);
    let mut func = f.function("abort!", vec![], None, body);
    func.crash_only = true;
    let program = Program::from_declarations(vec![f.decl(DeclKind::Function(func))]);

    let generated = generate(&mut f, &program);
    assert!(generated.is_empty());
}

#[test]
fn bodies_calling_unrecoverable_intrinsics_are_skipped() {
    let mut f = AstFactory::new();
    let cond = f.lit_bool(true);
    let verify = f.call_named("verify!", vec![cond]);
    let verify_stmt = f.expr_stmt(verify);
    let fail = fail_stmt(&mut f);
    let body = f.block(vec![verify_stmt, fail]);
    let program = failable_program(&mut f, body);

    let generated = generate(&mut f, &program);
    assert!(generated.is_empty());
}

#[test]
fn already_prefixed_functions_are_skipped() {
    let mut f = AstFactory::new();
    let fail = fail_stmt(&mut f);
    let body = f.block(vec![fail]);
    let func = f.function("try_parse!", vec![], None, body);
    let program = Program::from_declarations(vec![f.decl(DeclKind::Function(func))]);

    let generated = generate(&mut f, &program);
    assert!(generated.is_empty());
}

#[test]
fn methods_inside_classes_are_walked() {
    let mut f = AstFactory::new();
    let fail = fail_stmt(&mut f);
    let body = f.block(vec![fail]);
    let method = f.function("load!", vec![], None, body);
    let method_decl = f.decl(DeclKind::Function(method));
    let class = f.decl(DeclKind::Class(forge_ast::ClassDecl {
        name: "Store".to_string(),
        generics: vec![],
        features: vec![],
        members: vec![method_decl],
    }));
    let program = Program::from_declarations(vec![class]);

    let generated = generate(&mut f, &program);
    assert_eq!(function_names(&generated), vec!["try_load", "check_load"]);
}

#[test]
fn generated_bodies_use_fresh_node_ids() {
    let mut f = AstFactory::new();
    let err = f.ident("error");
    let original_id = err.id;
    let fail = f.throw(err);
    let body = f.block(vec![fail]);
    let program = failable_program(&mut f, body);

    let generated = generate(&mut f, &program);
    let check_fn = function(&generated, "check_parse");
    match &check_fn.body.statements[0].kind {
        StmtKind::Return(Some(value)) => assert_ne!(value.id, original_id),
        other => panic!("expected return, got {other:?}"),
    }
}
