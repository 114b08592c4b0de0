//! Snapshot tests of the printed target tree.
//!
//! Uses insta inline snapshots; run `cargo insta review` after intended
//! output changes.

mod common;

use insta::assert_snapshot;

use ceylon_lower::ast::{Arguments, BinaryOp, Expr, NamedArg, NamedArgs, PositionalArg};
use ceylon_lower::config::LoweringOptions;
use ceylon_lower::ir::print_stmt;
use ceylon_lower::lower::{Cx, Lowerer};
use ceylon_lower::model::{BoxingStrategy, MemberFlags, Model, Parameter, Type, Variadic};

use common::{callable_of, function, int_param, local, lower, lower_unreified};

fn model() -> Model {
    let mut m = Model::with_language();
    m.add_member(function("pair", Type::integer(), vec![int_param("a"), int_param("b")]));
    m.add_member(function(
        "f",
        Type::integer(),
        vec![int_param("a"), Parameter::new("rest", Type::integer(), BoxingStrategy::Boxed).variadic(Variadic::Star)],
    ));
    m
}

#[test]
fn test_snapshot_native_arithmetic() {
    let m = Model::with_language();
    let sum = Expr::binary(BinaryOp::Add, Expr::natural("3"), Expr::natural("4"), Type::integer());
    let e = Expr::binary(BinaryOp::Mul, sum, Expr::natural("2"), Type::integer());
    assert_snapshot!(lower(&m, &e, BoxingStrategy::Unboxed), @"(3L + 4L) * 2L");
}

#[test]
fn test_snapshot_variadic_call() {
    let m = model();
    let f = Expr::member("f", callable_of(Type::integer(), vec![Type::integer()]));
    let e = Expr::invoke(f, vec![Expr::natural("1"), Expr::natural("2")], Type::integer());
    assert_snapshot!(
        lower_unreified(&m, &e, BoxingStrategy::Unboxed),
        @"f_.f(1L, new ceylon.language.ArraySequence<ceylon.language.Integer>(new java.lang.Object[]{ceylon.language.Integer.instance(2L)}))"
    );
}

#[test]
fn test_snapshot_named_call() {
    let m = model();
    let args = Arguments::Named(NamedArgs {
        named: vec![
            NamedArg { param: "b".into(), value: Expr::natural("2") },
            NamedArg { param: "a".into(), value: Expr::natural("1") },
        ],
        sequenced: None,
    });
    let e = Expr::invoke_with(Expr::member("pair", Type::anything()), args, Type::integer());
    assert_snapshot!(
        lower(&m, &e, BoxingStrategy::Unboxed),
        @"(let final long arg$0$0 = 1L; final long arg$0$1 = 2L; in pair_.pair(arg$0$0, arg$0$1))"
    );
}

#[test]
fn test_snapshot_compound_assignment_statement() {
    let mut m = Model::with_language();
    let flags = MemberFlags { variable: true, unboxed: true, ..MemberFlags::default() };
    let x = local(&mut m, "x", Type::integer(), flags);
    let options = LoweringOptions::default();
    let l = Lowerer::new(&m, &options);
    let stmt = l.lower_assignment(Cx::default(), &x, &Expr::natural("5")).unwrap();
    assert_snapshot!(print_stmt(&stmt).trim_end(), @"x = 5L;");
}

#[test]
fn test_snapshot_tuple_literal() {
    let m = Model::with_language();
    let ty = Type::tuple(vec![Type::integer(), Type::string()], None);
    let e = Expr::new(
        ceylon_lower::ast::ExprKind::Tuple(vec![
            PositionalArg::Plain(Expr::natural("1")),
            PositionalArg::Plain(Expr::string("a")),
        ]),
        ty,
    );
    assert_snapshot!(
        lower_unreified(&m, &e, BoxingStrategy::Boxed),
        @r#"new ceylon.language.Tuple<java.lang.Object>(new java.lang.Object[]{ceylon.language.Integer.instance(1L), ceylon.language.String.instance("a")})"#
    );
}
