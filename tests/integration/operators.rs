mod common;

use ceylon_lower::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use ceylon_lower::config::LoweringOptions;
use ceylon_lower::ir;
use ceylon_lower::lower::{Cx, Lowerer};
use ceylon_lower::model::{BoxingStrategy, MemberFlags, Model, Type, TypeDecl, names};
use ceylon_lower::span::Span;

use common::{local, lower, lower_with};

fn version_model() -> Model {
    let mut m = Model::with_language();
    let mut version = TypeDecl::class("Version", "app.Version");
    version.extended = Some(Type::object());
    version.satisfied = vec![Type::class(names::COMPARABLE, vec![Type::named("Version")])];
    m.add_type(version);
    m
}

fn unboxed_var() -> MemberFlags {
    MemberFlags { variable: true, unboxed: true, ..MemberFlags::default() }
}

// ===== Arithmetic =====

#[test]
fn test_integer_addition_is_native() {
    let m = Model::with_language();
    let e = Expr::binary(BinaryOp::Add, Expr::natural("3"), Expr::natural("4"), Type::integer());
    let text = lower(&m, &e, BoxingStrategy::Unboxed);
    assert_eq!(text, "3L + 4L");
    assert!(!text.contains(".plus("));
}

#[test]
fn test_boxed_addition_wraps_native_result() {
    let m = Model::with_language();
    let e = Expr::binary(BinaryOp::Add, Expr::natural("3"), Expr::natural("4"), Type::integer());
    assert_eq!(lower(&m, &e, BoxingStrategy::Boxed), "ceylon.language.Integer.instance(3L + 4L)");
}

#[test]
fn test_unoptimised_addition_calls_plus() {
    let m = Model::with_language();
    let options = LoweringOptions { optimise_operators: false, ..LoweringOptions::default() };
    let e = Expr::binary(BinaryOp::Add, Expr::natural("3"), Expr::natural("4"), Type::integer());
    assert_eq!(
        lower_with(&m, &options, Cx::default(), &e, BoxingStrategy::Boxed),
        "ceylon.language.Integer.instance(3L).plus(ceylon.language.Integer.instance(4L))"
    );
}

#[test]
fn test_small_constant_power_is_unrolled() {
    let mut m = Model::with_language();
    let x = local(&mut m, "x", Type::integer(), unboxed_var());
    let e = Expr::binary(BinaryOp::Pow, x, Expr::natural("3"), Type::integer());
    assert_eq!(lower(&m, &e, BoxingStrategy::Unboxed), "(let final long $tmp$0 = x; in $tmp$0 * $tmp$0 * $tmp$0)");
}

#[test]
fn test_power_above_inline_limit_calls_power() {
    let mut m = Model::with_language();
    let x = local(&mut m, "x", Type::integer(), unboxed_var());
    let e = Expr::binary(BinaryOp::Pow, x, Expr::natural("3"), Type::integer());
    let options = LoweringOptions { max_inline_power: 2, ..LoweringOptions::default() };
    let text = lower_with(&m, &options, Cx::default(), &e, BoxingStrategy::Boxed);
    assert!(text.ends_with(".power(ceylon.language.Integer.instance(3L))"), "{text}");
}

// ===== Comparison =====

#[test]
fn test_user_type_comparison_goes_through_compare() {
    let mut m = version_model();
    let a = local(&mut m, "a", Type::named("Version"), MemberFlags::default());
    let b = local(&mut m, "b", Type::named("Version"), MemberFlags::default());
    let e = Expr::binary(BinaryOp::Lt, a.clone(), b.clone(), Type::boolean());
    let text = lower(&m, &e, BoxingStrategy::Unboxed);
    assert_eq!(text, "a.compare(b).getInteger() < 0");
    assert!(!text.contains("a < b"));

    let e = Expr::binary(BinaryOp::Compare, a, b, Type::named(names::COMPARISON));
    assert_eq!(lower(&m, &e, BoxingStrategy::Boxed), "a.compare(b)");
}

#[test]
fn test_integer_comparison_is_native() {
    let mut m = Model::with_language();
    let x = local(&mut m, "x", Type::integer(), unboxed_var());
    let e = Expr::binary(BinaryOp::GtEq, x, Expr::natural("0"), Type::boolean());
    assert_eq!(lower(&m, &e, BoxingStrategy::Unboxed), "x >= 0L");
}

// ===== Equality =====

#[test]
fn test_equality_and_identity() {
    let mut m = version_model();
    let a = local(&mut m, "a", Type::named("Version"), MemberFlags::default());
    let b = local(&mut m, "b", Type::named("Version"), MemberFlags::default());
    let e = Expr::binary(BinaryOp::Neq, a.clone(), b.clone(), Type::boolean());
    assert_eq!(lower(&m, &e, BoxingStrategy::Unboxed), "!a.equals(b)");
    let e = Expr::binary(BinaryOp::Identical, a, b, Type::boolean());
    assert_eq!(lower(&m, &e, BoxingStrategy::Unboxed), "a == b");
}

// ===== Literals =====

#[test]
fn test_minimum_integer_literal_is_folded() {
    let m = Model::with_language();
    let e = Expr::unary(UnaryOp::Neg, Expr::natural("9223372036854775808"), Type::integer());
    assert_eq!(lower(&m, &e, BoxingStrategy::Unboxed), "-9223372036854775808L");
}

#[test]
fn test_out_of_range_literal_is_a_placeholder() {
    let m = Model::with_language();
    let e = Expr::natural("9223372036854775808").at(Span::new(4, 23));
    let options = LoweringOptions::default();
    let l = Lowerer::new(&m, &options);
    let out = l.lower_expression(Cx::default(), &e, BoxingStrategy::Unboxed, None).unwrap();
    let diagnostics = ir::errors(&out);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].span, Span::new(4, 23));
    assert!(diagnostics[0].message.contains("literal outside representable range"), "{}", diagnostics[0].message);
}

#[test]
fn test_placeholder_does_not_poison_siblings() {
    let m = Model::with_language();
    let e = Expr::binary(BinaryOp::Add, Expr::natural("99999999999999999999"), Expr::natural("1"), Type::integer());
    let options = LoweringOptions::default();
    let l = Lowerer::new(&m, &options);
    let out = l.lower_expression(Cx::default(), &e, BoxingStrategy::Unboxed, None).unwrap();
    assert_eq!(ir::errors(&out).len(), 1);
    assert!(ir::print_expr(&out).ends_with(" + 1L"), "{}", ir::print_expr(&out));
}

// ===== Type tests =====

#[test]
fn test_negated_type_test_on_literal_uses_temp() {
    let m = Model::with_language();
    let e = Expr::new(
        ExprKind::Is { operand: Box::new(Expr::string("x")), target: Type::string(), negated: true },
        Type::boolean(),
    );
    assert_eq!(
        lower(&m, &e, BoxingStrategy::Unboxed),
        "!(let final java.lang.Object $tmp$0 = ceylon.language.String.instance(\"x\"); \
         in $tmp$0 instanceof ceylon.language.String)"
    );
}
