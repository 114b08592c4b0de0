mod common;

use ceylon_lower::ast::{BinaryOp, Clause, Comprehension, Condition, Expr, ExprKind, ForPattern, PositionalArg};
use ceylon_lower::config::LoweringOptions;
use ceylon_lower::ir::print_expr;
use ceylon_lower::lower::{Cx, Lowerer};
use ceylon_lower::model::{BoxingStrategy, Model, Type};

use common::{lower_unreified, toplevel_value};

fn model() -> Model {
    let mut m = Model::with_language();
    toplevel_value(&mut m, "xs", Type::sequential(Type::integer()));
    toplevel_value(&mut m, "ys", Type::sequential(Type::integer()));
    m
}

fn x() -> Expr {
    Expr::member("::x", Type::integer())
}

fn for_in(name: &str, iterable: &str) -> Clause {
    Clause::For {
        pattern: ForPattern::Value { name: name.into(), ty: Type::integer() },
        iterable: Expr::member(iterable, Type::sequential(Type::integer())),
    }
}

fn positive_doubles() -> Comprehension {
    let positive = Expr::binary(BinaryOp::Gt, x(), Expr::natural("0"), Type::boolean());
    let doubled = Expr::binary(BinaryOp::Mul, x(), Expr::natural("2"), Type::integer());
    Comprehension {
        clauses: vec![for_in("x", "xs"), Clause::If(vec![Condition::Boolean(positive)])],
        yield_expr: Box::new(doubled),
    }
}

fn as_expr(comp: Comprehension) -> Expr {
    let ty = Type::stream(comp.yield_expr.ty.clone());
    Expr::new(ExprKind::Comprehension(comp), ty)
}

// ===== Filtering =====

#[test]
fn test_filter_skips_until_a_match() {
    let m = model();
    let text = lower_unreified(&m, &as_expr(positive_doubles()), BoxingStrategy::Boxed);
    // the outer iterator is created once, in the initializer
    assert!(text.contains("$iterator$0 = xs_.get_().iterator();"), "{text}");
    // the filter loops over the outer clause until its condition holds
    assert!(text.contains("ifcomp_1: while (true) {"), "{text}");
    assert!(text.contains("if (!this.x()) {"), "{text}");
    assert!(text.contains("x.longValue() > 0L"), "{text}");
    assert!(text.contains("return !x$exhausted$;"), "{text}");
    // next() yields only after the filter succeeded
    assert!(text.contains("if (this.$next$1()) {"), "{text}");
    assert!(text.contains("return ceylon.language.Integer.instance(x.longValue() * 2L);"), "{text}");
    assert!(text.contains("return ceylon.language.finished_.get_();"), "{text}");
}

#[test]
fn test_exhaustion_comes_from_the_outer_iterator() {
    let m = model();
    let text = lower_unreified(&m, &as_expr(positive_doubles()), BoxingStrategy::Boxed);
    assert!(text.contains("x$exhausted$ = item$0 == ceylon.language.finished_.get_();"), "{text}");
    assert_eq!(text.matches("== ceylon.language.finished_.get_()").count(), 1, "{text}");
}

#[test]
fn test_public_entry_point_matches_expression_lowering() {
    let m = model();
    let options = LoweringOptions { reified_generics: false, ..LoweringOptions::default() };
    let l = Lowerer::new(&m, &options);
    let direct = l.lower_comprehension(Cx::default(), &positive_doubles(), None).unwrap();
    let text = print_expr(&direct);
    assert!(text.starts_with("new ceylon.language.AbstractIterable<"), "{text}");
    assert!(text.contains("ifcomp_1: while (true) {"), "{text}");
}

// ===== Nesting =====

#[test]
fn test_inner_iterator_is_recreated_per_outer_element() {
    let m = model();
    let comp = Comprehension {
        clauses: vec![for_in("x", "xs"), for_in("y", "ys")],
        yield_expr: Box::new(Expr::member("::y", Type::integer())),
    };
    let text = lower_unreified(&m, &as_expr(comp), BoxingStrategy::Boxed);
    assert!(text.contains("private final boolean $iterator$1() {"), "{text}");
    assert!(text.contains("if (!this.x()) {"), "{text}");
    assert!(text.contains("$iterator$1 = ys_.get_().iterator();"), "{text}");
    assert!(text.contains("while (this.$iterator$1()) {"), "{text}");
    assert!(text.contains("$iterator$1 = null;"), "{text}");
}

#[test]
fn test_comprehension_argument_of_an_enumeration() {
    let m = model();
    let comp = as_expr(positive_doubles());
    let ty = comp.ty.clone();
    let e = Expr::new(ExprKind::SequenceEnum(vec![PositionalArg::Comprehension(comp)]), ty);
    let text = lower_unreified(&m, &e, BoxingStrategy::Boxed);
    assert!(text.starts_with("new ceylon.language.AbstractIterable<"), "{text}");
    assert!(!text.contains("LazyIterable"), "{text}");
}
