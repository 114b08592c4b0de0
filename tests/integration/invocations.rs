mod common;

use ceylon_lower::ast::{Arguments, Expr, ExprKind, PositionalArg};
use ceylon_lower::config::LoweringOptions;
use ceylon_lower::ir::{print_expr, print_stmt};
use ceylon_lower::lower::{Cx, Lowerer};
use ceylon_lower::model::{BoxingStrategy, MemberFlags, Model, Parameter, Type, TypeDecl, TypeParam, Variadic};

use common::{callable_of, function, int_param, local, lower};

fn model() -> Model {
    let mut m = Model::with_language();
    m.add_member(function(
        "f",
        Type::integer(),
        vec![
            int_param("a"),
            Parameter::new("rest", Type::integer(), BoxingStrategy::Boxed).variadic(Variadic::Star),
        ],
    ));
    m.add_member(function("pair", Type::integer(), vec![int_param("a"), int_param("b")]));
    m.add_member(function("g", Type::integer(), vec![int_param("a"), int_param("b").defaulted()]));
    let mut cell = TypeDecl::class("Cell", "app.Cell");
    cell.type_params = vec![TypeParam::new("T")];
    cell.extended = Some(Type::object());
    cell.flags.reified = true;
    cell.parameters = vec![Parameter::new("value", Type::param("T"), BoxingStrategy::Boxed)];
    m.add_type(cell);
    m
}

fn f() -> Expr {
    Expr::member("f", callable_of(Type::integer(), vec![Type::integer()]))
}

fn naturals(values: &[&str]) -> Vec<Expr> {
    values.iter().map(|v| Expr::natural(*v)).collect()
}

// ===== Variadic parameters =====

#[test]
fn test_trailing_arguments_become_a_sequence() {
    let m = model();
    let call = Expr::invoke(f(), naturals(&["1", "2", "3"]), Type::integer());
    assert_eq!(
        lower(&m, &call, BoxingStrategy::Unboxed),
        "f_.f(1L, new ceylon.language.ArraySequence<ceylon.language.Integer>(\
         com.redhat.ceylon.compiler.java.runtime.model.TypeDescriptor.klass(ceylon.language.Integer.class), \
         new java.lang.Object[]{ceylon.language.Integer.instance(2L), ceylon.language.Integer.instance(3L)}))"
    );
}

#[test]
fn test_no_trailing_arguments_pass_empty() {
    let m = model();
    let call = Expr::invoke(f(), naturals(&["1"]), Type::integer());
    assert_eq!(lower(&m, &call, BoxingStrategy::Unboxed), "f_.f(1L, ceylon.language.empty_.get_())");
}

#[test]
fn test_sequence_spread_is_passed_through() {
    let mut m = model();
    let xs = local(&mut m, "xs", Type::sequential(Type::integer()), MemberFlags::default());
    let args = Arguments::Positional(vec![PositionalArg::Plain(Expr::natural("1")), PositionalArg::Spread(xs)]);
    let call = Expr::invoke_with(f(), args, Type::integer());
    assert_eq!(lower(&m, &call, BoxingStrategy::Unboxed), "f_.f(1L, xs)");
}

// ===== Tuple spread =====

#[test]
fn test_known_length_tuple_spread_has_no_length_check() {
    let mut m = model();
    let pair_ty = Type::tuple(vec![Type::integer(), Type::integer()], None);
    let t = local(&mut m, "t", pair_ty, MemberFlags::default());
    let pair = Expr::member("pair", callable_of(Type::integer(), vec![Type::integer(), Type::integer()]));
    let call = Expr::invoke_with(pair, Arguments::Positional(vec![PositionalArg::Spread(t)]), Type::integer());
    let text = lower(&m, &call, BoxingStrategy::Unboxed);
    assert!(text.contains("$spread$0$0 = "), "{text}");
    assert!(text.contains("$spread$0$1 = "), "{text}");
    assert!(text.ends_with("in pair_.pair($spread$0$0, $spread$0$1))"), "{text}");
    assert!(!text.contains("getSize"), "{text}");
}

#[test]
fn test_arguments_before_a_tuple_spread_are_evaluated_once_and_first() {
    let mut m = model();
    m.add_member(function("next", Type::integer(), Vec::new()));
    m.add_member(function("h", Type::integer(), vec![int_param("a"), int_param("b"), int_param("c").defaulted()]));
    let xs = local(&mut m, "xs", Type::sequential(Type::integer()), MemberFlags::default());
    let next = Expr::invoke(Expr::member("next", callable_of(Type::integer(), Vec::new())), Vec::new(), Type::integer());
    let h = Expr::member("h", callable_of(Type::integer(), vec![Type::integer(), Type::integer()]));
    let args = Arguments::Positional(vec![PositionalArg::Plain(next), PositionalArg::Spread(xs)]);
    let text = lower(&m, &Expr::invoke_with(h, args, Type::integer()), BoxingStrategy::Unboxed);

    assert_eq!(text.matches("next_.next()").count(), 1, "{text}");
    let first = text.find("arg$0$0 = next_.next();").expect(&text);
    let spread_at = text.find("$spread$").expect(&text);
    assert!(first < spread_at, "{text}");
    let spread = text[spread_at..].split_whitespace().next().unwrap_or_default();
    assert!(text.contains(&format!("{spread} = xs;")), "{text}");
    assert!(text.contains(&format!("h_.h$c(arg$0$0, {spread}$0)")), "{text}");
    assert!(text.ends_with(&format!("in h_.h(arg$0$0, {spread}$0, {spread}$1))")), "{text}");
}

// ===== Defaults =====

#[test]
fn test_omitted_argument_is_computed_by_default_method() {
    let m = model();
    let g = Expr::member("g", callable_of(Type::integer(), vec![Type::integer()]));
    let call = Expr::invoke(g, naturals(&["1"]), Type::integer());
    assert_eq!(
        lower(&m, &call, BoxingStrategy::Unboxed),
        "(let final long arg$0$0 = 1L; final long arg$0$1 = g_.g$b(arg$0$0); in g_.g(arg$0$0, arg$0$1))"
    );
}

// ===== Results =====

#[test]
fn test_void_call_as_statement_and_expression() {
    let m = Model::with_language();
    let print = Expr::member("print", callable_of(Type::anything(), vec![Type::anything()]));
    let call = Expr::invoke(print, vec![Expr::string("hi")], Type::anything());
    assert_eq!(
        lower(&m, &call, BoxingStrategy::Boxed),
        "(let ceylon.language.print_.print(ceylon.language.String.instance(\"hi\")); in null)"
    );
    let options = LoweringOptions::default();
    let l = Lowerer::new(&m, &options);
    let stmt = l.lower_statement(Cx::default(), &call).unwrap();
    assert_eq!(print_stmt(&stmt), "ceylon.language.print_.print(ceylon.language.String.instance(\"hi\"));\n");
}

#[test]
fn test_lower_invocation_rejects_non_calls() {
    let m = Model::with_language();
    let options = LoweringOptions::default();
    let l = Lowerer::new(&m, &options);
    assert!(l.lower_invocation(Cx::default(), &Expr::natural("1")).is_err());
    let print = Expr::member("print", callable_of(Type::anything(), vec![Type::anything()]));
    let call = Expr::invoke(print, vec![Expr::string("hi")], Type::anything());
    let out = l.lower_invocation(Cx::default(), &call).unwrap();
    assert!(print_expr(&out).contains("ceylon.language.print_.print("));
}

// ===== Receivers =====

#[test]
fn test_callable_value_is_called_indirectly() {
    let mut m = model();
    let h = local(&mut m, "h", callable_of(Type::integer(), vec![Type::integer()]), MemberFlags::default());
    let call = Expr::invoke(h, naturals(&["1"]), Type::integer());
    assert_eq!(
        lower(&m, &call, BoxingStrategy::Boxed),
        "(ceylon.language.Integer)h.$call$(ceylon.language.Integer.instance(1L))"
    );
}

#[test]
fn test_value_type_method_is_called_statically() {
    let mut m = model();
    let unboxed = MemberFlags { unboxed: true, ..MemberFlags::default() };
    let x = local(&mut m, "x", Type::integer(), unboxed.clone());
    let y = local(&mut m, "y", Type::integer(), unboxed);
    let plus = Expr::qualified(x, "Integer.plus", callable_of(Type::integer(), vec![Type::integer()]));
    let call = Expr::invoke(plus, vec![y], Type::integer());
    assert_eq!(lower(&m, &call, BoxingStrategy::Unboxed), "ceylon.language.Integer.plus(x, y)");
}

// ===== Instantiation =====

#[test]
fn test_generic_instantiation_passes_type_descriptor() {
    let m = model();
    let cell_ty = Type::class("Cell", vec![Type::string()]);
    let primary = Expr::new(
        ExprKind::BaseType { decl: "Cell".into(), type_args: vec![Type::string()] },
        callable_of(cell_ty.clone(), vec![Type::string()]),
    );
    let call = Expr::invoke(primary, vec![Expr::string("a")], cell_ty);
    assert_eq!(
        lower(&m, &call, BoxingStrategy::Boxed),
        "new app.Cell<ceylon.language.String>(\
         com.redhat.ceylon.compiler.java.runtime.model.TypeDescriptor.klass(ceylon.language.String.class), \
         ceylon.language.String.instance(\"a\"))"
    );
}
