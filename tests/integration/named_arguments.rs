mod common;

use ceylon_lower::ast::{Arguments, Expr, NamedArg, NamedArgs, PositionalArg};
use ceylon_lower::model::{BoxingStrategy, Container, Model, Parameter, Type, TypeDecl, Variadic};

use common::{function, int_param, lower, lower_unreified, member_function, toplevel_value};

fn model() -> Model {
    let mut m = Model::with_language();
    m.add_member(function("pair", Type::integer(), vec![int_param("a"), int_param("b")]));
    m.add_member(function("g", Type::integer(), vec![int_param("a"), int_param("b").defaulted()]));
    m.add_member(function(
        "f",
        Type::integer(),
        vec![int_param("a"), Parameter::new("rest", Type::integer(), BoxingStrategy::Boxed).variadic(Variadic::Star)],
    ));
    let mut person = TypeDecl::class("Person", "app.Person");
    person.extended = Some(Type::object());
    m.add_type(person);
    m.add_member(member_function(
        "greet",
        Container::Type("Person".into()),
        Type::string(),
        vec![Parameter::new("name", Type::string(), BoxingStrategy::Unboxed)],
    ));
    toplevel_value(&mut m, "someone", Type::named("Person"));
    m
}

fn named(args: Vec<(&str, Expr)>, sequenced: Option<Vec<PositionalArg>>) -> Arguments {
    Arguments::Named(NamedArgs {
        named: args.into_iter().map(|(param, value)| NamedArg { param: param.into(), value }).collect(),
        sequenced,
    })
}

fn call(callee: &str, args: Arguments) -> Expr {
    Expr::invoke_with(Expr::member(callee, Type::anything()), args, Type::integer())
}

// ===== Evaluation order =====

#[test]
fn test_temps_are_declared_in_parameter_order() {
    let m = model();
    let e = call("pair", named(vec![("b", Expr::natural("2")), ("a", Expr::natural("1"))], None));
    assert_eq!(
        lower(&m, &e, BoxingStrategy::Unboxed),
        "(let final long arg$0$0 = 1L; final long arg$0$1 = 2L; in pair_.pair(arg$0$0, arg$0$1))"
    );
}

#[test]
fn test_source_order_does_not_matter() {
    let m = model();
    let forward = call("pair", named(vec![("a", Expr::natural("1")), ("b", Expr::natural("2"))], None));
    let backward = call("pair", named(vec![("b", Expr::natural("2")), ("a", Expr::natural("1"))], None));
    assert_eq!(lower(&m, &forward, BoxingStrategy::Unboxed), lower(&m, &backward, BoxingStrategy::Unboxed));
}

#[test]
fn test_qualified_receiver_is_evaluated_first() {
    let m = model();
    let primary = Expr::qualified(Expr::member("someone", Type::named("Person")), "Person.greet", Type::anything());
    let e = Expr::invoke_with(primary, named(vec![("name", Expr::string("Ann"))], None), Type::string());
    let text = lower(&m, &e, BoxingStrategy::Unboxed);
    assert!(text.starts_with("(let final app.Person arg$0$callable$ = someone_.get_(); "), "{text}");
    assert!(text.ends_with("in arg$0$callable$.greet(arg$0$0))"), "{text}");
}

// ===== Defaults and sequenced arguments =====

#[test]
fn test_omitted_named_argument_uses_default_method() {
    let m = model();
    let e = call("g", named(vec![("a", Expr::natural("1"))], None));
    assert_eq!(
        lower(&m, &e, BoxingStrategy::Unboxed),
        "(let final long arg$0$0 = 1L; final long arg$0$1 = g_.g$b(arg$0$0); in g_.g(arg$0$0, arg$0$1))"
    );
}

#[test]
fn test_sequenced_arguments_bind_variadic_parameter() {
    let m = model();
    let sequenced = vec![PositionalArg::Plain(Expr::natural("2")), PositionalArg::Plain(Expr::natural("3"))];
    let e = call("f", named(vec![("a", Expr::natural("1"))], Some(sequenced)));
    let text = lower_unreified(&m, &e, BoxingStrategy::Unboxed);
    assert!(
        text.contains(
            "arg$0$1 = new ceylon.language.ArraySequence<ceylon.language.Integer>(new java.lang.Object[]{\
             ceylon.language.Integer.instance(2L), ceylon.language.Integer.instance(3L)});"
        ),
        "{text}"
    );
    assert!(text.ends_with("in f_.f(arg$0$0, arg$0$1))"), "{text}");
}

#[test]
fn test_unknown_parameter_is_a_placeholder() {
    let m = model();
    let e = call("pair", named(vec![("c", Expr::natural("1"))], None));
    assert_eq!(lower(&m, &e, BoxingStrategy::Unboxed), "<error: compiler bug: no parameter c for named argument>");
}
