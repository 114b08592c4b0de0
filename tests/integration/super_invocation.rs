mod common;

use ceylon_lower::ast::{Expr, ExprKind, MemberOp, PositionalArg};
use ceylon_lower::config::LoweringOptions;
use ceylon_lower::diagnostics::LowerError;
use ceylon_lower::ir::{JMember, print_member, print_stmt, stmt_errors};
use ceylon_lower::lower::{Cx, Lowerer, SuperCall};
use ceylon_lower::model::{
    BoxingStrategy, Container, MemberDecl, MemberFlags, Model, Parameter, Type, TypeDecl, ValueDecl,
};

fn model(nested: bool) -> Model {
    let mut m = Model::with_language();
    let mut base = TypeDecl::class("Base", "app.Base");
    base.extended = Some(Type::object());
    base.parameters = vec![
        Parameter::new("size", Type::integer(), BoxingStrategy::Unboxed),
        Parameter::new("label", Type::string(), BoxingStrategy::Unboxed).defaulted(),
    ];
    m.add_type(base);
    let mut derived = TypeDecl::class("Derived", "app.Derived");
    derived.extended = Some(Type::named("Base"));
    derived.parameters = vec![Parameter::new("xs", Type::sequential(Type::string()), BoxingStrategy::Boxed)];
    if nested {
        derived.container = Container::Type("Outer".into());
    }
    m.add_type(derived);
    m.add_member(MemberDecl::Value(ValueDecl {
        name: "xs".into(),
        ty: Type::sequential(Type::string()),
        container: Container::Local { owner: Some("Derived".into()), in_initializer: true },
        flags: MemberFlags { class_parameter: true, ..MemberFlags::default() },
    }));
    m
}

fn xs() -> Expr {
    Expr::member("Derived::xs", Type::sequential(Type::string()))
}

/// `xs*.size.size`, whose spread access loops while the instance is unconstructed.
fn looping_argument() -> Expr {
    let sizes = Expr::new(
        ExprKind::QualifiedMember {
            receiver: Box::new(xs()),
            decl: "Iterable.size".into(),
            op: MemberOp::Spread,
            type_args: Vec::new(),
        },
        Type::sequential(Type::integer()),
    );
    Expr::qualified(sizes, "Iterable.size", Type::integer())
}

fn super_call(m: &Model, args: Vec<PositionalArg>) -> SuperCall {
    let options = LoweringOptions::default();
    let l = Lowerer::new(m, &options);
    l.lower_super_initializer(Cx::default(), "Derived", &Type::named("Base"), &args).unwrap()
}

// ===== Delegation =====

#[test]
fn test_plain_arguments_stay_inline() {
    let m = model(false);
    let call = super_call(&m, vec![PositionalArg::Plain(Expr::natural("1")), PositionalArg::Plain(Expr::string("a"))]);
    assert_eq!(print_stmt(&call.call), "super(1L, \"a\");\n");
    assert!(call.helpers.is_empty());
}

#[test]
fn test_missing_argument_uses_static_default() {
    let m = model(false);
    let call = super_call(&m, vec![PositionalArg::Plain(Expr::natural("1"))]);
    assert_eq!(print_stmt(&call.call), "super(1L, app.Base.$default$label(1L));\n");
    assert!(call.helpers.is_empty());
}

// ===== Loops in arguments =====

#[test]
fn test_loop_in_argument_moves_arguments_to_static_helpers() {
    let m = model(false);
    let call = super_call(&m, vec![PositionalArg::Plain(looping_argument()), PositionalArg::Plain(Expr::string("a"))]);
    assert_eq!(print_stmt(&call.call), "super($superarg$0(xs), $superarg$1(xs));\n");
    assert_eq!(call.helpers.len(), 2);
    for helper in &call.helpers {
        let text = print_member(&JMember::Method(helper.clone()));
        assert!(text.starts_with("private static "), "{text}");
    }
}

#[test]
fn test_loop_with_omitted_default_hoists_the_default_too() {
    let m = model(false);
    let call = super_call(&m, vec![PositionalArg::Plain(looping_argument())]);
    assert!(stmt_errors(&call.call).is_empty());
    assert_eq!(print_stmt(&call.call), "super($superarg$0(xs), $superarg$1(xs));\n");
    assert_eq!(call.helpers.len(), 2);
    let default = print_member(&JMember::Method(call.helpers[1].clone()));
    assert!(default.contains("return app.Base.$default$label($superarg$0(xs));"), "{default}");
}

#[test]
fn test_loop_in_nested_class_is_reported() {
    let m = model(true);
    let call = super_call(&m, vec![PositionalArg::Plain(looping_argument()), PositionalArg::Plain(Expr::string("a"))]);
    assert!(call.helpers.is_empty());
    let diagnostics = stmt_errors(&call.call);
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.contains("currently only supported on top level classes"));
}

#[test]
fn test_unknown_superclass_aborts() {
    let m = model(false);
    let options = LoweringOptions::default();
    let l = Lowerer::new(&m, &options);
    let result = l.lower_super_initializer(Cx::default(), "Derived", &Type::named("Missing"), &[]);
    assert!(matches!(result, Err(LowerError::Internal { .. })));
}
