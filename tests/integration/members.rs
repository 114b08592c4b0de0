mod common;

use ceylon_lower::ast::{Expr, ExprKind, MemberOp};
use ceylon_lower::config::LoweringOptions;
use ceylon_lower::lower::{Cx, Scope};
use ceylon_lower::model::{BoxingStrategy, Container, MemberDecl, MemberFlags, Model, Type, TypeDecl, ValueDecl};

use common::{local, lower, lower_with};

fn model() -> Model {
    let mut m = Model::with_language();
    let mut person = TypeDecl::class("Person", "app.Person");
    person.extended = Some(Type::object());
    m.add_type(person);
    m.add_type(TypeDecl::interface("Named", "app.Named"));
    m.add_member(MemberDecl::Value(ValueDecl {
        name: "name".into(),
        ty: Type::string(),
        container: Container::Type("Person".into()),
        flags: MemberFlags { shared: true, ..MemberFlags::default() },
    }));
    m.add_member(MemberDecl::Value(ValueDecl {
        name: "age".into(),
        ty: Type::integer(),
        container: Container::Type("Person".into()),
        flags: MemberFlags { shared: true, unboxed: true, class_parameter: true, ..MemberFlags::default() },
    }));
    m.add_member(MemberDecl::Value(ValueDecl {
        name: "secret".into(),
        ty: Type::string(),
        container: Container::Type("Named".into()),
        flags: MemberFlags::default(),
    }));
    m.add_member(MemberDecl::Value(ValueDecl {
        name: "greeting".into(),
        ty: Type::string(),
        container: Container::Toplevel,
        flags: MemberFlags { shared: true, ..MemberFlags::default() },
    }));
    m
}

fn lower_in(m: &Model, cx: Cx<'_>, e: &Expr, boxing: BoxingStrategy) -> String {
    lower_with(m, &LoweringOptions::default(), cx, e, boxing)
}

// ===== Base members =====

#[test]
fn test_toplevel_values_read_through_wrappers() {
    let m = model();
    assert_eq!(lower(&m, &Expr::member("greeting", Type::string()), BoxingStrategy::Boxed), "greeting_.get_()");
    assert_eq!(
        lower(&m, &Expr::member("empty", Type::empty()), BoxingStrategy::Boxed),
        "ceylon.language.empty_.get_()"
    );
    assert_eq!(lower(&m, &Expr::member("true", Type::boolean()), BoxingStrategy::Unboxed), "true");
}

#[test]
fn test_class_parameter_depends_on_context() {
    let m = model();
    let e = Expr::member("Person.age", Type::integer());
    let in_super = Cx::new(Scope::in_class("Person")).within_super_invocation(Some("Person"));
    assert_eq!(lower_in(&m, in_super, &e, BoxingStrategy::Unboxed), "age");
    assert_eq!(lower_in(&m, Cx::new(Scope::in_class("Person")), &e, BoxingStrategy::Unboxed), "getAge()");
}

#[test]
fn test_outer_instance_is_qualified_in_synthetic_bodies() {
    let m = model();
    let e = Expr::member("Person.name", Type::string());
    let cx = Cx::new(Scope::in_class("Person")).in_synthetic_body();
    assert_eq!(lower_in(&m, cx, &e, BoxingStrategy::Boxed), "app.Person.this.getName()");
}

#[test]
fn test_boxed_variable_reads_its_cell() {
    let mut m = model();
    let flags = MemberFlags { variable: true, boxed_variable: true, unboxed: true, ..MemberFlags::default() };
    let count = local(&mut m, "count", Type::integer(), flags);
    assert_eq!(lower(&m, &count, BoxingStrategy::Unboxed), "count.ref");
}

// ===== Qualified members =====

#[test]
fn test_attribute_reads_through_getter() {
    let mut m = model();
    let p = local(&mut m, "p", Type::named("Person"), MemberFlags::default());
    let e = Expr::qualified(p, "Person.name", Type::string());
    assert_eq!(lower(&m, &e, BoxingStrategy::Boxed), "p.getName()");
}

#[test]
fn test_private_interface_member_uses_companion() {
    let mut m = model();
    let n = local(&mut m, "n", Type::named("Named"), MemberFlags::default());
    let e = Expr::qualified(n, "Named.secret", Type::string());
    assert_eq!(lower(&m, &e, BoxingStrategy::Boxed), "n.$Named$impl().getSecret()");
}

#[test]
fn test_value_type_attribute_is_static() {
    let m = Model::with_language();
    let e = Expr::qualified(Expr::string("abc"), "String.size", Type::integer());
    assert_eq!(lower(&m, &e, BoxingStrategy::Unboxed), "ceylon.language.String.getSize(\"abc\")");
}

#[test]
fn test_safe_access_tests_receiver_once() {
    let mut m = model();
    let q = local(&mut m, "q", Type::optional(Type::named("Person")), MemberFlags::default());
    let mut e = Expr::qualified(q, "Person.name", Type::optional(Type::string()));
    if let ExprKind::QualifiedMember { op, .. } = &mut e.kind {
        *op = MemberOp::Safe;
    }
    assert_eq!(
        lower(&m, &e, BoxingStrategy::Boxed),
        "(let final app.Person $safe$0 = q; in $safe$0 != null ? $safe$0.getName() : null)"
    );
}

#[test]
fn test_spread_access_collects_into_a_sequence() {
    let mut m = model();
    let people = local(&mut m, "people", Type::sequential(Type::named("Person")), MemberFlags::default());
    let mut e = Expr::qualified(people, "Person.name", Type::sequential(Type::string()));
    if let ExprKind::QualifiedMember { op, .. } = &mut e.kind {
        *op = MemberOp::Spread;
    }
    let text = lower(&m, &e, BoxingStrategy::Boxed);
    assert!(text.contains("spread$0$sb$.append(spread$0$element$.getName())"), "{text}");
    assert!(text.ends_with("in spread$0$sb$.getSequence())"), "{text}");
}

// ===== This =====

#[test]
fn test_this_inside_an_interface_companion() {
    let m = model();
    let e = Expr::new(ExprKind::This, Type::named("Named"));
    assert_eq!(lower_in(&m, Cx::new(Scope::in_interface("Named")), &e, BoxingStrategy::Boxed), "$this");
}
