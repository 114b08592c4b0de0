// Property tests for the type/boxing oracle:
// 1. needs_cast is deterministic and unaffected by pre-simplifying its inputs
// 2. Types that erase to Object are never the target of a cast
// 3. Erasure comparison is reflexive and symmetric

use proptest::prelude::*;

use ceylon_lower::ast::Expr;
use ceylon_lower::config::LoweringOptions;
use ceylon_lower::ir::print_expr;
use ceylon_lower::lower::java_types::JtFlags;
use ceylon_lower::lower::{Cx, Lowerer, Oracle};
use ceylon_lower::model::{BoxingStrategy, Container, MemberDecl, MemberFlags, Model, Type, ValueDecl};

fn arb_leaf() -> impl Strategy<Value = Type> {
    prop_oneof![
        Just(Type::anything()),
        Just(Type::object()),
        Just(Type::null()),
        Just(Type::integer()),
        Just(Type::float()),
        Just(Type::boolean()),
        Just(Type::character()),
        Just(Type::string()),
        Just(Type::empty()),
    ]
}

fn arb_type() -> impl Strategy<Value = Type> {
    arb_leaf().prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(Type::optional),
            inner.clone().prop_map(Type::sequential),
            inner.clone().prop_map(Type::sequence),
            inner.clone().prop_map(Type::stream),
            (inner.clone(), inner.clone()).prop_map(|(k, v)| Type::entry(k, v)),
            (inner.clone(), inner.clone()).prop_map(|(r, a)| Type::callable(r, Type::tuple(vec![a], None))),
            prop::collection::vec(inner, 1..3).prop_map(|elements| Type::tuple(elements, None)),
        ]
    })
}

/// Types represented as a plain `Object`.
fn arb_erased() -> impl Strategy<Value = Type> {
    prop_oneof![
        Just(Type::anything()),
        Just(Type::object()),
        Just(Type::union(vec![Type::integer(), Type::string()])),
        Just(Type::union(vec![Type::float(), Type::boolean(), Type::null()])),
        Just(Type::union(vec![Type::entry(Type::string(), Type::integer()), Type::character()])),
    ]
}

fn arb_flags() -> impl Strategy<Value = (bool, bool, bool)> {
    (any::<bool>(), any::<bool>(), any::<bool>())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn needs_cast_is_deterministic(have in arb_type(), want in arb_type(), flags in arb_flags()) {
        let model = Model::language();
        let oracle = Oracle::new(model);
        let (not_raw, constrained, down_cast) = flags;
        let first = oracle.needs_cast(&have, &want, not_raw, constrained, down_cast);
        let second = oracle.needs_cast(&have, &want, not_raw, constrained, down_cast);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn needs_cast_is_stable_under_simplification(have in arb_type(), want in arb_type(), flags in arb_flags()) {
        let oracle = Oracle::new(Model::language());
        let (not_raw, constrained, down_cast) = flags;
        let direct = oracle.needs_cast(&have, &want, not_raw, constrained, down_cast);
        let simplified = oracle.needs_cast(
            &oracle.simplify(&have),
            &oracle.simplify(&want),
            not_raw,
            constrained,
            down_cast,
        );
        prop_assert_eq!(direct, simplified);
    }

    #[test]
    fn object_erased_types_are_never_cast_to(have in arb_type(), want in arb_erased()) {
        let oracle = Oracle::new(Model::language());
        prop_assert!(oracle.erases_to_object(&want));
        prop_assert!(!oracle.needs_cast(&have, &want, false, false, false));

        let mut model = Model::with_language();
        let key = model.add_member(MemberDecl::Value(ValueDecl {
            name: "v".into(),
            ty: have.clone(),
            container: Container::Local { owner: None, in_initializer: false },
            flags: MemberFlags::default(),
        }));
        let options = LoweringOptions::default();
        let lowerer = Lowerer::new(&model, &options);
        let e = Expr::member(key, have);
        let out = lowerer.lower_expression(Cx::default(), &e, BoxingStrategy::Boxed, Some(&want)).unwrap();
        let text = print_expr(&out);
        prop_assert!(!text.contains("(java.lang.Object)"), "{}", text);
    }

    #[test]
    fn same_erasure_is_reflexive_and_symmetric(a in arb_type(), b in arb_type()) {
        let oracle = Oracle::new(Model::language());
        prop_assert!(oracle.have_same_erasure(&a, &a));
        prop_assert_eq!(oracle.have_same_erasure(&a, &b), oracle.have_same_erasure(&b, &a));
    }

    #[test]
    fn type_arguments_are_never_primitive(ty in arb_type()) {
        let oracle = Oracle::new(Model::language());
        prop_assert!(!oracle.java_type(&ty, JtFlags::TYPE_ARGUMENT).is_primitive());
        prop_assert!(!oracle.java_type(&ty, JtFlags::NO_PRIMITIVES).is_primitive());
    }

    #[test]
    fn optional_types_never_erase_to_primitive(ty in arb_type()) {
        let oracle = Oracle::new(Model::language());
        prop_assert!(!oracle.erases_to_primitive(&Type::optional(ty)));
    }
}
