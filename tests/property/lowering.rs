// Property tests for expression lowering:
// 1. Boxing idempotence: a value already in the requested representation is left alone
// 2. Named arguments are evaluated in parameter order whatever the source order
// 3. Omitted defaulted parameters are always bound
// 4. Variadic arguments and an explicit spread both pass one sequence
// 5. Natural literals parse to the value they denote

use proptest::prelude::*;

use ceylon_lower::ast::{Arguments, Expr, NamedArg, NamedArgs, PositionalArg};
use ceylon_lower::config::LoweringOptions;
use ceylon_lower::ir::print_expr;
use ceylon_lower::lower::{Cx, Lowerer, parse_natural, parse_negated_natural};
use ceylon_lower::model::{
    BoxingStrategy, Container, FunctionDecl, MemberDecl, MemberFlags, Model, Parameter, Type, ValueDecl, Variadic,
};

const PARAM_NAMES: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

fn lower(model: &Model, e: &Expr, boxing: BoxingStrategy) -> String {
    let options = LoweringOptions { reified_generics: false, ..LoweringOptions::default() };
    let lowerer = Lowerer::new(model, &options);
    print_expr(&lowerer.lower_expression(Cx::default(), e, boxing, Some(&e.ty)).unwrap())
}

fn function(name: &str, parameters: Vec<Parameter>) -> MemberDecl {
    MemberDecl::Function(FunctionDecl {
        name: name.into(),
        return_ty: Type::integer(),
        type_params: Vec::new(),
        parameters,
        container: Container::Toplevel,
        flags: MemberFlags { shared: true, unboxed: true, ..MemberFlags::default() },
    })
}

fn int_param(name: &str) -> Parameter {
    Parameter::new(name, Type::integer(), BoxingStrategy::Unboxed)
}

fn arb_value_type() -> impl Strategy<Value = Type> {
    prop_oneof![
        Just(Type::integer()),
        Just(Type::float()),
        Just(Type::boolean()),
        Just(Type::character()),
        Just(Type::string()),
    ]
}

fn arb_boxing() -> impl Strategy<Value = BoxingStrategy> {
    prop_oneof![Just(BoxingStrategy::Boxed), Just(BoxingStrategy::Unboxed)]
}

/// A permutation of the first `n` parameter names, `n` in 1..=6.
fn arb_permutation() -> impl Strategy<Value = Vec<usize>> {
    (1..=PARAM_NAMES.len()).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())
}

fn named_call(callee: &str, order: &[usize]) -> Expr {
    let named = order
        .iter()
        .map(|&i| NamedArg { param: PARAM_NAMES[i].into(), value: Expr::natural(i.to_string()) })
        .collect();
    let args = Arguments::Named(NamedArgs { named, sequenced: None });
    Expr::invoke_with(Expr::member(callee, Type::anything()), args, Type::integer())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn boxing_is_idempotent(ty in arb_value_type(), boxing in arb_boxing()) {
        let mut model = Model::with_language();
        let unboxed = boxing == BoxingStrategy::Unboxed;
        let key = model.add_member(MemberDecl::Value(ValueDecl {
            name: "v".into(),
            ty: ty.clone(),
            container: Container::Local { owner: None, in_initializer: false },
            flags: MemberFlags { unboxed, ..MemberFlags::default() },
        }));
        let e = Expr::member(key, ty);
        prop_assert_eq!(lower(&model, &e, boxing), "v");
    }

    #[test]
    fn named_arguments_follow_parameter_order(order in arb_permutation()) {
        let n = order.len();
        let mut model = Model::with_language();
        model.add_member(function("h", PARAM_NAMES[..n].iter().map(|p| int_param(p)).collect()));
        let text = lower(&model, &named_call("h", &order), BoxingStrategy::Unboxed);

        let mut sorted = order.clone();
        sorted.sort_unstable();
        prop_assert_eq!(&text, &lower(&model, &named_call("h", &sorted), BoxingStrategy::Unboxed));
        for i in 0..n {
            let decl = format!("final long arg$0${i} = {i}L;");
            prop_assert!(text.contains(&decl), "{} missing from {}", decl, text);
        }
        let positions: Vec<usize> = (0..n).filter_map(|i| text.find(&format!("arg$0${i} = "))).collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", text);
    }

    #[test]
    fn omitted_defaults_are_always_bound(required in 1usize..3, defaulted in 1usize..4) {
        let mut params: Vec<Parameter> = PARAM_NAMES[..required].iter().map(|p| int_param(p)).collect();
        params.extend(PARAM_NAMES[required..required + defaulted].iter().map(|p| int_param(p).defaulted()));
        let mut model = Model::with_language();
        model.add_member(function("g", params));

        let args = (0..required).map(|i| Expr::natural(i.to_string())).collect();
        let e = Expr::invoke(Expr::member("g", Type::anything()), args, Type::integer());
        let text = lower(&model, &e, BoxingStrategy::Unboxed);
        for name in &PARAM_NAMES[required..required + defaulted] {
            let call = format!("g_.g${name}(");
            prop_assert!(text.contains(&call), "{} missing from {}", call, text);
        }
        let all: Vec<String> = (0..required + defaulted).map(|i| format!("arg$0${i}")).collect();
        let expected_call = format!("in g_.g({}))", all.join(", "));
        prop_assert!(text.ends_with(&expected_call), "{}", text);
    }

    #[test]
    fn variadic_and_spread_pass_one_sequence(n in 0usize..6) {
        let mut model = Model::with_language();
        model.add_member(function(
            "f",
            vec![int_param("a"), Parameter::new("rest", Type::integer(), BoxingStrategy::Boxed).variadic(Variadic::Star)],
        ));
        let xs = model.add_member(MemberDecl::Value(ValueDecl {
            name: "xs".into(),
            ty: Type::sequential(Type::integer()),
            container: Container::Local { owner: None, in_initializer: false },
            flags: MemberFlags::default(),
        }));

        let mut args = vec![Expr::natural("1")];
        args.extend((0..n).map(|i| Expr::natural(i.to_string())));
        let listed = lower(&model, &Expr::invoke(Expr::member("f", Type::anything()), args, Type::integer()), BoxingStrategy::Unboxed);
        prop_assert!(listed.starts_with("f_.f(1L, "), "{}", listed);
        if n == 0 {
            prop_assert_eq!(&listed, "f_.f(1L, ceylon.language.empty_.get_())");
        } else {
            prop_assert!(listed.contains("new ceylon.language.ArraySequence<ceylon.language.Integer>("), "{}", listed);
            prop_assert_eq!(listed.matches("ceylon.language.Integer.instance(").count(), n);
        }

        let spread = Arguments::Positional(vec![
            PositionalArg::Plain(Expr::natural("1")),
            PositionalArg::Spread(Expr::member(xs, Type::sequential(Type::integer()))),
        ]);
        let spread = lower(&model, &Expr::invoke_with(Expr::member("f", Type::anything()), spread, Type::integer()), BoxingStrategy::Unboxed);
        prop_assert_eq!(spread, "f_.f(1L, xs)");
    }

    #[test]
    fn decimal_literals_parse_to_their_value(n in 0i64..=i64::MAX) {
        prop_assert_eq!(parse_natural(&n.to_string()), Ok(n));
        prop_assert_eq!(parse_negated_natural(&n.to_string()), Some(Ok(-n)));
    }

    #[test]
    fn grouping_underscores_are_ignored(n in 0i64..=i64::MAX) {
        let digits = n.to_string();
        let grouped: String = digits
            .chars()
            .rev()
            .enumerate()
            .flat_map(|(i, c)| if i > 0 && i % 3 == 0 { vec!['_', c] } else { vec![c] })
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        prop_assert_eq!(parse_natural(&grouped), Ok(n));
    }

    #[test]
    fn hexadecimal_literals_use_all_64_bits(bits in any::<u64>()) {
        prop_assert_eq!(parse_natural(&format!("#{bits:X}")), Ok(bits as i64));
        prop_assert_eq!(parse_natural(&format!("${bits:b}")), Ok(bits as i64));
        prop_assert_eq!(parse_negated_natural(&format!("#{bits:X}")), None);
    }
}
