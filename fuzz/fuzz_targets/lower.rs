#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use ceylon_lower::ast::{
    Arguments, BinaryOp, Clause, Comprehension, Condition, Expr, ExprKind, ForPattern, NamedArg, NamedArgs,
    PositionalArg, UnaryOp,
};
use ceylon_lower::config::LoweringOptions;
use ceylon_lower::lower::{Cx, Lowerer};
use ceylon_lower::model::{
    BoxingStrategy, Container, FunctionDecl, MemberDecl, MemberFlags, Model, Parameter, Type, ValueDecl, Variadic,
};

const MAX_DEPTH: usize = 6;

const BINARY_OPS: [BinaryOp; 12] = [
    BinaryOp::Add,
    BinaryOp::Sub,
    BinaryOp::Mul,
    BinaryOp::Div,
    BinaryOp::Pow,
    BinaryOp::Lt,
    BinaryOp::Compare,
    BinaryOp::Eq,
    BinaryOp::Identical,
    BinaryOp::And,
    BinaryOp::Else,
    BinaryOp::Entry,
];

/// Fuzzing-friendly expression shape; converted into a typed tree with a
/// bounded depth.
#[derive(Arbitrary, Debug)]
enum FuzzExpr {
    Natural(String),
    Float(String),
    Str(String),
    Xs,
    X,
    Binary(u8, Box<FuzzExpr>, Box<FuzzExpr>),
    Neg(Box<FuzzExpr>),
    Exists(Box<FuzzExpr>),
    Tuple(Vec<FuzzExpr>, bool),
    Enumeration(Vec<FuzzExpr>, bool),
    Call(Vec<FuzzExpr>, bool),
    Named(Vec<(u8, FuzzExpr)>),
    Comprehension(Box<FuzzExpr>, Option<Box<FuzzExpr>>),
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    expr: FuzzExpr,
    unboxed: bool,
    statement: bool,
    optimise_operators: bool,
    reified_generics: bool,
}

fn model() -> Model {
    let mut m = Model::with_language();
    let int = |name: &str| Parameter::new(name, Type::integer(), BoxingStrategy::Unboxed);
    m.add_member(MemberDecl::Function(FunctionDecl {
        name: "f".into(),
        return_ty: Type::integer(),
        type_params: Vec::new(),
        parameters: vec![
            int("a"),
            int("b").defaulted(),
            Parameter::new("rest", Type::integer(), BoxingStrategy::Boxed).variadic(Variadic::Star),
        ],
        container: Container::Toplevel,
        flags: MemberFlags { shared: true, unboxed: true, ..MemberFlags::default() },
    }));
    m.add_member(MemberDecl::Value(ValueDecl {
        name: "xs".into(),
        ty: Type::sequential(Type::integer()),
        container: Container::Toplevel,
        flags: MemberFlags::default(),
    }));
    m
}

fn positional(items: &[FuzzExpr], spread: bool, depth: usize) -> Vec<PositionalArg> {
    let mut args: Vec<PositionalArg> = items.iter().map(|e| PositionalArg::Plain(build(e, depth + 1))).collect();
    if spread {
        args.push(PositionalArg::Spread(Expr::member("xs", Type::sequential(Type::integer()))));
    }
    args
}

fn build(input: &FuzzExpr, depth: usize) -> Expr {
    if depth > MAX_DEPTH {
        return Expr::natural("0");
    }
    match input {
        FuzzExpr::Natural(text) => Expr::natural(text.clone()),
        FuzzExpr::Float(text) => Expr::float(text.clone()),
        FuzzExpr::Str(text) => Expr::string(text.clone()),
        FuzzExpr::Xs => Expr::member("xs", Type::sequential(Type::integer())),
        FuzzExpr::X => Expr::member("::x", Type::integer()),
        FuzzExpr::Binary(op, left, right) => {
            let op = BINARY_OPS[usize::from(*op) % BINARY_OPS.len()];
            let ty = match op {
                BinaryOp::Lt | BinaryOp::Eq | BinaryOp::Identical | BinaryOp::And => Type::boolean(),
                BinaryOp::Entry => Type::entry(Type::integer(), Type::integer()),
                _ => Type::integer(),
            };
            Expr::binary(op, build(left, depth + 1), build(right, depth + 1), ty)
        }
        FuzzExpr::Neg(operand) => Expr::unary(UnaryOp::Neg, build(operand, depth + 1), Type::integer()),
        FuzzExpr::Exists(operand) => Expr::unary(UnaryOp::Exists, build(operand, depth + 1), Type::boolean()),
        FuzzExpr::Tuple(items, spread) => {
            let elements = positional(items, *spread, depth);
            let types = elements.iter().filter(|a| !a.is_spread()).map(|a| a.expr().ty.clone()).collect();
            let tail = spread.then(|| Type::sequential(Type::integer()));
            Expr::new(ExprKind::Tuple(elements), Type::tuple(types, tail))
        }
        FuzzExpr::Enumeration(items, spread) => Expr::new(
            ExprKind::SequenceEnum(positional(items, *spread, depth)),
            Type::stream(Type::integer()),
        ),
        FuzzExpr::Call(items, spread) => Expr::invoke_with(
            Expr::member("f", Type::anything()),
            Arguments::Positional(positional(items, *spread, depth)),
            Type::integer(),
        ),
        FuzzExpr::Named(items) => {
            let named = items
                .iter()
                .map(|(p, e)| NamedArg { param: ["a", "b", "c"][usize::from(*p) % 3].into(), value: build(e, depth + 1) })
                .collect();
            Expr::invoke_with(
                Expr::member("f", Type::anything()),
                Arguments::Named(NamedArgs { named, sequenced: None }),
                Type::integer(),
            )
        }
        FuzzExpr::Comprehension(yield_expr, filter) => {
            let mut clauses = vec![Clause::For {
                pattern: ForPattern::Value { name: "x".into(), ty: Type::integer() },
                iterable: Expr::member("xs", Type::sequential(Type::integer())),
            }];
            if let Some(filter) = filter {
                clauses.push(Clause::If(vec![Condition::Boolean(build(filter, depth + 1))]));
            }
            let yield_expr = build(yield_expr, depth + 1);
            let ty = Type::stream(yield_expr.ty.clone());
            Expr::new(ExprKind::Comprehension(Comprehension { clauses, yield_expr: Box::new(yield_expr) }), ty)
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    let model = model();
    let options = LoweringOptions {
        optimise_operators: input.optimise_operators,
        reified_generics: input.reified_generics,
        ..LoweringOptions::default()
    };
    let lowerer = Lowerer::new(&model, &options);
    let expr = build(&input.expr, 0);

    // Lowering may report errors but must never panic.
    if input.statement {
        let _ = lowerer.lower_statement(Cx::default(), &expr);
    } else {
        let boxing = if input.unboxed { BoxingStrategy::Unboxed } else { BoxingStrategy::Boxed };
        if let Ok(out) = lowerer.lower_expression(Cx::default(), &expr, boxing, Some(&expr.ty)) {
            let _ = ceylon_lower::ir::print_expr(&out);
        }
    }
});
