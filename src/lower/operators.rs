//! Operator lowering: each binary operator either becomes a native
//! operator on unboxed operands or a call of its overridable method.

use tracing::trace;

use crate::ast::{BinaryOp, Bound, Expr, ExprKind, IncDec, IndexKind, UnaryOp};
use crate::diagnostics::LowerError;
use crate::ir::{JBinaryOp, JExpr, JStmt, JType, JUnaryOp};
use crate::model::{names, BoxingStrategy, Container, MemberDecl, Type};

use super::boxing::Source;
use super::context::{first_branch, CastFlags, Cx, Lowered, Request};
use super::java_types::JtFlags;
use super::Lowerer;

/// How one binary operator is lowered.
#[derive(Debug, PartialEq, Eq)]
pub struct OperatorDescriptor {
    pub op: BinaryOp,
    /// Name of the overridable method, empty when there is none.
    pub method: &'static str,
    /// Native operator used when both operands are unboxed.
    pub native: Option<JBinaryOp>,
    /// Operand types for which the native operator is observably the same.
    pub optimisable: &'static [&'static str],
}

const NUMERIC: &[&str] = &[names::INTEGER, names::FLOAT];
const ADDITIVE: &[&str] = &[names::INTEGER, names::FLOAT, names::STRING];
const ORDERED: &[&str] = &[names::INTEGER, names::FLOAT, names::CHARACTER];
const EQUATABLE: &[&str] = &[names::INTEGER, names::FLOAT, names::CHARACTER, names::BOOLEAN];
const LOGICAL: &[&str] = &[names::BOOLEAN];
const NONE: &[&str] = &[];

static DESCRIPTORS: [OperatorDescriptor; 25] = [
    OperatorDescriptor { op: BinaryOp::Add, method: "plus", native: Some(JBinaryOp::Add), optimisable: ADDITIVE },
    OperatorDescriptor { op: BinaryOp::Sub, method: "minus", native: Some(JBinaryOp::Sub), optimisable: NUMERIC },
    OperatorDescriptor { op: BinaryOp::Mul, method: "times", native: Some(JBinaryOp::Mul), optimisable: NUMERIC },
    OperatorDescriptor { op: BinaryOp::Div, method: "divided", native: Some(JBinaryOp::Div), optimisable: NUMERIC },
    OperatorDescriptor {
        op: BinaryOp::Rem,
        method: "remainder",
        native: Some(JBinaryOp::Rem),
        optimisable: &[names::INTEGER],
    },
    OperatorDescriptor { op: BinaryOp::Pow, method: "power", native: None, optimisable: NUMERIC },
    OperatorDescriptor { op: BinaryOp::Lt, method: "compare", native: Some(JBinaryOp::Lt), optimisable: ORDERED },
    OperatorDescriptor { op: BinaryOp::LtEq, method: "compare", native: Some(JBinaryOp::LtEq), optimisable: ORDERED },
    OperatorDescriptor { op: BinaryOp::Gt, method: "compare", native: Some(JBinaryOp::Gt), optimisable: ORDERED },
    OperatorDescriptor { op: BinaryOp::GtEq, method: "compare", native: Some(JBinaryOp::GtEq), optimisable: ORDERED },
    OperatorDescriptor { op: BinaryOp::Compare, method: "compare", native: None, optimisable: NONE },
    OperatorDescriptor { op: BinaryOp::Eq, method: "equals", native: Some(JBinaryOp::Eq), optimisable: EQUATABLE },
    OperatorDescriptor { op: BinaryOp::Neq, method: "equals", native: Some(JBinaryOp::Neq), optimisable: EQUATABLE },
    OperatorDescriptor { op: BinaryOp::Identical, method: "", native: Some(JBinaryOp::Eq), optimisable: NONE },
    OperatorDescriptor { op: BinaryOp::And, method: "", native: Some(JBinaryOp::And), optimisable: LOGICAL },
    OperatorDescriptor { op: BinaryOp::Or, method: "", native: Some(JBinaryOp::Or), optimisable: LOGICAL },
    OperatorDescriptor { op: BinaryOp::Union, method: "union", native: None, optimisable: NONE },
    OperatorDescriptor { op: BinaryOp::Intersection, method: "intersection", native: None, optimisable: NONE },
    OperatorDescriptor { op: BinaryOp::Complement, method: "complement", native: None, optimisable: NONE },
    OperatorDescriptor { op: BinaryOp::Else, method: "", native: None, optimisable: NONE },
    OperatorDescriptor { op: BinaryOp::Then, method: "", native: None, optimisable: NONE },
    OperatorDescriptor { op: BinaryOp::In, method: "contains", native: None, optimisable: NONE },
    OperatorDescriptor { op: BinaryOp::Entry, method: "", native: None, optimisable: NONE },
    OperatorDescriptor { op: BinaryOp::Span, method: "span", native: None, optimisable: NONE },
    OperatorDescriptor { op: BinaryOp::Measure, method: "measure", native: None, optimisable: NONE },
];

/// The descriptor of a binary operator.
pub fn descriptor(op: BinaryOp) -> &'static OperatorDescriptor {
    let index = DESCRIPTORS.iter().position(|d| d.op == op).unwrap_or(0);
    &DESCRIPTORS[index]
}

fn comparison_op(op: BinaryOp) -> Option<JBinaryOp> {
    match op {
        BinaryOp::Lt => Some(JBinaryOp::Lt),
        BinaryOp::LtEq => Some(JBinaryOp::LtEq),
        BinaryOp::Gt => Some(JBinaryOp::Gt),
        BinaryOp::GtEq => Some(JBinaryOp::GtEq),
        _ => None,
    }
}

/// How the value of an assign-and-return is read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Returns {
    NewValue,
    OldValue,
}

/// A resolved assignable target: its declaration and qualifier, plus the
/// definitions that evaluate the qualifier once.
pub(crate) struct Target<'m> {
    pub decl: &'m MemberDecl,
    pub qualifier: Option<JExpr>,
    pub defs: Vec<JStmt>,
    pub base: bool,
}

impl Lowerer<'_> {
    /// Operands of `op` at this site can use the native operator.
    pub(crate) fn optimisable(&self, op: BinaryOp, operands: &[&Type]) -> bool {
        let desc = descriptor(op);
        self.options.optimise_operators
            && desc.native.is_some()
            && operands.iter().all(|ty| self.is_optimisable_type(desc, ty))
    }

    fn is_optimisable_type(&self, desc: &OperatorDescriptor, ty: &Type) -> bool {
        !self.oracle.is_optional(ty)
            && self.oracle.simplify(ty).decl_name().is_some_and(|d| desc.optimisable.contains(&d))
    }

    fn operand(&self, cx: Cx<'_>, expr: &Expr, boxing: BoxingStrategy) -> Result<Lowered, LowerError> {
        let expected = self.model.non_null(&expr.ty);
        self.lower(cx.expression().within_invocation(false), expr, &Request::new(boxing, Some(expected)))
    }

    // ── binary ───────────────────────────────────────────────────

    pub(crate) fn lower_binary(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<Lowered, LowerError> {
        match op {
            BinaryOp::And | BinaryOp::Or => self.lower_logical(cx, op, left, right),
            BinaryOp::Identical => {
                let l = self.lower(cx.expression(), left, &Request::new(BoxingStrategy::Boxed, None))?;
                let r = self.lower(cx.expression(), right, &Request::new(BoxingStrategy::Boxed, None))?;
                let branch = first_branch([&l.backward_branch, &r.backward_branch]);
                Ok(Lowered::unboxed(JExpr::binary(JBinaryOp::Eq, l.expr, r.expr)).with_branch(branch))
            }
            BinaryOp::Eq | BinaryOp::Neq => self.lower_equality(cx, op, left, right),
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                self.lower_comparison(cx, op, left, right)
            }
            BinaryOp::Compare => {
                let l = self.operand(cx, left, BoxingStrategy::Boxed)?;
                let r = self.operand(cx, right, BoxingStrategy::Boxed)?;
                let branch = first_branch([&l.backward_branch, &r.backward_branch]);
                Ok(Lowered::boxed(l.expr.invoke("compare", vec![r.expr])).with_branch(branch))
            }
            BinaryOp::Pow => match self.lower_constant_power(cx, left, right)? {
                Some(lowered) => Ok(lowered),
                None => self.lower_overridable(cx, op, left, right),
            },
            BinaryOp::Union | BinaryOp::Intersection | BinaryOp::Complement => {
                self.lower_set_operator(cx, op, left, right)
            }
            BinaryOp::Else => self.lower_else(cx, expr, left, right),
            BinaryOp::Then => {
                let c = self.operand(cx, left, BoxingStrategy::Unboxed)?;
                let v = self.lower(cx.expression(), right, &Request::new(BoxingStrategy::Boxed, None))?;
                let branch = first_branch([&c.backward_branch, &v.backward_branch]);
                Ok(Lowered::boxed(JExpr::conditional(c.expr, v.expr, JExpr::null())).with_branch(branch))
            }
            BinaryOp::In => {
                let element = self.lower(cx.expression(), left, &Request::boxed(Type::object()))?;
                let category = self.operand(cx, right, BoxingStrategy::Boxed)?;
                let branch = first_branch([&element.backward_branch, &category.backward_branch]);
                Ok(Lowered::unboxed(category.expr.invoke("contains", vec![element.expr])).with_branch(branch))
            }
            BinaryOp::Entry => self.lower_entry(cx, expr, left, right),
            BinaryOp::Span | BinaryOp::Measure => self.lower_range(cx, expr, op, left, right),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                self.lower_overridable(cx, op, left, right)
            }
        }
    }

    /// Native operator on unboxed operands, or `left.method(right)`.
    fn lower_overridable(&self, cx: Cx<'_>, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Lowered, LowerError> {
        let desc = descriptor(op);
        if let Some(native) = desc.native.filter(|_| self.optimisable(op, &[&left.ty, &right.ty])) {
            trace!(op = op.symbol(), "native operator");
            let l = self.operand(cx, left, BoxingStrategy::Unboxed)?;
            let r = self.operand(cx, right, BoxingStrategy::Unboxed)?;
            let branch = first_branch([&l.backward_branch, &r.backward_branch]);
            return Ok(Lowered::unboxed(JExpr::binary(native, l.expr, r.expr)).with_branch(branch));
        }
        let l = self.operand(cx, left, BoxingStrategy::Boxed)?;
        let r = self.operand(cx, right, BoxingStrategy::Boxed)?;
        let branch = first_branch([&l.backward_branch, &r.backward_branch]);
        Ok(Lowered::boxed(l.expr.invoke(desc.method, vec![r.expr])).with_branch(branch))
    }

    fn lower_logical(&self, cx: Cx<'_>, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Lowered, LowerError> {
        let native = if op == BinaryOp::And { JBinaryOp::And } else { JBinaryOp::Or };
        let l = self.lower(cx.expression(), left, &Request::unboxed(Type::boolean()))?;
        let r = self.lower(cx.expression(), right, &Request::unboxed(Type::boolean()))?;
        let branch = first_branch([&l.backward_branch, &r.backward_branch]);
        Ok(Lowered::unboxed(JExpr::binary(native, l.expr, r.expr)).with_branch(branch))
    }

    fn lower_equality(&self, cx: Cx<'_>, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Lowered, LowerError> {
        let negate = op == BinaryOp::Neq;
        if self.optimisable(op, &[&left.ty, &right.ty]) {
            let l = self.operand(cx, left, BoxingStrategy::Unboxed)?;
            let r = self.operand(cx, right, BoxingStrategy::Unboxed)?;
            let branch = first_branch([&l.backward_branch, &r.backward_branch]);
            let native = if negate { JBinaryOp::Neq } else { JBinaryOp::Eq };
            return Ok(Lowered::unboxed(JExpr::binary(native, l.expr, r.expr)).with_branch(branch));
        }
        let l = self.operand(cx, left, BoxingStrategy::Boxed)?;
        let r = self.lower(cx.expression(), right, &Request::new(BoxingStrategy::Boxed, None))?;
        let branch = first_branch([&l.backward_branch, &r.backward_branch]);
        let equals = l.expr.invoke("equals", vec![r.expr]);
        let result = if negate { JExpr::not(equals) } else { equals };
        Ok(Lowered::unboxed(result).with_branch(branch))
    }

    /// `<`, `<=`, `>`, `>=`: native on unboxed numbers, otherwise the
    /// three-way `compare` result against zero.
    fn lower_comparison(&self, cx: Cx<'_>, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Lowered, LowerError> {
        let native = comparison_op(op).ok_or_else(|| LowerError::internal("not a comparison operator"))?;
        if self.optimisable(op, &[&left.ty, &right.ty]) {
            let l = self.operand(cx, left, BoxingStrategy::Unboxed)?;
            let r = self.operand(cx, right, BoxingStrategy::Unboxed)?;
            let branch = first_branch([&l.backward_branch, &r.backward_branch]);
            return Ok(Lowered::unboxed(JExpr::binary(native, l.expr, r.expr)).with_branch(branch));
        }
        let l = self.operand(cx, left, BoxingStrategy::Boxed)?;
        let r = self.operand(cx, right, BoxingStrategy::Boxed)?;
        let branch = first_branch([&l.backward_branch, &r.backward_branch]);
        Ok(Lowered::unboxed(compare_against_zero(native, l.expr, r.expr)).with_branch(branch))
    }

    /// `b^n` for a literal `n` becomes `b * b * ... * b` over a temp.
    fn lower_constant_power(&self, cx: Cx<'_>, base: &Expr, power: &Expr) -> Result<Option<Lowered>, LowerError> {
        if !self.options.optimise_constant_powers || !self.optimisable(BinaryOp::Mul, &[&base.ty, &power.ty]) {
            return Ok(None);
        }
        if !self.oracle.simplify(&power.ty).is_decl(names::INTEGER) {
            return Ok(None);
        }
        let ExprKind::Natural(text) = &power.unparenthesized().kind else { return Ok(None) };
        let Ok(n) = super::parse_natural(text) else { return Ok(None) };
        if n < 1 || n > i64::from(self.options.max_inline_power) {
            return Ok(None);
        }
        trace!(power = n, "strength-reduced power");
        let b = self.operand(cx, base, BoxingStrategy::Unboxed)?;
        if n == 1 {
            return Ok(Some(b));
        }
        let name = self.fresh("$tmp");
        let ty = self.oracle.java_type(&base.ty, JtFlags::NONE);
        let mut product = JExpr::ident(&name);
        for _ in 1..n {
            product = JExpr::binary(JBinaryOp::Mul, product, JExpr::ident(&name));
        }
        let result = JExpr::let_expr(vec![JStmt::final_var(ty, &name, b.expr)], product);
        Ok(Some(Lowered::unboxed(result).with_branch(b.backward_branch)))
    }

    /// `a | b` on sets: `a.<Other>union(reified Other, b)`.
    fn lower_set_operator(&self, cx: Cx<'_>, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Lowered, LowerError> {
        let desc = descriptor(op);
        let other = self.model.iterated_type(&right.ty).unwrap_or_else(Type::anything);
        let l = self.operand(cx, left, BoxingStrategy::Boxed)?;
        let r = self.operand(cx, right, BoxingStrategy::Boxed)?;
        let branch = first_branch([&l.backward_branch, &r.backward_branch]);
        let mut args = self.reified_arguments(std::slice::from_ref(&other));
        args.push(r.expr);
        let call = JExpr::Apply {
            type_args: vec![self.oracle.java_type(&other, JtFlags::TYPE_ARGUMENT)],
            method: Box::new(l.expr.select(desc.method)),
            args,
        };
        Ok(Lowered::boxed(call).with_branch(branch))
    }

    /// `x else y`: `(let X $tmp = x; in $tmp != null ? $tmp : y)`.
    fn lower_else(&self, cx: Cx<'_>, expr: &Expr, left: &Expr, right: &Expr) -> Result<Lowered, LowerError> {
        let l = self.lower(cx.expression(), left, &Request::new(BoxingStrategy::Boxed, Some(left.ty.clone())))?;
        let r = self.lower(cx.expression(), right, &Request::new(BoxingStrategy::Boxed, Some(expr.ty.clone())))?;
        let branch = first_branch([&l.backward_branch, &r.backward_branch]);
        let name = self.fresh("$tmp");
        let ty = self.oracle.java_type(&left.ty, JtFlags::NO_PRIMITIVES);
        let test = JExpr::binary(JBinaryOp::Neq, JExpr::ident(&name), JExpr::null());
        let result = JExpr::let_expr(
            vec![JStmt::final_var(ty, &name, l.expr)],
            JExpr::conditional(test, JExpr::ident(&name), r.expr),
        );
        Ok(Lowered::boxed(result).with_branch(branch))
    }

    /// `k -> i`: `new Entry<K, I>(reified K, reified I, k, i)`.
    fn lower_entry(&self, cx: Cx<'_>, expr: &Expr, left: &Expr, right: &Expr) -> Result<Lowered, LowerError> {
        let key_ty = expr.ty.type_arg(0).cloned().unwrap_or_else(|| left.ty.clone());
        let item_ty = expr.ty.type_arg(1).cloned().unwrap_or_else(|| right.ty.clone());
        let k = self.lower(cx.expression(), left, &Request::boxed(key_ty.clone()))?;
        let i = self.lower(cx.expression(), right, &Request::boxed(item_ty.clone()))?;
        let branch = first_branch([&k.backward_branch, &i.backward_branch]);
        let mut args = self.reified_arguments(&[key_ty.clone(), item_ty.clone()]);
        args.extend([k.expr, i.expr]);
        let class = self.oracle.java_type(&Type::entry(key_ty, item_ty), JtFlags::CLASS_NEW);
        Ok(Lowered::boxed(JExpr::new_class(class, args)).with_branch(branch))
    }

    /// `a .. b` and `a : n` through the language's `span` and `measure`.
    fn lower_range(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<Lowered, LowerError> {
        let element = self.model.sequential_element(&expr.ty).unwrap_or_else(|| left.ty.clone());
        let first = self.lower(cx.expression(), left, &Request::boxed(element.clone()))?;
        let second = if op == BinaryOp::Measure {
            self.lower(cx.expression(), right, &Request::unboxed(Type::integer()))?
        } else {
            self.lower(cx.expression(), right, &Request::boxed(element.clone()))?
        };
        let branch = first_branch([&first.backward_branch, &second.backward_branch]);
        let function = descriptor(op).method;
        let mut args = self.reified_arguments(std::slice::from_ref(&element));
        args.extend([first.expr, second.expr]);
        let call = self.language_class(&format!("{function}_")).invoke(function, args);
        Ok(Lowered::boxed(call).with_branch(branch))
    }

    // ── unary ────────────────────────────────────────────────────

    pub(crate) fn lower_unary(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        op: UnaryOp,
        operand: &Expr,
    ) -> Result<Lowered, LowerError> {
        match op {
            UnaryOp::Neg | UnaryOp::Pos => {
                if op == UnaryOp::Neg {
                    if let ExprKind::Natural(text) = &operand.unparenthesized().kind {
                        if let Some(folded) = self.lower_negated_natural(expr, text) {
                            return folded;
                        }
                    }
                }
                if self.optimisable(BinaryOp::Sub, &[&operand.ty]) {
                    let term = self.operand(cx, operand, BoxingStrategy::Unboxed)?;
                    if op == UnaryOp::Pos {
                        return Ok(term);
                    }
                    return Ok(term.map(|e| JExpr::unary(JUnaryOp::Neg, e)));
                }
                let getter = if op == UnaryOp::Neg { "getNegativeValue" } else { "getPositiveValue" };
                let term = self.operand(cx, operand, BoxingStrategy::Boxed)?;
                Ok(term.map(|e| e.invoke(getter, Vec::new())))
            }
            UnaryOp::Not => {
                let term = self.lower(cx.expression(), operand, &Request::unboxed(Type::boolean()))?;
                Ok(Lowered::unboxed(JExpr::not(term.expr)).with_branch(term.backward_branch))
            }
            UnaryOp::Exists => {
                let term = self.lower(cx.expression(), operand, &Request::new(BoxingStrategy::Boxed, None))?;
                let test = JExpr::binary(JBinaryOp::Neq, term.expr, JExpr::null());
                Ok(Lowered::unboxed(test).with_branch(term.backward_branch))
            }
            UnaryOp::Nonempty => {
                let term = self.lower(cx.expression(), operand, &Request::new(BoxingStrategy::Boxed, None))?;
                let test = JExpr::InstanceOf {
                    expr: Box::new(term.expr),
                    ty: JType::class(self.oracle.java_name(names::SEQUENCE)),
                };
                Ok(Lowered::unboxed(test).with_branch(term.backward_branch))
            }
        }
    }

    // ── type tests ───────────────────────────────────────────────

    /// `x is T`: the operand is evaluated once into a temp and tested.
    pub(crate) fn lower_is(
        &self,
        cx: Cx<'_>,
        operand: &Expr,
        target: &Type,
        negated: bool,
    ) -> Result<Lowered, LowerError> {
        let term = self.lower(cx.expression(), operand, &Request::new(BoxingStrategy::Boxed, None))?;
        let branch = term.backward_branch;
        let test = match term.expr {
            JExpr::Ident(name) => self.type_test(JExpr::Ident(name), target),
            other => {
                let name = self.fresh("$tmp");
                JExpr::let_expr(
                    vec![JStmt::final_var(JType::object(), &name, other)],
                    self.type_test(JExpr::ident(&name), target),
                )
            }
        };
        let test = if negated { JExpr::not(test) } else { test };
        Ok(Lowered::unboxed(test).with_branch(branch))
    }

    /// Runtime test that the boxed value `value` (a variable) has type `ty`.
    pub(crate) fn type_test(&self, value: JExpr, ty: &Type) -> JExpr {
        let ty = self.model.resolve_aliases(ty);
        match &ty {
            Type::Nothing => JExpr::bool(false),
            Type::Union(cases) => self.combine_tests(value, cases, JBinaryOp::Or),
            Type::Intersection(cases) => self.combine_tests(value, cases, JBinaryOp::And),
            _ if ty.is_decl(names::ANYTHING) => JExpr::bool(true),
            _ if ty.is_decl(names::OBJECT) => JExpr::binary(JBinaryOp::Neq, value, JExpr::null()),
            _ if self.oracle.is_null(&ty) => JExpr::binary(JBinaryOp::Eq, value, JExpr::null()),
            Type::Param(_) => self.reified_test(value, &ty),
            Type::Class(ct) if !ct.args.is_empty() && self.options.reified_generics => self.reified_test(value, &ty),
            Type::Class(_) => JExpr::InstanceOf {
                expr: Box::new(value),
                ty: self.oracle.java_type(&ty, JtFlags::RAW | JtFlags::NO_PRIMITIVES),
            },
        }
    }

    fn combine_tests(&self, value: JExpr, cases: &[Type], op: JBinaryOp) -> JExpr {
        let mut tests = cases.iter().map(|c| self.type_test(value.clone(), c));
        let first = tests.next().unwrap_or_else(|| JExpr::bool(op == JBinaryOp::And));
        tests.fold(first, |acc, t| JExpr::binary(op, acc, t))
    }

    fn reified_test(&self, value: JExpr, ty: &Type) -> JExpr {
        self.util("isReified", vec![value, self.oracle.reified_type(ty)])
    }

    /// `x of T` re-lowers `x` against `T` as a deliberate narrowing.
    pub(crate) fn lower_of(&self, cx: Cx<'_>, expr: &Expr, operand: &Expr, req: &Request) -> Result<Lowered, LowerError> {
        let req = Request { expected: Some(expr.ty.clone()), ..req.clone() }.with_flags(CastFlags::DOWN_CAST);
        self.lower(cx, operand, &req)
    }

    // ── within ───────────────────────────────────────────────────

    /// `a < x <= b`: `x` is evaluated once into a temp.
    pub(crate) fn lower_within(
        &self,
        cx: Cx<'_>,
        lower: &Expr,
        middle: &Expr,
        upper: &Expr,
        lower_bound: Bound,
        upper_bound: Bound,
    ) -> Result<Lowered, LowerError> {
        let optimise = [lower, middle, upper].iter().any(|e| self.optimisable(BinaryOp::Lt, &[&e.ty]));
        let boxing = if optimise { BoxingStrategy::Unboxed } else { BoxingStrategy::Boxed };
        let lo = self.operand(cx, lower, boxing)?;
        let mid = self.operand(cx, middle, boxing)?;
        let hi = self.operand(cx, upper, boxing)?;
        let branch = first_branch([&lo.backward_branch, &mid.backward_branch, &hi.backward_branch]);

        let name = self.fresh("$tmp");
        let flags = if optimise { JtFlags::NONE } else { JtFlags::NO_PRIMITIVES };
        let ty = self.oracle.java_type(&middle.ty, flags);
        let op_for = |bound| if bound == Bound::Open { JBinaryOp::Lt } else { JBinaryOp::LtEq };
        let check = |op, l: JExpr, r: JExpr| {
            if optimise { JExpr::binary(op, l, r) } else { compare_against_zero(op, l, r) }
        };
        let lower_check = check(op_for(lower_bound), lo.expr, JExpr::ident(&name));
        let upper_check = check(op_for(upper_bound), JExpr::ident(&name), hi.expr);
        let result = JExpr::let_expr(
            vec![JStmt::final_var(ty, &name, mid.expr)],
            JExpr::binary(JBinaryOp::And, lower_check, upper_check),
        );
        Ok(Lowered::unboxed(result).with_branch(branch))
    }

    // ── index ────────────────────────────────────────────────────

    pub(crate) fn lower_index(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        primary: &Expr,
        index: &IndexKind,
    ) -> Result<Lowered, LowerError> {
        let optional = self.oracle.is_optional(&primary.ty);
        let p = self.operand(cx, primary, BoxingStrategy::Boxed)?;
        let mut branches = vec![p.backward_branch];
        let mut arg = |e: &Expr, boxing| -> Result<JExpr, LowerError> {
            let l = self.operand(cx, e, boxing)?;
            branches.push(l.backward_branch);
            Ok(l.expr)
        };
        let (method, args) = match index {
            IndexKind::Element(i) => ("get", vec![arg(i, BoxingStrategy::Boxed)?]),
            IndexKind::Span { from, to } => {
                ("span", vec![arg(from, BoxingStrategy::Boxed)?, arg(to, BoxingStrategy::Boxed)?])
            }
            IndexKind::SpanFrom(from) => ("spanFrom", vec![arg(from, BoxingStrategy::Boxed)?]),
            IndexKind::SpanTo(to) => ("spanTo", vec![arg(to, BoxingStrategy::Boxed)?]),
            IndexKind::Measure { from, length } => {
                ("measure", vec![arg(from, BoxingStrategy::Boxed)?, arg(length, BoxingStrategy::Unboxed)?])
            }
        };
        let branch = first_branch(&branches);

        let (receiver, defs) = if optional {
            let name = self.fresh("$tmp");
            let ty = self.oracle.java_type(&primary.ty, JtFlags::NO_PRIMITIVES);
            (JExpr::ident(&name), vec![JStmt::final_var(ty, name, p.expr)])
        } else {
            (p.expr, Vec::new())
        };
        let mut call = receiver.clone().invoke(method, args);
        if matches!(index, IndexKind::Element(_)) {
            // `get` returns the erased item type.
            let req = Request::boxed(expr.ty.clone()).with_flags(CastFlags::DOWN_CAST);
            let erased = Type::anything();
            call = self.apply_erasure_and_boxing(Lowered::boxed(call), Source::boxed(&erased), &req).expr;
        }
        let result = if optional {
            let test = JExpr::binary(JBinaryOp::Neq, receiver, JExpr::null());
            JExpr::let_expr(defs, JExpr::conditional(test, call, JExpr::null()))
        } else {
            call
        };
        Ok(Lowered::boxed(result).with_branch(branch))
    }

    // ── assign and return ────────────────────────────────────────

    pub(crate) fn lower_compound_assign(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        op: BinaryOp,
        target: &Expr,
        value: &Expr,
    ) -> Result<Lowered, LowerError> {
        let target = target.unparenthesized();
        if let Some(name) = self.direct_local(target) {
            let desc = descriptor(op);
            if let Some(native) = desc.native.filter(|_| self.optimisable(op, &[&target.ty, &value.ty])) {
                if !matches!(op, BinaryOp::And | BinaryOp::Or) {
                    trace!(op = op.symbol(), "native compound assignment");
                    let v = self.operand(cx, value, BoxingStrategy::Unboxed)?;
                    let assign = JExpr::AssignOp {
                        op: native,
                        target: Box::new(JExpr::ident(name)),
                        value: Box::new(v.expr),
                    };
                    return Ok(Lowered::unboxed(assign).with_branch(v.backward_branch));
                }
            }
        }
        let v = self.operand(cx, value, BoxingStrategy::Boxed)?;
        let value_branch = v.backward_branch;
        let optimise = self.optimisable(op, &[&target.ty, &value.ty]);
        let result = self.assign_and_return(cx, expr, target, Returns::NewValue, |current, ty| {
            if optimise {
                let (l, _) = self.box_unbox_if_necessary(current.expr, !current.unboxed, ty, BoxingStrategy::Unboxed);
                let (r, _) = self.box_unbox_if_necessary(v.expr, true, &value.ty, BoxingStrategy::Unboxed);
                let native = descriptor(op).native.unwrap_or(JBinaryOp::Add);
                return Ok(Lowered::unboxed(JExpr::binary(native, l, r)));
            }
            let (l, _) = self.box_unbox_if_necessary(current.expr, !current.unboxed, ty, BoxingStrategy::Boxed);
            match op {
                BinaryOp::And | BinaryOp::Or => {
                    let native = if op == BinaryOp::And { JBinaryOp::And } else { JBinaryOp::Or };
                    let (l, _) = self.box_unbox_if_necessary(l, true, ty, BoxingStrategy::Unboxed);
                    let (r, _) = self.box_unbox_if_necessary(v.expr, true, &value.ty, BoxingStrategy::Unboxed);
                    Ok(Lowered::unboxed(JExpr::binary(native, l, r)))
                }
                _ => Ok(Lowered::boxed(l.invoke(descriptor(op).method, vec![v.expr]))),
            }
        })?;
        Ok(result.with_branch(value_branch))
    }

    pub(crate) fn lower_prefix(&self, cx: Cx<'_>, expr: &Expr, op: IncDec, target: &Expr) -> Result<Lowered, LowerError> {
        self.lower_increment(cx, expr, op, target, Returns::NewValue)
    }

    pub(crate) fn lower_postfix(&self, cx: Cx<'_>, expr: &Expr, op: IncDec, target: &Expr) -> Result<Lowered, LowerError> {
        self.lower_increment(cx, expr, op, target, Returns::OldValue)
    }

    fn lower_increment(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        op: IncDec,
        target: &Expr,
        returns: Returns,
    ) -> Result<Lowered, LowerError> {
        let target = target.unparenthesized();
        let optimise = self.options.optimise_operators
            && !self.oracle.is_optional(&target.ty)
            && self
                .oracle
                .simplify(&target.ty)
                .decl_name()
                .is_some_and(|d| d == names::INTEGER || d == names::CHARACTER);
        if optimise {
            if let Some(name) = self.direct_local(target) {
                let native = match (op, returns) {
                    (IncDec::Inc, Returns::NewValue) => JUnaryOp::PreInc,
                    (IncDec::Dec, Returns::NewValue) => JUnaryOp::PreDec,
                    (IncDec::Inc, Returns::OldValue) => JUnaryOp::PostInc,
                    (IncDec::Dec, Returns::OldValue) => JUnaryOp::PostDec,
                };
                return Ok(Lowered::unboxed(JExpr::unary(native, JExpr::ident(name))));
            }
        }
        let one = if self.oracle.simplify(&target.ty).is_decl(names::CHARACTER) { JExpr::int(1) } else { JExpr::long(1) };
        self.assign_and_return(cx, expr, target, returns, |current, ty| {
            if optimise {
                let (l, _) = self.box_unbox_if_necessary(current.expr, !current.unboxed, ty, BoxingStrategy::Unboxed);
                let native = if op == IncDec::Inc { JBinaryOp::Add } else { JBinaryOp::Sub };
                return Ok(Lowered::unboxed(JExpr::binary(native, l, one)));
            }
            let (l, _) = self.box_unbox_if_necessary(current.expr, !current.unboxed, ty, BoxingStrategy::Boxed);
            let method = if op == IncDec::Inc { "getSuccessor" } else { "getPredecessor" };
            Ok(Lowered::boxed(l.invoke(method, Vec::new())))
        })
    }

    /// A plain, unboxed local variable that can be updated in place.
    fn direct_local(&self, target: &Expr) -> Option<&str> {
        let ExprKind::BaseMember { decl, .. } = &target.kind else { return None };
        if self.substitution(decl).is_some() {
            return None;
        }
        let decl = self.model.member(decl)?;
        let flags = decl.flags();
        let direct = matches!(decl.container(), Container::Local { .. })
            && !flags.boxed_variable
            && !flags.transient
            && flags.unboxed;
        direct.then(|| decl.name())
    }

    /// Resolve an assignable target. A qualified target's receiver is
    /// evaluated once into `$tmpE`.
    pub(crate) fn assignable(&self, cx: Cx<'_>, target: &Expr, alias: bool) -> Result<Target<'_>, LowerError> {
        let target = target.unparenthesized();
        match &target.kind {
            ExprKind::BaseMember { decl: key, .. } => {
                let decl = self.member_decl(key)?;
                let qualifier = match decl.container() {
                    Container::Type(_) => self.implicit_qualifier(cx, decl)?,
                    _ => None,
                };
                Ok(Target { decl, qualifier, defs: Vec::new(), base: true })
            }
            ExprKind::QualifiedMember { receiver, decl: key, .. } => {
                let decl = self.member_decl(key)?;
                let recv = self.lower_receiver(cx, receiver, decl, true)?;
                if !alias {
                    return Ok(Target { decl, qualifier: Some(recv.expr), defs: Vec::new(), base: false });
                }
                let name = self.fresh("$tmpE");
                let ty = self.oracle.java_type(&self.model.non_null(&receiver.ty), JtFlags::NO_PRIMITIVES);
                Ok(Target {
                    decl,
                    qualifier: Some(JExpr::ident(&name)),
                    defs: vec![JStmt::final_var(ty, &name, recv.expr)],
                    base: false,
                })
            }
            _ => Err(LowerError::unsupported(
                format!("compiler bug: {} is not a supported assign and return operator", target.kind_name()),
                target.span,
            )),
        }
    }

    /// Read the target, compute a new value from it, store it, and yield
    /// either the new or the old value.
    fn assign_and_return(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        target: &Expr,
        returns: Returns,
        compute: impl FnOnce(Lowered, &Type) -> Result<Lowered, LowerError>,
    ) -> Result<Lowered, LowerError> {
        let Target { decl, qualifier, mut defs, base } = self.assignable(cx, target, true)?;
        let boxing = self.oracle.boxing_strategy_of(decl);
        let ty = self.model.non_null(&target.ty);
        let jt = self.oracle.java_type_for(&ty, boxing);
        let current = self.value_access(cx, decl, qualifier.clone(), base)?;
        let temp = if base { self.fresh("$tmp") } else { self.fresh("$tmpV") };
        trace!(target = decl.name(), ?returns, span = %expr.span, "assign and return");

        let to_decl = |l: Lowered| self.box_unbox_if_necessary(l.expr, !l.unboxed, &ty, boxing).0;
        match returns {
            Returns::NewValue => {
                let value = to_decl(compute(current, &ty)?);
                defs.push(JStmt::final_var(jt, &temp, value));
                defs.push(JStmt::exec(self.store(cx, decl, qualifier, JExpr::ident(&temp), base)?));
            }
            Returns::OldValue => {
                let current = to_decl(current);
                defs.push(JStmt::final_var(jt, &temp, current));
                let old = Lowered::new(JExpr::ident(&temp), boxing == BoxingStrategy::Unboxed);
                let value = to_decl(compute(old, &ty)?);
                defs.push(JStmt::exec(self.store(cx, decl, qualifier, value, base)?));
            }
        }
        Ok(Lowered::new(JExpr::let_expr(defs, JExpr::ident(&temp)), boxing == BoxingStrategy::Unboxed))
    }
}

/// `l.compare(r).getInteger() OP 0`.
fn compare_against_zero(op: JBinaryOp, left: JExpr, right: JExpr) -> JExpr {
    let comparison = left.invoke("compare", vec![right]).invoke("getInteger", Vec::new());
    JExpr::binary(op, comparison, JExpr::int(0))
}
