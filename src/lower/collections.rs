//! Tuple literals `[a, b, *rest]` and iterable enumerations `{a, b, *rest}`.
//!
//! A tuple is built eagerly: the listed elements go into an `Object[]` and
//! a trailing spread or comprehension becomes the tuple's tail. An
//! iterable enumeration is lazy; its elements are evaluated on demand by
//! an anonymous `LazyIterable` subclass.

use tracing::trace;

use crate::ast::{Expr, ExprKind, PositionalArg};
use crate::diagnostics::LowerError;
use crate::ir::{JBinaryOp, JExpr, JMember, JMethod, JStmt, JType, JTypeArg, Modifiers};
use crate::model::Type;

use super::context::{first_branch, Cx, Lowered, Request};
use super::java_types::JtFlags;
use super::Lowerer;

const LAZY_ITERABLE: &str = "ceylon.language.LazyIterable";

impl<'m> Lowerer<'m> {
    // ── tuples ───────────────────────────────────────────────────

    pub(crate) fn lower_tuple(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        elements: &Vec<PositionalArg>,
    ) -> Result<Lowered, LowerError> {
        if elements.is_empty() {
            return Ok(Lowered::boxed(self.make_empty()));
        }
        let shape = self.model.tuple_shape(&expr.ty);
        let element = expr
            .ty
            .type_arg(0)
            .cloned()
            .or_else(|| self.model.sequential_element(&expr.ty))
            .unwrap_or_else(Type::anything);

        let mut values = Vec::with_capacity(elements.len());
        let mut branches = Vec::with_capacity(elements.len());
        let mut tail = None;
        for (i, arg) in elements.iter().enumerate() {
            match arg {
                PositionalArg::Plain(value) => {
                    let expected = shape
                        .as_ref()
                        .and_then(|s| s.elements.get(i).cloned())
                        .unwrap_or_else(|| value.ty.clone());
                    let lowered = self.lower(cx, value, &Request::boxed(expected))?;
                    branches.push(lowered.backward_branch);
                    values.push(lowered.expr);
                }
                PositionalArg::Spread(spread) | PositionalArg::Comprehension(spread) => {
                    if i + 1 != elements.len() {
                        return Err(LowerError::unsupported(
                            "compiler bug: spread argument is not the last element of a tuple",
                            spread.span,
                        ));
                    }
                    let rest = self
                        .model
                        .iterated_type(&spread.ty)
                        .or_else(|| spread_element(spread))
                        .unwrap_or_else(Type::anything);
                    let lowered = self.sequential_value(cx, &rest, spread)?;
                    branches.push(lowered.backward_branch);
                    tail = Some(lowered.expr);
                }
            }
        }
        let branch = first_branch(&branches);
        trace!(elements = values.len(), spread = tail.is_some(), "tuple literal");

        let tuple = match (values.is_empty(), tail) {
            // `[*xs]` is just the sequence.
            (true, Some(tail)) => tail,
            (_, Some(tail)) => self.make_tuple_with_tail(&element, values, tail, false),
            (_, None) => {
                let class = JType::generic(
                    "ceylon.language.Tuple",
                    vec![JTypeArg::Type(self.oracle.java_type(&element, JtFlags::TYPE_ARGUMENT))],
                );
                let mut args = self.reified_arguments(std::slice::from_ref(&element));
                args.push(JExpr::NewArray { element: JType::object(), dims: Vec::new(), elems: Some(values) });
                JExpr::new_class(class, args)
            }
        };
        Ok(Lowered::boxed(tuple).with_branch(branch))
    }

    // ── iterable enumerations ────────────────────────────────────

    pub(crate) fn lower_iterable_enumeration(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        elements: &Vec<PositionalArg>,
    ) -> Result<Lowered, LowerError> {
        let element = self.model.iterated_type(&expr.ty).unwrap_or_else(Type::anything);
        let absent = self.model.absent_type(&expr.ty).unwrap_or_else(Type::null);
        self.lazy_iterable(cx, &element, &absent, elements)
    }

    /// An iterable over `args` that evaluates each one only when the
    /// iteration reaches it. A trailing spread contributes all of its
    /// elements.
    pub(crate) fn lazy_iterable(
        &self,
        cx: Cx<'_>,
        element: &Type,
        absent: &Type,
        args: &[PositionalArg],
    ) -> Result<Lowered, LowerError> {
        let iterable = Type::iterable(element.clone(), absent.clone());
        match args {
            [] => return Ok(Lowered::boxed(self.make_empty())),
            [PositionalArg::Comprehension(value)] => {
                return self.lower(cx, value, &Request::boxed(iterable));
            }
            _ => {}
        }

        // The elements run later, inside `$evaluate$`.
        let body_cx = cx.expression().in_synthetic_body().within_invocation(false);
        let mut body = Vec::with_capacity(args.len() + 1);
        let mut spread = false;
        for (i, arg) in args.iter().enumerate() {
            let value = match arg {
                PositionalArg::Plain(value) => self.lower(body_cx, value, &Request::boxed(element.clone()))?,
                PositionalArg::Spread(value) | PositionalArg::Comprehension(value) => {
                    if i + 1 != args.len() {
                        return Err(LowerError::unsupported(
                            "compiler bug: spread argument is not the last element of an iterable enumeration",
                            value.span,
                        ));
                    }
                    spread = true;
                    self.lower(body_cx, value, &Request::boxed(iterable.clone()))?
                }
            };
            let test = JExpr::binary(JBinaryOp::Eq, JExpr::ident("$index$"), JExpr::int(i as i32));
            body.push(JStmt::if_then(test, JStmt::Block(vec![JStmt::ret(value.expr)])));
        }
        body.push(JStmt::ret(JExpr::null()));
        trace!(elements = args.len(), spread, "lazy iterable");

        let evaluate = JMethod {
            modifiers: Modifiers::PUBLIC | Modifiers::FINAL,
            name: "$evaluate$".to_string(),
            result: Some(JType::object()),
            params: vec![(JType::Prim(crate::model::Prim::Int), "$index$".to_string())],
            body,
        };
        let class = JType::generic(
            LAZY_ITERABLE,
            vec![
                JTypeArg::Type(self.oracle.java_type(element, JtFlags::TYPE_ARGUMENT)),
                JTypeArg::Type(self.oracle.java_type(absent, JtFlags::NO_PRIMITIVES)),
            ],
        );
        let mut ctor_args = self.reified_arguments(&[element.clone(), absent.clone()]);
        ctor_args.push(JExpr::int(args.len() as i32));
        ctor_args.push(JExpr::bool(spread));
        Ok(Lowered::boxed(JExpr::NewClass {
            outer: None,
            class,
            args: ctor_args,
            body: Some(vec![JMember::Method(evaluate)]),
        }))
    }
}

/// Element type of a comprehension used as a spread, when the node's own
/// type does not say.
fn spread_element(spread: &Expr) -> Option<Type> {
    match &spread.unparenthesized().kind {
        ExprKind::Comprehension(comp) => Some(comp.yield_expr.ty.clone()),
        _ => None,
    }
}
