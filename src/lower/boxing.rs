//! Erasure and boxing normalization: the step every lowered expression goes
//! through before it is handed back to its caller.

use tracing::trace;

use crate::ir::{JExpr, JType};
use crate::model::{names, BoxingStrategy, Prim, Type};

use super::context::{CastFlags, Lowered, Request};
use super::java_types::JtFlags;
use super::Lowerer;

/// Static facts about a lowered expression that decide which casts and
/// conversions it needs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Source<'t> {
    pub ty: &'t Type,
    pub boxed: bool,
    pub erased: bool,
    pub untrusted: bool,
}

impl<'t> Source<'t> {
    pub fn boxed(ty: &'t Type) -> Self {
        Self { ty, boxed: true, erased: false, untrusted: false }
    }

    pub fn unboxed(ty: &'t Type) -> Self {
        Self { ty, boxed: false, erased: false, untrusted: false }
    }

    pub fn of(ty: &'t Type, lowered: &Lowered) -> Self {
        Self { ty, boxed: !lowered.unboxed, erased: false, untrusted: false }
    }

    pub fn erased(mut self, erased: bool) -> Self {
        self.erased = erased;
        self
    }

    pub fn untrusted(mut self, untrusted: bool) -> Self {
        self.untrusted = untrusted;
        self
    }
}

impl Lowerer<'_> {
    /// Adjust `lowered` (whose static facts are `src`) to what `req` asks
    /// for: erasure casts first, then box/unbox, then variance and
    /// self-type casts, then narrow primitive conversions.
    pub(crate) fn apply_erasure_and_boxing(&self, lowered: Lowered, src: Source<'_>, req: &Request) -> Lowered {
        let Lowered { expr, backward_branch, .. } = lowered;
        let (expr, unboxed) = self.erasure_and_boxing(expr, src, req);
        Lowered { expr, unboxed, backward_branch }
    }

    fn erasure_and_boxing(&self, mut expr: JExpr, src: Source<'_>, req: &Request) -> (JExpr, bool) {
        let oracle = self.oracle;
        let model = self.model;
        let mut expr_ty = model.resolve_aliases(src.ty);
        let expected = req.expected.as_ref().map(|t| model.resolve_aliases(t));
        let flags = req.flags;

        if flags.contains(CastFlags::NULL_CHECKED) {
            expr_ty = model.non_null(&expr_ty);
        }

        let companion = if flags.contains(CastFlags::WANTS_COMPANION) { JtFlags::COMPANION } else { JtFlags::NONE };
        let mut can_cast = false;
        if let Some(exp) = expected.as_ref().filter(|e| !oracle.erases_to_object(e)) {
            if src.boxed {
                let down_cast = flags.contains(CastFlags::DOWN_CAST);
                if oracle.is_null(&expr_ty) {
                    if !oracle.model().is_null_value(&expr_ty) || down_cast {
                        trace!(expected = %exp, "cast of null-typed value");
                        expr = JExpr::cast(oracle.java_type(exp, JtFlags::RAW | companion), expr);
                    }
                } else if expr_ty.is_nothing() {
                    expr = JExpr::cast(oracle.java_type(exp, JtFlags::RAW | JtFlags::NO_PRIMITIVES | companion), expr);
                } else {
                    let not_raw = flags.contains(CastFlags::NOT_RAW);
                    let constrained = flags.contains(CastFlags::CONSTRAINED_TYPE_PARAMS);
                    let dependent = flags.contains(CastFlags::DEPENDENT_COVARIANT_TYPE_PARAMS);
                    let needs = oracle.needs_cast(&expr_ty, exp, not_raw, constrained, down_cast);
                    let raw_mismatch = expr_ty.is_raw() && (not_raw || !oracle.is_turned_to_raw(exp));
                    if src.erased || src.untrusted || dependent || needs || raw_mismatch {
                        trace!(from = %expr_ty, to = %exp, erased = src.erased, untrusted = src.untrusted, "erasure cast");
                        let mut expr_is_raw = expr_ty.is_raw();
                        let expected_is_raw = oracle.is_turned_to_raw(exp) && !not_raw;
                        let mut down_cast = down_cast;
                        let mut untrusted = src.untrusted;
                        if !expr_is_raw && oracle.has_type_parameters(exp) {
                            expr = JExpr::cast(
                                oracle.java_type(exp, JtFlags::TYPE_ARGUMENT | JtFlags::RAW | companion),
                                expr,
                            );
                            expr_is_raw = true;
                            down_cast = false;
                            untrusted = false;
                        }
                        let typed = !expr_is_raw || (!constrained && !dependent && !expected_is_raw);
                        if typed || down_cast || untrusted {
                            if untrusted {
                                expr = JExpr::cast(JType::object(), expr);
                            }
                            expr = JExpr::cast(oracle.java_type(exp, JtFlags::TYPE_ARGUMENT | companion), expr);
                        }
                        // from here on the value has the type it was cast to
                        expr_ty = oracle.simplify(exp).without_underlying();
                    } else {
                        can_cast = true;
                    }
                }
            } else {
                can_cast = true;
            }
        }

        let (mut expr, mut unboxed) = self.box_unbox_if_necessary(expr, src.boxed, &expr_ty, req.boxing);

        if expr_ty.is_nothing() && req.boxing == BoxingStrategy::Unboxed {
            if let Some(exp) = expected.as_ref() {
                let (e, u) = self.box_unbox_if_necessary(expr, true, exp, BoxingStrategy::Unboxed);
                expr = e;
                unboxed = u;
            }
        }

        if let Some(exp) = expected.as_ref() {
            let result_boxed = match req.boxing {
                BoxingStrategy::Boxed => true,
                BoxingStrategy::Unboxed => false,
                BoxingStrategy::Indifferent => src.boxed,
            };
            if can_cast && (src.boxed || req.boxing == BoxingStrategy::Boxed) {
                if let Some(vc) = oracle.variance_cast(&expr_ty, exp) {
                    trace!(from = %expr_ty, to = %exp, "variance cast");
                    expr = JExpr::cast(oracle.java_type(exp, JtFlags::RAW | companion), expr);
                    if let Some(exact) = vc.exact {
                        expr = JExpr::cast(oracle.java_type(&exact, JtFlags::TYPE_ARGUMENT), expr);
                    }
                }
            }
            if let Some(self_ty) = oracle.self_type_cast(&expr_ty, exp) {
                let flags = if result_boxed { JtFlags::TYPE_ARGUMENT } else { JtFlags::NONE };
                expr = JExpr::cast(oracle.java_type(&self_ty, flags), expr);
            }
            if req.boxing == BoxingStrategy::Unboxed {
                expr = self.java_type_conversion(expr, &expr_ty, exp);
            }
        }
        (expr, unboxed)
    }

    /// Convert between boxed and unboxed representation when the request
    /// asks for one the expression does not have. Returns the expression and
    /// whether it is now unboxed.
    pub(crate) fn box_unbox_if_necessary(
        &self,
        expr: JExpr,
        boxed: bool,
        ty: &Type,
        boxing: BoxingStrategy,
    ) -> (JExpr, bool) {
        match boxing {
            BoxingStrategy::Indifferent => (expr, !boxed),
            BoxingStrategy::Boxed if boxed => (expr, false),
            BoxingStrategy::Unboxed if !boxed => (expr, true),
            BoxingStrategy::Boxed => (self.box_value(expr, ty), false),
            BoxingStrategy::Unboxed => match self.unbox_value(expr, ty) {
                Ok(unboxed) => (unboxed, true),
                Err(unchanged) => (unchanged, false),
            },
        }
    }

    /// `ceylon.language.Integer.instance(e)` and friends. Types without an
    /// unboxed form are returned unchanged.
    pub(crate) fn box_value(&self, expr: JExpr, ty: &Type) -> JExpr {
        let simple = self.oracle.simplify(ty);
        match value_type_name(&simple) {
            Some(name) => JExpr::path(&self.oracle.java_name(name)).invoke("instance", vec![expr]),
            None => expr,
        }
    }

    /// `e.longValue()` and friends. `Err` gives the expression back when
    /// the type has no unboxed form.
    pub(crate) fn unbox_value(&self, expr: JExpr, ty: &Type) -> Result<JExpr, JExpr> {
        let simple = self.oracle.simplify(ty);
        let method = match value_type_name(&simple) {
            Some(names::INTEGER) => "longValue",
            Some(names::FLOAT) => "doubleValue",
            Some(names::BOOLEAN) => "booleanValue",
            Some(names::CHARACTER) => "intValue",
            Some(names::BYTE) => "byteValue",
            Some(names::STRING) => "toString",
            _ => return Err(expr),
        };
        Ok(expr.invoke(method, Vec::new()))
    }

    /// Narrow foreign primitives: a value used where an `int`, `short`,
    /// `byte`, `float` or `char` is declared is cast down from the wide form.
    fn java_type_conversion(&self, expr: JExpr, expr_ty: &Type, expected: &Type) -> JExpr {
        let from = self.oracle.simplify(expr_ty).underlying();
        let to = self.oracle.simplify(expected).underlying();
        if from == to {
            return expr;
        }
        match to {
            Some(prim @ (Prim::Byte | Prim::Short | Prim::Int | Prim::Float | Prim::Char)) => {
                trace!(to = prim.java_name(), "narrowing conversion");
                JExpr::cast(JType::Prim(prim), expr)
            }
            _ => expr,
        }
    }
}

fn value_type_name(ty: &Type) -> Option<&'static str> {
    [names::INTEGER, names::FLOAT, names::BOOLEAN, names::CHARACTER, names::BYTE, names::STRING]
        .into_iter()
        .find(|n| ty.is_decl(n))
}
