//! Literal values and string templates.

use tracing::trace;

use crate::ast::{Expr, ExprKind};
use crate::diagnostics::LowerError;
use crate::ir::{JBinaryOp, JExpr, Literal};
use crate::model::{BoxingStrategy, Type};

use super::context::{Cx, Lowered, Request};
use super::Lowerer;

/// Parse the text of a natural literal. `#` introduces hexadecimal and `$`
/// binary digits; both may use the full 64 bits, wrapping into the sign.
pub fn parse_natural(text: &str) -> Result<i64, String> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    if let Some(hex) = digits.strip_prefix('#') {
        return u64::from_str_radix(hex, 16)
            .map(|v| v as i64)
            .map_err(|_| format!("invalid hexadecimal literal: {text} has more than 64 bits"));
    }
    if let Some(bin) = digits.strip_prefix('$') {
        return u64::from_str_radix(bin, 2)
            .map(|v| v as i64)
            .map_err(|_| format!("invalid binary literal: {text} has more than 64 bits"));
    }
    digits
        .parse::<i64>()
        .map_err(|_| format!("literal outside representable range: {text} is too large to be represented as an Integer"))
}

/// Parse a decimal natural literal under a unary minus, so the most negative
/// value is representable. `None` for hexadecimal and binary forms, which
/// are negated at runtime instead.
pub fn parse_negated_natural(text: &str) -> Option<Result<i64, String>> {
    if text.starts_with('#') || text.starts_with('$') {
        return None;
    }
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    Some(format!("-{digits}").parse::<i64>().map_err(|_| {
        format!("literal outside representable range: -{text} is too large to be represented as an Integer")
    }))
}

pub fn parse_float(text: &str) -> Result<f64, String> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    let value: f64 = digits
        .parse()
        .map_err(|_| format!("literal outside representable range: {text} is not a valid Float"))?;
    if value.is_infinite() {
        return Err(format!("literal so large it is indistinguishable from infinity: {text} (use infinity)"));
    }
    let mantissa = digits.split(['e', 'E']).next().unwrap_or_default();
    if value == 0.0 && mantissa.chars().any(|c| c.is_ascii_digit() && c != '0') {
        return Err(format!("literal so small it is indistinguishable from zero: {text} (use 0.0)"));
    }
    Ok(value)
}

impl Lowerer<'_> {
    pub(crate) fn lower_natural(&self, expr: &Expr, text: &str) -> Result<Lowered, LowerError> {
        let value = parse_natural(text).map_err(|msg| LowerError::literal(msg, expr.span))?;
        Ok(Lowered::unboxed(JExpr::long(value)))
    }

    /// `-n` for a literal `n`, folded at compile time.
    pub(crate) fn lower_negated_natural(&self, expr: &Expr, text: &str) -> Option<Result<Lowered, LowerError>> {
        let parsed = parse_negated_natural(text)?;
        trace!(literal = text, "folding negated literal");
        Some(
            parsed
                .map(|v| Lowered::unboxed(JExpr::long(v)))
                .map_err(|msg| LowerError::literal(msg, expr.span)),
        )
    }

    pub(crate) fn lower_float(&self, expr: &Expr, text: &str) -> Result<Lowered, LowerError> {
        let value = parse_float(text).map_err(|msg| LowerError::literal(msg, expr.span))?;
        Ok(Lowered::unboxed(JExpr::Literal(Literal::Double(value))))
    }

    pub(crate) fn lower_char(&self, c: char) -> Lowered {
        Lowered::unboxed(JExpr::Literal(Literal::Char(u32::from(c))))
    }

    pub(crate) fn lower_string(&self, s: &str) -> Lowered {
        Lowered::unboxed(JExpr::string(s))
    }

    /// `"a ``x`` b"` becomes `"a " + x.toString() + " b"`. Interpolated
    /// strings are used as they are; other values are boxed and converted.
    pub(crate) fn lower_string_template(&self, cx: Cx<'_>, parts: &[Expr]) -> Result<Lowered, LowerError> {
        let mut result: Option<JExpr> = None;
        let mut branch = None;
        for part in parts {
            let piece = match &part.unparenthesized().kind {
                ExprKind::Str(s) if s.is_empty() => continue,
                ExprKind::Str(s) => JExpr::string(s),
                _ if self.oracle.simplify(&part.ty).is_decl(crate::model::names::STRING)
                    && !self.oracle.is_optional(&part.ty) =>
                {
                    let lowered = self.lower(cx.expression(), part, &Request::unboxed(Type::string()))?;
                    branch = branch.or(lowered.backward_branch);
                    lowered.expr
                }
                _ => {
                    let lowered = self.lower(cx.expression(), part, &Request::new(BoxingStrategy::Boxed, None))?;
                    branch = branch.or(lowered.backward_branch);
                    lowered.expr.invoke("toString", Vec::new())
                }
            };
            result = Some(match result {
                None => piece,
                Some(acc) => JExpr::binary(JBinaryOp::Add, acc, piece),
            });
        }
        let expr = result.unwrap_or_else(|| JExpr::string(""));
        Ok(Lowered::unboxed(expr).with_branch(branch))
    }
}
