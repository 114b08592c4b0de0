//! Stores: the write side of member references.

use tracing::trace;

use crate::ast::Expr;
use crate::diagnostics::LowerError;
use crate::ir::{JExpr, JStmt};
use crate::model::{BoxingStrategy, Container, MemberDecl};

use super::context::{Cx, Lowered, Request};
use super::operators::Target;
use super::{setter_name, Lowerer};

impl Lowerer<'_> {
    /// Write `value` through the representation `decl` has. `base` is set
    /// when the target was written without a receiver.
    pub(crate) fn store(
        &self,
        cx: Cx<'_>,
        decl: &MemberDecl,
        qualifier: Option<JExpr>,
        value: JExpr,
        base: bool,
    ) -> Result<JExpr, LowerError> {
        let flags = decl.flags();
        let name = decl.name();
        if let MemberDecl::Function(_) = decl {
            if !flags.deferred {
                return Err(LowerError::internal(format!("function {name} is not assignable")));
            }
            return Ok(JExpr::assign(JExpr::ident(name), value));
        }
        let stored = match decl.container() {
            Container::Toplevel => JExpr::path(&self.toplevel_wrapper(name)).invoke("set_", vec![value]),
            Container::Type(owner) => {
                let use_parameter = base
                    && flags.class_parameter
                    && (cx.within_super_invocation == Some(owner.as_str())
                        || cx.within_default_param_expr == Some(owner.as_str()));
                if use_parameter || (flags.java_field && qualifier.is_none()) {
                    JExpr::assign(JExpr::ident(name), value)
                } else if flags.java_field {
                    let field = qualifier.map(|q| q.select(name)).unwrap_or_else(|| JExpr::ident(name));
                    JExpr::assign(field, value)
                } else {
                    match qualifier {
                        Some(q) => q.invoke(setter_name(name), vec![value]),
                        None => JExpr::call(JExpr::ident(setter_name(name)), vec![value]),
                    }
                }
            }
            Container::Local { .. } if flags.boxed_variable => JExpr::assign(JExpr::ident(name).select("ref"), value),
            Container::Local { .. } if flags.transient => {
                JExpr::call(JExpr::ident(format!("{name}$setter")), vec![value])
            }
            Container::Local { .. } => JExpr::assign(JExpr::ident(name), value),
        };
        Ok(stored)
    }

    /// `target = value`. As a statement this is the bare store; as an
    /// expression the value is kept in a temp and yielded after the store.
    pub(crate) fn lower_assignment_expr(&self, cx: Cx<'_>, target: &Expr, value: &Expr) -> Result<Lowered, LowerError> {
        let in_statement = cx.in_statement;
        let cx = cx.expression();
        let Target { decl, qualifier, mut defs, base } = self.assignable(cx, target, !in_statement)?;
        let boxing = self.oracle.boxing_strategy_of(decl);
        let unboxed = boxing == BoxingStrategy::Unboxed;
        let v = self.lower(cx.within_invocation(false), value, &Request::new(boxing, Some(target.ty.clone())))?;
        let branch = v.backward_branch;
        trace!(target = decl.name(), in_statement, "assignment");

        if in_statement {
            let stored = self.store(cx, decl, qualifier, v.expr, base)?;
            return Ok(Lowered::new(stored, unboxed).with_branch(branch));
        }
        let temp = self.fresh("$tmp");
        let ty = self.oracle.java_type_for(&target.ty, boxing);
        defs.push(JStmt::final_var(ty, &temp, v.expr));
        defs.push(JStmt::exec(self.store(cx, decl, qualifier, JExpr::ident(&temp), base)?));
        Ok(Lowered::new(JExpr::let_expr(defs, JExpr::ident(&temp)), unboxed).with_branch(branch))
    }
}
