//! Named-argument invocations: every parameter gets a temp, declared in
//! parameter order, and the call itself is positional over the temps.

use tracing::{debug, trace};

use crate::ast::{Expr, NamedArgs, PositionalArg};
use crate::diagnostics::LowerError;
use crate::ir::{JExpr, JStmt, JType};
use crate::model::{names, ParamDefault, Type};

use super::arguments::Defaults;
use super::context::{Cx, Lowered, Request};
use super::invocation::{CallShape, Callee, Qualifier};
use super::java_types::{JtFlags, TYPE_DESCRIPTOR};
use super::Lowerer;

impl<'m> Lowerer<'m> {
    pub(crate) fn lower_named_call(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        callee: Callee<'m>,
        named: &NamedArgs,
    ) -> Result<Lowered, LowerError> {
        let base = self.fresh("arg");
        let mut prelude = Vec::new();
        let callee = self.alias_callee(callee, &base, &mut prelude);

        let supplied = match &callee {
            Callee::JavaArray { class, .. } => class
                .parameters
                .iter()
                .rposition(|p| named.named.iter().any(|a| a.param == p.name))
                .map_or(1, |i| i + 1),
            _ => usize::MAX,
        };
        let shape = self.callee_shape(&callee, supplied);
        let count = shape.num_parameters();
        if let Some(stray) = named.named.iter().find(|a| !(0..count).any(|i| shape.parameter_name(i) == a.param)) {
            return Err(LowerError::unsupported(
                format!("compiler bug: no parameter {} for named argument", stray.param),
                stray.value.span,
            ));
        }
        debug!(%base, params = count, named = named.named.len(), "named invocation");

        let mut args = Vec::new();
        for (i, reified) in self.callee_reified_arguments(&callee).into_iter().enumerate() {
            let name = format!("{base}$reified${i}");
            prelude.push(JStmt::final_var(JType::class(TYPE_DESCRIPTOR), &name, reified));
            args.push(JExpr::ident(name));
        }

        let arg_cx = cx.expression().within_invocation(false).with_uninitialized_operand(callee.is_instantiation());
        let sequenced = match &named.sequenced {
            Some(list) => Some((self.sequenced_parameter(shape.as_ref(), named)?, list.as_slice())),
            None => None,
        };
        let mut defaults: Option<Option<Defaults>> = None;
        let mut bound = Vec::with_capacity(count);
        let mut branch = None;
        for i in 0..count {
            let name = shape.parameter_name(i);
            let value = if let Some(arg) = named.named.iter().find(|a| a.param == name) {
                trace!(param = name, "named argument");
                let req = if shape.is_variadic(i) { Request::boxed(shape.sequence_type(i)) } else { shape.request(i) };
                self.lower(arg_cx, &arg.value, &req)?
            } else if let Some((_, list)) = sequenced.filter(|(target, _)| *target == i) {
                trace!(param = name, args = list.len(), "sequenced argument");
                if shape.is_variadic(i) {
                    self.variadic_argument(arg_cx, shape.as_ref(), i, list)?
                } else {
                    self.lazy_argument(arg_cx, shape.as_ref(), i, list)?
                }
            } else {
                let defaults = defaults.get_or_insert_with(|| self.named_defaults(&callee, &base, &mut prelude));
                self.named_default(arg_cx, shape.as_ref(), i, &bound, defaults.as_ref())?
            };
            branch = branch.or(value.backward_branch);
            let temp = format!("{base}${i}");
            prelude.push(JStmt::final_var(self.argument_type(shape.as_ref(), i), &temp, value.expr));
            bound.push(JExpr::ident(temp));
        }

        args.extend(bound);
        let call = self.apply_callee(&callee, args);
        Ok(self.finish_call(cx, expr, &callee, prelude, call).with_branch(branch))
    }

    /// The parameter that takes the trailing positional arguments: the last
    /// unnamed parameter that is variadic or accepts a stream.
    fn sequenced_parameter(&self, shape: &dyn CallShape, named: &NamedArgs) -> Result<usize, LowerError> {
        (0..shape.num_parameters())
            .rev()
            .filter(|&i| !named.named.iter().any(|a| a.param == shape.parameter_name(i)))
            .find(|&i| shape.is_variadic(i) || self.accepts_stream(shape, i))
            .ok_or_else(|| {
                let span = named
                    .sequenced
                    .as_ref()
                    .and_then(|s| s.first())
                    .map(|a| a.expr().span)
                    .unwrap_or_else(crate::span::Span::dummy);
                LowerError::unsupported("compiler bug: no parameter accepts the sequenced arguments", span)
            })
    }

    fn accepts_stream(&self, shape: &dyn CallShape, i: usize) -> bool {
        self.model.supertype_of(&shape.parameter_type(i), names::ITERABLE).is_some()
    }

    /// Sequenced arguments for a `{T*}` parameter, evaluated lazily.
    fn lazy_argument(
        &self,
        cx: Cx<'_>,
        shape: &dyn CallShape,
        i: usize,
        list: &[PositionalArg],
    ) -> Result<Lowered, LowerError> {
        let ty = shape.parameter_type(i);
        let element = self.model.iterated_type(&ty).unwrap_or_else(Type::anything);
        let absent = self.model.absent_type(&ty).unwrap_or_else(Type::null);
        self.lazy_iterable(cx, &element, &absent, list)
    }

    /// Defaults for a named call. A default method reached through the
    /// implicit instance gets that instance in `{base}$argthis$`.
    fn named_defaults(&self, callee: &Callee<'m>, base: &str, prelude: &mut Vec<JStmt>) -> Option<Defaults> {
        if let Callee::Function { decl, qualifier: Qualifier::Implicit(this), .. } = callee {
            if !decl.flags.static_ {
                let owner = decl.container.type_name().and_then(|o| self.model.type_decl(o));
                let ty = match owner {
                    Some(o) => self.oracle.java_type(&o.own_type(), JtFlags::NO_PRIMITIVES),
                    None => JType::object(),
                };
                let name = format!("{base}$argthis$");
                prelude.push(JStmt::final_var(ty, &name, this.clone()));
                return Some(Defaults::Function { qualifier: Some(JExpr::ident(name)), name: decl.name.clone() });
            }
        }
        self.defaults_for(callee)
    }

    fn named_default(
        &self,
        cx: Cx<'_>,
        shape: &dyn CallShape,
        i: usize,
        preceding: &[JExpr],
        defaults: Option<&Defaults>,
    ) -> Result<Lowered, LowerError> {
        let required = matches!(shape.default(i), ParamDefault::Required);
        if required && !shape.is_variadic(i) && self.accepts_stream(shape, i) {
            trace!(param = shape.parameter_name(i), "empty iterable for unbound stream parameter");
            return Ok(Lowered::boxed(self.make_empty()));
        }
        self.default_argument(cx, shape, i, preceding, defaults)
    }
}
