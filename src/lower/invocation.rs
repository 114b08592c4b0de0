//! Invocation model: each call site is classified once into a callee and
//! the parameter shape its arguments bind against. Argument binding only
//! sees the shape through `CallShape`.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::ast::{Arguments, Expr, ExprKind, MemberOp, PositionalArg};
use crate::diagnostics::LowerError;
use crate::ir::{JExpr, JStmt, JType};
use crate::model::{
    BoxingStrategy, Container, FunctionDecl, MemberDecl, ParamDefault, Parameter, Prim, TupleShape, Type, TypeDecl,
    Variadic,
};
use crate::span::Span;

use super::arguments::Defaults;
use super::boxing::Source;
use super::context::{CastFlags, Cx, Lowered, Request};
use super::java_types::JtFlags;
use super::members::Receiver;
use super::Lowerer;

static REQUIRED: ParamDefault = ParamDefault::Required;

// ── parameter shapes ─────────────────────────────────────────────

/// The parameter list a call binds against.
///
/// For a variadic parameter `parameter_type` is the element type; the
/// value passed is a sequence of it (or a native array for foreign
/// `T...` parameters).
pub(crate) trait CallShape {
    fn num_parameters(&self) -> usize;
    fn parameter_name(&self, i: usize) -> &str;
    fn parameter_type(&self, i: usize) -> Type;
    fn variadic(&self, i: usize) -> Option<Variadic>;
    fn default(&self, i: usize) -> &ParamDefault;
    fn boxing(&self, i: usize) -> BoxingStrategy;

    fn cast_flags(&self, _i: usize) -> CastFlags {
        CastFlags::NONE
    }

    fn java_variadic(&self, _i: usize) -> bool {
        false
    }

    fn is_variadic(&self, i: usize) -> bool {
        self.variadic(i).is_some()
    }

    /// `Sequential<T>` or `Sequence<T>` for a variadic parameter.
    fn sequence_type(&self, i: usize) -> Type {
        let element = self.parameter_type(i);
        match self.variadic(i) {
            Some(Variadic::Plus) => Type::sequence(element),
            _ => Type::sequential(element),
        }
    }

    fn request(&self, i: usize) -> Request {
        Request::new(self.boxing(i), Some(self.parameter_type(i))).with_flags(self.cast_flags(i))
    }
}

/// Parameters of a declaration, with the call site's type arguments
/// substituted.
pub(crate) struct DeclaredParameters<'p> {
    params: &'p [Parameter],
    bindings: HashMap<String, Type>,
}

impl<'p> DeclaredParameters<'p> {
    pub fn new(params: &'p [Parameter], bindings: HashMap<String, Type>) -> Self {
        Self { params, bindings }
    }
}

impl CallShape for DeclaredParameters<'_> {
    fn num_parameters(&self) -> usize {
        self.params.len()
    }

    fn parameter_name(&self, i: usize) -> &str {
        &self.params[i].name
    }

    fn parameter_type(&self, i: usize) -> Type {
        self.params[i].ty.substitute(&self.bindings)
    }

    fn variadic(&self, i: usize) -> Option<Variadic> {
        self.params[i].variadic
    }

    fn default(&self, i: usize) -> &ParamDefault {
        &self.params[i].default
    }

    fn boxing(&self, i: usize) -> BoxingStrategy {
        self.params[i].boxing
    }

    fn cast_flags(&self, i: usize) -> CastFlags {
        CastFlags::for_parameter(&self.params[i])
    }

    fn java_variadic(&self, i: usize) -> bool {
        self.params[i].flags.java_variadic
    }
}

/// Parameters read off a `Callable` type. Everything is boxed and nothing
/// is defaulted.
pub(crate) struct CallableParameters {
    shape: TupleShape,
    names: Vec<String>,
}

impl CallableParameters {
    pub fn new(shape: TupleShape) -> Self {
        let count = shape.elements.len() + usize::from(shape.rest.is_some());
        let names = (0..count).map(|i| format!("$param${i}")).collect();
        Self { shape, names }
    }
}

impl CallShape for CallableParameters {
    fn num_parameters(&self) -> usize {
        self.names.len()
    }

    fn parameter_name(&self, i: usize) -> &str {
        &self.names[i]
    }

    fn parameter_type(&self, i: usize) -> Type {
        match self.shape.elements.get(i) {
            Some(ty) => ty.clone(),
            None => self.shape.rest.clone().unwrap_or_else(Type::anything),
        }
    }

    fn variadic(&self, i: usize) -> Option<Variadic> {
        if i < self.shape.elements.len() || self.shape.rest.is_none() {
            return None;
        }
        Some(if self.shape.rest_nonempty { Variadic::Plus } else { Variadic::Star })
    }

    fn default(&self, _i: usize) -> &ParamDefault {
        &REQUIRED
    }

    fn boxing(&self, _i: usize) -> BoxingStrategy {
        BoxingStrategy::Boxed
    }
}

// ── callees ──────────────────────────────────────────────────────

/// How a function's selector is reached.
#[derive(Debug, Clone)]
pub(crate) enum Qualifier {
    /// Local functions, and members called from inside their own class.
    None,
    /// A static path: a toplevel wrapper or a foreign static owner.
    Static(JExpr),
    /// The current instance, qualified because the call is made from a
    /// companion or a synthetic body.
    Implicit(JExpr),
    /// An explicit primary.
    Instance(Receiver),
}

/// What a call site invokes.
pub(crate) enum Callee<'m> {
    Function {
        decl: &'m FunctionDecl,
        qualifier: Qualifier,
        bindings: HashMap<String, Type>,
        type_args: Vec<Type>,
    },
    New {
        class: &'m TypeDecl,
        ty: Type,
        outer: Option<JExpr>,
    },
    /// Foreign array constructor: `new T[size]`, filled when an element is
    /// given.
    JavaArray {
        class: &'m TypeDecl,
        ty: Type,
    },
    /// A `Callable` value called through `$call$`.
    Indirect {
        callable: JExpr,
        ty: Type,
        shape: TupleShape,
    },
}

impl Callee<'_> {
    pub fn is_instantiation(&self) -> bool {
        matches!(self, Callee::New { .. } | Callee::JavaArray { .. })
    }

    fn describe(&self) -> &str {
        match self {
            Callee::Function { decl, .. } => &decl.name,
            Callee::New { class, .. } | Callee::JavaArray { class, .. } => &class.name,
            Callee::Indirect { .. } => "$call$",
        }
    }
}

impl<'m> Lowerer<'m> {
    /// A function that is called directly: declared, not deferred and not
    /// shadowed by a lowering-introduced variable.
    pub(crate) fn direct_function(&self, key: &str) -> Option<&'m FunctionDecl> {
        if self.substitution(key).is_some() {
            return None;
        }
        self.model.member(key)?.as_function().filter(|f| !f.flags.deferred)
    }

    pub(crate) fn method_callee(
        &self,
        decl: &'m FunctionDecl,
        qualifier: Qualifier,
        type_args: &[Type],
    ) -> Callee<'m> {
        let mut bindings = match &qualifier {
            Qualifier::Instance(recv) => self.model.type_arguments(&recv.ty),
            _ => HashMap::new(),
        };
        bindings.extend(decl.type_params.iter().zip(type_args).map(|(p, a)| (p.name.clone(), a.clone())));
        Callee::Function { decl, qualifier, bindings, type_args: type_args.to_vec() }
    }

    /// Qualifier of an unqualified call to `decl`.
    pub(crate) fn function_qualifier(&self, cx: Cx<'_>, decl: &MemberDecl) -> Result<Qualifier, LowerError> {
        Ok(match decl.container() {
            Container::Toplevel => Qualifier::Static(JExpr::path(&self.toplevel_wrapper(decl.name()))),
            Container::Type(_) => match self.implicit_qualifier(cx, decl)? {
                Some(q) if decl.flags().static_ => Qualifier::Static(q),
                Some(q) => Qualifier::Implicit(q),
                None => Qualifier::None,
            },
            Container::Local { .. } => Qualifier::None,
        })
    }

    pub(crate) fn callee_shape(&self, callee: &Callee<'m>, supplied: usize) -> Box<dyn CallShape + 'm> {
        match callee {
            Callee::Function { decl, bindings, .. } => {
                Box::new(DeclaredParameters::new(&decl.parameters, bindings.clone()))
            }
            Callee::New { class, ty, .. } => {
                Box::new(DeclaredParameters::new(&class.parameters, self.model.type_arguments(ty)))
            }
            Callee::JavaArray { class, ty } => {
                // an omitted element leaves the array unfilled
                let count = supplied.clamp(1, class.parameters.len().max(1)).min(class.parameters.len());
                Box::new(DeclaredParameters::new(&class.parameters[..count], self.model.type_arguments(ty)))
            }
            Callee::Indirect { shape, .. } => Box::new(CallableParameters::new(shape.clone())),
        }
    }

    /// Where default values of omitted parameters come from.
    pub(crate) fn defaults_for(&self, callee: &Callee<'m>) -> Option<Defaults> {
        match callee {
            Callee::Function { decl, qualifier, .. } => {
                let foreign_array = decl
                    .container
                    .type_name()
                    .and_then(|o| self.model.type_decl(o))
                    .is_some_and(|o| o.flags.java_array);
                let qualifier = match qualifier {
                    Qualifier::None => None,
                    Qualifier::Static(q) | Qualifier::Implicit(q) => Some(q.clone()),
                    Qualifier::Instance(recv) => Some(recv.expr.clone()),
                };
                if foreign_array {
                    return qualifier.map(|receiver| Defaults::ArrayCopy { receiver });
                }
                Some(Defaults::Function { qualifier, name: decl.name.clone() })
            }
            Callee::New { class, .. } => Some(Defaults::Class { class: class.java_name.clone() }),
            Callee::JavaArray { .. } | Callee::Indirect { .. } => None,
        }
    }

    /// Alias an explicit receiver or a callable into `{base}$callable$` so
    /// default value methods can reuse it.
    pub(crate) fn alias_callee(&self, callee: Callee<'m>, base: &str, prelude: &mut Vec<JStmt>) -> Callee<'m> {
        let name = format!("{base}$callable$");
        match callee {
            Callee::Function { decl, qualifier: Qualifier::Instance(recv), bindings, type_args } => {
                let flags = if recv.value_type.is_some() { JtFlags::NONE } else { JtFlags::NO_PRIMITIVES };
                prelude.push(JStmt::final_var(self.oracle.java_type(&recv.ty, flags), &name, recv.expr));
                let recv = Receiver { expr: JExpr::ident(&name), ..recv };
                Callee::Function { decl, qualifier: Qualifier::Instance(recv), bindings, type_args }
            }
            Callee::Indirect { callable, ty, shape } => {
                prelude.push(JStmt::final_var(self.oracle.java_type(&ty, JtFlags::NO_PRIMITIVES), &name, callable));
                Callee::Indirect { callable: JExpr::ident(&name), ty, shape }
            }
            other => other,
        }
    }

    /// Reified type arguments passed ahead of the explicit arguments.
    pub(crate) fn reified_arguments(&self, types: &[Type]) -> Vec<JExpr> {
        if !self.options.reified_generics {
            return Vec::new();
        }
        types.iter().map(|t| self.oracle.reified_type(t)).collect()
    }

    pub(crate) fn callee_reified_arguments(&self, callee: &Callee<'m>) -> Vec<JExpr> {
        match callee {
            Callee::Function { decl, type_args, .. } if !decl.type_params.is_empty() => {
                let types: Vec<Type> = decl
                    .type_params
                    .iter()
                    .enumerate()
                    .map(|(i, p)| type_args.get(i).cloned().unwrap_or_else(|| Type::param(&p.name)))
                    .collect();
                self.reified_arguments(&types)
            }
            Callee::New { class, ty, .. } if class.flags.reified => self.reified_arguments(ty.type_args()),
            _ => Vec::new(),
        }
    }

    /// The call expression itself.
    pub(crate) fn apply_callee(&self, callee: &Callee<'m>, mut args: Vec<JExpr>) -> JExpr {
        match callee {
            Callee::Function { decl, qualifier, .. } => match qualifier {
                Qualifier::None => JExpr::call(JExpr::ident(&decl.name), args),
                Qualifier::Static(q) | Qualifier::Implicit(q) => q.clone().invoke(&decl.name, args),
                Qualifier::Instance(recv) => recv.apply(&decl.name, args),
            },
            Callee::New { class, ty, outer } => {
                if class.flags.generate_instantiator {
                    let name = format!("{}$new$", class.name);
                    let call = match outer {
                        Some(o) => o.clone().invoke(name, args),
                        None => JExpr::call(JExpr::ident(name), args),
                    };
                    if class.flags.untyped_instantiator {
                        return JExpr::cast(self.oracle.java_type(ty, JtFlags::NONE), call);
                    }
                    return call;
                }
                match outer {
                    Some(o) => JExpr::NewClass {
                        outer: Some(Box::new(o.clone())),
                        class: JType::class(&class.name),
                        args,
                        body: None,
                    },
                    None => JExpr::new_class(self.oracle.java_type(ty, JtFlags::CLASS_NEW), args),
                }
            }
            Callee::JavaArray { ty, .. } => {
                let element = match self.oracle.java_type(ty, JtFlags::NONE) {
                    JType::Array(element) => *element,
                    _ => JType::object(),
                };
                let mut args = args.into_iter();
                let size = args.next().unwrap_or_else(|| JExpr::int(0));
                let array = JExpr::NewArray {
                    element,
                    dims: vec![JExpr::cast(JType::Prim(Prim::Int), size)],
                    elems: None,
                };
                match args.next() {
                    Some(fill) => self.util("fillArray", vec![array, fill]),
                    None => array,
                }
            }
            Callee::Indirect { callable, shape, .. } => {
                let method = if shape.rest.is_some() { "$callvariadic$" } else { "$call$" };
                if args.len() == 1 {
                    let array = shape.elements.first().is_some_and(|t| self.oracle.is_java_array(t));
                    if array || args[0].is_null_literal() {
                        let arg = args.remove(0);
                        args.push(JExpr::cast(JType::object(), arg));
                    }
                }
                callable.clone().invoke(method, args)
            }
        }
    }

    // ── call sites ───────────────────────────────────────────────

    pub(crate) fn lower_call(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        primary: &Expr,
        args: &Arguments,
    ) -> Result<Lowered, LowerError> {
        let primary = primary.unparenthesized();
        if let ExprKind::QualifiedMember { receiver, decl: key, op, type_args } = &primary.kind {
            let function = self.direct_function(key);
            match (function, op) {
                (Some(function), MemberOp::Safe) => {
                    let decl = self.member_decl(key)?;
                    debug!(function = %function.name, "safe invocation");
                    return self.lower_safe(cx, receiver, decl, |recv| {
                        let callee = self.method_callee(function, Qualifier::Instance(recv), type_args);
                        self.invoke(cx, expr, callee, args)
                    });
                }
                (Some(function), MemberOp::Spread) => {
                    return self.lower_spread_call(cx, expr, receiver, key, function, type_args, args);
                }
                _ => {}
            }
        }
        let (callee, branch) = self.classify(cx, expr, primary)?;
        debug!(callee = callee.describe(), named = matches!(args, Arguments::Named(_)), "invocation");
        Ok(self.invoke(cx, expr, callee, args)?.with_branch(branch))
    }

    /// Pick the callee of a call whose primary is `primary`.
    fn classify(&self, cx: Cx<'_>, expr: &Expr, primary: &Expr) -> Result<(Callee<'m>, Option<Span>), LowerError> {
        let direct = match &primary.kind {
            ExprKind::BaseMember { decl, .. } | ExprKind::QualifiedMember { decl, .. } => self.direct_function(decl),
            _ => None,
        };
        match (&primary.kind, direct) {
            (ExprKind::BaseMember { decl: key, type_args }, Some(function)) => {
                let qualifier = self.function_qualifier(cx, self.member_decl(key)?)?;
                Ok((self.method_callee(function, qualifier, type_args), None))
            }
            (ExprKind::QualifiedMember { receiver, decl: key, type_args, .. }, Some(function)) => {
                let recv = self.lower_receiver(cx, receiver, self.member_decl(key)?, false)?;
                let branch = recv.backward_branch;
                Ok((self.method_callee(function, Qualifier::Instance(recv), type_args), branch))
            }
            (ExprKind::BaseType { decl, .. }, _) => self.instantiation(cx, expr, decl, None),
            (ExprKind::QualifiedType { receiver, decl, .. }, _) => self.instantiation(cx, expr, decl, Some(receiver)),
            _ => self.indirect(cx, primary),
        }
    }

    fn instantiation(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        name: &str,
        receiver: Option<&Expr>,
    ) -> Result<(Callee<'m>, Option<Span>), LowerError> {
        let class = self.type_decl(name)?;
        let ty = expr.ty.clone();
        if class.flags.java_array {
            return Ok((Callee::JavaArray { class, ty }, None));
        }
        let Some(receiver) = receiver else {
            return Ok((Callee::New { class, ty, outer: None }, None));
        };
        let cx = cx.expression().within_invocation(false);
        let lowered = self.lower(cx, receiver, &Request::boxed(self.model.non_null(&receiver.ty)))?;
        let container = class.container.type_name().and_then(|o| self.model.type_decl(o));
        let outer = match container {
            Some(od) if od.is_interface() => {
                trace!(interface = %od.name, "class nested in interface");
                lowered.expr.invoke(format!("${}$impl", od.name), Vec::new())
            }
            _ => lowered.expr,
        };
        Ok((Callee::New { class, ty, outer: Some(outer) }, lowered.backward_branch))
    }

    fn indirect(&self, cx: Cx<'_>, primary: &Expr) -> Result<(Callee<'m>, Option<Span>), LowerError> {
        let shape = self.model.callable_parameters(&primary.ty).ok_or_else(|| {
            LowerError::unsupported(
                format!("compiler bug: {} of type {} is not invocable", primary.kind_name(), primary.ty),
                primary.span,
            )
        })?;
        let deferred = match &primary.kind {
            ExprKind::BaseMember { decl, .. } if self.substitution(decl).is_none() => {
                self.model.member(decl).and_then(MemberDecl::as_function).filter(|f| f.flags.deferred)
            }
            _ => None,
        };
        let (callable, branch) = match deferred {
            Some(function) => (JExpr::ident(&function.name), None),
            None => {
                let cx = cx.expression().within_invocation(false);
                let lowered = self.lower(cx, primary, &Request::boxed(primary.ty.clone()))?;
                (lowered.expr, lowered.backward_branch)
            }
        };
        trace!(arity = shape.elements.len(), variadic = shape.rest.is_some(), "indirect invocation");
        Ok((Callee::Indirect { callable, ty: primary.ty.clone(), shape }, branch))
    }

    pub(crate) fn invoke(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        callee: Callee<'m>,
        args: &Arguments,
    ) -> Result<Lowered, LowerError> {
        match args {
            Arguments::Positional(list) => self.invoke_positional(cx, expr, callee, list),
            Arguments::Named(named) => self.lower_named_call(cx, expr, callee, named),
        }
    }

    fn invoke_positional(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        callee: Callee<'m>,
        list: &[PositionalArg],
    ) -> Result<Lowered, LowerError> {
        let shape = self.callee_shape(&callee, list.len());
        let arg_cx = cx.expression().within_invocation(false).with_uninitialized_operand(callee.is_instantiation());

        let mut prelude = Vec::new();
        let alias = super::arguments::needs_argument_temps(shape.as_ref(), list).then(|| self.fresh("arg"));
        let callee = match &alias {
            Some(base) => self.alias_callee(callee, base, &mut prelude),
            None => callee,
        };
        let defaults = self.defaults_for(&callee);
        let bound = self.bind_positional(arg_cx, shape.as_ref(), list, alias.as_deref(), defaults.as_ref())?;
        prelude.extend(bound.prelude);

        let mut branch = bound.branch;
        let mut values = bound.args;
        if branch.is_some() && callee.is_instantiation() {
            let base = self.fresh("arg");
            trace!(%base, "aliasing arguments of an instantiation with a backward branch");
            values = values
                .into_iter()
                .enumerate()
                .map(|(i, value)| {
                    let name = format!("{base}${i}");
                    prelude.push(JStmt::final_var(self.argument_type(shape.as_ref(), i), &name, value));
                    JExpr::ident(name)
                })
                .collect();
            if !cx.uninitialized_operand {
                branch = None;
            }
        }

        let mut args = self.callee_reified_arguments(&callee);
        args.extend(values);
        let call = self.apply_callee(&callee, args);
        Ok(self.finish_call(cx, expr, &callee, prelude, call).with_branch(branch))
    }

    /// Wrap the call with its prelude and fix up void and erased results.
    pub(crate) fn finish_call(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        callee: &Callee<'m>,
        mut prelude: Vec<JStmt>,
        call: JExpr,
    ) -> Lowered {
        let (void, unboxed, erased) = match callee {
            Callee::Function { decl, .. } => (
                decl.is_void(),
                decl.flags.unboxed,
                decl.flags.type_erased || decl.return_ty.any_type(&|t| matches!(t, Type::Param(_))),
            ),
            Callee::New { .. } | Callee::JavaArray { .. } => (false, false, false),
            Callee::Indirect { .. } => (false, false, true),
        };
        if void && !cx.in_statement {
            prelude.push(JStmt::exec(call));
            return Lowered::boxed(JExpr::let_expr(prelude, JExpr::null()));
        }
        let result = Lowered::new(JExpr::let_expr(prelude, call), unboxed);
        if !erased || unboxed || cx.in_statement {
            return result;
        }
        let anything = Type::anything();
        let req = Request::new(BoxingStrategy::Indifferent, Some(expr.ty.clone())).with_flags(CastFlags::DOWN_CAST);
        self.apply_erasure_and_boxing(result, Source::boxed(&anything).erased(true), &req)
    }

    /// `xs*.f(args)`: the arguments are evaluated once, before the loop.
    #[allow(clippy::too_many_arguments)]
    fn lower_spread_call(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        receiver: &Expr,
        key: &str,
        function: &'m FunctionDecl,
        type_args: &[Type],
        args: &Arguments,
    ) -> Result<Lowered, LowerError> {
        let Arguments::Positional(list) = args else {
            return Err(LowerError::unsupported(
                "compiler bug: spread invocation with named arguments",
                expr.span,
            ));
        };
        let decl = self.member_decl(key)?;
        let bindings = function.type_params.iter().zip(type_args).map(|(p, a)| (p.name.clone(), a.clone())).collect();
        let shape = DeclaredParameters::new(&function.parameters, bindings);
        let base = self.fresh("arg");
        let bound = self.bind_positional(cx.expression().within_invocation(false), &shape, list, Some(&base), None)?;
        debug!(function = %function.name, args = list.len(), "spread invocation");
        let values = bound.args;
        let lowered = self.lower_spread(cx, expr, receiver, decl, bound.prelude, |recv| {
            let callee = self.method_callee(function, Qualifier::Instance(recv), type_args);
            let mut call_args = self.callee_reified_arguments(&callee);
            call_args.extend(values);
            let call = self.apply_callee(&callee, call_args);
            if function.is_void() {
                return Ok(Lowered::boxed(JExpr::let_expr(vec![JStmt::exec(call)], JExpr::null())));
            }
            Ok(Lowered::new(call, function.flags.unboxed))
        })?;
        Ok(lowered.with_branch(bound.branch))
    }
}
