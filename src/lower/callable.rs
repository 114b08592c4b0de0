//! Callable values: function and class references used as values,
//! function literals, and functions whose body is a specifier that names
//! another callable.
//!
//! Every callable value is an anonymous `AbstractCallable` whose `$call$`
//! receives its arguments as `Object` and forwards them to the target.

use tracing::{debug, trace};

use crate::ast::{Expr, ExprKind, MemberOp};
use crate::diagnostics::LowerError;
use crate::ir::{JExpr, JMember, JMethod, JStmt, JType, JTypeArg, Modifiers};
use crate::model::{BoxingStrategy, Parameter, TupleShape, Type};

use super::boxing::Source;
use super::context::{CastFlags, Cx, Lowered, Request};
use super::invocation::{CallShape, Callee, CallableParameters, Qualifier};
use super::java_types::JtFlags;
use super::members::Receiver;
use super::Lowerer;

const ABSTRACT_CALLABLE: &str = "ceylon.language.AbstractCallable";

impl<'m> Lowerer<'m> {
    fn callable_shape(&self, ty: &Type, span: crate::span::Span) -> Result<(Type, TupleShape), LowerError> {
        let shape = self
            .model
            .callable_parameters(ty)
            .ok_or_else(|| LowerError::unsupported(format!("compiler bug: {ty} is not a callable type"), span))?;
        let ret = self.model.callable_return(ty).unwrap_or_else(Type::anything);
        Ok((ret, shape))
    }

    /// A method or function used as a value.
    pub(crate) fn lower_function_reference(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        key: &str,
        receiver: Option<Receiver>,
        type_args: &[Type],
    ) -> Result<Lowered, LowerError> {
        let decl = self.member_decl(key)?;
        let Some(function) = decl.as_function() else {
            return Err(LowerError::internal(format!("{key} is not a function")));
        };
        if function.flags.deferred && receiver.is_none() {
            // already held as a Callable
            return Ok(Lowered::boxed(JExpr::ident(&function.name)));
        }
        let mut defs = Vec::new();
        let mut branch = None;
        let qualifier = match receiver {
            Some(recv) => {
                let name = self.fresh("$instance");
                let flags = if recv.value_type.is_some() { JtFlags::NONE } else { JtFlags::NO_PRIMITIVES };
                defs.push(JStmt::final_var(self.oracle.java_type(&recv.ty, flags), &name, recv.expr.clone()));
                branch = recv.backward_branch;
                Qualifier::Instance(Receiver { expr: JExpr::ident(&name), ..recv })
            }
            None => self.function_qualifier(cx.in_synthetic_body(), decl)?,
        };
        debug!(function = %function.name, "function reference");
        let callee = self.method_callee(function, qualifier, type_args);
        let wrapper = self.callable_wrapper(cx, expr, &function.name, callee)?;
        Ok(Lowered::boxed(JExpr::let_expr(defs, wrapper)).with_branch(branch))
    }

    /// A class used as a value: its instantiation wrapped as a callable.
    pub(crate) fn lower_type_reference(&self, cx: Cx<'_>, expr: &Expr, name: &str) -> Result<Lowered, LowerError> {
        let class = self.type_decl(name)?;
        let ty = self.model.callable_return(&expr.ty).unwrap_or_else(|| class.own_type());
        let outer = match &expr.kind {
            ExprKind::QualifiedType { receiver, .. } => {
                let cx = cx.expression().within_invocation(false);
                Some(self.lower(cx, receiver, &Request::boxed(receiver.ty.clone()))?.expr)
            }
            _ => None,
        };
        let callee = if class.flags.java_array {
            Callee::JavaArray { class, ty }
        } else {
            Callee::New { class, ty, outer }
        };
        debug!(class = %class.name, "class reference");
        Ok(Lowered::boxed(self.callable_wrapper(cx, expr, &class.name, callee)?))
    }

    /// `new AbstractCallable<R>(...) { $call$(Object...) { return target(...); } }`
    fn callable_wrapper(&self, cx: Cx<'_>, expr: &Expr, name: &str, callee: Callee<'m>) -> Result<JExpr, LowerError> {
        let (ret, shape) = self.callable_shape(&expr.ty, expr.span)?;
        let params = CallableParameters::new(shape.clone());
        let target = self.callee_shape(&callee, params.num_parameters());
        let defaults = self.defaults_for(&callee);
        let body_cx = cx.expression().in_synthetic_body().within_invocation(false);

        let mut args = self.callee_reified_arguments(&callee);
        let mut bound = Vec::new();
        for i in 0..target.num_parameters() {
            let value = if i < params.num_parameters() {
                self.from_object(JExpr::ident(params.parameter_name(i)), target.as_ref(), i)
            } else {
                trace!(param = target.parameter_name(i), "callable omits defaulted parameter");
                self.default_argument(body_cx, target.as_ref(), i, &bound, defaults.as_ref())?.expr
            };
            bound.push(value);
        }
        args.extend(bound);
        let call = self.apply_callee(&callee, args);

        let (void, unboxed, result_ty) = match &callee {
            Callee::Function { decl, .. } => (decl.is_void(), decl.flags.unboxed, decl.return_ty.clone()),
            _ => (false, false, ret.clone()),
        };
        let body = if void {
            vec![JStmt::exec(call), JStmt::ret(JExpr::null())]
        } else {
            let (value, _) = self.box_unbox_if_necessary(call, !unboxed, &result_ty, BoxingStrategy::Boxed);
            vec![JStmt::ret(value)]
        };
        Ok(self.abstract_callable(&expr.ty, &ret, name, &shape, body))
    }

    /// Read parameter `i` of the target out of an `Object`-typed callable
    /// parameter.
    fn from_object(&self, value: JExpr, target: &dyn CallShape, i: usize) -> JExpr {
        let req = if target.is_variadic(i) {
            Request::boxed(target.sequence_type(i))
        } else {
            target.request(i)
        };
        let req = req.with_flags(CastFlags::DOWN_CAST);
        let anything = Type::anything();
        self.apply_erasure_and_boxing(Lowered::boxed(value), Source::boxed(&anything), &req).expr
    }

    fn abstract_callable(&self, ty: &Type, ret: &Type, name: &str, shape: &TupleShape, body: Vec<JStmt>) -> JExpr {
        let class = JType::generic(
            ABSTRACT_CALLABLE,
            vec![JTypeArg::Type(self.oracle.java_type(ret, JtFlags::TYPE_ARGUMENT))],
        );
        let arguments = ty.type_arg(1).cloned().unwrap_or_else(Type::empty);
        let mut args = self.reified_arguments(&[ret.clone(), arguments]);
        args.push(JExpr::string(name));
        let count = shape.elements.len() + usize::from(shape.rest.is_some());
        let method = JMethod {
            modifiers: Modifiers::PUBLIC,
            name: if shape.rest.is_some() { "$callvariadic$" } else { "$call$" }.to_string(),
            result: Some(JType::object()),
            params: (0..count).map(|i| (JType::object(), format!("$param${i}"))).collect(),
            body,
        };
        JExpr::NewClass { outer: None, class, args, body: Some(vec![JMember::Method(method)]) }
    }

    // ── function literals ────────────────────────────────────────

    pub(crate) fn lower_function_literal(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        params: &[Parameter],
        body: &Expr,
    ) -> Result<Lowered, LowerError> {
        let (ret, shape) = self.callable_shape(&expr.ty, expr.span)?;
        let mark = self.substitution_mark();
        let mut stmts = Vec::with_capacity(params.len() + 1);
        for (i, p) in params.iter().enumerate() {
            let ty = match p.variadic {
                Some(_) => Type::sequential(p.ty.clone()),
                None => p.ty.clone(),
            };
            let anything = Type::anything();
            let req = Request::new(p.boxing, Some(ty.clone())).with_flags(CastFlags::DOWN_CAST);
            let value = self.apply_erasure_and_boxing(
                Lowered::boxed(JExpr::ident(format!("$param${i}"))),
                Source::boxed(&anything),
                &req,
            );
            let jt = if value.unboxed {
                self.oracle.java_type(&ty, JtFlags::NONE)
            } else {
                self.oracle.java_type(&ty, JtFlags::NO_PRIMITIVES)
            };
            stmts.push(JStmt::final_var(jt, &p.name, value.expr));
            self.substitute(&p.name, p.name.clone(), value.unboxed);
        }
        trace!(params = params.len(), "function literal");
        let body_cx = cx.expression().in_synthetic_body().within_invocation(false);
        let result = self.lower(body_cx, body, &Request::boxed(ret.clone()));
        self.restore_substitutions(mark);
        let result = result?;
        stmts.push(JStmt::ret(result.expr));
        let literal = self.abstract_callable(&expr.ty, &ret, "anonymous", &shape, stmts);
        Ok(Lowered::boxed(literal).with_branch(result.backward_branch))
    }

    // ── specifiers ───────────────────────────────────────────────

    /// Body of a function declared with a specifier, `f(a) => g`: the
    /// parameters are forwarded to `g.$call$(...)`, or straight to `g` when
    /// it names a method.
    pub fn lower_specifier(&self, cx: Cx<'_>, function_key: &str, specifier: &Expr) -> Result<JMethod, LowerError> {
        let decl = self.member_decl(function_key)?;
        let Some(function) = decl.as_function() else {
            return Err(LowerError::internal(format!("{function_key} is not a function")));
        };
        let cx = cx.expression();
        let callee = self.specifier_callee(cx, specifier)?;
        debug!(function = %function.name, direct = !matches!(callee, Callee::Indirect { .. }), "specifier invocation");
        let target = self.callee_shape(&callee, function.parameters.len());

        let defaults = self.defaults_for(&callee);
        let mut bound = Vec::with_capacity(target.num_parameters());
        for (i, p) in function.parameters.iter().enumerate().take(target.num_parameters()) {
            let ty = match p.variadic {
                Some(_) => Type::sequential(p.ty.clone()),
                None => p.ty.clone(),
            };
            let unboxed = p.boxing == BoxingStrategy::Unboxed;
            let req = if target.is_variadic(i) { Request::boxed(target.sequence_type(i)) } else { target.request(i) };
            let src = if unboxed { Source::unboxed(&ty) } else { Source::boxed(&ty) };
            let value = self.apply_erasure_and_boxing(Lowered::new(JExpr::ident(&p.name), unboxed), src, &req);
            bound.push(value.expr);
        }
        for i in bound.len()..target.num_parameters() {
            let value = self.default_argument(cx, target.as_ref(), i, &bound, defaults.as_ref())?;
            bound.push(value.expr);
        }
        let mut args = self.callee_reified_arguments(&callee);
        args.extend(bound);
        let call = self.apply_callee(&callee, args);

        let boxing = self.oracle.boxing_strategy_of(decl);
        let params = function
            .parameters
            .iter()
            .map(|p| {
                let jt = match p.variadic {
                    Some(_) => self.oracle.java_type(&Type::sequential(p.ty.clone()), JtFlags::NO_PRIMITIVES),
                    None => self.oracle.java_type_for(&p.ty, p.boxing),
                };
                (jt, p.name.clone())
            })
            .collect();
        let (result, body) = if function.is_void() {
            (None, vec![JStmt::exec(call)])
        } else {
            let value = match &callee {
                Callee::Function { decl: target_decl, .. } => {
                    let lowered = Lowered::new(call, target_decl.flags.unboxed);
                    let erased = target_decl.return_ty.any_type(&|t| matches!(t, Type::Param(_)));
                    let src = Source::of(&target_decl.return_ty, &lowered).erased(erased || target_decl.flags.type_erased);
                    self.apply_erasure_and_boxing(lowered, src, &Request::new(boxing, Some(function.return_ty.clone())))
                }
                _ => {
                    let anything = Type::anything();
                    let req = Request::new(boxing, Some(function.return_ty.clone())).with_flags(CastFlags::DOWN_CAST);
                    self.apply_erasure_and_boxing(Lowered::boxed(call), Source::boxed(&anything), &req)
                }
            };
            (Some(self.oracle.java_type_for(&function.return_ty, boxing)), vec![JStmt::ret(value.expr)])
        };
        Ok(JMethod {
            modifiers: if function.flags.shared { Modifiers::PUBLIC } else { Modifiers::NONE },
            name: function.name.clone(),
            result,
            params,
            body,
        })
    }

    fn specifier_callee(&self, cx: Cx<'_>, specifier: &Expr) -> Result<Callee<'m>, LowerError> {
        let inner = specifier.unparenthesized();
        match &inner.kind {
            ExprKind::BaseMember { decl: key, type_args } => {
                if let Some(target) = self.direct_function(key) {
                    let qualifier = self.function_qualifier(cx, self.member_decl(key)?)?;
                    return Ok(self.method_callee(target, qualifier, type_args));
                }
            }
            ExprKind::QualifiedMember { receiver, decl: key, op: MemberOp::Normal, type_args } => {
                if let Some(target) = self.direct_function(key) {
                    let recv = self.lower_receiver(cx, receiver, self.member_decl(key)?, false)?;
                    return Ok(self.method_callee(target, Qualifier::Instance(recv), type_args));
                }
            }
            _ => {}
        }
        let (_, shape) = self.callable_shape(&inner.ty, inner.span)?;
        let lowered = self.lower(cx.within_invocation(false), inner, &Request::boxed(inner.ty.clone()))?;
        Ok(Callee::Indirect { callable: lowered.expr, ty: inner.ty.clone(), shape })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;
    use crate::config::LoweringOptions;
    use crate::ir::{print_expr, print_member};
    use crate::model::{Container, FunctionDecl, MemberDecl, MemberFlags, Model, TypeDecl, TypeParam, ValueDecl};

    fn function(name: &str, container: Container, return_ty: Type, parameters: Vec<Parameter>) -> MemberDecl {
        MemberDecl::Function(FunctionDecl {
            name: name.into(),
            return_ty,
            type_params: Vec::new(),
            parameters,
            container,
            flags: MemberFlags { shared: true, unboxed: true, ..MemberFlags::default() },
        })
    }

    fn int_param(name: &str) -> Parameter {
        Parameter::new(name, Type::integer(), BoxingStrategy::Unboxed)
    }

    fn callable_of(ret: Type, args: Vec<Type>) -> Type {
        Type::callable(ret, Type::tuple(args, None))
    }

    fn model() -> Model {
        let mut m = Model::with_language();
        m.add_member(function("pair", Container::Toplevel, Type::integer(), vec![int_param("a"), int_param("b")]));
        m.add_member(function(
            "twice",
            Container::Toplevel,
            Type::integer(),
            vec![int_param("a"), int_param("b").defaulted()],
        ));
        m.add_member(function("f", Container::Toplevel, Type::integer(), vec![int_param("n")]));
        let mut person = TypeDecl::class("Person", "app.Person");
        person.extended = Some(Type::object());
        m.add_type(person);
        m.add_member(function(
            "greet",
            Container::Type("Person".into()),
            Type::string(),
            vec![Parameter::new("name", Type::string(), BoxingStrategy::Unboxed)],
        ));
        m.add_member(MemberDecl::Value(ValueDecl {
            name: "p".into(),
            ty: Type::named("Person"),
            container: Container::Local { owner: None, in_initializer: false },
            flags: MemberFlags::default(),
        }));
        m.add_member(MemberDecl::Value(ValueDecl {
            name: "h".into(),
            ty: callable_of(Type::integer(), vec![Type::integer()]),
            container: Container::Local { owner: None, in_initializer: false },
            flags: MemberFlags::default(),
        }));
        let mut cell = TypeDecl::class("Cell", "app.Cell");
        cell.type_params = vec![TypeParam::new("T")];
        cell.extended = Some(Type::object());
        cell.parameters = vec![Parameter::new("value", Type::param("T"), BoxingStrategy::Boxed)];
        m.add_type(cell);
        m
    }

    fn show(m: &Model, e: &Expr) -> String {
        let options = LoweringOptions { reified_generics: false, ..LoweringOptions::default() };
        let l = Lowerer::new(m, &options);
        print_expr(&l.lower_expression(Cx::default(), e, BoxingStrategy::Boxed, Some(&e.ty)).unwrap())
    }

    // ===== References =====

    #[test]
    fn test_function_reference_forwards_unboxed_arguments() {
        let m = model();
        let e = Expr::member("pair", callable_of(Type::integer(), vec![Type::integer(), Type::integer()]));
        let out = show(&m, &e);
        assert!(out.starts_with("new ceylon.language.AbstractCallable<ceylon.language.Integer>(\"pair\") {"), "{out}");
        assert!(
            out.contains("public java.lang.Object $call$(java.lang.Object $param$0, java.lang.Object $param$1) {"),
            "{out}"
        );
        assert!(
            out.contains(
                "return ceylon.language.Integer.instance(pair_.pair(((ceylon.language.Integer)$param$0).longValue(), \
                 ((ceylon.language.Integer)$param$1).longValue()));"
            ),
            "{out}"
        );
    }

    #[test]
    fn test_reference_with_fewer_parameters_fills_defaults() {
        let m = model();
        let e = Expr::member("twice", callable_of(Type::integer(), vec![Type::integer()]));
        let out = show(&m, &e);
        assert!(
            out.contains("twice_.twice(((ceylon.language.Integer)$param$0).longValue(), twice_.twice$b("),
            "{out}"
        );
    }

    #[test]
    fn test_method_reference_captures_receiver() {
        let m = model();
        let e = Expr::qualified(
            Expr::member("::p", Type::named("Person")),
            "Person.greet",
            callable_of(Type::string(), vec![Type::string()]),
        );
        let out = show(&m, &e);
        assert!(out.starts_with("(let final app.Person $instance$0 = p; in new ceylon.language.AbstractCallable<"), "{out}");
        assert!(
            out.contains("return ceylon.language.String.instance($instance$0.greet(((ceylon.language.String)$param$0).toString()));"),
            "{out}"
        );
    }

    #[test]
    fn test_void_reference_returns_null() {
        let m = Model::with_language();
        let e = Expr::member("print", callable_of(Type::anything(), vec![Type::anything()]));
        let out = show(&m, &e);
        assert!(out.contains("ceylon.language.print_.print($param$0);\n"), "{out}");
        assert!(out.contains("return null;"), "{out}");
    }

    #[test]
    fn test_class_reference_instantiates() {
        let m = model();
        let cell_ty = Type::class("Cell", vec![Type::string()]);
        let e = Expr::new(
            ExprKind::BaseType { decl: "Cell".into(), type_args: vec![Type::string()] },
            callable_of(cell_ty, vec![Type::string()]),
        );
        let out = show(&m, &e);
        assert!(out.contains("\"Cell\""), "{out}");
        assert!(out.contains("return new app.Cell<ceylon.language.String>((ceylon.language.String)$param$0);"), "{out}");
    }

    #[test]
    fn test_reified_descriptors_lead_the_arguments() {
        let m = model();
        let options = LoweringOptions::default();
        let l = Lowerer::new(&m, &options);
        let e = Expr::member("f", callable_of(Type::integer(), vec![Type::integer()]));
        let out = print_expr(&l.lower_expression(Cx::default(), &e, BoxingStrategy::Boxed, None).unwrap());
        assert!(
            out.starts_with(
                "new ceylon.language.AbstractCallable<ceylon.language.Integer>(\
                 com.redhat.ceylon.compiler.java.runtime.model.TypeDescriptor.klass(ceylon.language.Integer.class), "
            ),
            "{out}"
        );
        assert!(out.contains("\"f\") {"), "{out}");
    }

    // ===== Function literals =====

    #[test]
    fn test_function_literal_binds_typed_locals() {
        let m = model();
        let body = Expr::binary(BinaryOp::Add, Expr::member("x", Type::integer()), Expr::natural("1"), Type::integer());
        let e = Expr::new(
            ExprKind::FunctionLiteral { params: vec![int_param("x")], body: Box::new(body) },
            callable_of(Type::integer(), vec![Type::integer()]),
        );
        let out = show(&m, &e);
        assert!(out.contains("final long x = ((ceylon.language.Integer)$param$0).longValue();"), "{out}");
        assert!(out.contains("return ceylon.language.Integer.instance(x + 1L);"), "{out}");
    }

    #[test]
    fn test_function_literal_scope_is_closed() {
        let m = model();
        let options = LoweringOptions::default();
        let l = Lowerer::new(&m, &options);
        let e = Expr::new(
            ExprKind::FunctionLiteral { params: vec![int_param("x")], body: Box::new(Expr::member("x", Type::integer())) },
            callable_of(Type::integer(), vec![Type::integer()]),
        );
        l.lower_expression(Cx::default(), &e, BoxingStrategy::Boxed, None).unwrap();
        assert_eq!(l.substitution("x"), None);
    }

    // ===== Specifiers =====

    #[test]
    fn test_callable_specifier_calls_through_callable() {
        let m = model();
        let options = LoweringOptions::default();
        let l = Lowerer::new(&m, &options);
        let h = Expr::member("::h", callable_of(Type::integer(), vec![Type::integer()]));
        let method = l.lower_specifier(Cx::default(), "f", &h).unwrap();
        assert_eq!(
            print_member(&JMember::Method(method)),
            "public long f(long n) {\n    return ((ceylon.language.Integer)h.$call$(ceylon.language.Integer.instance(n))).longValue();\n}"
        );
    }

    #[test]
    fn test_method_reference_specifier_calls_directly() {
        let m = model();
        let options = LoweringOptions::default();
        let l = Lowerer::new(&m, &options);
        let target = Expr::member("twice", callable_of(Type::integer(), vec![Type::integer()]));
        let method = l.lower_specifier(Cx::default(), "f", &target).unwrap();
        let text = print_member(&JMember::Method(method));
        assert!(text.contains("return twice_.twice(n"), "{text}");
    }
}
