//! Member reference resolution: which qualifier and which selector a
//! reference to a value, attribute or method becomes.

use tracing::trace;

use crate::ast::{Expr, ExprKind, MemberOp};
use crate::diagnostics::LowerError;
use crate::ir::{JExpr, JStmt, JType, JUnaryOp};
use crate::model::{names, BoxingStrategy, Container, MemberDecl, Type, TypeDecl};
use crate::span::Span;

use super::context::{CastFlags, Cx, Lowered, Request};
use super::java_types::JtFlags;
use super::{getter_name, Lowerer};

/// The lowered primary of a qualified member access.
#[derive(Debug, Clone)]
pub(crate) struct Receiver {
    pub expr: JExpr,
    /// Static type the primary is seen as.
    pub ty: Type,
    /// The primary is an unboxed value type; members are reached through
    /// the static form on this class.
    pub value_type: Option<String>,
    pub backward_branch: Option<Span>,
}

impl Receiver {
    /// `recv.name` or, for value types, `Class.name` applied to `recv`.
    pub fn apply(&self, name: &str, mut args: Vec<JExpr>) -> JExpr {
        match &self.value_type {
            Some(class) => {
                args.insert(0, self.expr.clone());
                JExpr::path(class).invoke(name, args)
            }
            None => self.expr.clone().invoke(name, args),
        }
    }
}

impl Lowerer<'_> {
    // ── this / super / outer ─────────────────────────────────────

    pub(crate) fn lower_this(&self, cx: Cx<'_>) -> Result<Lowered, LowerError> {
        Ok(Lowered::boxed(self.this_expr(cx)))
    }

    /// The current instance. Inside an interface's companion it is the
    /// `$this` field; inside a synthetic body it must be qualified.
    pub(crate) fn this_expr(&self, cx: Cx<'_>) -> JExpr {
        let Some(class) = cx.scope.class else {
            return JExpr::ident("this");
        };
        let java = self.oracle.java_name(class);
        match (cx.scope.in_interface, cx.within_synthetic_class_body) {
            (true, true) => JExpr::QualifiedThis(format!("{java}$impl")).select("$this"),
            (true, false) => JExpr::ident("$this"),
            (false, true) => JExpr::QualifiedThis(java),
            (false, false) => JExpr::ident("this"),
        }
    }

    pub(crate) fn lower_super(&self, cx: Cx<'_>, expr: &Expr) -> Result<Lowered, LowerError> {
        if cx.scope.class.is_none() {
            return Err(LowerError::unsupported("compiler bug: super outside of a class or interface", expr.span));
        }
        if cx.scope.in_interface {
            return Ok(Lowered::boxed(self.this_expr(cx)));
        }
        Ok(Lowered::boxed(JExpr::ident("super")))
    }

    pub(crate) fn lower_outer(&self, cx: Cx<'_>, expr: &Expr) -> Result<Lowered, LowerError> {
        let outer = cx
            .scope
            .class
            .and_then(|c| self.model.type_decl(c))
            .and_then(|d| d.container.type_name());
        let Some(outer) = outer else {
            return Err(LowerError::unsupported("compiler bug: outer used outside of a member class", expr.span));
        };
        let decl = self.type_decl(outer)?;
        if decl.is_interface() {
            let companion = format!("{}$impl", decl.java_name);
            return Ok(Lowered::boxed(JExpr::QualifiedThis(companion).select("$this")));
        }
        Ok(Lowered::boxed(JExpr::QualifiedThis(decl.java_name.clone())))
    }

    // ── base members ─────────────────────────────────────────────

    pub(crate) fn lower_base_member(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        key: &str,
        type_args: &[Type],
    ) -> Result<Lowered, LowerError> {
        if let Some((target, unboxed)) = self.substitution(key) {
            trace!(key, target = %target, "substituted variable");
            return Ok(Lowered::new(JExpr::ident(target), unboxed));
        }
        let decl = self.member_decl(key)?;
        match decl {
            MemberDecl::Function(_) if cx.within_invocation => {
                Err(LowerError::internal(format!("method {key} must be lowered as an invocation primary")))
            }
            MemberDecl::Function(_) => self.lower_function_reference(cx, expr, key, None, type_args),
            MemberDecl::Value(_) => {
                let qualifier = match decl.container() {
                    Container::Type(_) => self.implicit_qualifier(cx, decl)?,
                    _ => None,
                };
                self.value_access(cx, decl, qualifier, true)
            }
        }
    }

    /// Qualifier added to an unqualified reference to a member of a type.
    pub(crate) fn implicit_qualifier(&self, cx: Cx<'_>, decl: &MemberDecl) -> Result<Option<JExpr>, LowerError> {
        let Some(owner) = decl.container().type_name() else { return Ok(None) };
        if decl.flags().static_ {
            return Ok(Some(JExpr::path(&self.oracle.java_name(owner))));
        }
        if cx.within_super_invocation.is_some() {
            return Ok(None);
        }
        let object_member = [names::OBJECT, names::BASIC, names::ANYTHING].contains(&owner);
        if object_member {
            return Ok(cx.scope.in_interface.then(|| self.this_expr(cx)));
        }
        let owner_decl = self.type_decl(owner)?;
        if owner_decl.is_interface() && decl.flags().shared && (cx.scope.in_interface || cx.within_synthetic_class_body)
        {
            let this = self.this_expr(cx);
            if cx.scope.in_interface {
                return Ok(Some(this));
            }
            let companion = format!("{}$impl", owner_decl.java_name);
            return Ok(Some(JExpr::QualifiedThis(companion).select("$this")));
        }
        if cx.within_synthetic_class_body {
            let class = cx.scope.class.unwrap_or(owner);
            let java = self.oracle.java_name(class);
            let name = if cx.scope.in_interface || owner_decl.is_interface() { format!("{java}$impl") } else { java };
            return Ok(Some(JExpr::QualifiedThis(name)));
        }
        Ok(None)
    }

    /// Read a value through the representation its declaration has:
    /// literal, toplevel wrapper, field, getter, box or plain variable.
    pub(crate) fn value_access(
        &self,
        cx: Cx<'_>,
        decl: &MemberDecl,
        qualifier: Option<JExpr>,
        base: bool,
    ) -> Result<Lowered, LowerError> {
        let flags = decl.flags();
        let name = decl.name();
        let unboxed = self.oracle.boxing_strategy_of(decl) == BoxingStrategy::Unboxed;
        let expr = match decl.container() {
            Container::Toplevel => match name {
                "null" => return Ok(Lowered::boxed(JExpr::null())),
                "true" | "false" => {
                    return Ok(Lowered::unboxed(JExpr::bool(name == "true")));
                }
                _ => JExpr::path(&self.toplevel_wrapper(name)).invoke("get_", Vec::new()),
            },
            Container::Type(owner) => {
                let use_parameter = base
                    && flags.class_parameter
                    && (cx.within_super_invocation == Some(owner.as_str())
                        || cx.within_default_param_expr == Some(owner.as_str()));
                if use_parameter {
                    JExpr::ident(name)
                } else if flags.java_field {
                    match qualifier {
                        Some(q) => q.select(name),
                        None => JExpr::ident(name),
                    }
                } else {
                    let getter = getter_name(name);
                    match qualifier {
                        Some(q) => q.invoke(getter, Vec::new()),
                        None => JExpr::call(JExpr::ident(getter), Vec::new()),
                    }
                }
            }
            Container::Local { .. } => {
                if flags.boxed_variable {
                    JExpr::ident(name).select("ref")
                } else if flags.transient {
                    JExpr::call(JExpr::ident(format!("{name}$getter")), Vec::new())
                } else {
                    JExpr::ident(name)
                }
            }
        };
        Ok(Lowered::new(expr, unboxed))
    }

    // ── qualified members ────────────────────────────────────────

    pub(crate) fn lower_qualified_member(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        receiver: &Expr,
        key: &str,
        op: MemberOp,
        type_args: &[Type],
    ) -> Result<Lowered, LowerError> {
        let decl = self.member_decl(key)?;
        match op {
            MemberOp::Normal => {
                let recv = self.lower_receiver(cx, receiver, decl, false)?;
                let branch = recv.backward_branch;
                Ok(self.apply_member(cx, expr, key, decl, recv, type_args)?.with_branch(branch))
            }
            MemberOp::Safe => self.lower_safe(cx, receiver, decl, |recv| {
                self.apply_member(cx, expr, key, decl, recv, type_args)
            }),
            MemberOp::Spread => self.lower_spread(cx, expr, receiver, decl, Vec::new(), |recv| {
                self.apply_member(cx, expr, key, decl, recv, type_args)
            }),
        }
    }

    /// Select `decl` on an already lowered receiver: a value read or a
    /// method reference wrapped as a callable.
    fn apply_member(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        key: &str,
        decl: &MemberDecl,
        recv: Receiver,
        type_args: &[Type],
    ) -> Result<Lowered, LowerError> {
        match decl {
            MemberDecl::Function(_) => self.lower_function_reference(cx, expr, key, Some(recv), type_args),
            MemberDecl::Value(v) => {
                if recv.value_type.is_some() && !v.flags.java_field {
                    return Ok(Lowered::new(recv.apply(&getter_name(&v.name), Vec::new()), v.flags.unboxed));
                }
                self.value_access(cx, decl, Some(recv.expr), false)
            }
        }
    }

    /// Lower the primary of a qualified member access and add the
    /// companion accessor or private upcast the member needs. `boxed`
    /// forces the boxed form even for value types.
    pub(crate) fn lower_receiver(
        &self,
        cx: Cx<'_>,
        receiver: &Expr,
        decl: &MemberDecl,
        boxed: bool,
    ) -> Result<Receiver, LowerError> {
        let cx = cx.expression().within_invocation(false);
        let owner = decl.container().type_name();
        let owner_decl = owner.and_then(|o| self.model.type_decl(o));

        if matches!(receiver.unparenthesized().kind, ExprKind::Super) {
            if let Some(od) = owner_decl.filter(|d| d.is_interface() && !cx.scope.in_interface) {
                let field = format!("${}$impl", od.name);
                return Ok(Receiver {
                    expr: JExpr::ident("this").select(field),
                    ty: od.own_type(),
                    value_type: None,
                    backward_branch: None,
                });
            }
        }

        let value_type = owner_decl
            .filter(|d| d.flags.value_type && !boxed)
            .filter(|_| self.oracle.is_value_type(&self.oracle.simplify(&receiver.ty)))
            .filter(|_| !self.oracle.is_optional(&receiver.ty));
        if let Some(vt) = value_type {
            let lowered = self.lower(cx, receiver, &Request::unboxed(receiver.ty.clone()))?;
            if lowered.unboxed {
                trace!(owner = %vt.name, "value type receiver");
                return Ok(Receiver {
                    expr: lowered.expr,
                    ty: receiver.ty.clone(),
                    value_type: Some(vt.java_name.clone()),
                    backward_branch: lowered.backward_branch,
                });
            }
        }

        let expected = owner
            .and_then(|o| self.model.supertype_of(&receiver.ty, o))
            .unwrap_or_else(|| self.model.non_null(&receiver.ty));
        let mut req = Request::boxed(expected.clone());
        if owner_decl.is_some_and(|d| d.is_interface() && !decl.flags().shared) {
            req = req.with_flags(CastFlags::WANTS_COMPANION);
        }
        let lowered = self.lower(cx, receiver, &req)?;
        let mut expr = lowered.expr;
        if let Some(od) = owner_decl {
            expr = self.companion_access(expr, od, decl);
            expr = self.private_upcast(expr, receiver, od, decl);
        }
        Ok(Receiver { expr, ty: expected, value_type: None, backward_branch: lowered.backward_branch })
    }

    /// Non-shared interface members live on the companion, reached through
    /// the `$I$impl()` accessor.
    fn companion_access(&self, expr: JExpr, owner: &TypeDecl, decl: &MemberDecl) -> JExpr {
        if !owner.is_interface() || decl.flags().shared {
            return expr;
        }
        let accessor = expr.invoke(format!("${}$impl", owner.name), Vec::new());
        if owner.flags.ancestor_local {
            return JExpr::cast(JType::class(format!("{}$impl", owner.java_name)), accessor);
        }
        accessor
    }

    /// A private member reached through a subtype needs the receiver seen
    /// as the declaring class.
    fn private_upcast(&self, expr: JExpr, receiver: &Expr, owner: &TypeDecl, decl: &MemberDecl) -> JExpr {
        if decl.flags().shared || !owner.is_class() {
            return expr;
        }
        let recv_decl = self.oracle.simplify(&receiver.ty).decl_name().map(str::to_string);
        if recv_decl.as_deref() == Some(owner.name.as_str()) {
            return expr;
        }
        trace!(owner = %owner.name, "private access upcast");
        JExpr::cast(self.oracle.java_type(&owner.own_type(), JtFlags::RAW), expr)
    }

    // ── member operators ─────────────────────────────────────────

    /// `x?.m`: `(let Q $safe$N = x; in $safe$N != null ? m : null)`. The
    /// member is always boxed.
    pub(crate) fn lower_safe(
        &self,
        cx: Cx<'_>,
        receiver: &Expr,
        decl: &MemberDecl,
        apply: impl FnOnce(Receiver) -> Result<Lowered, LowerError>,
    ) -> Result<Lowered, LowerError> {
        let recv = self.lower_receiver(cx, receiver, decl, true)?;
        let name = self.fresh("$safe");
        let qualifying = self.model.non_null(&receiver.ty);
        let ty = self.oracle.java_type(&qualifying, JtFlags::NO_PRIMITIVES);
        let branch = recv.backward_branch;
        let applied = apply(Receiver {
            expr: JExpr::ident(&name),
            ty: qualifying.clone(),
            value_type: None,
            backward_branch: None,
        })?;
        let value_ty = decl.ty().clone();
        let (value, _) = self.box_unbox_if_necessary(applied.expr, !applied.unboxed, &value_ty, BoxingStrategy::Boxed);
        let test = JExpr::binary(crate::ir::JBinaryOp::Neq, JExpr::ident(&name), JExpr::null());
        let result = JExpr::let_expr(
            vec![JStmt::final_var(ty, &name, recv.expr)],
            JExpr::conditional(test, value, JExpr::null()),
        );
        Ok(Lowered::boxed(result).with_branch(branch.or(applied.backward_branch)))
    }

    /// `xs*.m`: iterate the primary, apply the member to each element and
    /// collect the results in a sequence builder. `prelude` holds argument
    /// aliases evaluated once before the loop.
    pub(crate) fn lower_spread(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        receiver: &Expr,
        decl: &MemberDecl,
        prelude: Vec<JStmt>,
        apply: impl FnOnce(Receiver) -> Result<Lowered, LowerError>,
    ) -> Result<Lowered, LowerError> {
        let model = self.model;
        let base = self.fresh("spread");
        let iterable_name = format!("{base}$iterable$");
        let builder_name = format!("{base}$sb$");
        let element_name = format!("{base}$element$");
        let iteration_name = format!("{base}$iteration$");
        let iterator_name = format!("{base}$iterator$");

        let element_ty = match decl.container().type_name() {
            Some(owner) => model
                .iterated_type(&receiver.ty)
                .and_then(|e| model.supertype_of(&e, owner))
                .unwrap_or_else(|| Type::named(owner)),
            None => model.iterated_type(&receiver.ty).unwrap_or_else(Type::anything),
        };
        let result_element = model.sequential_element(&expr.ty).unwrap_or_else(|| decl.ty().clone());

        let iterable_ty = Type::stream(element_ty.clone());
        let source = self.lower(
            cx.expression().within_invocation(false),
            receiver,
            &Request::boxed(iterable_ty.clone()),
        )?;

        let builder_ty = JType::generic(
            "ceylon.language.SequenceBuilder",
            vec![crate::ir::JTypeArg::Type(self.oracle.java_type(&result_element, JtFlags::TYPE_ARGUMENT))],
        );
        let builder_init = JExpr::new_class(builder_ty.clone(), vec![self.oracle.reified_type(&result_element)]);

        let element_jt = self.oracle.java_type(&element_ty, JtFlags::NO_PRIMITIVES);
        let mut iteration = JExpr::ident(&iteration_name);
        if !self.oracle.erases_to_object(&element_ty) {
            iteration = JExpr::cast(element_jt.clone(), iteration);
        }

        let element = Receiver {
            expr: JExpr::ident(&element_name),
            ty: element_ty.clone(),
            value_type: None,
            backward_branch: None,
        };
        let applied = apply(element)?;
        let result_ty = decl.ty().clone();
        let (value, _) = self.box_unbox_if_necessary(applied.expr, !applied.unboxed, &result_ty, BoxingStrategy::Boxed);
        let append = JStmt::exec(JExpr::ident(&builder_name).invoke("append", vec![value]));

        let next = JExpr::assign(
            JExpr::ident(&iteration_name),
            JExpr::ident(&iterator_name).invoke("next", Vec::new()),
        );
        let finished = JExpr::InstanceOf { expr: Box::new(next), ty: JType::class("ceylon.language.Finished") };
        let iterator_ty = JType::generic(
            "ceylon.language.Iterator",
            vec![crate::ir::JTypeArg::Extends(self.oracle.java_type(&element_ty, JtFlags::TYPE_ARGUMENT))],
        );

        let mut defs = vec![
            JStmt::final_var(self.oracle.java_type(&iterable_ty, JtFlags::NO_PRIMITIVES), &iterable_name, source.expr),
            JStmt::final_var(builder_ty, &builder_name, builder_init),
        ];
        defs.extend(prelude);
        defs.push(JStmt::final_var(
            iterator_ty,
            &iterator_name,
            JExpr::ident(&iterable_name).invoke("iterator", Vec::new()),
        ));
        defs.push(JStmt::VarDef { is_final: false, ty: JType::object(), name: iteration_name.clone(), init: None });
        defs.push(JStmt::While {
            cond: JExpr::unary(JUnaryOp::Not, finished),
            body: Box::new(JStmt::Block(vec![JStmt::final_var(element_jt, &element_name, iteration), append])),
        });

        let mut result = JExpr::let_expr(defs, JExpr::ident(&builder_name).invoke("getSequence", Vec::new()));
        if model.is_sequence(&receiver.ty) {
            let sequence = Type::sequence(result_element.clone());
            result = JExpr::cast(self.oracle.java_type(&sequence, JtFlags::NONE), result);
        }
        let loop_branch = cx.uninitialized_operand.then_some(expr.span);
        if loop_branch.is_some() {
            trace!(span = %expr.span, "spread loop with unconstructed receiver");
        }
        Ok(Lowered::boxed(result).with_branch(source.backward_branch.or(applied.backward_branch).or(loop_branch)))
    }
}
