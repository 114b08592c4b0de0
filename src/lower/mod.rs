//! The lowering engine: typed expressions in, target expressions out.
//!
//! `Lowerer::lower` is the single recursive entry point. It strips
//! grouping, dispatches on the node kind to one of the submodules, turns
//! node-scoped failures into placeholders, and finally normalizes the
//! result's erasure and boxing against what the caller asked for.

mod arguments;
mod assign;
pub(crate) mod boxing;
mod callable;
mod collections;
mod comprehension;
pub mod context;
mod invocation;
pub mod java_types;
mod literals;
mod members;
mod named;
mod operators;
pub mod oracle;
mod super_call;

use std::cell::{Cell, RefCell};

use tracing::{debug, warn};

use crate::ast::{Comprehension, Expr, ExprKind, PositionalArg};
use crate::config::LoweringOptions;
use crate::diagnostics::LowerError;
use crate::ir::{JExpr, JStmt};
use crate::model::{BoxingStrategy, MemberDecl, Model, Type, TypeDecl};

pub use context::{CastFlags, Cx, Lowered, Request, Scope};
pub use literals::{parse_float, parse_natural, parse_negated_natural};
pub use operators::{OperatorDescriptor, descriptor};
pub use oracle::Oracle;
pub use super_call::SuperCall;

use boxing::Source;

/// Prefix of the wrappers generated for the language module's toplevels.
const LANGUAGE_PACKAGE: &str = "ceylon.language";

/// A variable introduced by the lowering itself (comprehension iteration
/// variables, function-literal parameters) that shadows the declaration of
/// the same name while its scope is open.
#[derive(Debug, Clone)]
struct Substitution {
    name: String,
    target: String,
    unboxed: bool,
}

pub struct Lowerer<'m> {
    pub(crate) model: &'m Model,
    pub(crate) options: &'m LoweringOptions,
    pub(crate) oracle: Oracle<'m>,
    counter: Cell<u32>,
    substitutions: RefCell<Vec<Substitution>>,
}

impl<'m> Lowerer<'m> {
    pub fn new(model: &'m Model, options: &'m LoweringOptions) -> Self {
        Self {
            model,
            options,
            oracle: Oracle::new(model),
            counter: Cell::new(0),
            substitutions: RefCell::new(Vec::new()),
        }
    }

    pub fn options(&self) -> &LoweringOptions {
        self.options
    }

    // ── public entry points ──────────────────────────────────────

    /// Lower a standalone expression to the requested representation.
    pub fn lower_expression(
        &self,
        cx: Cx<'_>,
        expr: &Expr,
        boxing: BoxingStrategy,
        expected: Option<&Type>,
    ) -> Result<JExpr, LowerError> {
        debug!(kind = expr.kind_name(), ?boxing, "lower expression");
        let req = Request::new(boxing, expected.cloned());
        Ok(self.lower(cx.expression(), expr, &req)?.expr)
    }

    /// Lower an expression whose value is discarded.
    pub fn lower_statement(&self, cx: Cx<'_>, expr: &Expr) -> Result<JStmt, LowerError> {
        debug!(kind = expr.kind_name(), "lower statement");
        if let ExprKind::Assign { target, value } = &expr.unparenthesized().kind {
            return self.lower_assignment(cx, target, value);
        }
        let lowered = self.lower(cx.statement(), expr, &Request::indifferent())?;
        Ok(JStmt::exec(lowered.expr))
    }

    /// Lower a call site. The expression must be an invocation.
    pub fn lower_invocation(&self, cx: Cx<'_>, expr: &Expr) -> Result<JExpr, LowerError> {
        let ExprKind::Invocation { primary, args } = &expr.unparenthesized().kind else {
            return Err(LowerError::internal(format!("{} is not an invocation", expr.kind_name())));
        };
        debug!(primary = primary.kind_name(), "lower invocation");
        let req = Request::new(BoxingStrategy::Boxed, Some(expr.ty.clone()));
        let lowered = self.guard(expr, self.lower_call(cx.expression(), expr, primary, args))?;
        let src = self.source_of(expr, &lowered);
        Ok(self.apply_erasure_and_boxing(lowered, src, &req).expr)
    }

    /// Lower `target = value` as a statement.
    pub fn lower_assignment(&self, cx: Cx<'_>, target: &Expr, value: &Expr) -> Result<JStmt, LowerError> {
        debug!(target = target.kind_name(), "lower assignment");
        let expr = self.guard(target, self.lower_assignment_expr(cx.statement(), target, value))?;
        Ok(JStmt::exec(expr.expr))
    }

    /// Lower a comprehension into an anonymous iterable.
    pub fn lower_comprehension(
        &self,
        cx: Cx<'_>,
        comprehension: &Comprehension,
        expected: Option<&Type>,
    ) -> Result<JExpr, LowerError> {
        debug!(clauses = comprehension.clauses.len(), "lower comprehension");
        Ok(self.lower_comprehension_node(cx.expression(), comprehension, expected)?.expr)
    }

    /// Lower the `super(...)` call of `class`'s initializer.
    pub fn lower_super_initializer(
        &self,
        cx: Cx<'_>,
        class: &str,
        superclass: &Type,
        args: &[PositionalArg],
    ) -> Result<SuperCall, LowerError> {
        debug!(class, superclass = %superclass, "lower super initializer");
        self.lower_super_call(cx, class, superclass, args)
    }

    // ── dispatch ─────────────────────────────────────────────────

    pub(crate) fn lower(&self, cx: Cx<'_>, expr: &Expr, req: &Request) -> Result<Lowered, LowerError> {
        let expr = expr.unparenthesized();
        if let ExprKind::Of(operand) = &expr.kind {
            return self.guard(expr, self.lower_of(cx, expr, operand, req));
        }
        let lowered = match self.guard(expr, self.lower_kind(cx, expr, req))? {
            l if l.expr.is_erroneous() => return Ok(l),
            l => l,
        };
        let mut req = req.clone();
        let lowered = self.check_nulls(expr, lowered, &mut req);
        let src = self.source_of(expr, &lowered);
        Ok(self.apply_erasure_and_boxing(lowered, src, &req))
    }

    /// Turn a node-scoped failure into a placeholder; fatal errors pass.
    fn guard(&self, expr: &Expr, result: Result<Lowered, LowerError>) -> Result<Lowered, LowerError> {
        match result {
            Err(err) if err.is_recoverable() => {
                let span = err.span().filter(|s| !s.is_dummy()).unwrap_or(expr.span);
                warn!(kind = expr.kind_name(), %span, "{}", err.message());
                Ok(Lowered::erroneous(err.message(), span))
            }
            other => other,
        }
    }

    fn lower_kind(&self, cx: Cx<'_>, expr: &Expr, req: &Request) -> Result<Lowered, LowerError> {
        match &expr.kind {
            ExprKind::Natural(text) => self.lower_natural(expr, text),
            ExprKind::Float(text) => self.lower_float(expr, text),
            ExprKind::Char(c) => Ok(self.lower_char(*c)),
            ExprKind::Str(s) => Ok(self.lower_string(s)),
            ExprKind::StringTemplate(parts) => self.lower_string_template(cx, parts),
            ExprKind::Group(inner) => self.lower(cx, inner, req),

            ExprKind::BaseMember { decl, type_args } => self.lower_base_member(cx, expr, decl, type_args),
            ExprKind::QualifiedMember { receiver, decl, op, type_args } => {
                self.lower_qualified_member(cx, expr, receiver, decl, *op, type_args)
            }
            ExprKind::BaseType { decl, .. } | ExprKind::QualifiedType { decl, .. } => {
                self.lower_type_reference(cx, expr, decl)
            }
            ExprKind::This => self.lower_this(cx),
            ExprKind::Super => self.lower_super(cx, expr),
            ExprKind::Outer => self.lower_outer(cx, expr),

            ExprKind::Binary { op, left, right } => self.lower_binary(cx, expr, *op, left, right),
            ExprKind::Unary { op, operand } => self.lower_unary(cx, expr, *op, operand),
            ExprKind::Is { operand, target, negated } => self.lower_is(cx, operand, target, *negated),
            ExprKind::Of(operand) => self.lower_of(cx, expr, operand, req),
            ExprKind::Assign { target, value } => self.lower_assignment_expr(cx, target, value),
            ExprKind::CompoundAssign { op, target, value } => {
                self.lower_compound_assign(cx, expr, *op, target, value)
            }
            ExprKind::Prefix { op, target } => self.lower_prefix(cx, expr, *op, target),
            ExprKind::Postfix { op, target } => self.lower_postfix(cx, expr, *op, target),
            ExprKind::Within { lower, middle, upper, lower_bound, upper_bound } => {
                self.lower_within(cx, lower, middle, upper, *lower_bound, *upper_bound)
            }
            ExprKind::Index { primary, index } => self.lower_index(cx, expr, primary, index),

            ExprKind::Invocation { primary, args } => self.lower_call(cx, expr, primary, args),
            ExprKind::Tuple(elements) => self.lower_tuple(cx, expr, elements),
            ExprKind::SequenceEnum(elements) => self.lower_iterable_enumeration(cx, expr, elements),
            ExprKind::Comprehension(comp) => {
                self.lower_comprehension_node(cx, comp, req.expected.as_ref().or(Some(&expr.ty)))
            }
            ExprKind::FunctionLiteral { params, body } => self.lower_function_literal(cx, expr, params, body),

            ExprKind::Dynamic => Err(LowerError::unsupported(
                "compiler bug: dynamic blocks are not supported on the JVM backend",
                expr.span,
            )),
            ExprKind::MetaLiteral(text) => Err(LowerError::unsupported(
                format!("compiler bug: meta literal {text} is not supported by the expression lowering"),
                expr.span,
            )),
        }
    }

    /// Values of foreign, null-permitting origin used where a non-optional
    /// type is expected are wrapped in a runtime check.
    fn check_nulls(&self, expr: &Expr, lowered: Lowered, req: &mut Request) -> Lowered {
        if !self.options.unchecked_null_checks || !expr.unchecked_nulls || lowered.unboxed {
            return lowered;
        }
        let Some(expected) = req.expected.as_ref() else { return lowered };
        if self.oracle.is_optional(expected) || self.oracle.is_null(expected) {
            return lowered;
        }
        req.flags = req.flags | CastFlags::NULL_CHECKED;
        lowered.map(|e| self.util("checkNull", vec![e]))
    }

    fn source_of<'e>(&self, expr: &'e Expr, lowered: &Lowered) -> Source<'e> {
        let decl_erased = match &expr.kind {
            ExprKind::BaseMember { decl, .. } | ExprKind::QualifiedMember { decl, .. } => {
                self.model.member(decl).is_some_and(|d| d.flags().type_erased)
            }
            _ => false,
        };
        Source::of(&expr.ty, lowered)
            .erased(expr.type_erased || decl_erased)
            .untrusted(expr.untrusted_type)
    }

    // ── shared helpers ───────────────────────────────────────────

    /// A fresh synthetic name such as `$tmp$3` or `arg$0`.
    pub(crate) fn fresh(&self, base: &str) -> String {
        let n = self.counter.get();
        self.counter.set(n + 1);
        format!("{base}${n}")
    }

    /// `Util.method(args)` on the configured runtime helper class.
    pub(crate) fn util(&self, method: &str, args: Vec<JExpr>) -> JExpr {
        JExpr::path(&self.options.runtime_util_class).invoke(method, args)
    }

    pub(crate) fn member_decl(&self, key: &str) -> Result<&'m MemberDecl, LowerError> {
        self.model
            .member(key)
            .ok_or_else(|| LowerError::internal(format!("no declaration for member reference {key}")))
    }

    pub(crate) fn type_decl(&self, name: &str) -> Result<&'m TypeDecl, LowerError> {
        self.model
            .type_decl(name)
            .ok_or_else(|| LowerError::internal(format!("no declaration for type {name}")))
    }

    /// The `empty` value.
    pub(crate) fn make_empty(&self) -> JExpr {
        JExpr::path(&self.toplevel_wrapper("empty")).invoke("get_", Vec::new())
    }

    /// Name of the static wrapper class of a toplevel declaration.
    pub(crate) fn toplevel_wrapper(&self, name: &str) -> String {
        if Model::language().member(name).is_some() {
            format!("{LANGUAGE_PACKAGE}.{name}_")
        } else {
            format!("{name}_")
        }
    }

    pub(crate) fn language_class(&self, name: &str) -> JExpr {
        JExpr::path(&format!("{LANGUAGE_PACKAGE}.{name}"))
    }

    // ── substitutions ────────────────────────────────────────────

    pub(crate) fn substitute(&self, name: &str, target: impl Into<String>, unboxed: bool) {
        self.substitutions.borrow_mut().push(Substitution { name: name.to_string(), target: target.into(), unboxed });
    }

    pub(crate) fn substitution_mark(&self) -> usize {
        self.substitutions.borrow().len()
    }

    /// Close every substitution opened since `mark`.
    pub(crate) fn restore_substitutions(&self, mark: usize) {
        self.substitutions.borrow_mut().truncate(mark);
    }

    /// The innermost substitution for a reference: target variable and
    /// whether it holds the unboxed representation. Local keys (`f::x`)
    /// match on their last segment.
    pub(crate) fn substitution(&self, key: &str) -> Option<(String, bool)> {
        let local = key.rsplit("::").next().unwrap_or(key);
        self.substitutions
            .borrow()
            .iter()
            .rev()
            .find(|s| s.name == key || s.name == local)
            .map(|s| (s.target.clone(), s.unboxed))
    }
}

/// Getter method name of an attribute.
pub(crate) fn getter_name(name: &str) -> String {
    match name {
        "string" => "toString".to_string(),
        "hash" => "hashCode".to_string(),
        _ => format!("get{}", capitalize(name)),
    }
}

pub(crate) fn setter_name(name: &str) -> String {
    format!("set{}", capitalize(name))
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
