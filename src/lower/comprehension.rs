//! Comprehensions, `{ for (x in xs) if (p(x)) f(x) }`.
//!
//! The comprehension becomes an anonymous `AbstractIterable` whose
//! `iterator()` returns an anonymous `AbstractIterator`. Each clause adds
//! state to that iterator:
//!
//! * a `for` clause gets a `$iterator$k` field, fields for the pattern
//!   variables, an `…$exhausted$` flag and a context method that advances
//!   to the next item. Iterators after the first are (re)created lazily by
//!   a `$iterator$k()` method since they may depend on outer items.
//! * an `if` clause gets a `$next$k()` context method that advances the
//!   previous context until its conditions hold.
//!
//! `next()` calls the innermost context method and either yields the
//! element or `finished`. Iteration variables are read through a final
//! local copy so that anything capturing them sees the value of that
//! iteration.

use tracing::trace;

use crate::ast::{Clause, Comprehension, Condition, Expr, ForPattern};
use crate::diagnostics::LowerError;
use crate::ir::{JBinaryOp, JExpr, JMember, JMethod, JStmt, JType, JTypeArg, Modifiers};
use crate::model::{names, Type};

use super::boxing::Source;
use super::context::{CastFlags, Cx, Lowered, Request};
use super::java_types::JtFlags;
use super::Lowerer;

const ABSTRACT_ITERABLE: &str = "ceylon.language.AbstractIterable";
const ABSTRACT_ITERATOR: &str = "ceylon.language.AbstractIterator";
const ITERATOR: &str = "ceylon.language.Iterator";

impl<'m> Lowerer<'m> {
    pub(crate) fn lower_comprehension_node(
        &self,
        cx: Cx<'_>,
        comp: &Comprehension,
        expected: Option<&Type>,
    ) -> Result<Lowered, LowerError> {
        let element = self.comprehension_element(comp, expected);
        let absent = match comp.clauses.first() {
            Some(Clause::For { iterable, .. }) => self.model.absent_type(&iterable.ty).unwrap_or_else(Type::null),
            _ => Type::null(),
        };
        trace!(clauses = comp.clauses.len(), element = %element, "comprehension");

        let mark = self.substitution_mark();
        let builder = IteratorBuilder::new(self, cx.expression().in_synthetic_body().within_invocation(false));
        let result = builder.build(comp, &element);
        self.restore_substitutions(mark);
        let iterator_members = result?;

        let iterator = JMethod {
            modifiers: Modifiers::PUBLIC | Modifiers::FINAL,
            name: "iterator".to_string(),
            result: Some(JType::generic(ITERATOR, vec![JTypeArg::Extends(self.element_type_arg(&element))])),
            params: Vec::new(),
            body: vec![JStmt::ret(JExpr::NewClass {
                outer: None,
                class: JType::generic(ABSTRACT_ITERATOR, vec![JTypeArg::Type(self.element_type_arg(&element))]),
                args: self.reified_arguments(std::slice::from_ref(&element)),
                body: Some(iterator_members),
            })],
        };
        let iterable = JExpr::NewClass {
            outer: None,
            class: JType::generic(
                ABSTRACT_ITERABLE,
                vec![
                    JTypeArg::Type(self.element_type_arg(&element)),
                    JTypeArg::Type(self.oracle.java_type(&absent, JtFlags::NO_PRIMITIVES)),
                ],
            ),
            args: self.reified_arguments(&[element.clone(), absent]),
            body: Some(vec![JMember::Method(iterator)]),
        };
        Ok(Lowered::boxed(iterable))
    }

    /// The yielded element type, widened to optional when the expected
    /// iterable holds optional elements and the yielded one is not.
    fn comprehension_element(&self, comp: &Comprehension, expected: Option<&Type>) -> Type {
        let yielded = comp.yield_expr.ty.clone();
        let wants_optional = expected
            .and_then(|t| self.model.iterated_type(t))
            .is_some_and(|t| self.model.is_optional(&t));
        if wants_optional && !self.model.is_optional(&yielded) {
            Type::optional(yielded)
        } else {
            yielded
        }
    }

    fn element_type_arg(&self, element: &Type) -> JType {
        self.oracle.java_type(element, JtFlags::TYPE_ARGUMENT)
    }

    fn make_finished(&self) -> JExpr {
        JExpr::path(&self.toplevel_wrapper("finished")).invoke("get_", Vec::new())
    }
}

/// Accumulates the members of the anonymous iterator, clause by clause.
struct IteratorBuilder<'l, 'm, 'c> {
    lowerer: &'l Lowerer<'m>,
    cx: Cx<'c>,
    members: Vec<JMember>,
    init: Option<JStmt>,
    /// Final locals at the top of `next()` copying the iteration fields.
    captures: Vec<JStmt>,
    /// Context method of the innermost clause so far.
    context: Option<String>,
    /// Context method of the innermost `for` clause so far.
    last_item: Option<String>,
}

impl<'l, 'm, 'c> IteratorBuilder<'l, 'm, 'c> {
    fn new(lowerer: &'l Lowerer<'m>, cx: Cx<'c>) -> Self {
        Self { lowerer, cx, members: Vec::new(), init: None, captures: Vec::new(), context: None, last_item: None }
    }

    fn build(mut self, comp: &Comprehension, element: &Type) -> Result<Vec<JMember>, LowerError> {
        for (k, clause) in comp.clauses.iter().enumerate() {
            match clause {
                Clause::For { pattern, iterable } => self.for_clause(k, pattern, iterable)?,
                Clause::If(conditions) => self.if_clause(k, conditions)?,
            }
        }
        let next = self.next_method(&comp.yield_expr, element)?;
        self.members.push(JMember::Method(next));

        let mut members = Vec::with_capacity(self.members.len() + 1);
        if let Some(init) = self.init {
            members.push(JMember::Init(vec![init]));
        }
        members.extend(self.members);
        Ok(members)
    }

    // ── for clauses ──────────────────────────────────────────────

    fn for_clause(&mut self, k: usize, pattern: &ForPattern, iterable: &Expr) -> Result<(), LowerError> {
        let l = self.lowerer;
        let iterator_name = format!("$iterator${k}");
        let iterated = l.model.iterated_type(&iterable.ty).unwrap_or_else(Type::anything);
        let iterable_ty = l
            .model
            .supertype_of(&iterable.ty, names::ITERABLE)
            .unwrap_or_else(|| Type::stream(iterated.clone()));
        let source = l.lower(self.cx, iterable, &Request::boxed(iterable_ty))?;
        let new_iterator = source.expr.invoke("iterator", Vec::new());
        let iterator_ty = JType::generic(
            ITERATOR,
            vec![JTypeArg::Extends(l.oracle.java_type(&iterated, JtFlags::TYPE_ARGUMENT))],
        );

        if k == 0 {
            self.members.push(field(Modifiers::PRIVATE | Modifiers::FINAL, iterator_ty, &iterator_name));
            self.init = Some(JStmt::exec(JExpr::assign(JExpr::ident(&iterator_name), new_iterator)));
        } else {
            self.members.push(field(Modifiers::PRIVATE, iterator_ty, &iterator_name));
            let mut body = Vec::new();
            if let Some(last) = &self.last_item {
                body.push(JStmt::if_then(JExpr::ident(exhausted(last)), JStmt::ret(JExpr::bool(false))));
            }
            body.push(JStmt::if_then(
                JExpr::binary(JBinaryOp::Neq, JExpr::ident(&iterator_name), JExpr::null()),
                JStmt::ret(JExpr::bool(true)),
            ));
            body.push(JStmt::if_then(JExpr::not(self.call_context()?), JStmt::ret(JExpr::bool(false))));
            body.push(JStmt::exec(JExpr::assign(JExpr::ident(&iterator_name), new_iterator)));
            body.push(JStmt::ret(JExpr::bool(true)));
            self.members.push(JMember::Method(boolean_method(&iterator_name, body)));
        }

        let item = l.fresh("item");
        let (item_var, assignments) = match pattern {
            ForPattern::Value { name, ty } => {
                let jt = l.oracle.java_type(ty, JtFlags::NO_PRIMITIVES);
                self.iteration_field(name, jt.clone());
                let assign = JExpr::assign(JExpr::ident(name), JExpr::cast(jt, JExpr::ident(&item)));
                (name.clone(), vec![JStmt::exec(assign)])
            }
            ForPattern::Entry { key, key_ty, item: value, item_ty } => {
                let entry = l.oracle.java_type(&iterated, JtFlags::NO_PRIMITIVES);
                let mut assignments = Vec::with_capacity(2);
                for (name, ty, getter) in [(key, key_ty, "getKey"), (value, item_ty, "getItem")] {
                    let jt = l.oracle.java_type(ty, JtFlags::NO_PRIMITIVES);
                    self.iteration_field(name, jt.clone());
                    let read = JExpr::cast(entry.clone(), JExpr::ident(&item)).invoke(getter, Vec::new());
                    assignments.push(JStmt::exec(JExpr::assign(JExpr::ident(name), JExpr::cast(jt, read))));
                }
                (format!("$kv${key}${value}"), assignments)
            }
        };
        let exhausted_flag = exhausted(&item_var);
        self.members.push(field(Modifiers::PRIVATE, JType::boolean(), &exhausted_flag));

        // final Object item$N = $iterator$k.next();
        // x$exhausted$ = item$N == finished;
        // if (x$exhausted$) { ... } else { x = (T)item$N; return true; }
        let mut advance = vec![
            JStmt::final_var(
                JType::object(),
                &item,
                JExpr::ident(&iterator_name).invoke("next", Vec::new()),
            ),
            JStmt::exec(JExpr::assign(
                JExpr::ident(&exhausted_flag),
                JExpr::binary(JBinaryOp::Eq, JExpr::ident(&item), l.make_finished()),
            )),
        ];
        let on_exhausted = if k == 0 {
            JStmt::ret(JExpr::bool(false))
        } else {
            // restart with a fresh inner iterator for the next outer item
            JStmt::exec(JExpr::assign(JExpr::ident(&iterator_name), JExpr::null()))
        };
        let mut found = assignments;
        found.push(JStmt::ret(JExpr::bool(true)));
        advance.push(JStmt::if_else(
            JExpr::ident(&exhausted_flag),
            JStmt::Block(vec![on_exhausted]),
            JStmt::Block(found),
        ));

        let body = if k == 0 {
            advance
        } else {
            let mut body = vec![JStmt::While {
                cond: JExpr::call(JExpr::path("this").select(&iterator_name), Vec::new()),
                body: Box::new(JStmt::Block(advance)),
            }];
            if let Some(last) = &self.last_item {
                body.push(JStmt::if_then(
                    JExpr::ident(exhausted(last)),
                    JStmt::exec(JExpr::assign(JExpr::ident(&exhausted_flag), JExpr::bool(true))),
                ));
            }
            body.push(JStmt::ret(JExpr::bool(false)));
            body
        };
        self.members.push(JMember::Method(boolean_method(&item_var, body)));
        self.context = Some(item_var.clone());
        self.last_item = Some(item_var);
        Ok(())
    }

    /// A pattern variable held in a field of the iterator, copied into a
    /// final local at the top of `next()`.
    fn iteration_field(&mut self, name: &str, ty: JType) {
        self.members.push(field(Modifiers::PRIVATE, ty.clone(), name));
        self.captures.push(JStmt::final_var(ty, name, JExpr::path("this").select(name)));
        self.lowerer.substitute(name, name, false);
    }

    // ── if clauses ───────────────────────────────────────────────

    fn if_clause(&mut self, k: usize, conditions: &[Condition]) -> Result<(), LowerError> {
        let name = format!("$next${k}");
        let body = match self.last_item.clone() {
            // Filter over a previous `for`: advance it until the conditions hold.
            Some(last) => {
                let label = format!("ifcomp_{k}");
                let previous = self.call_context()?;
                let (decls, tests) = self.conditions(conditions, vec![JStmt::Break(Some(label.clone()))])?;
                let mut inner = vec![JStmt::if_then(JExpr::not(previous), JStmt::Break(Some(label.clone())))];
                inner.extend(decls);
                inner.extend(tests);
                let looped = JStmt::While { cond: JExpr::bool(true), body: Box::new(JStmt::Block(inner)) };
                vec![
                    JStmt::Labelled { label, body: Box::new(looped) },
                    JStmt::ret(JExpr::not(JExpr::ident(exhausted(&last)))),
                ]
            }
            // No iteration yet: the conditions are evaluated once.
            None => {
                let mut pre = Vec::new();
                match self.context.clone() {
                    None => {
                        let flag = exhausted(&name);
                        self.members.push(field(Modifiers::PRIVATE, JType::boolean(), &flag));
                        pre.push(JStmt::if_then(JExpr::ident(&flag), JStmt::ret(JExpr::bool(false))));
                        pre.push(JStmt::exec(JExpr::assign(JExpr::ident(&flag), JExpr::bool(true))));
                    }
                    Some(_) => {
                        pre.push(JStmt::if_then(JExpr::not(self.call_context()?), JStmt::ret(JExpr::bool(false))));
                    }
                }
                let (decls, tests) = self.conditions(conditions, vec![JStmt::ret(JExpr::bool(true))])?;
                pre.extend(decls);
                pre.extend(tests);
                pre.push(JStmt::ret(JExpr::bool(false)));
                pre
            }
        };
        self.members.push(JMember::Method(boolean_method(&name, body)));
        self.context = Some(name);
        Ok(())
    }

    /// Nested `if`s testing each condition in turn with `inside` in the
    /// innermost one, plus the declarations of the test temporaries.
    fn conditions(
        &mut self,
        conditions: &[Condition],
        inside: Vec<JStmt>,
    ) -> Result<(Vec<JStmt>, Vec<JStmt>), LowerError> {
        let mut decls = Vec::new();
        let mut tests = Vec::with_capacity(conditions.len());
        for condition in conditions {
            tests.push(self.condition(condition, &mut decls)?);
        }
        let mut stmts = inside;
        for (test, bind) in tests.into_iter().rev() {
            let mut body: Vec<JStmt> = bind.into_iter().collect();
            body.extend(stmts);
            stmts = vec![JStmt::if_then(test, JStmt::Block(body))];
        }
        Ok((decls, stmts))
    }

    /// The test of one condition and, for a narrowing condition, the
    /// statement binding its variable.
    fn condition(
        &mut self,
        condition: &Condition,
        decls: &mut Vec<JStmt>,
    ) -> Result<(JExpr, Option<JStmt>), LowerError> {
        let l = self.lowerer;
        let (name, ty, expr) = match condition {
            Condition::Boolean(expr) => {
                let test = l.lower(self.cx, expr, &Request::unboxed(Type::boolean()))?;
                return Ok((test.expr, None));
            }
            Condition::Exists { name, ty, expr }
            | Condition::Nonempty { name, ty, expr }
            | Condition::Is { name, ty, expr } => (name, ty, expr),
        };
        // The test is lowered before the variable it introduces is in scope.
        let value = l.lower(self.cx, expr, &Request::boxed(expr.ty.clone()))?;
        let temp = l.fresh(&format!("{name}$tmp"));
        decls.push(JStmt::VarDef { is_final: false, ty: JType::object(), name: temp.clone(), init: None });
        let stored = JExpr::assign(JExpr::ident(&temp), value.expr);
        let test = match condition {
            Condition::Exists { .. } => JExpr::binary(JBinaryOp::Neq, stored, JExpr::null()),
            Condition::Nonempty { .. } => {
                JExpr::InstanceOf { expr: Box::new(stored), ty: JType::class("ceylon.language.Sequence") }
            }
            _ => JExpr::let_expr(vec![JStmt::exec(stored)], l.type_test(JExpr::ident(&temp), ty)),
        };

        let alias = l.fresh(name);
        let jt = l.oracle.java_type(ty, JtFlags::NO_PRIMITIVES);
        let anything = Type::anything();
        let narrowed = l.apply_erasure_and_boxing(
            Lowered::boxed(JExpr::ident(&temp)),
            Source::boxed(&anything),
            &Request::boxed(ty.clone()).with_flags(CastFlags::DOWN_CAST),
        );
        self.members.push(field(Modifiers::PRIVATE, jt.clone(), &alias));
        self.captures.push(JStmt::final_var(jt, &alias, JExpr::path("this").select(&alias)));
        l.substitute(name, alias.clone(), false);
        let bind = JStmt::exec(JExpr::assign(JExpr::ident(&alias), narrowed.expr));
        Ok((test, Some(bind)))
    }

    // ── next() ───────────────────────────────────────────────────

    fn next_method(&mut self, yield_expr: &Expr, element: &Type) -> Result<JMethod, LowerError> {
        let l = self.lowerer;
        let value = l.lower(self.cx, yield_expr, &Request::boxed(element.clone()))?;
        let mut found = std::mem::take(&mut self.captures);
        found.push(JStmt::ret(value.expr));
        let body = vec![JStmt::if_else(
            self.call_context()?,
            JStmt::Block(found),
            JStmt::ret(l.make_finished()),
        )];
        Ok(JMethod {
            modifiers: Modifiers::PUBLIC | Modifiers::FINAL,
            name: "next".to_string(),
            result: Some(JType::object()),
            params: Vec::new(),
            body,
        })
    }

    fn call_context(&self) -> Result<JExpr, LowerError> {
        let name = self
            .context
            .as_ref()
            .ok_or_else(|| LowerError::internal("comprehension has no clause to iterate"))?;
        Ok(JExpr::call(JExpr::path("this").select(name), Vec::new()))
    }
}

fn exhausted(name: &str) -> String {
    format!("{name}$exhausted$")
}

fn field(modifiers: Modifiers, ty: JType, name: &str) -> JMember {
    JMember::Field { modifiers, ty, name: name.to_string(), init: None }
}

fn boolean_method(name: &str, body: Vec<JStmt>) -> JMethod {
    JMethod {
        modifiers: Modifiers::PRIVATE | Modifiers::FINAL,
        name: name.to_string(),
        result: Some(JType::boolean()),
        params: Vec::new(),
        body,
    }
}
