//! Read-only traversal of the target tree.
//!
//! Implement `Visitor`, override the methods you care about and call the
//! matching `walk_*` function to keep recursing.

use super::{JExpr, JMember, JStmt};
use crate::diagnostics::Diagnostic;

pub trait Visitor: Sized {
    fn visit_expr(&mut self, expr: &JExpr) {
        walk_expr(self, expr);
    }

    fn visit_stmt(&mut self, stmt: &JStmt) {
        walk_stmt(self, stmt);
    }

    fn visit_member(&mut self, member: &JMember) {
        walk_member(self, member);
    }
}

pub fn walk_expr<V: Visitor>(v: &mut V, expr: &JExpr) {
    match expr {
        JExpr::Literal(_) | JExpr::Ident(_) | JExpr::QualifiedThis(_) | JExpr::Erroneous { .. } => {}
        JExpr::Select { target, .. } => v.visit_expr(target),
        JExpr::Apply { method, args, .. } => {
            v.visit_expr(method);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        JExpr::NewClass { outer, args, body, .. } => {
            if let Some(outer) = outer {
                v.visit_expr(outer);
            }
            for arg in args {
                v.visit_expr(arg);
            }
            for member in body.iter().flatten() {
                v.visit_member(member);
            }
        }
        JExpr::NewArray { dims, elems, .. } => {
            for d in dims {
                v.visit_expr(d);
            }
            for e in elems.iter().flatten() {
                v.visit_expr(e);
            }
        }
        JExpr::TypeCast { expr, .. } | JExpr::InstanceOf { expr, .. } => v.visit_expr(expr),
        JExpr::Unary { operand, .. } => v.visit_expr(operand),
        JExpr::Binary { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        JExpr::Conditional { cond, then, otherwise } => {
            v.visit_expr(cond);
            v.visit_expr(then);
            v.visit_expr(otherwise);
        }
        JExpr::Assign { target, value } | JExpr::AssignOp { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        JExpr::Let { defs, expr } => {
            for def in defs {
                v.visit_stmt(def);
            }
            v.visit_expr(expr);
        }
    }
}

pub fn walk_stmt<V: Visitor>(v: &mut V, stmt: &JStmt) {
    match stmt {
        JStmt::VarDef { init, .. } => {
            if let Some(init) = init {
                v.visit_expr(init);
            }
        }
        JStmt::Exec(expr) => v.visit_expr(expr),
        JStmt::If { cond, then, otherwise } => {
            v.visit_expr(cond);
            v.visit_stmt(then);
            if let Some(otherwise) = otherwise {
                v.visit_stmt(otherwise);
            }
        }
        JStmt::While { cond, body } => {
            v.visit_expr(cond);
            v.visit_stmt(body);
        }
        JStmt::Labelled { body, .. } => v.visit_stmt(body),
        JStmt::Break(_) => {}
        JStmt::Return(expr) => {
            if let Some(expr) = expr {
                v.visit_expr(expr);
            }
        }
        JStmt::Block(stmts) => {
            for s in stmts {
                v.visit_stmt(s);
            }
        }
    }
}

pub fn walk_member<V: Visitor>(v: &mut V, member: &JMember) {
    match member {
        JMember::Field { init, .. } => {
            if let Some(init) = init {
                v.visit_expr(init);
            }
        }
        JMember::Method(method) => {
            for s in &method.body {
                v.visit_stmt(s);
            }
        }
        JMember::Init(stmts) => {
            for s in stmts {
                v.visit_stmt(s);
            }
        }
    }
}

/// Collects `Erroneous` placeholders in source order.
#[derive(Default)]
pub struct ErrorCollector {
    pub errors: Vec<Diagnostic>,
}

impl Visitor for ErrorCollector {
    fn visit_expr(&mut self, expr: &JExpr) {
        if let JExpr::Erroneous { message, span } = expr {
            self.errors.push(Diagnostic::new(message.clone(), *span));
        }
        walk_expr(self, expr);
    }
}

/// Counts the nodes matching a predicate. Used by tests and benchmarks.
pub struct Counter<F: Fn(&JExpr) -> bool> {
    pred: F,
    pub count: usize,
}

impl<F: Fn(&JExpr) -> bool> Counter<F> {
    pub fn new(pred: F) -> Self {
        Self { pred, count: 0 }
    }
}

impl<F: Fn(&JExpr) -> bool> Visitor for Counter<F> {
    fn visit_expr(&mut self, expr: &JExpr) {
        if (self.pred)(expr) {
            self.count += 1;
        }
        walk_expr(self, expr);
    }
}

/// Number of nodes in `expr` for which `pred` holds.
pub fn count(expr: &JExpr, pred: impl Fn(&JExpr) -> bool) -> usize {
    let mut counter = Counter::new(pred);
    counter.visit_expr(expr);
    counter.count
}
