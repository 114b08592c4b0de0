//! The target tree: a javac-shaped expression and statement IR.

pub mod printer;
pub mod visit;

use crate::diagnostics::Diagnostic;
use crate::model::Prim;
use crate::span::Span;

pub use printer::{print_expr, print_member, print_stmt, print_type};

#[derive(Debug, Clone, PartialEq)]
pub enum JType {
    Prim(Prim),
    /// A named class or interface, possibly parameterised.
    Class { name: String, args: Vec<JTypeArg> },
    Array(Box<JType>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JTypeArg {
    Type(JType),
    /// `?`
    Wildcard,
    /// `? extends T`
    Extends(JType),
    /// `? super T`
    Super(JType),
}

impl JType {
    pub fn class(name: impl Into<String>) -> JType {
        JType::Class { name: name.into(), args: Vec::new() }
    }

    pub fn generic(name: impl Into<String>, args: Vec<JTypeArg>) -> JType {
        JType::Class { name: name.into(), args }
    }

    pub fn object() -> JType {
        JType::class("java.lang.Object")
    }

    pub fn boolean() -> JType {
        JType::Prim(Prim::Boolean)
    }

    pub fn long() -> JType {
        JType::Prim(Prim::Long)
    }

    pub fn array_of(element: JType) -> JType {
        JType::Array(Box::new(element))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, JType::Prim(_))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            JType::Class { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The same class without type arguments.
    pub fn raw(&self) -> JType {
        match self {
            JType::Class { name, .. } => JType::class(name.clone()),
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    /// A code point.
    Char(u32),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JUnaryOp {
    Neg,
    Pos,
    Not,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JBinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    Neq,
    And,
    Or,
}

impl JBinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            JBinaryOp::Add => "+",
            JBinaryOp::Sub => "-",
            JBinaryOp::Mul => "*",
            JBinaryOp::Div => "/",
            JBinaryOp::Rem => "%",
            JBinaryOp::Lt => "<",
            JBinaryOp::LtEq => "<=",
            JBinaryOp::Gt => ">",
            JBinaryOp::GtEq => ">=",
            JBinaryOp::Eq => "==",
            JBinaryOp::Neq => "!=",
            JBinaryOp::And => "&&",
            JBinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JExpr {
    Literal(Literal),
    Ident(String),
    Select {
        target: Box<JExpr>,
        name: String,
    },
    Apply {
        type_args: Vec<JType>,
        method: Box<JExpr>,
        args: Vec<JExpr>,
    },
    NewClass {
        outer: Option<Box<JExpr>>,
        class: JType,
        args: Vec<JExpr>,
        body: Option<Vec<JMember>>,
    },
    NewArray {
        element: JType,
        dims: Vec<JExpr>,
        elems: Option<Vec<JExpr>>,
    },
    TypeCast {
        ty: JType,
        expr: Box<JExpr>,
    },
    InstanceOf {
        expr: Box<JExpr>,
        ty: JType,
    },
    Unary {
        op: JUnaryOp,
        operand: Box<JExpr>,
    },
    Binary {
        op: JBinaryOp,
        left: Box<JExpr>,
        right: Box<JExpr>,
    },
    Conditional {
        cond: Box<JExpr>,
        then: Box<JExpr>,
        otherwise: Box<JExpr>,
    },
    Assign {
        target: Box<JExpr>,
        value: Box<JExpr>,
    },
    AssignOp {
        op: JBinaryOp,
        target: Box<JExpr>,
        value: Box<JExpr>,
    },
    /// Statements evaluated in order, followed by a value.
    Let {
        defs: Vec<JStmt>,
        expr: Box<JExpr>,
    },
    /// `Outer.this`
    QualifiedThis(String),
    /// Placeholder for a node that could not be lowered.
    Erroneous {
        message: String,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum JStmt {
    VarDef {
        is_final: bool,
        ty: JType,
        name: String,
        init: Option<JExpr>,
    },
    Exec(JExpr),
    If {
        cond: JExpr,
        then: Box<JStmt>,
        otherwise: Option<Box<JStmt>>,
    },
    While {
        cond: JExpr,
        body: Box<JStmt>,
    },
    Labelled {
        label: String,
        body: Box<JStmt>,
    },
    Break(Option<String>),
    Return(Option<JExpr>),
    Block(Vec<JStmt>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const PUBLIC: Modifiers = Modifiers(1);
    pub const PRIVATE: Modifiers = Modifiers(2);
    pub const STATIC: Modifiers = Modifiers(4);
    pub const FINAL: Modifiers = Modifiers(8);

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn keywords(self) -> Vec<&'static str> {
        [
            (Modifiers::PUBLIC, "public"),
            (Modifiers::PRIVATE, "private"),
            (Modifiers::STATIC, "static"),
            (Modifiers::FINAL, "final"),
        ]
        .into_iter()
        .filter(|(m, _)| self.contains(*m))
        .map(|(_, kw)| kw)
        .collect()
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JMethod {
    pub modifiers: Modifiers,
    pub name: String,
    /// `None` for `void`.
    pub result: Option<JType>,
    pub params: Vec<(JType, String)>,
    pub body: Vec<JStmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JMember {
    Field {
        modifiers: Modifiers,
        ty: JType,
        name: String,
        init: Option<JExpr>,
    },
    Method(JMethod),
    Init(Vec<JStmt>),
}

// ── builders ─────────────────────────────────────────────────────

impl JExpr {
    pub fn null() -> JExpr {
        JExpr::Literal(Literal::Null)
    }

    pub fn bool(value: bool) -> JExpr {
        JExpr::Literal(Literal::Bool(value))
    }

    pub fn long(value: i64) -> JExpr {
        JExpr::Literal(Literal::Long(value))
    }

    pub fn int(value: i32) -> JExpr {
        JExpr::Literal(Literal::Int(value))
    }

    pub fn string(value: impl Into<String>) -> JExpr {
        JExpr::Literal(Literal::String(value.into()))
    }

    pub fn ident(name: impl Into<String>) -> JExpr {
        JExpr::Ident(name.into())
    }

    /// A dotted path such as `ceylon.language.Integer`.
    pub fn path(dotted: &str) -> JExpr {
        let mut parts = dotted.split('.');
        let first = JExpr::ident(parts.next().unwrap_or_default());
        parts.fold(first, |acc, part| acc.select(part))
    }

    pub fn select(self, name: impl Into<String>) -> JExpr {
        JExpr::Select { target: Box::new(self), name: name.into() }
    }

    /// `self.name(args)`
    pub fn invoke(self, name: impl Into<String>, args: Vec<JExpr>) -> JExpr {
        JExpr::call(self.select(name), args)
    }

    /// `method(args)` where `method` is an identifier or a selection.
    pub fn call(method: JExpr, args: Vec<JExpr>) -> JExpr {
        JExpr::Apply { type_args: Vec::new(), method: Box::new(method), args }
    }

    pub fn cast(ty: JType, expr: JExpr) -> JExpr {
        JExpr::TypeCast { ty, expr: Box::new(expr) }
    }

    pub fn unary(op: JUnaryOp, operand: JExpr) -> JExpr {
        JExpr::Unary { op, operand: Box::new(operand) }
    }

    pub fn not(operand: JExpr) -> JExpr {
        JExpr::unary(JUnaryOp::Not, operand)
    }

    pub fn binary(op: JBinaryOp, left: JExpr, right: JExpr) -> JExpr {
        JExpr::Binary { op, left: Box::new(left), right: Box::new(right) }
    }

    pub fn conditional(cond: JExpr, then: JExpr, otherwise: JExpr) -> JExpr {
        JExpr::Conditional { cond: Box::new(cond), then: Box::new(then), otherwise: Box::new(otherwise) }
    }

    pub fn assign(target: JExpr, value: JExpr) -> JExpr {
        JExpr::Assign { target: Box::new(target), value: Box::new(value) }
    }

    pub fn new_class(class: JType, args: Vec<JExpr>) -> JExpr {
        JExpr::NewClass { outer: None, class, args, body: None }
    }

    pub fn let_expr(defs: Vec<JStmt>, expr: JExpr) -> JExpr {
        if defs.is_empty() {
            return expr;
        }
        JExpr::Let { defs, expr: Box::new(expr) }
    }

    pub fn erroneous(message: impl Into<String>, span: Span) -> JExpr {
        JExpr::Erroneous { message: message.into(), span }
    }

    pub fn is_erroneous(&self) -> bool {
        matches!(self, JExpr::Erroneous { .. })
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self, JExpr::Literal(Literal::Null))
    }
}

impl JStmt {
    pub fn var(ty: JType, name: impl Into<String>, init: JExpr) -> JStmt {
        JStmt::VarDef { is_final: false, ty, name: name.into(), init: Some(init) }
    }

    pub fn final_var(ty: JType, name: impl Into<String>, init: JExpr) -> JStmt {
        JStmt::VarDef { is_final: true, ty, name: name.into(), init: Some(init) }
    }

    pub fn exec(expr: JExpr) -> JStmt {
        JStmt::Exec(expr)
    }

    pub fn if_then(cond: JExpr, then: JStmt) -> JStmt {
        JStmt::If { cond, then: Box::new(then), otherwise: None }
    }

    pub fn if_else(cond: JExpr, then: JStmt, otherwise: JStmt) -> JStmt {
        JStmt::If { cond, then: Box::new(then), otherwise: Some(Box::new(otherwise)) }
    }

    pub fn ret(expr: JExpr) -> JStmt {
        JStmt::Return(Some(expr))
    }
}

/// Every placeholder in a lowered expression, as diagnostics.
pub fn errors(expr: &JExpr) -> Vec<Diagnostic> {
    let mut collector = visit::ErrorCollector::default();
    visit::Visitor::visit_expr(&mut collector, expr);
    collector.errors
}

/// Every placeholder in a lowered statement, as diagnostics.
pub fn stmt_errors(stmt: &JStmt) -> Vec<Diagnostic> {
    let mut collector = visit::ErrorCollector::default();
    visit::Visitor::visit_stmt(&mut collector, stmt);
    collector.errors
}
