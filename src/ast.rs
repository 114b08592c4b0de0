//! The typed expression tree handed over by the type checker.
//!
//! Every node has already been resolved: it carries its static type, the
//! key of the declaration it refers to (if any) and the representation
//! flags the boxing analysis attached to it.

use serde::{Deserialize, Serialize};

use crate::model::{Parameter, Type};
use crate::span::Span;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
    #[serde(default)]
    pub span: Span,
    /// The value is held in its unboxed representation.
    #[serde(default)]
    pub unboxed: bool,
    /// The target type of the value was forcibly erased.
    #[serde(default)]
    pub type_erased: bool,
    /// The target type of the value cannot be trusted.
    #[serde(default)]
    pub untrusted_type: bool,
    /// The value comes from a foreign, null-permitting origin.
    #[serde(default)]
    pub unchecked_nulls: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Natural(String),
    Float(String),
    Char(char),
    Str(String),
    /// Alternating literal fragments and interpolated expressions.
    StringTemplate(Vec<Expr>),
    /// Parentheses.
    Group(Box<Expr>),

    BaseMember {
        decl: String,
        #[serde(default)]
        type_args: Vec<Type>,
    },
    QualifiedMember {
        receiver: Box<Expr>,
        decl: String,
        #[serde(default)]
        op: MemberOp,
        #[serde(default)]
        type_args: Vec<Type>,
    },
    /// Reference to a class, used as the primary of an instantiation.
    BaseType {
        decl: String,
        #[serde(default)]
        type_args: Vec<Type>,
    },
    QualifiedType {
        receiver: Box<Expr>,
        decl: String,
        #[serde(default)]
        type_args: Vec<Type>,
    },
    This,
    Super,
    Outer,

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Is {
        operand: Box<Expr>,
        target: Type,
        #[serde(default)]
        negated: bool,
    },
    /// `x of T`; the node type is `T`.
    Of(Box<Expr>),
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    CompoundAssign {
        op: BinaryOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Prefix {
        op: IncDec,
        target: Box<Expr>,
    },
    Postfix {
        op: IncDec,
        target: Box<Expr>,
    },
    Within {
        lower: Box<Expr>,
        middle: Box<Expr>,
        upper: Box<Expr>,
        lower_bound: Bound,
        upper_bound: Bound,
    },
    Index {
        primary: Box<Expr>,
        index: IndexKind,
    },

    Invocation {
        primary: Box<Expr>,
        args: Arguments,
    },
    /// `[a, b, *c]`
    Tuple(Vec<PositionalArg>),
    /// `{ a, b, *c }`
    SequenceEnum(Vec<PositionalArg>),
    Comprehension(Comprehension),
    FunctionLiteral {
        params: Vec<Parameter>,
        body: Box<Expr>,
    },

    /// Dynamic blocks have no JVM lowering.
    Dynamic,
    /// Metamodel literals have no JVM lowering.
    MetaLiteral(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MemberOp {
    /// `x.m`
    #[default]
    Normal,
    /// `x?.m`
    Safe,
    /// `xs*.m`
    Spread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// `<=>`
    Compare,
    Eq,
    Neq,
    /// `===`
    Identical,
    And,
    Or,
    /// `|` on sets
    Union,
    /// `&` on sets
    Intersection,
    /// `~` on sets
    Complement,
    Else,
    Then,
    In,
    /// `->`
    Entry,
    /// `..`
    Span,
    /// `:`
    Measure,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Compare => "<=>",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Identical => "===",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Union => "|",
            BinaryOp::Intersection => "&",
            BinaryOp::Complement => "~",
            BinaryOp::Else => "else",
            BinaryOp::Then => "then",
            BinaryOp::In => "in",
            BinaryOp::Entry => "->",
            BinaryOp::Span => "..",
            BinaryOp::Measure => ":",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
    Exists,
    Nonempty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncDec {
    Inc,
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bound {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexKind {
    Element(Box<Expr>),
    Span { from: Box<Expr>, to: Box<Expr> },
    SpanFrom(Box<Expr>),
    SpanTo(Box<Expr>),
    Measure { from: Box<Expr>, length: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Arguments {
    Positional(Vec<PositionalArg>),
    Named(NamedArgs),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PositionalArg {
    Plain(Expr),
    /// `*xs`
    Spread(Expr),
    /// A trailing comprehension argument; the expression is a
    /// `Comprehension` node.
    Comprehension(Expr),
}

impl PositionalArg {
    pub fn expr(&self) -> &Expr {
        match self {
            PositionalArg::Plain(e) | PositionalArg::Spread(e) | PositionalArg::Comprehension(e) => e,
        }
    }

    pub fn is_spread(&self) -> bool {
        matches!(self, PositionalArg::Spread(_) | PositionalArg::Comprehension(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedArgs {
    pub named: Vec<NamedArg>,
    /// Trailing positional arguments bound to the variadic parameter.
    #[serde(default)]
    pub sequenced: Option<Vec<PositionalArg>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedArg {
    /// Name of the parameter this argument is bound to.
    pub param: String,
    /// A specified value, or a `FunctionLiteral` for a named function
    /// argument.
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comprehension {
    pub clauses: Vec<Clause>,
    pub yield_expr: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Clause {
    For { pattern: ForPattern, iterable: Expr },
    If(Vec<Condition>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForPattern {
    Value { name: String, ty: Type },
    Entry { key: String, key_ty: Type, item: String, item_ty: Type },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Boolean(Expr),
    /// `exists x = expr`
    Exists { name: String, ty: Type, expr: Expr },
    /// `nonempty x = expr`
    Nonempty { name: String, ty: Type, expr: Expr },
    /// `is T x = expr`
    Is { name: String, ty: Type, expr: Expr },
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Type) -> Self {
        Self {
            kind,
            ty,
            span: Span::dummy(),
            unboxed: false,
            type_erased: false,
            untrusted_type: false,
            unchecked_nulls: false,
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn unboxed(mut self) -> Self {
        self.unboxed = true;
        self
    }

    pub fn erased(mut self) -> Self {
        self.type_erased = true;
        self
    }

    pub fn untrusted(mut self) -> Self {
        self.untrusted_type = true;
        self
    }

    pub fn with_unchecked_nulls(mut self) -> Self {
        self.unchecked_nulls = true;
        self
    }

    pub fn natural(text: impl Into<String>) -> Self {
        Expr::new(ExprKind::Natural(text.into()), Type::integer()).unboxed()
    }

    pub fn float(text: impl Into<String>) -> Self {
        Expr::new(ExprKind::Float(text.into()), Type::float()).unboxed()
    }

    pub fn string(text: impl Into<String>) -> Self {
        Expr::new(ExprKind::Str(text.into()), Type::string()).unboxed()
    }

    pub fn member(decl: impl Into<String>, ty: Type) -> Self {
        Expr::new(ExprKind::BaseMember { decl: decl.into(), type_args: Vec::new() }, ty)
    }

    pub fn qualified(receiver: Expr, decl: impl Into<String>, ty: Type) -> Self {
        Expr::new(
            ExprKind::QualifiedMember {
                receiver: Box::new(receiver),
                decl: decl.into(),
                op: MemberOp::Normal,
                type_args: Vec::new(),
            },
            ty,
        )
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr, ty: Type) -> Self {
        Expr::new(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) }, ty)
    }

    pub fn unary(op: UnaryOp, operand: Expr, ty: Type) -> Self {
        Expr::new(ExprKind::Unary { op, operand: Box::new(operand) }, ty)
    }

    pub fn invoke(primary: Expr, args: Vec<Expr>, ty: Type) -> Self {
        Expr::new(
            ExprKind::Invocation {
                primary: Box::new(primary),
                args: Arguments::Positional(args.into_iter().map(PositionalArg::Plain).collect()),
            },
            ty,
        )
    }

    pub fn invoke_with(primary: Expr, args: Arguments, ty: Type) -> Self {
        Expr::new(ExprKind::Invocation { primary: Box::new(primary), args }, ty)
    }

    /// Strip grouping parentheses.
    pub fn unparenthesized(&self) -> &Expr {
        match &self.kind {
            ExprKind::Group(inner) => inner.unparenthesized(),
            _ => self,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.unparenthesized().kind,
            ExprKind::Natural(_) | ExprKind::Float(_) | ExprKind::Char(_) | ExprKind::Str(_)
        )
    }

    /// Short name of the node kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Natural(_) => "NaturalLiteral",
            ExprKind::Float(_) => "FloatLiteral",
            ExprKind::Char(_) => "CharLiteral",
            ExprKind::Str(_) => "StringLiteral",
            ExprKind::StringTemplate(_) => "StringTemplate",
            ExprKind::Group(_) => "Expression",
            ExprKind::BaseMember { .. } => "BaseMemberExpression",
            ExprKind::QualifiedMember { .. } => "QualifiedMemberExpression",
            ExprKind::BaseType { .. } => "BaseTypeExpression",
            ExprKind::QualifiedType { .. } => "QualifiedTypeExpression",
            ExprKind::This => "This",
            ExprKind::Super => "Super",
            ExprKind::Outer => "Outer",
            ExprKind::Binary { .. } => "BinaryOperatorExpression",
            ExprKind::Unary { .. } => "UnaryOperatorExpression",
            ExprKind::Is { .. } => "IsOp",
            ExprKind::Of(_) => "OfOp",
            ExprKind::Assign { .. } => "AssignOp",
            ExprKind::CompoundAssign { .. } => "CompoundAssignmentOp",
            ExprKind::Prefix { .. } => "PrefixOperatorExpression",
            ExprKind::Postfix { .. } => "PostfixOperatorExpression",
            ExprKind::Within { .. } => "WithinOp",
            ExprKind::Index { .. } => "IndexExpression",
            ExprKind::Invocation { .. } => "InvocationExpression",
            ExprKind::Tuple(_) => "Tuple",
            ExprKind::SequenceEnum(_) => "SequenceEnumeration",
            ExprKind::Comprehension(_) => "Comprehension",
            ExprKind::FunctionLiteral { .. } => "FunctionArgument",
            ExprKind::Dynamic => "Dynamic",
            ExprKind::MetaLiteral(_) => "MetaLiteral",
        }
    }
}
