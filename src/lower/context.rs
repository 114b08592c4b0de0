//! Context threaded down the lowering recursion, and the shapes of a
//! lowering request and result.
//!
//! `Cx` is `Copy`: a scoped override is a builder call that returns a
//! modified copy, and the caller's context is untouched once the callee
//! returns.

use crate::ir::JExpr;
use crate::model::{BoxingStrategy, Parameter, Type};
use crate::span::Span;

/// Where the expression being lowered lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope<'a> {
    /// Enclosing class or interface.
    pub class: Option<&'a str>,
    /// The enclosing type is an interface, so member code ends up in its
    /// companion class.
    pub in_interface: bool,
    /// Inside a function, method or initializer body.
    pub local: bool,
    /// Key of the enclosing function or method.
    pub function: Option<&'a str>,
}

impl<'a> Scope<'a> {
    pub fn toplevel() -> Self {
        Self::default()
    }

    pub fn in_class(class: &'a str) -> Self {
        Self { class: Some(class), ..Self::default() }
    }

    pub fn in_interface(interface: &'a str) -> Self {
        Self { class: Some(interface), in_interface: true, ..Self::default() }
    }

    pub fn in_function(mut self, key: &'a str) -> Self {
        self.function = Some(key);
        self.local = true;
        self
    }

    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Cx<'a> {
    /// Lowering the primary of an invocation, so a member reference must
    /// not be wrapped as a callable value.
    pub within_invocation: bool,
    /// Lowering the arguments of `super(...)` for this class.
    pub within_super_invocation: Option<&'a str>,
    /// Lowering a default parameter expression declared by this type.
    pub within_default_param_expr: Option<&'a str>,
    /// Inside an anonymous class the lowering synthesized (callable or
    /// comprehension iterator).
    pub within_synthetic_class_body: bool,
    /// Directly under an expression statement; the value is discarded.
    pub in_statement: bool,
    /// An unconstructed instance is on the evaluation stack.
    pub uninitialized_operand: bool,
    pub scope: Scope<'a>,
}

impl<'a> Cx<'a> {
    pub fn new(scope: Scope<'a>) -> Self {
        Self { scope, ..Self::default() }
    }

    pub fn within_invocation(mut self, within: bool) -> Self {
        self.within_invocation = within;
        self
    }

    pub fn within_super_invocation(mut self, class: Option<&'a str>) -> Self {
        self.within_super_invocation = class;
        self
    }

    pub fn within_default_param_expr(mut self, owner: Option<&'a str>) -> Self {
        self.within_default_param_expr = owner;
        self
    }

    pub fn in_synthetic_body(mut self) -> Self {
        self.within_synthetic_class_body = true;
        self
    }

    pub fn statement(mut self) -> Self {
        self.in_statement = true;
        self
    }

    pub fn expression(mut self) -> Self {
        self.in_statement = false;
        self
    }

    /// Once set, the marker stays set for the whole subtree.
    pub fn with_uninitialized_operand(mut self, uninitialized: bool) -> Self {
        self.uninitialized_operand |= uninitialized;
        self
    }
}

/// Extra facts about the expected type that change how casts are made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CastFlags(u8);

impl CastFlags {
    pub const NONE: CastFlags = CastFlags(0);
    /// The caller narrows the static type on purpose (`of`, `is`).
    pub const DOWN_CAST: CastFlags = CastFlags(1);
    /// The expected type is known to keep its type arguments in the target.
    pub const NOT_RAW: CastFlags = CastFlags(2);
    pub const CONSTRAINED_TYPE_PARAMS: CastFlags = CastFlags(4);
    pub const DEPENDENT_COVARIANT_TYPE_PARAMS: CastFlags = CastFlags(8);
    /// The value was wrapped in a runtime null check and is definitely
    /// not null.
    pub const NULL_CHECKED: CastFlags = CastFlags(16);
    /// The value is used as the receiver of a companion member.
    pub const WANTS_COMPANION: CastFlags = CastFlags(32);

    pub fn contains(self, other: CastFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn without(self, other: CastFlags) -> CastFlags {
        CastFlags(self.0 & !other.0)
    }

    /// Flags implied by the declared type of a parameter.
    pub fn for_parameter(param: &Parameter) -> CastFlags {
        let mut flags = CastFlags::NONE;
        if param.flags.not_raw {
            flags = flags | CastFlags::NOT_RAW;
        }
        if param.flags.constrained_type_params {
            flags = flags | CastFlags::CONSTRAINED_TYPE_PARAMS;
        }
        if param.flags.dependent_covariant_type_params {
            flags = flags | CastFlags::DEPENDENT_COVARIANT_TYPE_PARAMS;
        }
        flags
    }
}

impl std::ops::BitOr for CastFlags {
    type Output = CastFlags;

    fn bitor(self, rhs: CastFlags) -> CastFlags {
        CastFlags(self.0 | rhs.0)
    }
}

/// What the caller wants back: a representation, optionally a static type,
/// and cast flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub boxing: BoxingStrategy,
    pub expected: Option<Type>,
    pub flags: CastFlags,
}

impl Request {
    pub fn new(boxing: BoxingStrategy, expected: Option<Type>) -> Self {
        Self { boxing, expected, flags: CastFlags::NONE }
    }

    pub fn boxed(expected: Type) -> Self {
        Self::new(BoxingStrategy::Boxed, Some(expected))
    }

    pub fn unboxed(expected: Type) -> Self {
        Self::new(BoxingStrategy::Unboxed, Some(expected))
    }

    /// Any representation, no expected type. Used for discarded values.
    pub fn indifferent() -> Self {
        Self::new(BoxingStrategy::Indifferent, None)
    }

    pub fn with_flags(mut self, flags: CastFlags) -> Self {
        self.flags = self.flags | flags;
        self
    }

    /// Request matching a parameter declaration.
    pub fn for_parameter(param: &Parameter, ty: Type) -> Self {
        Self::new(param.boxing, Some(ty)).with_flags(CastFlags::for_parameter(param))
    }
}

/// Result of lowering one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Lowered {
    pub expr: JExpr,
    /// `expr` evaluates to the unboxed representation.
    pub unboxed: bool,
    /// A node in this subtree loops while an unconstructed instance is on
    /// the evaluation stack. Propagates upwards to the nearest
    /// instantiation or super invocation.
    pub backward_branch: Option<Span>,
}

impl Lowered {
    pub fn new(expr: JExpr, unboxed: bool) -> Self {
        Self { expr, unboxed, backward_branch: None }
    }

    pub fn boxed(expr: JExpr) -> Self {
        Self::new(expr, false)
    }

    pub fn unboxed(expr: JExpr) -> Self {
        Self::new(expr, true)
    }

    pub fn erroneous(message: impl Into<String>, span: Span) -> Self {
        Self::boxed(JExpr::erroneous(message, span))
    }

    pub fn with_branch(mut self, branch: Option<Span>) -> Self {
        self.backward_branch = self.backward_branch.or(branch);
        self
    }

    pub fn map(self, f: impl FnOnce(JExpr) -> JExpr) -> Self {
        Self { expr: f(self.expr), ..self }
    }
}

/// The first backward branch among several child results.
pub fn first_branch<'l>(results: impl IntoIterator<Item = &'l Option<Span>>) -> Option<Span> {
    results.into_iter().find_map(|b| *b)
}
