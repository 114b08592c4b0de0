use serde::{Deserialize, Serialize};

use super::types::Type;
use crate::ast::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Variance {
    #[default]
    Invariant,
    Covariant,
    Contravariant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: String,
    #[serde(default)]
    pub variance: Variance,
    /// Upper bounds (`satisfies` constraints).
    #[serde(default)]
    pub bounds: Vec<Type>,
}

impl TypeParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), variance: Variance::Invariant, bounds: Vec::new() }
    }

    pub fn covariant(name: impl Into<String>) -> Self {
        Self { variance: Variance::Covariant, ..Self::new(name) }
    }

    pub fn contravariant(name: impl Into<String>) -> Self {
        Self { variance: Variance::Contravariant, ..Self::new(name) }
    }

    pub fn bounded(mut self, bound: Type) -> Self {
        self.bounds.push(bound);
        self
    }

    pub fn is_variant(&self) -> bool {
        self.variance != Variance::Invariant
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeKind {
    Class,
    Interface,
    /// A type alias, expanded by `Model::resolve_aliases`.
    Alias(Type),
}

/// Where a declaration lives.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Container {
    #[default]
    Toplevel,
    /// Member of the named class or interface.
    Type(String),
    /// Local to a function, method or initializer body.
    Local { owner: Option<String>, in_initializer: bool },
}

impl Container {
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Container::Type(name) => Some(name),
            Container::Local { owner, .. } => owner.as_deref(),
            Container::Toplevel => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeFlags {
    pub shared: bool,
    /// Declared inside a function body, or nested in such a declaration.
    pub ancestor_local: bool,
    pub anonymous: bool,
    /// A foreign array type such as `ObjectArray<T>`.
    pub java_array: bool,
    /// Construction goes through a generated instantiator method.
    pub generate_instantiator: bool,
    /// The instantiator is declared with an erased return type.
    pub untyped_instantiator: bool,
    /// Generic instances take reified type descriptors.
    pub reified: bool,
    /// Has an unboxed target representation (`long`, `double`, ...).
    pub value_type: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    /// Qualified target name, e.g. `ceylon.language.Integer`.
    pub java_name: String,
    pub kind: TypeKind,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    #[serde(default)]
    pub extended: Option<Type>,
    #[serde(default)]
    pub satisfied: Vec<Type>,
    /// Name of the self-type parameter, as in `Comparable<Other> of Other`.
    #[serde(default)]
    pub self_type: Option<String>,
    #[serde(default)]
    pub container: Container,
    #[serde(default)]
    pub flags: TypeFlags,
    /// Initializer parameters, for classes.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl TypeDecl {
    pub fn class(name: impl Into<String>, java_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            java_name: java_name.into(),
            kind: TypeKind::Class,
            type_params: Vec::new(),
            extended: None,
            satisfied: Vec::new(),
            self_type: None,
            container: Container::Toplevel,
            flags: TypeFlags { shared: true, ..TypeFlags::default() },
            parameters: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<String>, java_name: impl Into<String>) -> Self {
        Self { kind: TypeKind::Interface, ..Self::class(name, java_name) }
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface)
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, TypeKind::Class)
    }

    pub fn is_toplevel(&self) -> bool {
        self.container == Container::Toplevel
    }

    /// The declaration applied to its own type parameters.
    pub fn own_type(&self) -> Type {
        Type::class(
            self.name.clone(),
            self.type_params.iter().map(|tp| Type::param(tp.name.clone())).collect(),
        )
    }

    pub fn type_param_index(&self, name: &str) -> Option<usize> {
        self.type_params.iter().position(|tp| tp.name == name)
    }
}

/// Declared representation of a value or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoxingStrategy {
    Boxed,
    Unboxed,
    /// Either representation is acceptable; keep whatever the expression has.
    Indifferent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variadic {
    /// `T*`, zero or more.
    Star,
    /// `T+`, one or more.
    Plus,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ParamDefault {
    #[default]
    Required,
    /// Computed by the generated default-value method.
    Defaulted,
    /// A defaulted variadic parameter whose default is the empty sequence.
    DefaultedEmpty,
    /// A default that is a literal and is substituted directly.
    Inline(Expr),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamFlags {
    /// The parameter type is known not to be raw in the target.
    pub not_raw: bool,
    pub constrained_type_params: bool,
    pub dependent_covariant_type_params: bool,
    /// Foreign `T...` parameter, which takes a native array.
    pub java_variadic: bool,
    /// The parameter is a functional parameter (`Integer f(Integer x)`).
    pub functional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
    pub boxing: BoxingStrategy,
    #[serde(default)]
    pub default: ParamDefault,
    #[serde(default)]
    pub variadic: Option<Variadic>,
    #[serde(default)]
    pub flags: ParamFlags,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: Type, boxing: BoxingStrategy) -> Self {
        Self {
            name: name.into(),
            ty,
            boxing,
            default: ParamDefault::Required,
            variadic: None,
            flags: ParamFlags::default(),
        }
    }

    pub fn defaulted(mut self) -> Self {
        self.default = ParamDefault::Defaulted;
        self
    }

    pub fn variadic(mut self, kind: Variadic) -> Self {
        self.variadic = Some(kind);
        self
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic.is_some()
    }

    pub fn is_defaulted(&self) -> bool {
        !matches!(self.default, ParamDefault::Required)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberFlags {
    pub shared: bool,
    pub variable: bool,
    pub late: bool,
    /// Captured by a nested function or class.
    pub captured: bool,
    /// Captured and variable, so held in a mutable box.
    pub boxed_variable: bool,
    /// A getter (with optional setter) rather than a stored value.
    pub transient: bool,
    /// A foreign field accessed directly.
    pub java_field: bool,
    /// A class initializer parameter.
    pub class_parameter: bool,
    /// Statically importable foreign member.
    pub static_: bool,
    /// Function declared without a body and specified later.
    pub deferred: bool,
    pub overloaded: bool,
    /// Target representation is unboxed.
    pub unboxed: bool,
    /// Declared type is erased in the target signature.
    pub type_erased: bool,
    /// Formal or actual member that implementations can refine.
    pub formal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueDecl {
    pub name: String,
    pub ty: Type,
    #[serde(default)]
    pub container: Container,
    #[serde(default)]
    pub flags: MemberFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub return_ty: Type,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub container: Container,
    #[serde(default)]
    pub flags: MemberFlags,
}

impl FunctionDecl {
    pub fn is_void(&self) -> bool {
        self.return_ty.is_decl(super::names::ANYTHING)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemberDecl {
    Value(ValueDecl),
    Function(FunctionDecl),
}

impl MemberDecl {
    pub fn name(&self) -> &str {
        match self {
            MemberDecl::Value(v) => &v.name,
            MemberDecl::Function(f) => &f.name,
        }
    }

    pub fn container(&self) -> &Container {
        match self {
            MemberDecl::Value(v) => &v.container,
            MemberDecl::Function(f) => &f.container,
        }
    }

    pub fn flags(&self) -> &MemberFlags {
        match self {
            MemberDecl::Value(v) => &v.flags,
            MemberDecl::Function(f) => &f.flags,
        }
    }

    /// Declared type of a value, or result type of a function.
    pub fn ty(&self) -> &Type {
        match self {
            MemberDecl::Value(v) => &v.ty,
            MemberDecl::Function(f) => &f.return_ty,
        }
    }

    pub fn is_toplevel(&self) -> bool {
        *self.container() == Container::Toplevel
    }

    pub fn is_member(&self) -> bool {
        matches!(self.container(), Container::Type(_))
    }

    pub fn is_local(&self) -> bool {
        matches!(self.container(), Container::Local { .. })
    }

    pub fn as_function(&self) -> Option<&FunctionDecl> {
        match self {
            MemberDecl::Function(f) => Some(f),
            MemberDecl::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&ValueDecl> {
        match self {
            MemberDecl::Value(v) => Some(v),
            MemberDecl::Function(_) => None,
        }
    }

    /// Key under which the declaration is registered in the model.
    pub fn key(&self) -> String {
        member_key(self.container(), self.name())
    }
}

pub fn member_key(container: &Container, name: &str) -> String {
    match container {
        Container::Toplevel => name.to_string(),
        Container::Type(owner) => format!("{owner}.{name}"),
        Container::Local { owner: Some(owner), .. } => format!("{owner}::{name}"),
        Container::Local { owner: None, .. } => format!("::{name}"),
    }
}
