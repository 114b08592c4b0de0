use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::names;

/// A fully resolved source-language type, as produced by the type checker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// A class or interface (or alias) applied to type arguments.
    Class(ClassType),
    /// A reference to a type parameter in scope.
    Param(String),
    Union(Vec<Type>),
    Intersection(Vec<Type>),
    /// The bottom type.
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassType {
    pub decl: String,
    #[serde(default)]
    pub args: Vec<Type>,
    /// Foreign primitive this type was declared with, e.g. `int` for a
    /// foreign `int` field typed as `Integer`.
    #[serde(default)]
    pub underlying: Option<Prim>,
    /// A foreign raw usage of a generic type.
    #[serde(default)]
    pub raw: bool,
}

/// Primitive kinds of the target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prim {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
}

impl Prim {
    pub fn java_name(self) -> &'static str {
        match self {
            Prim::Boolean => "boolean",
            Prim::Byte => "byte",
            Prim::Short => "short",
            Prim::Int => "int",
            Prim::Long => "long",
            Prim::Float => "float",
            Prim::Double => "double",
            Prim::Char => "char",
        }
    }
}

impl Type {
    pub fn class(decl: impl Into<String>, args: Vec<Type>) -> Type {
        Type::Class(ClassType { decl: decl.into(), args, underlying: None, raw: false })
    }

    pub fn named(decl: impl Into<String>) -> Type {
        Type::class(decl, Vec::new())
    }

    pub fn param(name: impl Into<String>) -> Type {
        Type::Param(name.into())
    }

    /// Build a union, flattening nested unions and dropping duplicates.
    /// A union of a single type is that type.
    pub fn union(cases: Vec<Type>) -> Type {
        let mut flat: Vec<Type> = Vec::new();
        for case in cases {
            match case {
                Type::Union(inner) => {
                    for t in inner {
                        push_unique(&mut flat, t);
                    }
                }
                Type::Nothing => {}
                other => push_unique(&mut flat, other),
            }
        }
        match flat.len() {
            0 => Type::Nothing,
            1 => flat.remove(0),
            _ => Type::Union(flat),
        }
    }

    pub fn intersection(cases: Vec<Type>) -> Type {
        let mut flat: Vec<Type> = Vec::new();
        for case in cases {
            match case {
                Type::Intersection(inner) => {
                    for t in inner {
                        push_unique(&mut flat, t);
                    }
                }
                other => push_unique(&mut flat, other),
            }
        }
        if flat.iter().any(|t| matches!(t, Type::Nothing)) {
            return Type::Nothing;
        }
        match flat.len() {
            0 => Type::named(names::ANYTHING),
            1 => flat.remove(0),
            _ => Type::Intersection(flat),
        }
    }

    /// `T?`, i.e. `T|Null`.
    pub fn optional(ty: Type) -> Type {
        Type::union(vec![ty, Type::named(names::NULL)])
    }

    pub fn with_underlying(mut self, prim: Prim) -> Type {
        if let Type::Class(ct) = &mut self {
            ct.underlying = Some(prim);
        }
        self
    }

    pub fn as_raw(mut self) -> Type {
        if let Type::Class(ct) = &mut self {
            ct.raw = true;
        }
        self
    }

    pub fn decl_name(&self) -> Option<&str> {
        match self {
            Type::Class(ct) => Some(&ct.decl),
            _ => None,
        }
    }

    pub fn is_decl(&self, name: &str) -> bool {
        self.decl_name() == Some(name)
    }

    pub fn type_args(&self) -> &[Type] {
        match self {
            Type::Class(ct) => &ct.args,
            _ => &[],
        }
    }

    pub fn type_arg(&self, index: usize) -> Option<&Type> {
        self.type_args().get(index)
    }

    pub fn underlying(&self) -> Option<Prim> {
        match self {
            Type::Class(ct) => ct.underlying,
            _ => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Type::Class(ct) if ct.raw)
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Type::Nothing)
    }

    pub fn without_underlying(&self) -> Type {
        match self {
            Type::Class(ct) => Type::Class(ClassType { underlying: None, ..ct.clone() }),
            other => other.clone(),
        }
    }

    /// Structural equality that ignores case order in unions and
    /// intersections as well as foreign representation details.
    pub fn is_exactly(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Class(a), Type::Class(b)) => {
                a.decl == b.decl
                    && a.args.len() == b.args.len()
                    && a.args.iter().zip(&b.args).all(|(x, y)| x.is_exactly(y))
            }
            (Type::Param(a), Type::Param(b)) => a == b,
            (Type::Nothing, Type::Nothing) => true,
            (Type::Union(a), Type::Union(b)) | (Type::Intersection(a), Type::Intersection(b)) => {
                a.len() == b.len()
                    && a.iter().all(|x| b.iter().any(|y| x.is_exactly(y)))
                    && b.iter().all(|y| a.iter().any(|x| x.is_exactly(y)))
            }
            _ => false,
        }
    }

    /// Replace type parameter references using `map`.
    pub fn substitute(&self, map: &HashMap<String, Type>) -> Type {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            Type::Param(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            Type::Class(ct) => Type::Class(ClassType {
                args: ct.args.iter().map(|a| a.substitute(map)).collect(),
                ..ct.clone()
            }),
            Type::Union(cases) => Type::union(cases.iter().map(|c| c.substitute(map)).collect()),
            Type::Intersection(cases) => {
                Type::intersection(cases.iter().map(|c| c.substitute(map)).collect())
            }
            Type::Nothing => Type::Nothing,
        }
    }

    /// Returns true if `pred` holds for this type or any type nested in it.
    pub fn any_type(&self, pred: &impl Fn(&Type) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Type::Class(ct) => ct.args.iter().any(|a| a.any_type(pred)),
            Type::Union(cases) | Type::Intersection(cases) => cases.iter().any(|c| c.any_type(pred)),
            Type::Param(_) | Type::Nothing => false,
        }
    }

    pub fn mentions_param(&self, name: &str) -> bool {
        self.any_type(&|t| matches!(t, Type::Param(p) if p == name))
    }
}

fn push_unique(into: &mut Vec<Type>, ty: Type) {
    if !into.iter().any(|t| t.is_exactly(&ty)) {
        into.push(ty);
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Class(ct) => {
                write!(f, "{}", ct.decl)?;
                if !ct.args.is_empty() {
                    write!(f, "<")?;
                    for (i, a) in ct.args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ",")?;
                        }
                        write!(f, "{a}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            Type::Param(name) => write!(f, "{name}"),
            Type::Union(cases) => {
                let null = cases.iter().position(|c| c.is_decl(names::NULL));
                if let (Some(idx), 2) = (null, cases.len()) {
                    return write!(f, "{}?", cases[1 - idx]);
                }
                for (i, c) in cases.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{c}")?;
                }
                Ok(())
            }
            Type::Intersection(cases) => {
                for (i, c) in cases.iter().enumerate() {
                    if i > 0 {
                        write!(f, "&")?;
                    }
                    write!(f, "{c}")?;
                }
                Ok(())
            }
            Type::Nothing => write!(f, "Nothing"),
        }
    }
}
