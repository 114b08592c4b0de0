//! Mapping of source types to target types and reified type descriptors.

use crate::ir::{JExpr, JType, JTypeArg};
use crate::model::{names, BoxingStrategy, ClassType, Prim, Type, TypeDecl, Variance};

use super::oracle::Oracle;

pub const TYPE_DESCRIPTOR: &str = "com.redhat.ceylon.compiler.java.runtime.model.TypeDescriptor";

/// Options for `Oracle::java_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JtFlags(u8);

impl JtFlags {
    pub const NONE: JtFlags = JtFlags(0);
    /// Drop type arguments.
    pub const RAW: JtFlags = JtFlags(1);
    /// The type is used as a type argument, so it cannot be primitive.
    pub const TYPE_ARGUMENT: JtFlags = JtFlags(2);
    pub const NO_PRIMITIVES: JtFlags = JtFlags(4);
    /// The interface's companion class instead of the interface.
    pub const COMPANION: JtFlags = JtFlags(8);
    /// Used after `new`, where wildcards are not allowed.
    pub const CLASS_NEW: JtFlags = JtFlags(16);

    pub fn contains(self, other: JtFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Flags for the declared type of a value with this representation.
    pub fn for_boxing(boxing: BoxingStrategy) -> JtFlags {
        match boxing {
            BoxingStrategy::Boxed => JtFlags::NO_PRIMITIVES,
            _ => JtFlags::NONE,
        }
    }
}

impl std::ops::BitOr for JtFlags {
    type Output = JtFlags;

    fn bitor(self, rhs: JtFlags) -> JtFlags {
        JtFlags(self.0 | rhs.0)
    }
}

impl Oracle<'_> {
    /// The target type used to declare or cast to a value of `ty`.
    pub fn java_type(&self, ty: &Type, flags: JtFlags) -> JType {
        let resolved = self.model().resolve_aliases(ty);
        let optional = self.is_optional(&resolved) && !self.is_null(&resolved);
        let simple = self.simplify(&resolved);
        if self.erases_to_object(&simple) {
            return JType::object();
        }
        if self.erases_to_sequence(&simple) {
            return JType::class(self.java_name(names::SEQUENTIAL));
        }
        match &simple {
            Type::Param(name) => JType::class(name.clone()),
            Type::Class(ct) => match self.model().type_decl(&ct.decl) {
                Some(decl) => self.class_java_type(decl, ct, &simple, optional, flags),
                None => JType::class(ct.decl.clone()),
            },
            _ => JType::object(),
        }
    }

    fn class_java_type(&self, decl: &TypeDecl, ct: &ClassType, ty: &Type, optional: bool, flags: JtFlags) -> JType {
        let primitives = !optional && !flags.contains(JtFlags::NO_PRIMITIVES) && !flags.contains(JtFlags::TYPE_ARGUMENT);
        if primitives && decl.flags.value_type {
            if decl.name == names::STRING {
                return JType::class("java.lang.String");
            }
            if let Some(prim) = self.primitive_of(ty) {
                return JType::Prim(prim);
            }
        }
        if decl.flags.java_array {
            let element = match ct.args.first() {
                Some(arg) => self.java_type(arg, JtFlags::NO_PRIMITIVES),
                None => JType::Prim(Prim::Long),
            };
            return JType::array_of(element);
        }
        let mut name = decl.java_name.clone();
        if flags.contains(JtFlags::COMPANION) {
            name.push_str("$impl");
        }
        if flags.contains(JtFlags::RAW) || ct.args.is_empty() || self.is_turned_to_raw(ty) {
            return JType::class(name);
        }
        let callable = decl.name == names::CALLABLE;
        let mut args = Vec::new();
        for (i, arg) in ct.args.iter().enumerate() {
            if callable && i > 0 {
                break;
            }
            let jt = self.java_type(arg, JtFlags::TYPE_ARGUMENT);
            let variance = decl.type_params.get(i).map(|tp| tp.variance).unwrap_or_default();
            let dependent = self.has_dependent_type_parameters(&decl.type_params, i);
            args.push(match variance {
                _ if flags.contains(JtFlags::CLASS_NEW) || dependent => JTypeArg::Type(jt),
                Variance::Covariant => JTypeArg::Extends(jt),
                Variance::Contravariant => JTypeArg::Super(jt),
                Variance::Invariant => JTypeArg::Type(jt),
            });
        }
        JType::generic(name, args)
    }

    /// Declared type of a parameter or value with the given representation.
    pub fn java_type_for(&self, ty: &Type, boxing: BoxingStrategy) -> JType {
        self.java_type(ty, JtFlags::for_boxing(boxing))
    }

    /// Qualified target name of a declaration, falling back to its source
    /// name for declarations the model does not know.
    pub fn java_name(&self, decl: &str) -> String {
        self.model()
            .type_decl(decl)
            .map(|d| d.java_name.clone())
            .unwrap_or_else(|| decl.to_string())
    }

    /// A runtime type descriptor for `ty`, passed to reified generic code.
    pub fn reified_type(&self, ty: &Type) -> JExpr {
        let descriptor = JExpr::path(TYPE_DESCRIPTOR);
        match self.model().resolve_aliases(ty) {
            Type::Nothing => descriptor.select("NothingType"),
            Type::Param(name) => JExpr::ident(format!("$reified${name}")),
            Type::Class(ct) => {
                let class_name = if ct.decl == names::ANYTHING {
                    "ceylon.language.Anything".to_string()
                } else {
                    self.java_name(&ct.decl)
                };
                let mut args = vec![JExpr::path(&class_name).select("class")];
                args.extend(ct.args.iter().map(|a| self.reified_type(a)));
                descriptor.invoke("klass", args)
            }
            Type::Union(cases) => descriptor.invoke("union", cases.iter().map(|c| self.reified_type(c)).collect()),
            Type::Intersection(cases) => {
                descriptor.invoke("intersection", cases.iter().map(|c| self.reified_type(c)).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::printer::print_type;
    use crate::ir::print_expr;
    use crate::model::Model;

    fn oracle() -> Oracle<'static> {
        Oracle::new(Model::language())
    }

    fn show(ty: &Type, flags: JtFlags) -> String {
        print_type(&oracle().java_type(ty, flags))
    }

    #[test]
    fn test_value_types_map_to_primitives() {
        assert_eq!(show(&Type::integer(), JtFlags::NONE), "long");
        assert_eq!(show(&Type::float(), JtFlags::NONE), "double");
        assert_eq!(show(&Type::character(), JtFlags::NONE), "int");
        assert_eq!(show(&Type::string(), JtFlags::NONE), "java.lang.String");
        assert_eq!(show(&Type::integer().with_underlying(Prim::Int), JtFlags::NONE), "int");
    }

    #[test]
    fn test_boxed_value_types() {
        assert_eq!(show(&Type::integer(), JtFlags::NO_PRIMITIVES), "ceylon.language.Integer");
        assert_eq!(show(&Type::optional(Type::integer()), JtFlags::NONE), "ceylon.language.Integer");
        assert_eq!(show(&Type::string(), JtFlags::TYPE_ARGUMENT), "ceylon.language.String");
    }

    #[test]
    fn test_generic_types_use_wildcards_for_variance() {
        assert_eq!(
            show(&Type::sequential(Type::string()), JtFlags::NONE),
            "ceylon.language.Sequential<? extends ceylon.language.String>"
        );
        assert_eq!(
            show(&Type::sequential(Type::string()), JtFlags::CLASS_NEW),
            "ceylon.language.Sequential<ceylon.language.String>"
        );
        assert_eq!(show(&Type::sequential(Type::string()), JtFlags::RAW), "ceylon.language.Sequential");
    }

    #[test]
    fn test_callable_keeps_only_return_type() {
        let ty = Type::callable(Type::integer(), Type::tuple(vec![Type::string()], None));
        assert_eq!(show(&ty, JtFlags::NONE), "ceylon.language.Callable<? extends ceylon.language.Integer>");
    }

    #[test]
    fn test_erased_types() {
        assert_eq!(show(&Type::anything(), JtFlags::NONE), "java.lang.Object");
        assert_eq!(show(&Type::union(vec![Type::integer(), Type::string()]), JtFlags::NONE), "java.lang.Object");
        assert_eq!(show(&Type::sequential(Type::Nothing), JtFlags::NONE), "ceylon.language.Sequential");
        assert_eq!(show(&Type::param("T"), JtFlags::NONE), "T");
    }

    #[test]
    fn test_java_arrays() {
        let arr = Type::class(names::OBJECT_ARRAY, vec![Type::string()]);
        assert_eq!(show(&arr, JtFlags::NONE), "ceylon.language.String[]");
        assert_eq!(show(&Type::named(names::LONG_ARRAY), JtFlags::NONE), "long[]");
    }

    #[test]
    fn test_reified_descriptor() {
        let e = oracle().reified_type(&Type::sequential(Type::param("T")));
        assert_eq!(
            print_expr(&e),
            "com.redhat.ceylon.compiler.java.runtime.model.TypeDescriptor.klass(ceylon.language.Sequential.class, $reified$T)"
        );
    }
}
