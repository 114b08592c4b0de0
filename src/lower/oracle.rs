//! Pure queries over the type model: erasure, raw-ness, cast necessity and
//! variance casts.

use crate::model::{names, BoxingStrategy, MemberDecl, Model, Prim, Type, TypeParam};

/// Declarations whose instances erase to `java.lang.Object`.
const ERASED_TO_OBJECT: &[&str] =
    &[names::ANYTHING, names::OBJECT, names::NULL, names::NULL_VALUE, names::BASIC, names::IDENTIFIABLE];

/// Outcome of the variance-cast analysis: a raw cast is always needed, and
/// `exact` is the more precise second cast when one exists.
#[derive(Debug, Clone, PartialEq)]
pub struct VarianceCast {
    pub exact: Option<Type>,
}

#[derive(Debug, Clone, Copy)]
pub struct Oracle<'m> {
    model: &'m Model,
}

impl<'m> Oracle<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &'m Model {
        self.model
    }

    /// Definite form of a type: aliases resolved, `Null` cases dropped and
    /// trivial intersection cases (`Object`, `Anything`) removed.
    pub fn simplify(&self, ty: &Type) -> Type {
        match self.model.simplify(ty) {
            Type::Intersection(cases) => {
                let kept: Vec<Type> = cases
                    .iter()
                    .filter(|c| !(c.is_decl(names::OBJECT) || c.is_decl(names::ANYTHING)))
                    .cloned()
                    .collect();
                if kept.is_empty() { Type::intersection(cases) } else { Type::intersection(kept) }
            }
            other => other,
        }
    }

    // ── erasure ──────────────────────────────────────────────────

    pub fn erases_to_object(&self, ty: &Type) -> bool {
        let ty = self.simplify(ty);
        match &ty {
            Type::Nothing => true,
            Type::Param(_) => false,
            Type::Class(ct) => ERASED_TO_OBJECT.contains(&ct.decl.as_str()),
            Type::Union(_) | Type::Intersection(_) => !self.erases_to_sequence(&ty),
        }
    }

    /// A union or intersection of sequential types is represented as a
    /// `Sequential`.
    pub fn erases_to_sequence(&self, ty: &Type) -> bool {
        let ty = self.simplify(ty);
        let anything_seq = Type::sequential(Type::anything());
        match &ty {
            Type::Union(cases) | Type::Intersection(cases) => {
                cases.iter().all(|c| self.model.is_subtype(c, &anything_seq))
            }
            _ => false,
        }
    }

    pub fn is_value_type(&self, ty: &Type) -> bool {
        ty.decl_name()
            .and_then(|d| self.model.type_decl(d))
            .is_some_and(|d| d.flags.value_type)
    }

    /// The type has a primitive target representation when unboxed.
    pub fn erases_to_primitive(&self, ty: &Type) -> bool {
        let resolved = self.model.resolve_aliases(ty);
        !self.model.is_optional(&resolved) && self.is_value_type(&resolved) && !resolved.is_decl(names::STRING)
    }

    /// Primitive kind of an unboxed value type.
    pub fn primitive_of(&self, ty: &Type) -> Option<Prim> {
        let simple = self.simplify(ty);
        if let Some(prim) = simple.underlying() {
            return Some(prim);
        }
        match simple.decl_name()? {
            names::INTEGER => Some(Prim::Long),
            names::FLOAT => Some(Prim::Double),
            names::BOOLEAN => Some(Prim::Boolean),
            names::CHARACTER => Some(Prim::Int),
            names::BYTE => Some(Prim::Byte),
            _ => None,
        }
    }

    /// Some type argument erases in a way that forces the type itself to be
    /// used raw in the target.
    pub fn is_turned_to_raw(&self, ty: &Type) -> bool {
        let ty = self.model.resolve_aliases(ty);
        if ty.is_raw() {
            return true;
        }
        let callable = ty.is_decl(names::CALLABLE);
        for (i, arg) in ty.type_args().iter().enumerate() {
            if callable && i > 0 {
                break;
            }
            let simple = self.simplify(arg);
            if simple.is_nothing() {
                return true;
            }
            if matches!(simple, Type::Union(_) | Type::Intersection(_)) && self.erases_to_object(&simple) {
                return true;
            }
            if self.is_turned_to_raw(&simple) {
                return true;
            }
        }
        false
    }

    /// The parameter at `index` is bounded by, or bounds, another parameter
    /// of the same declaration.
    pub fn has_dependent_type_parameters(&self, params: &[TypeParam], index: usize) -> bool {
        let Some(tp) = params.get(index) else { return false };
        params.iter().enumerate().any(|(i, other)| {
            i != index
                && (tp.bounds.iter().any(|b| b.mentions_param(&other.name))
                    || other.bounds.iter().any(|b| b.mentions_param(&tp.name)))
        })
    }

    pub fn has_type_parameters(&self, ty: &Type) -> bool {
        match ty {
            Type::Class(ct) => !ct.args.is_empty(),
            Type::Union(cases) | Type::Intersection(cases) => cases.iter().any(|c| self.has_type_parameters(c)),
            Type::Param(_) | Type::Nothing => false,
        }
    }

    // ── casts ────────────────────────────────────────────────────

    /// Whether a value of `expr_ty` must be cast to be usable where
    /// `expected` is wanted.
    pub fn needs_cast(
        &self,
        expr_ty: &Type,
        expected: &Type,
        not_raw: bool,
        constrained: bool,
        down_cast: bool,
    ) -> bool {
        let expr_ty = self.simplify(expr_ty);
        let expected = self.simplify(expected);
        if expr_ty.is_exactly(&expected) && !constrained {
            return false;
        }
        if self.erases_to_object(&expected) && !constrained {
            return false;
        }
        if self.erases_to_object(&expr_ty) {
            return true;
        }
        let decl = match &expected {
            Type::Class(ct) => ct.decl.as_str(),
            // A type variable needs a cast from anything but itself.
            Type::Param(_) => return !expr_ty.is_exactly(&expected),
            _ => return down_cast,
        };
        let Some(common) = self.model.supertype_of(&expr_ty, decl) else {
            return down_cast;
        };
        if self.lost_type_parameter_in_inheritance(&expr_ty, decl) {
            return true;
        }
        if !not_raw {
            if self.is_turned_to_raw(&expected) {
                return false;
            }
            if common.is_exactly(&expected) {
                return false;
            }
        }
        let callable = common.is_decl(names::CALLABLE);
        let common_args = common.type_args();
        let expected_args = expected.type_args();
        if common_args.len() != expected_args.len() {
            return false;
        }
        let params = self.model.type_params_of(&expected);
        for (i, (have, want)) in common_args.iter().zip(expected_args).enumerate() {
            if self.has_dependent_type_parameters(params, i) && !self.simplify(have).is_exactly(&self.simplify(want)) {
                return true;
            }
            if self.needs_cast(have, want, not_raw, constrained, down_cast) {
                return true;
            }
            if callable {
                break;
            }
        }
        false
    }

    /// Walking the inheritance path from `ty` up to `target`, some supertype
    /// along the way is used raw, so the type arguments of the common type
    /// cannot be trusted.
    fn lost_type_parameter_in_inheritance(&self, ty: &Type, target: &str) -> bool {
        let Some(start) = ty.decl_name() else { return false };
        let search_interfaces = self.model.type_decl(target).is_some_and(|d| d.is_interface());
        self.lost_on_path(start, target, search_interfaces, false, 0)
    }

    fn lost_on_path(&self, from: &str, target: &str, interfaces: bool, lost: bool, depth: usize) -> bool {
        if from == target {
            return lost;
        }
        // Inheritance graphs are acyclic; the bound guards malformed input.
        if depth > 64 {
            return false;
        }
        let Some(decl) = self.model.type_decl(from) else { return false };
        if interfaces {
            for st in &decl.satisfied {
                let lost_here = lost || self.is_turned_to_raw(st);
                let Some(next) = st.decl_name() else { continue };
                if self.lost_on_path(next, target, interfaces, lost_here, depth + 1) {
                    return true;
                }
            }
        }
        if let Some(ext) = &decl.extended {
            let lost_here = lost || self.is_turned_to_raw(ext);
            match ext.decl_name() {
                Some(next) if next != names::OBJECT && next != names::ANYTHING => {
                    return self.lost_on_path(next, target, interfaces, lost_here, depth + 1);
                }
                _ => {}
            }
        }
        false
    }

    /// Whether `a` and `b` have the same target erasure. Types that both
    /// erase to `Object` match each other and nothing else.
    pub fn have_same_erasure(&self, a: &Type, b: &Type) -> bool {
        let erased_a = self.erases_to_object(a);
        let erased_b = self.erases_to_object(b);
        if erased_a || erased_b {
            return erased_a && erased_b;
        }
        let (sa, sb) = (self.simplify(a), self.simplify(b));
        match (&sa, &sb) {
            (Type::Class(x), Type::Class(y)) => {
                x.decl == y.decl
                    && x.args.len() == y.args.len()
                    && x.args.iter().zip(&y.args).all(|(p, q)| self.have_same_erasure(p, q))
            }
            _ => sa.is_exactly(&sb),
        }
    }

    /// A value of `expr_ty` that inherits the expected variant interface
    /// through several instantiations with different erasures needs a raw
    /// cast before the target type system accepts it.
    pub fn variance_cast(&self, expr_ty: &Type, expected: &Type) -> Option<VarianceCast> {
        let expr_ty = self.model.resolve_aliases(expr_ty);
        let expected = self.model.resolve_aliases(expected);
        if expr_ty.is_exactly(&expected) {
            return None;
        }
        let decl_name = expected.decl_name()?;
        let decl = self.model.type_decl(decl_name)?;
        if !decl.is_interface() || expected.type_args().is_empty() || !decl.type_params.iter().any(|tp| tp.is_variant())
        {
            return None;
        }
        let mut instantiations: Vec<Type> = Vec::new();
        for st in self.model.instantiations_of(&expr_ty, decl_name) {
            if !instantiations.iter().any(|seen| seen.is_exactly(&st) || self.have_same_erasure(seen, &st)) {
                instantiations.push(st);
            }
        }
        if instantiations.len() <= 1 {
            return None;
        }
        if instantiations.iter().all(|st| expr_ty.is_exactly(st)) {
            return None;
        }
        let exact = instantiations.into_iter().find(|st| expected.is_exactly(st));
        Some(VarianceCast { exact })
    }

    /// The type argument a self type resolves to, as in `Comparable<Other>
    /// of Other`, when a cast to it is needed.
    pub fn self_type_cast(&self, expr_ty: &Type, expected: &Type) -> Option<Type> {
        let expr_ty = self.model.resolve_aliases(expr_ty);
        let decl = self.model.type_decl(expr_ty.decl_name()?)?;
        let self_param = decl.self_type.as_deref()?;
        let index = decl.type_param_index(self_param)?;
        let own = matches!(expr_ty.type_arg(index), Some(Type::Param(p)) if p == self_param);
        if own || !expr_ty.is_exactly(expected) {
            return expr_ty.type_arg(index).cloned();
        }
        None
    }

    // ── declarations ─────────────────────────────────────────────

    pub fn boxing_strategy_of(&self, decl: &MemberDecl) -> BoxingStrategy {
        if decl.flags().unboxed { BoxingStrategy::Unboxed } else { BoxingStrategy::Boxed }
    }

    pub fn is_optional(&self, ty: &Type) -> bool {
        self.model.is_optional(ty)
    }

    pub fn is_null(&self, ty: &Type) -> bool {
        self.model.is_null(ty)
    }

    pub fn is_java_array(&self, ty: &Type) -> bool {
        ty.decl_name()
            .and_then(|d| self.model.type_decl(d))
            .is_some_and(|d| d.flags.java_array)
    }
}
