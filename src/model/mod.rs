pub mod decl;
pub mod types;

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

pub use decl::*;
pub use types::*;

/// Names of the declarations of the built-in language module.
pub mod names {
    pub const ANYTHING: &str = "Anything";
    pub const OBJECT: &str = "Object";
    pub const NULL: &str = "Null";
    /// The anonymous class of the `null` value.
    pub const NULL_VALUE: &str = "null";
    pub const BASIC: &str = "Basic";
    pub const IDENTIFIABLE: &str = "Identifiable";
    pub const INTEGER: &str = "Integer";
    pub const FLOAT: &str = "Float";
    pub const BOOLEAN: &str = "Boolean";
    pub const CHARACTER: &str = "Character";
    pub const BYTE: &str = "Byte";
    pub const STRING: &str = "String";
    pub const ITERABLE: &str = "Iterable";
    pub const LIST: &str = "List";
    pub const SEQUENTIAL: &str = "Sequential";
    pub const SEQUENCE: &str = "Sequence";
    pub const EMPTY: &str = "Empty";
    pub const TUPLE: &str = "Tuple";
    pub const CALLABLE: &str = "Callable";
    pub const ENTRY: &str = "Entry";
    pub const RANGE: &str = "Range";
    pub const COMPARABLE: &str = "Comparable";
    pub const SUMMABLE: &str = "Summable";
    pub const COMPARISON: &str = "Comparison";
    pub const FINISHED: &str = "Finished";
    pub const ARRAY: &str = "Array";
    pub const OBJECT_ARRAY: &str = "ObjectArray";
    pub const LONG_ARRAY: &str = "LongArray";
}

/// Static shape of a tuple type: leading element types plus an optional
/// variadic tail.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleShape {
    pub elements: Vec<Type>,
    /// Element type of a trailing `T*` or `T+` tail.
    pub rest: Option<Type>,
    /// The tail is a `T+`.
    pub rest_nonempty: bool,
}

impl TupleShape {
    pub fn min_len(&self) -> usize {
        self.elements.len() + usize::from(self.rest.is_some() && self.rest_nonempty)
    }

    /// `None` when the tail is unbounded.
    pub fn max_len(&self) -> Option<usize> {
        match self.rest {
            Some(_) => None,
            None => Some(self.elements.len()),
        }
    }

    pub fn is_exact(&self) -> bool {
        self.rest.is_none()
    }
}

/// The declarations visible to one compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub types: BTreeMap<String, TypeDecl>,
    /// Members keyed by `decl::member_key`.
    #[serde(default)]
    pub members: BTreeMap<String, MemberDecl>,
}

static LANGUAGE: OnceLock<Model> = OnceLock::new();

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in language module. Built once on first access.
    pub fn language() -> &'static Model {
        LANGUAGE.get_or_init(build_language)
    }

    /// A fresh model seeded with the language module.
    pub fn with_language() -> Model {
        Self::language().clone()
    }

    /// Add the declarations of `other`, replacing any with the same name.
    pub fn extend(&mut self, other: Model) {
        self.types.extend(other.types);
        self.members.extend(other.members);
    }

    pub fn add_type(&mut self, decl: TypeDecl) {
        self.types.insert(decl.name.clone(), decl);
    }

    pub fn add_member(&mut self, decl: MemberDecl) -> String {
        let key = decl.key();
        self.members.insert(key.clone(), decl);
        key
    }

    pub fn type_decl(&self, name: &str) -> Option<&TypeDecl> {
        self.types.get(name)
    }

    pub fn member(&self, key: &str) -> Option<&MemberDecl> {
        self.members.get(key)
    }

    /// Find a member by name on `owner` or any of its supertypes.
    pub fn find_member(&self, owner: &Type, name: &str) -> Option<(&str, &MemberDecl)> {
        for st in self.supertypes(owner) {
            let Some(decl) = st.decl_name() else { continue };
            let key = member_key(&Container::Type(decl.to_string()), name);
            if let Some((k, m)) = self.members.get_key_value(&key) {
                return Some((k.as_str(), m));
            }
        }
        None
    }

    // ── aliases and substitution ─────────────────────────────────

    pub fn resolve_aliases(&self, ty: &Type) -> Type {
        match ty {
            Type::Class(ct) => {
                let args: Vec<Type> = ct.args.iter().map(|a| self.resolve_aliases(a)).collect();
                if let Some(TypeDecl { kind: TypeKind::Alias(target), type_params, .. }) = self.types.get(&ct.decl) {
                    let map = bind_params(type_params, &args);
                    return self.resolve_aliases(&target.substitute(&map));
                }
                Type::Class(ClassType { args, ..ct.clone() })
            }
            Type::Union(cases) => Type::union(cases.iter().map(|c| self.resolve_aliases(c)).collect()),
            Type::Intersection(cases) => {
                Type::intersection(cases.iter().map(|c| self.resolve_aliases(c)).collect())
            }
            Type::Param(_) | Type::Nothing => ty.clone(),
        }
    }

    /// Type-argument bindings of a class type, keyed by parameter name.
    pub fn type_arguments(&self, ty: &Type) -> HashMap<String, Type> {
        match (ty, ty.decl_name().and_then(|d| self.types.get(d))) {
            (Type::Class(ct), Some(decl)) => bind_params(&decl.type_params, &ct.args),
            _ => HashMap::new(),
        }
    }

    // ── supertypes ───────────────────────────────────────────────

    /// Extended and satisfied types of a class type, with its type
    /// arguments substituted.
    pub fn direct_supertypes(&self, ty: &Type) -> Vec<Type> {
        let Some(decl) = ty.decl_name().and_then(|d| self.types.get(d)) else {
            return Vec::new();
        };
        let map = self.type_arguments(ty);
        let mut out = Vec::new();
        match &decl.extended {
            Some(ext) => out.push(ext.substitute(&map)),
            None if decl.is_interface() => out.push(Type::named(names::OBJECT)),
            None => {}
        }
        out.extend(decl.satisfied.iter().map(|s| s.substitute(&map)));
        if ty.is_raw() {
            out = out.into_iter().map(Type::as_raw).collect();
        }
        out
    }

    /// Every supertype of `ty`, including `ty` itself, nearest first.
    pub fn supertypes(&self, ty: &Type) -> Vec<Type> {
        let ty = self.resolve_aliases(ty);
        let mut out: Vec<Type> = Vec::new();
        match &ty {
            Type::Class(_) => {
                let mut queue = vec![ty.clone()];
                while !queue.is_empty() {
                    let current = queue.remove(0);
                    if out.iter().any(|t| t.is_exactly(&current)) {
                        continue;
                    }
                    queue.extend(self.direct_supertypes(&current));
                    out.push(current);
                }
            }
            Type::Intersection(cases) => {
                out.push(ty.clone());
                for case in cases {
                    for st in self.supertypes(case) {
                        if !out.iter().any(|t| t.is_exactly(&st)) {
                            out.push(st);
                        }
                    }
                }
            }
            _ => {
                out.push(ty.clone());
                out.push(Type::named(names::ANYTHING));
            }
        }
        out
    }

    /// The instantiation of `decl` that `ty` inherits, if any. For a union,
    /// every case must have one; their type arguments are joined.
    pub fn supertype_of(&self, ty: &Type, decl: &str) -> Option<Type> {
        let ty = self.resolve_aliases(ty);
        match &ty {
            Type::Union(cases) => {
                let found: Option<Vec<Type>> = cases.iter().map(|c| self.supertype_of(c, decl)).collect();
                let found = found?;
                let arity = found.first()?.type_args().len();
                let args = (0..arity)
                    .map(|i| Type::union(found.iter().filter_map(|f| f.type_arg(i).cloned()).collect()))
                    .collect();
                Some(Type::class(decl, args))
            }
            Type::Nothing => None,
            _ => self.supertypes(&ty).into_iter().find(|st| st.is_decl(decl)),
        }
    }

    /// All distinct instantiations of `decl` among the supertypes of `ty`.
    pub fn instantiations_of(&self, ty: &Type, decl: &str) -> Vec<Type> {
        self.supertypes(ty).into_iter().filter(|st| st.is_decl(decl)).collect()
    }

    // ── subtyping ────────────────────────────────────────────────

    pub fn is_subtype(&self, sub: &Type, sup: &Type) -> bool {
        let sub = self.resolve_aliases(sub);
        let sup = self.resolve_aliases(sup);
        self.is_subtype_resolved(&sub, &sup)
    }

    fn is_subtype_resolved(&self, sub: &Type, sup: &Type) -> bool {
        match (sub, sup) {
            (Type::Nothing, _) => true,
            (_, sup) if sup.is_decl(names::ANYTHING) => true,
            (Type::Union(cases), _) => cases.iter().all(|c| self.is_subtype_resolved(c, sup)),
            (_, Type::Intersection(cases)) => cases.iter().all(|c| self.is_subtype_resolved(sub, c)),
            (Type::Intersection(cases), _) => cases.iter().any(|c| self.is_subtype_resolved(c, sup)),
            (_, Type::Union(cases)) => cases.iter().any(|c| self.is_subtype_resolved(sub, c)),
            (Type::Param(a), Type::Param(b)) => a == b,
            (Type::Class(_), Type::Class(target)) => {
                let Some(found) = self.supertype_of(sub, &target.decl) else {
                    return false;
                };
                if target.raw || found.is_raw() || target.args.is_empty() {
                    return true;
                }
                let params = self.type_decl(&target.decl).map(|d| d.type_params.as_slice()).unwrap_or(&[]);
                found.type_args().iter().zip(&target.args).enumerate().all(|(i, (have, want))| {
                    match params.get(i).map(|p| p.variance).unwrap_or_default() {
                        Variance::Covariant => self.is_subtype_resolved(have, want),
                        Variance::Contravariant => self.is_subtype_resolved(want, have),
                        Variance::Invariant => have.is_exactly(want),
                    }
                })
            }
            _ => false,
        }
    }

    // ── optionality ──────────────────────────────────────────────

    /// Strip `Null` cases from a union: `T?` becomes `T`.
    pub fn simplify(&self, ty: &Type) -> Type {
        let ty = self.resolve_aliases(ty);
        match &ty {
            Type::Union(cases) => {
                let kept: Vec<Type> = cases.iter().filter(|c| !self.is_null(c)).cloned().collect();
                if kept.is_empty() { ty.clone() } else { Type::union(kept) }
            }
            _ => ty,
        }
    }

    pub fn is_optional(&self, ty: &Type) -> bool {
        self.is_subtype(&Type::named(names::NULL), ty)
    }

    /// `ty` is `Null` or one of its subtypes (but not `Nothing`).
    pub fn is_null(&self, ty: &Type) -> bool {
        !ty.is_nothing() && self.is_subtype(ty, &Type::named(names::NULL))
    }

    /// The type of the `null` value itself.
    pub fn is_null_value(&self, ty: &Type) -> bool {
        ty.is_decl(names::NULL_VALUE)
    }

    pub fn non_null(&self, ty: &Type) -> Type {
        self.simplify(ty)
    }

    // ── iteration ────────────────────────────────────────────────

    pub fn iterated_type(&self, ty: &Type) -> Option<Type> {
        self.supertype_of(ty, names::ITERABLE)?.type_arg(0).cloned()
    }

    pub fn absent_type(&self, ty: &Type) -> Option<Type> {
        self.supertype_of(ty, names::ITERABLE)?.type_arg(1).cloned()
    }

    pub fn sequential_element(&self, ty: &Type) -> Option<Type> {
        self.supertype_of(ty, names::SEQUENTIAL)?.type_arg(0).cloned()
    }

    pub fn is_sequential(&self, ty: &Type) -> bool {
        self.supertype_of(ty, names::SEQUENTIAL).is_some()
    }

    pub fn is_sequence(&self, ty: &Type) -> bool {
        self.supertype_of(ty, names::SEQUENCE).is_some()
    }

    pub fn is_empty_type(&self, ty: &Type) -> bool {
        let ty = self.resolve_aliases(ty);
        ty.is_decl(names::EMPTY) || ty.is_nothing()
    }

    /// Shape of a tuple or sequential type. `None` for other types.
    pub fn tuple_shape(&self, ty: &Type) -> Option<TupleShape> {
        let mut elements = Vec::new();
        let mut current = self.simplify(ty);
        loop {
            if current.is_decl(names::TUPLE) {
                let (Some(first), Some(rest)) = (current.type_arg(1), current.type_arg(2)) else {
                    return None;
                };
                elements.push(first.clone());
                current = self.resolve_aliases(rest);
            } else if self.is_empty_type(&current) {
                return Some(TupleShape { elements, rest: None, rest_nonempty: false });
            } else if current.is_decl(names::SEQUENCE) || current.is_decl(names::SEQUENTIAL) {
                let rest = current.type_arg(0).cloned().unwrap_or_else(|| Type::named(names::ANYTHING));
                return Some(TupleShape {
                    elements,
                    rest: Some(rest),
                    rest_nonempty: current.is_decl(names::SEQUENCE),
                });
            } else {
                let rest = self.sequential_element(&current)?;
                return Some(TupleShape { elements, rest: Some(rest), rest_nonempty: self.is_sequence(&current) });
            }
        }
    }

    // ── callables ────────────────────────────────────────────────

    pub fn callable_return(&self, ty: &Type) -> Option<Type> {
        self.supertype_of(ty, names::CALLABLE)?.type_arg(0).cloned()
    }

    pub fn callable_parameters(&self, ty: &Type) -> Option<TupleShape> {
        let args = self.supertype_of(ty, names::CALLABLE)?.type_arg(1).cloned()?;
        self.tuple_shape(&args)
    }

    pub fn is_callable(&self, ty: &Type) -> bool {
        self.supertype_of(ty, names::CALLABLE).is_some()
    }

    // ── declarations ─────────────────────────────────────────────

    pub fn type_params_of(&self, ty: &Type) -> &[TypeParam] {
        ty.decl_name()
            .and_then(|d| self.types.get(d))
            .map(|d| d.type_params.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_interface(&self, ty: &Type) -> bool {
        ty.decl_name().and_then(|d| self.types.get(d)).is_some_and(TypeDecl::is_interface)
    }
}

fn bind_params(params: &[TypeParam], args: &[Type]) -> HashMap<String, Type> {
    params.iter().zip(args).map(|(p, a)| (p.name.clone(), a.clone())).collect()
}

// ── convenience constructors for language types ──────────────────

impl Type {
    pub fn anything() -> Type {
        Type::named(names::ANYTHING)
    }

    pub fn object() -> Type {
        Type::named(names::OBJECT)
    }

    pub fn integer() -> Type {
        Type::named(names::INTEGER)
    }

    pub fn float() -> Type {
        Type::named(names::FLOAT)
    }

    pub fn boolean() -> Type {
        Type::named(names::BOOLEAN)
    }

    pub fn character() -> Type {
        Type::named(names::CHARACTER)
    }

    pub fn string() -> Type {
        Type::named(names::STRING)
    }

    pub fn null() -> Type {
        Type::named(names::NULL)
    }

    pub fn empty() -> Type {
        Type::named(names::EMPTY)
    }

    pub fn iterable(element: Type, absent: Type) -> Type {
        Type::class(names::ITERABLE, vec![element, absent])
    }

    /// `{T*}`.
    pub fn stream(element: Type) -> Type {
        Type::iterable(element, Type::null())
    }

    pub fn sequential(element: Type) -> Type {
        Type::class(names::SEQUENTIAL, vec![element])
    }

    pub fn sequence(element: Type) -> Type {
        Type::class(names::SEQUENCE, vec![element])
    }

    pub fn entry(key: Type, item: Type) -> Type {
        Type::class(names::ENTRY, vec![key, item])
    }

    pub fn callable(ret: Type, args: Type) -> Type {
        Type::class(names::CALLABLE, vec![ret, args])
    }

    /// `[A, B, C*]` built from leading elements and an optional tail type
    /// (a `Sequential` or `Sequence`; `Empty` when absent).
    pub fn tuple(elements: Vec<Type>, tail: Option<Type>) -> Type {
        let mut result = tail.unwrap_or_else(Type::empty);
        for element in elements.into_iter().rev() {
            let union_elem = match result.type_arg(0) {
                Some(rest_elem) if !result.is_decl(names::EMPTY) => {
                    Type::union(vec![element.clone(), rest_elem.clone()])
                }
                _ => element.clone(),
            };
            result = Type::class(names::TUPLE, vec![union_elem, element, result]);
        }
        result
    }
}

fn class(name: &str, java: &str) -> TypeDecl {
    TypeDecl::class(name, format!("ceylon.language.{java}"))
}

fn interface(name: &str, java: &str) -> TypeDecl {
    TypeDecl::interface(name, format!("ceylon.language.{java}"))
}

fn value(name: &str, ty: Type, container: Container) -> MemberDecl {
    MemberDecl::Value(ValueDecl {
        name: name.to_string(),
        ty,
        container,
        flags: MemberFlags { shared: true, ..MemberFlags::default() },
    })
}

fn method(owner: &str, name: &str, return_ty: Type, parameters: Vec<Parameter>, unboxed: bool) -> MemberDecl {
    MemberDecl::Function(FunctionDecl {
        name: name.to_string(),
        return_ty,
        type_params: Vec::new(),
        parameters,
        container: Container::Type(owner.to_string()),
        flags: MemberFlags { shared: true, formal: true, unboxed, ..MemberFlags::default() },
    })
}

fn build_language() -> Model {
    use names::*;

    let mut m = Model::new();
    let p = Type::param;
    let boxed = BoxingStrategy::Boxed;
    let unboxed = BoxingStrategy::Unboxed;

    let mut anything = class(ANYTHING, "Anything");
    anything.java_name = "java.lang.Object".into();
    m.add_type(anything);

    let mut object = class(OBJECT, "Object");
    object.extended = Some(Type::anything());
    m.add_type(object);

    let mut null = class(NULL, "Null");
    null.extended = Some(Type::anything());
    m.add_type(null);

    let mut null_value = class(NULL_VALUE, "null_");
    null_value.extended = Some(Type::null());
    null_value.flags.anonymous = true;
    m.add_type(null_value);

    let mut identifiable = interface(IDENTIFIABLE, "Identifiable");
    identifiable.extended = Some(Type::object());
    m.add_type(identifiable);

    let mut basic = class(BASIC, "Basic");
    basic.extended = Some(Type::object());
    basic.satisfied = vec![Type::named(IDENTIFIABLE)];
    m.add_type(basic);

    let mut comparable = interface(COMPARABLE, "Comparable");
    comparable.type_params = vec![TypeParam::contravariant("Other")];
    comparable.self_type = Some("Other".into());
    m.add_type(comparable);

    let mut summable = interface(SUMMABLE, "Summable");
    summable.type_params = vec![TypeParam::new("Other")];
    summable.self_type = Some("Other".into());
    m.add_type(summable);

    let mut iterable = interface(ITERABLE, "Iterable");
    iterable.type_params = vec![
        TypeParam::covariant("Element"),
        TypeParam::covariant("Absent").bounded(Type::null()),
    ];
    m.add_type(iterable);

    let mut list = interface(LIST, "List");
    list.type_params = vec![TypeParam::covariant("Element")];
    list.satisfied = vec![Type::stream(p("Element"))];
    m.add_type(list);

    let mut sequential = interface(SEQUENTIAL, "Sequential");
    sequential.type_params = vec![TypeParam::covariant("Element")];
    sequential.satisfied = vec![Type::class(LIST, vec![p("Element")])];
    m.add_type(sequential);

    let mut sequence = interface(SEQUENCE, "Sequence");
    sequence.type_params = vec![TypeParam::covariant("Element")];
    sequence.satisfied = vec![Type::sequential(p("Element")), Type::iterable(p("Element"), Type::Nothing)];
    m.add_type(sequence);

    let mut empty = interface(EMPTY, "Empty");
    empty.satisfied = vec![Type::sequential(Type::Nothing)];
    m.add_type(empty);

    let mut tuple = class(TUPLE, "Tuple");
    tuple.type_params = vec![
        TypeParam::covariant("Element"),
        TypeParam::covariant("First").bounded(p("Element")),
        TypeParam::covariant("Rest").bounded(Type::sequential(p("Element"))),
    ];
    tuple.extended = Some(Type::object());
    tuple.satisfied = vec![Type::sequence(p("Element"))];
    tuple.flags.reified = true;
    m.add_type(tuple);

    let mut callable = interface(CALLABLE, "Callable");
    callable.type_params = vec![
        TypeParam::covariant("Return"),
        TypeParam::contravariant("Arguments").bounded(Type::sequential(Type::anything())),
    ];
    m.add_type(callable);

    let mut entry = class(ENTRY, "Entry");
    entry.type_params = vec![
        TypeParam::covariant("Key").bounded(Type::object()),
        TypeParam::covariant("Item"),
    ];
    entry.extended = Some(Type::object());
    entry.flags.reified = true;
    m.add_type(entry);

    let mut range = class(RANGE, "Range");
    range.type_params = vec![TypeParam::new("Element")];
    range.extended = Some(Type::object());
    range.satisfied = vec![Type::sequence(p("Element"))];
    range.flags.reified = true;
    m.add_type(range);

    let mut array = class(ARRAY, "Array");
    array.type_params = vec![TypeParam::new("Element")];
    array.extended = Some(Type::object());
    array.satisfied = vec![Type::class(LIST, vec![p("Element")])];
    array.flags.reified = true;
    m.add_type(array);

    let value_types: [(&str, Option<&str>); 5] = [
        (INTEGER, Some(INTEGER)),
        (FLOAT, Some(FLOAT)),
        (CHARACTER, Some(CHARACTER)),
        (BOOLEAN, None),
        (BYTE, None),
    ];
    for (name, comparable_over) in value_types {
        let mut decl = class(name, name);
        decl.extended = Some(Type::object());
        if let Some(other) = comparable_over {
            decl.satisfied.push(Type::class(COMPARABLE, vec![Type::named(other)]));
        }
        if name == INTEGER || name == FLOAT {
            decl.satisfied.push(Type::class(SUMMABLE, vec![Type::named(name)]));
        }
        decl.flags.value_type = true;
        m.add_type(decl);
    }

    let mut string = class(STRING, "String");
    string.extended = Some(Type::object());
    string.satisfied = vec![
        Type::class(LIST, vec![Type::character()]),
        Type::class(COMPARABLE, vec![Type::string()]),
        Type::class(SUMMABLE, vec![Type::string()]),
    ];
    string.flags.value_type = true;
    m.add_type(string);

    let mut comparison = class(COMPARISON, "Comparison");
    comparison.extended = Some(Type::named(BASIC));
    m.add_type(comparison);

    let mut finished = class(FINISHED, "Finished");
    finished.extended = Some(Type::named(BASIC));
    m.add_type(finished);

    let mut object_array = TypeDecl::class(OBJECT_ARRAY, "java.lang.ObjectArray");
    object_array.type_params = vec![TypeParam::new("Element")];
    object_array.extended = Some(Type::object());
    object_array.flags.java_array = true;
    object_array.parameters = vec![
        Parameter::new("size", Type::integer(), unboxed),
        Parameter::new("element", Type::optional(p("Element")), boxed).defaulted(),
    ];
    m.add_type(object_array);

    let mut long_array = TypeDecl::class(LONG_ARRAY, "java.lang.LongArray");
    long_array.extended = Some(Type::object());
    long_array.flags.java_array = true;
    long_array.parameters = vec![
        Parameter::new("size", Type::integer(), unboxed),
        Parameter::new("element", Type::integer(), unboxed).defaulted(),
    ];
    m.add_type(long_array);

    // ── toplevel values ──────────────────────────────────────────
    m.add_member(value("null", Type::named(NULL_VALUE), Container::Toplevel));
    m.add_member(value("true", Type::boolean(), Container::Toplevel));
    m.add_member(value("false", Type::boolean(), Container::Toplevel));
    m.add_member(value("empty", Type::empty(), Container::Toplevel));
    m.add_member(value("finished", Type::named(FINISHED), Container::Toplevel));
    for name in ["larger", "smaller", "equal"] {
        m.add_member(value(name, Type::named(COMPARISON), Container::Toplevel));
    }
    m.add_member(MemberDecl::Function(FunctionDecl {
        name: "print".into(),
        return_ty: Type::anything(),
        type_params: Vec::new(),
        parameters: vec![Parameter::new("val", Type::anything(), boxed)],
        container: Container::Toplevel,
        flags: MemberFlags { shared: true, ..MemberFlags::default() },
    }));

    // ── members ──────────────────────────────────────────────────
    let int = Type::integer;
    let size = |owner: &str, m: &mut Model| {
        let mut v = value("size", int(), Container::Type(owner.to_string()));
        if let MemberDecl::Value(vd) = &mut v {
            vd.flags.unboxed = true;
            vd.flags.transient = true;
        }
        m.add_member(v);
    };
    size(ITERABLE, &mut m);
    size(STRING, &mut m);
    size(OBJECT_ARRAY, &mut m);
    size(LONG_ARRAY, &mut m);

    m.add_member(method(INTEGER, "plus", int(), vec![Parameter::new("other", int(), unboxed)], true));
    m.add_member(method(INTEGER, "times", int(), vec![Parameter::new("other", int(), unboxed)], true));
    m.add_member(method(
        STRING,
        "startsWith",
        Type::boolean(),
        vec![Parameter::new("substring", Type::string(), unboxed)],
        true,
    ));
    m.add_member(method(
        ITERABLE,
        "contains",
        Type::boolean(),
        vec![Parameter::new("element", Type::object(), boxed)],
        true,
    ));
    for owner in [OBJECT_ARRAY, LONG_ARRAY] {
        let element_array = if owner == OBJECT_ARRAY {
            Type::class(OBJECT_ARRAY, vec![p("Element")])
        } else {
            Type::named(LONG_ARRAY)
        };
        m.add_member(method(
            owner,
            "copyTo",
            Type::anything(),
            vec![
                Parameter::new("destination", element_array, boxed),
                Parameter::new("sourcePosition", int(), unboxed).defaulted(),
                Parameter::new("destinationPosition", int(), unboxed).defaulted(),
                Parameter::new("length", int(), unboxed).defaulted(),
            ],
            false,
        ));
    }
    let key = value("key", p("Key"), Container::Type(ENTRY.into()));
    let item = value("item", p("Item"), Container::Type(ENTRY.into()));
    m.add_member(key);
    m.add_member(item);

    m
}
