//! Argument binding: one lowered argument per parameter, in declaration
//! order, following the calling convention of the callee.

use tracing::trace;

use crate::ast::{Expr, ExprKind, PositionalArg};
use crate::diagnostics::LowerError;
use crate::ir::{JBinaryOp, JExpr, JStmt, JType, JTypeArg};
use crate::model::{names, BoxingStrategy, ParamDefault, Prim, Type};
use crate::span::Span;

use super::boxing::Source;
use super::context::{CastFlags, Cx, Lowered, Request};
use super::invocation::CallShape;
use super::java_types::JtFlags;
use super::Lowerer;

/// Lowered arguments plus the statements that must run before the call.
#[derive(Debug, Default)]
pub(crate) struct BoundArgs {
    pub prelude: Vec<JStmt>,
    pub args: Vec<JExpr>,
    pub branch: Option<Span>,
}

impl BoundArgs {
    fn push(&mut self, value: Lowered) {
        self.branch = self.branch.or(value.backward_branch);
        self.args.push(value.expr);
    }
}

/// Where the value of an omitted defaulted parameter comes from.
#[derive(Debug, Clone)]
pub(crate) enum Defaults {
    /// `f$p(preceding...)`, next to the function.
    Function { qualifier: Option<JExpr>, name: String },
    /// `Class.$default$p(preceding...)`.
    Class { class: String },
    /// `copyTo` on a foreign array: positions start at zero and the length
    /// is the receiver's.
    ArrayCopy { receiver: JExpr },
}

impl Defaults {
    pub fn call(&self, param: &str, preceding: Vec<JExpr>) -> Result<JExpr, LowerError> {
        Ok(match self {
            Defaults::Function { qualifier, name } => {
                let method = format!("{name}${param}");
                match qualifier {
                    Some(q) => q.clone().invoke(method, preceding),
                    None => JExpr::call(JExpr::ident(method), preceding),
                }
            }
            Defaults::Class { class } => JExpr::path(class).invoke(format!("$default${param}"), preceding),
            Defaults::ArrayCopy { receiver } => match param {
                "sourcePosition" | "destinationPosition" => JExpr::long(0),
                "length" => receiver.clone().select("length"),
                other => return Err(LowerError::internal(format!("copyTo has no defaulted parameter {other}"))),
            },
        })
    }
}

/// Whether the plain arguments have to be evaluated once into variables
/// ahead of the call: an omitted default is computed by a method taking
/// the preceding arguments, or a spread onto fixed parameters is unpacked
/// into temporaries that must not run before the arguments left of it.
pub(crate) fn needs_argument_temps(shape: &dyn CallShape, args: &[PositionalArg]) -> bool {
    if let Some(i) = args.iter().position(PositionalArg::is_spread) {
        return i > 0 && i < shape.num_parameters() && !shape.is_variadic(i);
    }
    (args.len()..shape.num_parameters())
        .any(|i| !shape.is_variadic(i) && matches!(shape.default(i), ParamDefault::Defaulted))
}

impl Lowerer<'_> {
    /// Bind positional arguments to `shape`. With `alias`, every bound
    /// value is stored in `{alias}${i}` and passed by name.
    pub(crate) fn bind_positional(
        &self,
        cx: Cx<'_>,
        shape: &dyn CallShape,
        args: &[PositionalArg],
        alias: Option<&str>,
        defaults: Option<&Defaults>,
    ) -> Result<BoundArgs, LowerError> {
        let count = shape.num_parameters();
        if args.len() > count && !(count > 0 && shape.is_variadic(count - 1)) {
            let span = args.get(count).map(|a| a.expr().span).unwrap_or_else(Span::dummy);
            return Err(LowerError::unsupported(
                format!("compiler bug: {} arguments for {count} parameters", args.len()),
                span,
            ));
        }
        let mut out = BoundArgs::default();
        for i in 0..count {
            let value = if shape.is_variadic(i) {
                self.variadic_argument(cx, shape, i, args.get(i..).unwrap_or(&[]))?
            } else {
                match args.get(i) {
                    Some(PositionalArg::Plain(e)) => self.lower(cx, e, &shape.request(i))?,
                    Some(spread) => {
                        self.destructure_spread(cx, shape, i, spread.expr(), defaults, &mut out)?;
                        break;
                    }
                    None => self.default_argument(cx, shape, i, &out.args, defaults)?,
                }
            };
            trace!(param = shape.parameter_name(i), unboxed = value.unboxed, "bound argument");
            self.push_argument(&mut out, shape, i, value, alias);
        }
        Ok(out)
    }

    fn push_argument(&self, out: &mut BoundArgs, shape: &dyn CallShape, i: usize, value: Lowered, alias: Option<&str>) {
        let Some(base) = alias else {
            out.push(value);
            return;
        };
        let name = format!("{base}${i}");
        out.prelude.push(JStmt::final_var(self.argument_type(shape, i), &name, value.expr));
        out.push(Lowered::new(JExpr::ident(name), value.unboxed).with_branch(value.backward_branch));
    }

    /// Declared type of the variable holding argument `i`.
    pub(crate) fn argument_type(&self, shape: &dyn CallShape, i: usize) -> JType {
        match shape.variadic(i) {
            Some(_) if shape.java_variadic(i) => {
                JType::array_of(self.oracle.java_type_for(&shape.parameter_type(i), shape.boxing(i)))
            }
            Some(_) => self.oracle.java_type(&shape.sequence_type(i), JtFlags::NO_PRIMITIVES),
            None => self.oracle.java_type_for(&shape.parameter_type(i), shape.boxing(i)),
        }
    }

    /// Value of an omitted parameter.
    pub(crate) fn default_argument(
        &self,
        cx: Cx<'_>,
        shape: &dyn CallShape,
        i: usize,
        preceding: &[JExpr],
        defaults: Option<&Defaults>,
    ) -> Result<Lowered, LowerError> {
        let name = shape.parameter_name(i);
        match shape.default(i) {
            ParamDefault::DefaultedEmpty => Ok(Lowered::boxed(self.make_empty())),
            ParamDefault::Inline(e) => self.lower(cx, e, &shape.request(i)),
            ParamDefault::Defaulted => match defaults {
                Some(d) => {
                    let call = d.call(name, preceding.to_vec())?;
                    Ok(Lowered::new(call, shape.boxing(i) == BoxingStrategy::Unboxed))
                }
                None => Err(LowerError::unsupported(
                    format!("compiler bug: no default value method for parameter {name}"),
                    Span::dummy(),
                )),
            },
            ParamDefault::Required if shape.is_variadic(i) => Ok(Lowered::boxed(self.make_empty())),
            ParamDefault::Required => Err(LowerError::unsupported(
                format!("compiler bug: missing argument for parameter {name}"),
                Span::dummy(),
            )),
        }
    }

    // ── variadic parameters ──────────────────────────────────────

    /// The value passed for variadic parameter `i`, from the trailing
    /// arguments.
    pub(crate) fn variadic_argument(
        &self,
        cx: Cx<'_>,
        shape: &dyn CallShape,
        i: usize,
        rest: &[PositionalArg],
    ) -> Result<Lowered, LowerError> {
        let element = shape.parameter_type(i);
        let java_variadic = shape.java_variadic(i);
        match rest {
            [] if java_variadic => Ok(Lowered::boxed(JExpr::NewArray {
                element: self.oracle.java_type_for(&element, shape.boxing(i)),
                dims: Vec::new(),
                elems: Some(Vec::new()),
            })),
            [] => Ok(Lowered::boxed(self.make_empty())),
            [single] if single.is_spread() => self.forward_spread(cx, shape, i, single.expr()),
            _ if java_variadic => {
                let mut values = Vec::with_capacity(rest.len());
                let mut branch = None;
                for arg in rest {
                    let PositionalArg::Plain(e) = arg else {
                        return Err(LowerError::unsupported(
                            "compiler bug: spread argument mixed with arguments to a foreign variadic parameter",
                            arg.expr().span,
                        ));
                    };
                    let lowered = self.lower(cx, e, &Request::new(shape.boxing(i), Some(element.clone())))?;
                    branch = branch.or(lowered.backward_branch);
                    values.push(lowered.expr);
                }
                let array = JExpr::NewArray {
                    element: self.oracle.java_type_for(&element, shape.boxing(i)),
                    dims: Vec::new(),
                    elems: Some(values),
                };
                Ok(Lowered::boxed(array).with_branch(branch))
            }
            _ => {
                let (plain, tail) = match rest.split_last() {
                    Some((last, init)) if last.is_spread() => (init, Some(last)),
                    _ => (rest, None),
                };
                let mut values = Vec::with_capacity(plain.len());
                let mut branch = None;
                for arg in plain {
                    let lowered = self.lower(cx, arg.expr(), &Request::boxed(element.clone()))?;
                    branch = branch.or(lowered.backward_branch);
                    values.push(lowered.expr);
                }
                let sequence = match tail {
                    None => self.make_sequence(&element, values),
                    Some(tail) => {
                        let tail = self.sequential_value(cx, &element, tail.expr())?;
                        branch = branch.or(tail.backward_branch);
                        self.make_tuple_with_tail(&element, values, tail.expr, true)
                    }
                };
                Ok(Lowered::boxed(sequence).with_branch(branch))
            }
        }
    }

    /// `new ArraySequence<T>(reified T, new Object[]{...})`.
    pub(crate) fn make_sequence(&self, element: &Type, values: Vec<JExpr>) -> JExpr {
        let class = JType::generic(
            "ceylon.language.ArraySequence",
            vec![JTypeArg::Type(self.oracle.java_type(element, JtFlags::TYPE_ARGUMENT))],
        );
        let mut args = self.reified_arguments(std::slice::from_ref(element));
        args.push(object_array(values));
        JExpr::new_class(class, args)
    }

    /// `new Tuple(reified T, new Object[]{...}, tail)`. Raw when the tail
    /// type is not statically known.
    pub(crate) fn make_tuple_with_tail(&self, element: &Type, values: Vec<JExpr>, tail: JExpr, raw: bool) -> JExpr {
        let class = if raw {
            JType::class("ceylon.language.Tuple")
        } else {
            JType::generic(
                "ceylon.language.Tuple",
                vec![JTypeArg::Type(self.oracle.java_type(element, JtFlags::TYPE_ARGUMENT))],
            )
        };
        let mut args = self.reified_arguments(std::slice::from_ref(element));
        args.push(object_array(values));
        args.push(tail);
        JExpr::new_class(class, args)
    }

    /// A spread expression as a `Sequential<T>`: sequential values pass
    /// through, other iterables are materialized with `sequence()`.
    pub(crate) fn sequential_value(&self, cx: Cx<'_>, element: &Type, spread: &Expr) -> Result<Lowered, LowerError> {
        if let ExprKind::Comprehension(comp) = &spread.unparenthesized().kind {
            let iterable = self.lower_comprehension_node(cx, comp, Some(&Type::stream(element.clone())))?;
            return Ok(iterable.map(|e| e.invoke("sequence", Vec::new())));
        }
        if self.model.is_sequential(&spread.ty) {
            return self.lower(cx, spread, &Request::boxed(Type::sequential(element.clone())));
        }
        let iterable = self.lower(cx, spread, &Request::boxed(Type::stream(element.clone())))?;
        Ok(iterable.map(|e| e.invoke("sequence", Vec::new())))
    }

    /// A single spread argument passed on as the variadic parameter.
    fn forward_spread(&self, cx: Cx<'_>, shape: &dyn CallShape, i: usize, spread: &Expr) -> Result<Lowered, LowerError> {
        let element = shape.parameter_type(i);
        let sequence = self.sequential_value(cx, &element, spread)?;
        if !shape.java_variadic(i) {
            trace!(param = shape.parameter_name(i), "forwarding spread sequence");
            return Ok(sequence);
        }
        let converter = match self.oracle.primitive_of(&element) {
            _ if shape.boxing(i) == BoxingStrategy::Boxed => None,
            Some(Prim::Long) => Some("toLongArray"),
            Some(Prim::Double) => Some("toDoubleArray"),
            Some(Prim::Boolean) => Some("toBooleanArray"),
            Some(Prim::Int) => Some("toIntArray"),
            _ if self.oracle.simplify(&element).is_decl(names::STRING) => Some("toJavaStringArray"),
            _ => None,
        };
        Ok(sequence.map(|seq| match converter {
            Some(method) => self.util(method, vec![seq]),
            None => {
                let empty = JExpr::NewArray {
                    element: self.oracle.java_type(&element, JtFlags::NO_PRIMITIVES),
                    dims: vec![JExpr::int(0)],
                    elems: None,
                };
                self.util("toArray", vec![seq, empty])
            }
        }))
    }

    // ── spread onto fixed parameters ─────────────────────────────

    /// `f(*t)` where `f` has fixed parameters from `first` on: the tuple is
    /// held in `$spread$N` and its statically known elements are read into
    /// `$spread$N$k`. Positions past the known minimum length fall back to
    /// a size test against the default.
    fn destructure_spread(
        &self,
        cx: Cx<'_>,
        shape: &dyn CallShape,
        first: usize,
        spread: &Expr,
        defaults: Option<&Defaults>,
        out: &mut BoundArgs,
    ) -> Result<(), LowerError> {
        let Some(tuple) = self.model.tuple_shape(&spread.ty) else {
            return Err(LowerError::unsupported(
                format!("compiler bug: spread argument of type {} is not a sequence", spread.ty),
                spread.span,
            ));
        };
        let temp = self.fresh("$spread");
        let lowered = self.lower(cx, spread, &Request::boxed(spread.ty.clone()))?;
        out.branch = out.branch.or(lowered.backward_branch);
        out.prelude.push(JStmt::final_var(self.oracle.java_type(&spread.ty, JtFlags::NO_PRIMITIVES), &temp, lowered.expr));
        trace!(%temp, min = tuple.min_len(), exact = tuple.is_exact(), "destructuring spread argument");

        for i in first..shape.num_parameters() {
            let k = i - first;
            let index = self.box_value(JExpr::long(k as i64), &Type::integer());
            if shape.is_variadic(i) {
                let tail = if k == 0 {
                    JExpr::ident(&temp)
                } else {
                    JExpr::ident(&temp).invoke("spanFrom", vec![index])
                };
                out.push(Lowered::boxed(tail));
                break;
            }
            let element_ty = tuple
                .elements
                .get(k)
                .or(tuple.rest.as_ref())
                .cloned()
                .unwrap_or_else(Type::anything);
            let known = k < tuple.min_len();
            let past_end = tuple.is_exact() && k >= tuple.elements.len();
            let value = if past_end {
                self.default_argument(cx, shape, i, &out.args, defaults)?
            } else {
                let get = JExpr::ident(&temp).invoke("get", vec![index]);
                let req = shape.request(i).with_flags(CastFlags::DOWN_CAST);
                let element = self.apply_erasure_and_boxing(Lowered::boxed(get), Source::boxed(&element_ty).erased(true), &req);
                if known || matches!(shape.default(i), ParamDefault::Required) {
                    element
                } else {
                    let fallback = self.default_argument(cx, shape, i, &out.args, defaults)?;
                    let (fallback, _) = self.box_unbox_if_necessary(
                        fallback.expr,
                        !fallback.unboxed,
                        &shape.parameter_type(i),
                        if element.unboxed { BoxingStrategy::Unboxed } else { BoxingStrategy::Boxed },
                    );
                    let size = JExpr::ident(&temp).invoke("getSize", Vec::new());
                    let test = JExpr::binary(JBinaryOp::Gt, size, JExpr::long(k as i64));
                    Lowered::new(JExpr::conditional(test, element.expr, fallback), element.unboxed)
                }
            };
            let name = format!("{temp}${k}");
            out.prelude.push(JStmt::final_var(self.argument_type(shape, i), &name, value.expr));
            out.push(Lowered::new(JExpr::ident(name), value.unboxed));
        }
        Ok(())
    }
}

fn object_array(values: Vec<JExpr>) -> JExpr {
    JExpr::NewArray { element: JType::object(), dims: Vec::new(), elems: Some(values) }
}
