//! `super(...)` delegation from a class initializer.
//!
//! The arguments are evaluated while the new instance is still
//! unconstructed. When one of them contains a backward branch the
//! argument expressions are moved into private static `$superarg$N`
//! methods taking the class's own parameters, so nothing crosses the
//! branch with the uninitialized receiver on the operand stack.

use tracing::{debug, warn};

use crate::ast::PositionalArg;
use crate::diagnostics::LowerError;
use crate::ir::{JExpr, JMethod, JStmt, JType, Modifiers};
use crate::model::{ParamDefault, Type, TypeDecl, Variadic};
use crate::span::Span;

use super::arguments::Defaults;
use super::context::Cx;
use super::invocation::{CallShape, DeclaredParameters};
use super::java_types::{JtFlags, TYPE_DESCRIPTOR};
use super::Lowerer;

const BACKWARD_BRANCH_IN_NESTED: &str = "compiler bug: use of expressions which imply a loop (or other backward \
     branch) in the invocation of a super class initializer are currently only supported on top level classes";

/// A lowered superclass initializer invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SuperCall {
    /// The `super(...)` statement.
    pub call: JStmt,
    /// Static methods the arguments were hoisted into; to be added to the
    /// class.
    pub helpers: Vec<JMethod>,
}

impl<'m> Lowerer<'m> {
    pub(crate) fn lower_super_call(
        &self,
        cx: Cx<'_>,
        class: &str,
        superclass: &Type,
        args: &[PositionalArg],
    ) -> Result<SuperCall, LowerError> {
        match self.super_call(cx, class, superclass, args) {
            Err(err) if err.is_recoverable() => {
                let span = err.span().unwrap_or_else(Span::dummy);
                warn!(class, %span, "{}", err.message());
                let call = JStmt::exec(JExpr::erroneous(err.message(), span));
                Ok(SuperCall { call, helpers: Vec::new() })
            }
            other => other,
        }
    }

    fn super_call(
        &self,
        cx: Cx<'_>,
        class: &str,
        superclass: &Type,
        args: &[PositionalArg],
    ) -> Result<SuperCall, LowerError> {
        let subclass = self.type_decl(class)?;
        let super_name = superclass
            .decl_name()
            .ok_or_else(|| LowerError::internal(format!("superclass {superclass} of {class} is not a class")))?;
        let super_decl = self.type_decl(super_name)?;
        let shape = DeclaredParameters::new(&super_decl.parameters, self.model.type_arguments(superclass));
        let defaults = Defaults::Class { class: super_decl.java_name.clone() };

        let arg_cx = cx
            .expression()
            .within_invocation(false)
            .within_super_invocation(Some(class))
            .with_uninitialized_operand(true);
        // Nothing may be declared ahead of `super(...)`, so omitted defaults
        // take the preceding argument expressions directly.
        let bound = self.bind_positional(arg_cx, &shape, args, None, Some(&defaults))?;

        let mut call_args = if super_decl.flags.reified {
            self.reified_arguments(superclass.type_args())
        } else {
            Vec::new()
        };
        let Some(span) = bound.branch else {
            call_args.extend(bound.args);
            return Ok(SuperCall { call: self.super_statement(bound.prelude, call_args), helpers: Vec::new() });
        };

        debug!(class, args = bound.args.len(), "hoisting super initializer arguments");
        if !subclass.is_toplevel() {
            return Err(LowerError::unsupported(BACKWARD_BRANCH_IN_NESTED, span));
        }
        if !bound.prelude.is_empty() {
            return Err(LowerError::unsupported(
                "compiler bug: spread argument in a super class initializer invocation with a backward branch",
                span,
            ));
        }
        let mut hoisted: Vec<JExpr> = Vec::with_capacity(bound.args.len());
        let mut helpers = Vec::with_capacity(bound.args.len());
        for (i, value) in bound.args.into_iter().enumerate() {
            let omitted = i >= args.len() && !shape.is_variadic(i);
            let value = match shape.default(i) {
                ParamDefault::Defaulted if omitted => defaults.call(shape.parameter_name(i), hoisted.clone())?,
                _ => value,
            };
            let helper = self.super_argument_helper(subclass, i, self.argument_type(&shape, i), value);
            let forwarded = helper.params.iter().map(|(_, name)| JExpr::ident(name)).collect();
            hoisted.push(JExpr::call(JExpr::ident(&helper.name), forwarded));
            helpers.push(helper);
        }
        call_args.extend(hoisted);
        Ok(SuperCall { call: self.super_statement(Vec::new(), call_args), helpers })
    }

    /// `private static T $superarg$i(<class parameters>) { return value; }`
    fn super_argument_helper(&self, subclass: &TypeDecl, i: usize, result: JType, value: JExpr) -> JMethod {
        let mut params = Vec::new();
        if self.options.reified_generics {
            params.extend(
                subclass.type_params.iter().map(|tp| (JType::class(TYPE_DESCRIPTOR), format!("$reified${}", tp.name))),
            );
        }
        params.extend(subclass.parameters.iter().map(|p| {
            let ty = match p.variadic {
                Some(_) => {
                    let seq = if p.variadic == Some(Variadic::Plus) {
                        Type::sequence(p.ty.clone())
                    } else {
                        Type::sequential(p.ty.clone())
                    };
                    self.oracle.java_type(&seq, JtFlags::NO_PRIMITIVES)
                }
                None => self.oracle.java_type_for(&p.ty, p.boxing),
            };
            (ty, p.name.clone())
        }));
        JMethod {
            modifiers: Modifiers::PRIVATE | Modifiers::STATIC,
            name: format!("$superarg${i}"),
            result: Some(result),
            params,
            body: vec![JStmt::ret(value)],
        }
    }

    fn super_statement(&self, prelude: Vec<JStmt>, args: Vec<JExpr>) -> JStmt {
        JStmt::exec(JExpr::let_expr(prelude, JExpr::call(JExpr::ident("super"), args)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, ExprKind, MemberOp};
    use crate::config::LoweringOptions;
    use crate::ir::{print_member, print_stmt, JMember};
    use crate::model::{BoxingStrategy, Container, MemberDecl, MemberFlags, Model, Parameter, ValueDecl};

    fn model(nested: bool) -> Model {
        let mut m = Model::with_language();
        let mut base = TypeDecl::class("Base", "app.Base");
        base.extended = Some(Type::object());
        base.parameters = vec![
            Parameter::new("size", Type::integer(), BoxingStrategy::Unboxed),
            Parameter::new("label", Type::string(), BoxingStrategy::Unboxed).defaulted(),
        ];
        m.add_type(base);
        let mut derived = TypeDecl::class("Derived", "app.Derived");
        derived.extended = Some(Type::named("Base"));
        derived.parameters = vec![Parameter::new("xs", Type::sequential(Type::string()), BoxingStrategy::Boxed)];
        if nested {
            derived.container = Container::Type("Outer".into());
        }
        m.add_type(derived);
        m.add_member(MemberDecl::Value(ValueDecl {
            name: "xs".into(),
            ty: Type::sequential(Type::string()),
            container: Container::Local { owner: Some("Derived".into()), in_initializer: true },
            flags: MemberFlags { class_parameter: true, ..MemberFlags::default() },
        }));
        m
    }

    fn xs() -> Expr {
        Expr::member("Derived::xs", Type::sequential(Type::string()))
    }

    /// `xs*.size.size`: the spread member access loops over its receiver.
    fn looping_argument() -> Expr {
        let sizes = Expr::new(
            ExprKind::QualifiedMember {
                receiver: Box::new(xs()),
                decl: "Iterable.size".into(),
                op: MemberOp::Spread,
                type_args: Vec::new(),
            },
            Type::sequential(Type::integer()),
        );
        Expr::qualified(sizes, "Iterable.size", Type::integer())
    }

    fn lower(m: &Model, args: Vec<PositionalArg>) -> SuperCall {
        let options = LoweringOptions::default();
        let l = Lowerer::new(m, &options);
        l.lower_super_initializer(Cx::default(), "Derived", &Type::named("Base"), &args).unwrap()
    }

    // ===== Plain delegation =====

    #[test]
    fn test_arguments_passed_in_place() {
        let m = model(false);
        let call = lower(&m, vec![PositionalArg::Plain(Expr::natural("1")), PositionalArg::Plain(Expr::string("a"))]);
        assert_eq!(print_stmt(&call.call), "super(1L, \"a\");\n");
        assert!(call.helpers.is_empty());
    }

    #[test]
    fn test_defaulted_argument_uses_class_default_method() {
        let m = model(false);
        let call = lower(&m, vec![PositionalArg::Plain(Expr::natural("1"))]);
        assert_eq!(print_stmt(&call.call), "super(1L, app.Base.$default$label(1L));\n");
    }

    #[test]
    fn test_class_parameter_read_directly() {
        let m = model(false);
        let size = Expr::qualified(xs(), "Iterable.size", Type::integer());
        let call = lower(&m, vec![PositionalArg::Plain(size), PositionalArg::Plain(Expr::string("a"))]);
        assert_eq!(print_stmt(&call.call), "super(xs.getSize(), \"a\");\n");
    }

    // ===== Backward branches =====

    #[test]
    fn test_backward_branch_hoists_arguments() {
        let m = model(false);
        let call = lower(&m, vec![PositionalArg::Plain(looping_argument()), PositionalArg::Plain(Expr::string("a"))]);
        assert_eq!(print_stmt(&call.call), "super($superarg$0(xs), $superarg$1(xs));\n");
        assert_eq!(call.helpers.len(), 2);
        let first = print_member(&JMember::Method(call.helpers[0].clone()));
        assert!(
            first.starts_with("private static long $superarg$0(ceylon.language.Sequential<"),
            "{first}"
        );
        assert!(first.contains("return "), "{first}");
        let second = print_member(&JMember::Method(call.helpers[1].clone()));
        assert!(second.contains("return \"a\";"), "{second}");
    }

    #[test]
    fn test_backward_branch_hoists_omitted_default() {
        let m = model(false);
        let call = lower(&m, vec![PositionalArg::Plain(looping_argument())]);
        assert_eq!(print_stmt(&call.call), "super($superarg$0(xs), $superarg$1(xs));\n");
        assert_eq!(call.helpers.len(), 2);
        let default = print_member(&JMember::Method(call.helpers[1].clone()));
        assert!(default.starts_with("private static java.lang.String $superarg$1("), "{default}");
        assert!(default.contains("return app.Base.$default$label($superarg$0(xs));"), "{default}");
    }

    #[test]
    fn test_backward_branch_in_nested_class_is_reported() {
        let m = model(true);
        let call = lower(&m, vec![PositionalArg::Plain(looping_argument()), PositionalArg::Plain(Expr::string("a"))]);
        assert!(call.helpers.is_empty());
        let text = print_stmt(&call.call);
        assert!(text.contains("currently only supported on top level classes"), "{text}");
    }

    #[test]
    fn test_unknown_superclass_is_fatal() {
        let m = model(false);
        let options = LoweringOptions::default();
        let l = Lowerer::new(&m, &options);
        let err = l.lower_super_initializer(Cx::default(), "Derived", &Type::named("Missing"), &[]).unwrap_err();
        assert!(matches!(err, LowerError::Internal { .. }));
    }
}
