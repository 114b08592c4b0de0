#![allow(dead_code)]

use std::process::Command;

use ceylon_lower::ast::Expr;
use ceylon_lower::config::LoweringOptions;
use ceylon_lower::ir::print_expr;
use ceylon_lower::lower::{Cx, Lowerer};
use ceylon_lower::model::{
    BoxingStrategy, Container, FunctionDecl, MemberDecl, MemberFlags, Model, Parameter, Type, ValueDecl,
};

pub fn lowerc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_lowerc"))
}

/// A shared toplevel function with unboxed signature.
pub fn function(name: &str, return_ty: Type, parameters: Vec<Parameter>) -> MemberDecl {
    member_function(name, Container::Toplevel, return_ty, parameters)
}

pub fn member_function(name: &str, container: Container, return_ty: Type, parameters: Vec<Parameter>) -> MemberDecl {
    MemberDecl::Function(FunctionDecl {
        name: name.into(),
        return_ty,
        type_params: Vec::new(),
        parameters,
        container,
        flags: MemberFlags { shared: true, unboxed: true, ..MemberFlags::default() },
    })
}

pub fn int_param(name: &str) -> Parameter {
    Parameter::new(name, Type::integer(), BoxingStrategy::Unboxed)
}

/// Declare a local value and return a reference to it.
pub fn local(m: &mut Model, name: &str, ty: Type, flags: MemberFlags) -> Expr {
    let key = m.add_member(MemberDecl::Value(ValueDecl {
        name: name.into(),
        ty: ty.clone(),
        container: Container::Local { owner: None, in_initializer: false },
        flags,
    }));
    Expr::member(key, ty)
}

pub fn toplevel_value(m: &mut Model, name: &str, ty: Type) {
    m.add_member(MemberDecl::Value(ValueDecl {
        name: name.into(),
        ty,
        container: Container::Toplevel,
        flags: MemberFlags::default(),
    }));
}

pub fn callable_of(ret: Type, args: Vec<Type>) -> Type {
    Type::callable(ret, Type::tuple(args, None))
}

pub fn lower_with(m: &Model, options: &LoweringOptions, cx: Cx<'_>, e: &Expr, boxing: BoxingStrategy) -> String {
    let l = Lowerer::new(m, options);
    print_expr(&l.lower_expression(cx, e, boxing, Some(&e.ty)).unwrap())
}

pub fn lower(m: &Model, e: &Expr, boxing: BoxingStrategy) -> String {
    lower_with(m, &LoweringOptions::default(), Cx::default(), e, boxing)
}

/// Lowering without reified type arguments, which keeps expected strings short.
pub fn lower_unreified(m: &Model, e: &Expr, boxing: BoxingStrategy) -> String {
    let options = LoweringOptions { reified_generics: false, ..LoweringOptions::default() };
    lower_with(m, &options, Cx::default(), e, boxing)
}
