pub mod span;
pub mod diagnostics;
pub mod config;
pub mod model;
pub mod ast;
pub mod ir;
pub mod lower;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ast::Expr;
use config::LoweringOptions;
use diagnostics::{Diagnostic, LowerError};
use ir::{JExpr, JStmt};
use lower::{Cx, Lowerer, Scope};
use model::{BoxingStrategy, Model, Type};

/// A self-contained lowering job: the declarations the expressions refer
/// to (on top of the language module) and the expressions themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoweringUnit {
    /// Source text the spans point into, used for diagnostics only.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub model: Model,
    #[serde(default)]
    pub expressions: Vec<UnitExpression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitExpression {
    pub name: String,
    pub expr: Expr,
    #[serde(default = "boxed")]
    pub boxing: BoxingStrategy,
    /// Type the consumer expects; the expression's own type when absent.
    #[serde(default)]
    pub expected: Option<Type>,
    /// Lower as a statement whose value is discarded.
    #[serde(default)]
    pub statement: bool,
    /// Class whose body the expression appears in.
    #[serde(default)]
    pub class: Option<String>,
}

fn boxed() -> BoxingStrategy {
    BoxingStrategy::Boxed
}

/// Result of lowering one named expression.
#[derive(Debug, Clone, PartialEq)]
pub struct LoweredExpression {
    pub name: String,
    pub output: LoweredOutput,
    /// One entry per erroneous placeholder in the output.
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoweredOutput {
    Expr(JExpr),
    Stmt(JStmt),
}

impl LoweredOutput {
    pub fn render(&self) -> String {
        match self {
            LoweredOutput::Expr(e) => ir::print_expr(e),
            LoweredOutput::Stmt(s) => ir::print_stmt(s).trim_end().to_string(),
        }
    }
}

impl LoweringUnit {
    pub fn from_json(json: &str) -> Result<Self, LowerError> {
        serde_json::from_str(json).map_err(|e| LowerError::input(format!("invalid lowering unit: {e}")))
    }

    /// The unit's declarations layered over the language module.
    pub fn full_model(&self) -> Model {
        let mut model = Model::with_language();
        model.types.extend(self.model.types.iter().map(|(k, v)| (k.clone(), v.clone())));
        model.members.extend(self.model.members.iter().map(|(k, v)| (k.clone(), v.clone())));
        model
    }
}

/// Lower every expression of a unit. Recoverable failures show up as
/// diagnostics of the expression they occurred in; a fatal error aborts the
/// whole unit.
pub fn lower_unit(unit: &LoweringUnit, options: &LoweringOptions) -> Result<Vec<LoweredExpression>, LowerError> {
    let model = unit.full_model();
    let lowerer = Lowerer::new(&model, options);
    info!(expressions = unit.expressions.len(), "lowering unit");
    unit.expressions.iter().map(|e| lower_one(&lowerer, e)).collect()
}

fn lower_one(lowerer: &Lowerer<'_>, item: &UnitExpression) -> Result<LoweredExpression, LowerError> {
    debug!(name = %item.name, statement = item.statement, "lowering expression");
    let scope = match &item.class {
        Some(class) => Scope::in_class(class),
        None => Scope::toplevel(),
    };
    let cx = Cx::new(scope);
    let (output, diagnostics) = if item.statement {
        let stmt = lowerer.lower_statement(cx, &item.expr)?;
        let diagnostics = ir::stmt_errors(&stmt);
        (LoweredOutput::Stmt(stmt), diagnostics)
    } else {
        let expected = item.expected.as_ref().unwrap_or(&item.expr.ty);
        let expr = lowerer.lower_expression(cx, &item.expr, item.boxing, Some(expected))?;
        let diagnostics = ir::errors(&expr);
        (LoweredOutput::Expr(expr), diagnostics)
    };
    Ok(LoweredExpression { name: item.name.clone(), output, diagnostics })
}

/// Lower a single expression against the language module only.
pub fn lower_standalone(expr: &Expr, boxing: BoxingStrategy, options: &LoweringOptions) -> Result<JExpr, LowerError> {
    let lowerer = Lowerer::new(Model::language(), options);
    lowerer.lower_expression(Cx::default(), expr, boxing, Some(&expr.ty))
}
