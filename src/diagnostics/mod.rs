use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::span::Span;

#[derive(Debug, Error)]
pub enum LowerError {
    #[error("Literal error: {msg}")]
    Literal { msg: String, span: Span },

    #[error("Unsupported: {msg}")]
    Unsupported { msg: String, span: Span },

    #[error("Internal compiler error: {msg}")]
    Internal { msg: String },

    #[error("Config error: {msg}")]
    Config { msg: String, path: PathBuf },

    #[error("Input error: {msg}")]
    Input { msg: String },
}

impl LowerError {
    pub fn literal(msg: impl Into<String>, span: Span) -> Self {
        Self::Literal { msg: msg.into(), span }
    }

    pub fn unsupported(msg: impl Into<String>, span: Span) -> Self {
        Self::Unsupported { msg: msg.into(), span }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal { msg: msg.into() }
    }

    pub fn config(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Config { msg: msg.into(), path }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input { msg: msg.into() }
    }

    /// Node-scoped errors are recovered from by emitting a placeholder;
    /// everything else aborts the enclosing entry point.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, LowerError::Literal { .. } | LowerError::Unsupported { .. })
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            LowerError::Literal { span, .. } | LowerError::Unsupported { span, .. } => Some(*span),
            _ => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            LowerError::Literal { msg, .. }
            | LowerError::Unsupported { msg, .. }
            | LowerError::Internal { msg }
            | LowerError::Config { msg, .. }
            | LowerError::Input { msg } => msg,
        }
    }
}

/// A diagnostic attached to the source node that produced an erroneous
/// placeholder in the lowered tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self { message: message.into(), span }
    }

    pub fn is_compiler_bug(&self) -> bool {
        self.message.starts_with("compiler bug:")
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {})", self.message, self.span)
    }
}

/// Render a diagnostic with ariadne against the unit's source text.
/// Falls back to a single line when there is no source or no position.
pub fn render_diagnostic(source: Option<&str>, filename: &str, diag: &Diagnostic) {
    use ariadne::{Label, Report, ReportKind, Source};

    let Some(source) = source.filter(|_| !diag.span.is_dummy()) else {
        eprintln!("error: {}: {}", filename, diag.message);
        return;
    };
    let kind = if diag.is_compiler_bug() { "internal" } else { "lowering" };
    let report = Report::build(ReportKind::Error, (), diag.span.start)
        .with_message(format!("{kind} error in {filename}"))
        .with_label(Label::new(diag.span.range()).with_message(&diag.message))
        .finish();
    if let Err(err) = report.eprint(Source::from(source)) {
        eprintln!("error: {}: {} ({err})", filename, diag.message);
    }
}

/// Render a fatal error the way the driver reports it.
pub fn render_error(source: Option<&str>, filename: &str, err: &LowerError) {
    match err.span() {
        Some(span) => render_diagnostic(source, filename, &Diagnostic::new(err.message(), span)),
        None => match err {
            LowerError::Config { msg, path } => {
                eprintln!("error[config]: {msg}");
                eprintln!("  --> {}", path.display());
            }
            _ => eprintln!("error: {err}"),
        },
    }
}
