use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::diagnostics::LowerError;

pub const DEFAULT_UTIL_CLASS: &str = "com.redhat.ceylon.compiler.java.Util";

/// Knobs for the lowering engine, usually read from a `lower.toml`.
///
/// ```toml
/// optimise_operators = true
/// max_inline_power = 16
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoweringOptions {
    /// Use native operators when both operands have a primitive representation.
    pub optimise_operators: bool,
    /// Strength-reduce `b^n` for literal `n` into a multiplication chain.
    pub optimise_constant_powers: bool,
    /// Largest literal power that is strength-reduced.
    pub max_inline_power: u32,
    /// Pass reified type descriptors to generic calls.
    pub reified_generics: bool,
    /// Wrap values of foreign, null-permitting origin in a runtime null check.
    pub unchecked_null_checks: bool,
    /// Fully qualified name of the runtime helper class.
    pub runtime_util_class: String,
}

impl Default for LoweringOptions {
    fn default() -> Self {
        Self {
            optimise_operators: true,
            optimise_constant_powers: true,
            max_inline_power: 64,
            reified_generics: true,
            unchecked_null_checks: true,
            runtime_util_class: DEFAULT_UTIL_CLASS.to_string(),
        }
    }
}

impl LoweringOptions {
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, LowerError> {
        let options: LoweringOptions = toml::from_str(content)
            .map_err(|e| LowerError::config(format!("invalid lowering options: {e}"), path.to_path_buf()))?;
        options.validate(path)?;
        Ok(options)
    }

    pub fn load(path: &Path) -> Result<Self, LowerError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LowerError::config(format!("could not read {}: {e}", path.display()), path.to_path_buf())
        })?;
        Self::from_toml_str(&content, path)
    }

    fn validate(&self, path: &Path) -> Result<(), LowerError> {
        if self.runtime_util_class.trim().is_empty() {
            return Err(LowerError::config("runtime_util_class must not be empty", path.to_path_buf()));
        }
        if self.max_inline_power == 0 {
            return Err(LowerError::config("max_inline_power must be at least 1", path.to_path_buf()));
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, LowerError> {
        toml::to_string(self).map_err(|e| LowerError::internal(format!("could not serialize options: {e}")))
    }
}
