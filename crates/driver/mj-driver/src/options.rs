//! Compile options, loadable from TOML

use crate::ConfigError;
use mj_ir_build::BuildOptions;
use mj_mono::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pipeline switches. Every field may be left out of the TOML text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileOptions {
    /// Run the validation pass
    pub validate: bool,

    /// Run forward reference resolution
    pub resolve: bool,

    /// Nested template instantiation limit
    pub max_template_depth: usize,

    /// Lower overloaded operators to calls
    pub lower_operators: bool,

    /// Fold operators with constant operands
    pub fold_constants: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            validate: true,
            resolve: true,
            max_template_depth: DEFAULT_MAX_DEPTH,
            lower_operators: true,
            fold_constants: true,
        }
    }
}

impl CompileOptions {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read options from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    pub(crate) fn build_options(&self) -> BuildOptions {
        BuildOptions {
            fold_constants: self.fold_constants,
        }
    }
}
