use mj_ir_build::BuildError;
use mj_mono::InstantiateError;
use std::path::PathBuf;
use thiserror::Error;

/// Options that could not be read
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read options from {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid options: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot write options: {0}")]
    Write(#[from] toml::ser::Error),
}

/// Failures that stop the pipeline. Problems in the compiled program are
/// diagnostics on the returned program instead.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Instantiate(#[from] InstantiateError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
