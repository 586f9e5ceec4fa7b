//! Error types for the lazy component transform.

use std::path::PathBuf;

/// Fatal setup errors and source-level failures.
///
/// Per-statement problems never surface here: classification failures are
/// treated as "not a component" and synthesis failures leave the statement
/// untouched.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// No symbol oracle was supplied to the builder.
    #[error("a symbol oracle is required to classify imports")]
    MissingOracle,

    /// The configured wrapper factory is not a single expression.
    #[error("invalid wrapper factory `{factory}`: {message}")]
    InvalidWrapperFactory { factory: String, message: String },

    /// The configured injected import is not exactly one import declaration.
    #[error("invalid injected import `{import}`: {message}")]
    InvalidInjectedImport { import: String, message: String },

    /// An include/exclude specifier pattern failed to compile.
    #[error("invalid specifier pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Options JSON could not be decoded.
    #[error("invalid options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    /// The module being transformed does not parse.
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// The module being transformed could not be read.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A replacement statement template failed to parse.
    #[error("failed to synthesize `{template}`: {message}")]
    Synthesis { template: String, message: String },
}

/// Symbol resolution failures reported by a [`crate::SymbolOracle`].
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("cannot resolve module '{specifier}' from {importer}")]
    ModuleNotFound { specifier: String, importer: PathBuf },

    #[error("module {module} has no export named '{name}'")]
    ExportNotFound { module: PathBuf, name: String },

    #[error("export '{name}' of '{specifier}' resolves to {count} declarations")]
    Ambiguous {
        specifier: String,
        name: String,
        count: usize,
    },

    #[error("re-export cycle through '{name}' in {module}")]
    ReExportCycle { module: PathBuf, name: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for transform setup and source-level operations.
pub type TransformResult<T> = Result<T, TransformError>;
