use thiserror::Error;

use crate::vir::BuildError;

#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LowerError {
    #[error("module `{module}` is missing attribute `{attribute}`")]
    MissingAttribute { module: String, attribute: String },

    #[error("module `{module}` has invalid attribute `{attribute}`: {reason}")]
    InvalidAttribute { module: String, attribute: String, reason: String },

    #[error("invalid memory descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("descriptor requires {expected} input signals but {actual} were given")]
    SignalCountMismatch { expected: usize, actual: usize },

    #[error("signal `{field}` of port {port} must be {expected} bits wide, found {actual}")]
    PortWidthMismatch { port: String, field: String, expected: usize, actual: usize },

    #[error("descriptor requires {expected} output ports but the module declares {actual}")]
    OutputCountMismatch { expected: usize, actual: usize },

    #[error("module build error: {0}")]
    Build(#[from] BuildError),
}
