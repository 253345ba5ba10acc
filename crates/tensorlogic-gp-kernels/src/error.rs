//! Error types for tensorlogic-gp-kernels.

use thiserror::Error;

/// Errors that can occur in kernel construction, evaluation and transforms.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    /// Invalid kernel or transformer parameter
    #[error("Invalid parameter '{parameter}' = '{value}': {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Shapes of inputs, outputs or parameter vectors disagree
    #[error("Shape mismatch in {context}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        context: String,
    },

    /// Operation not defined for this kernel or input kind
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Input data that cannot be encoded or decoded
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Kernel configuration could not be (de)serialized
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KernelError {
    pub(crate) fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn shape_mismatch(
        expected: Vec<usize>,
        got: Vec<usize>,
        context: impl Into<String>,
    ) -> Self {
        Self::ShapeMismatch {
            expected,
            got,
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for KernelError {
    fn from(err: serde_json::Error) -> Self {
        KernelError::Config(err.to_string())
    }
}

/// Result type for kernel operations
pub type Result<T> = std::result::Result<T, KernelError>;
