//! Error types for the xflow engine

use thiserror::Error;

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Which side of a callback signature could not be wired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackSide {
    /// A callback input has no edge leaving the call site
    Input,
    /// A callback output has no edge returning to the call site
    Output,
}

impl std::fmt::Display for CallbackSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// Errors that can occur while running a program
#[derive(Debug, Error)]
pub enum EngineError {
    /// A node references a function that is not in the catalog
    #[error("Function not found: {name}")]
    FunctionNotFound { name: String },

    /// A declared external input was not supplied to `run`
    #[error("Missing required input: {name}")]
    MissingInput { name: String },

    /// A closure was invoked without one of its declared arguments
    #[error("Callback '{callback}' invoked without input '{name}'")]
    MissingCallbackInput { callback: String, name: String },

    /// A runner asked for an argument that is not in its record
    #[error("Argument not found: {key}")]
    ArgumentNotFound { key: String },

    /// A runner received an argument of the wrong shape
    #[error("Invalid argument '{key}': expected {expected}")]
    InvalidArgument { key: String, expected: String },

    /// A declared callback key has no matching edge in the graph
    #[error("Callback '{callback}' {side} '{key}' is not wired")]
    CallbackWiring {
        callback: String,
        key: String,
        side: CallbackSide,
    },

    /// A runner asked for a callback its node does not provide
    #[error("Unknown callback: {name}")]
    UnknownCallback { name: String },

    /// Runner-level failure
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Create an execution failed error with a message
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Create an argument-not-found error
    pub fn argument(key: impl Into<String>) -> Self {
        Self::ArgumentNotFound { key: key.into() }
    }

    /// Create an invalid-argument error
    pub fn invalid(key: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidArgument {
            key: key.into(),
            expected: expected.into(),
        }
    }
}
