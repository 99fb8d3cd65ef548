//! Runtime error type.
//!
//! One crate-wide enum covering the guard and lookup failures of
//! rendering, diffing, patching and hydration; every fallible operation
//! returns [`RuntimeResult`].

use compact_str::CompactString;
use thiserror::Error;

/// Errors that can occur during runtime operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Tree deeper than the recursion guard allows (render, diff or patch)
    #[error("tree depth exceeded: more than {max} nested levels")]
    DepthExceeded {
        /// Configured maximum depth
        max: usize,
    },

    /// Component name could not be resolved where resolution is required
    #[error("component `{0}` is not registered")]
    UnknownComponent(CompactString),

    /// A component with the same name was already registered
    #[error("component `{0}` is already registered")]
    DuplicateComponent(CompactString),

    /// Instance id does not refer to a live instance
    #[error("no live instance with id {0}")]
    UnknownInstance(u64),

    /// Hydration payload failed to parse as JSON
    #[error("malformed hydration payload: {0}")]
    MalformedPayload(String),

    /// Edit script does not fit the target DOM structure
    #[error("patch does not match target: {0}")]
    PatchMismatch(String),
}

/// Result type alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

impl RuntimeError {
    /// Create a patch mismatch error with a message.
    pub fn patch_mismatch(msg: impl Into<String>) -> Self {
        Self::PatchMismatch(msg.into())
    }

    /// Create a malformed payload error from any error type.
    pub fn malformed_payload(err: impl std::error::Error) -> Self {
        Self::MalformedPayload(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RuntimeError::DepthExceeded { max: 64 };
        assert_eq!(err.to_string(), "tree depth exceeded: more than 64 nested levels");

        let err = RuntimeError::UnknownComponent("Hero".into());
        assert_eq!(err.to_string(), "component `Hero` is not registered");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RuntimeError>();
    }
}
