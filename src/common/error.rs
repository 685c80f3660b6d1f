//! Error handling primitives shared across the crate.

use std::path::PathBuf;

/// Stable error codes that cross the FFI boundary and become CLI exit codes.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ServeCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// Checkpoint file was not found at the configured path.
    CheckpointMissing = 1,
    /// Checkpoint could not be decoded or does not fit the network.
    CheckpointIncompatible = 2,
    /// Request payload is not a decodable image.
    ImageDecode = 3,
    /// Decoded image dimensions disagree with the network input.
    InputShape = 4,
    /// Input failed validation.
    InvalidInput = 5,
    /// Catch-all for bugs and backend failures.
    Internal = 6,
}

/// Canonical error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("checkpoint not found at {}", path.display())]
    CheckpointMissing { path: PathBuf },
    #[error("checkpoint {} is incompatible with the network: {reason}", path.display())]
    CheckpointIncompatible { path: PathBuf, reason: String },
    #[error("payload is not a decodable image: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("input shape mismatch: expected {expected:?} (channels, height, width), got {actual:?}")]
    InputShape {
        expected: [usize; 3],
        actual: [usize; 3],
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used throughout the crate.
pub type ServeResult<T> = Result<T, ServeError>;

impl ServeError {
    /// Machine parsable code for this error.
    pub fn code(&self) -> ServeCode {
        match self {
            ServeError::CheckpointMissing { .. } => ServeCode::CheckpointMissing,
            ServeError::CheckpointIncompatible { .. } => ServeCode::CheckpointIncompatible,
            ServeError::ImageDecode(_) => ServeCode::ImageDecode,
            ServeError::InputShape { .. } => ServeCode::InputShape,
            ServeError::InvalidInput(_) => ServeCode::InvalidInput,
            ServeError::Internal(_) => ServeCode::Internal,
        }
    }

    /// Whether the error can only happen while bringing the model up.
    ///
    /// Startup errors are fatal: the process must not report ready.
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            ServeError::CheckpointMissing { .. } | ServeError::CheckpointIncompatible { .. }
        )
    }

    pub(crate) fn incompatible(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ServeError::CheckpointIncompatible {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        ServeError::InvalidInput(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ServeError::Internal(msg.into())
    }
}
