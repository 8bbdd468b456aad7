// Failure kinds shared by every stage of the conversion pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StegoError>;

#[derive(Debug, Error)]
pub enum StegoError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("compression failed: {0}")]
    CompressionFailure(String),

    #[error("decompression failed: {0}")]
    DecompressionFailure(String),

    /// Decrypted data did not start with the key marker: wrong key, wrong
    /// cipher backend, or corrupted ciphertext.
    #[error("decryption failed (wrong key or corrupted data)")]
    AuthenticationFailure,

    #[error("checksum mismatch: stored {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("could not decode image: {0}")]
    ImageDecodeFailure(String),

    #[error("could not encode image: {0}")]
    ImageEncodeFailure(String),

    #[error("image capacity or dimension error: {0}")]
    CapacityOrDimensionFailure(String),

    #[error("no hidden data found")]
    EmptyPayload,
}

/// Fieldless tag of a [`StegoError`], for callers that only report the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidConfiguration,
    CompressionFailure,
    DecompressionFailure,
    AuthenticationFailure,
    ChecksumMismatch,
    ImageDecodeFailure,
    ImageEncodeFailure,
    CapacityOrDimensionFailure,
    EmptyPayload,
}

impl StegoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            Self::CompressionFailure(_) => ErrorKind::CompressionFailure,
            Self::DecompressionFailure(_) => ErrorKind::DecompressionFailure,
            Self::AuthenticationFailure => ErrorKind::AuthenticationFailure,
            Self::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Self::ImageDecodeFailure(_) => ErrorKind::ImageDecodeFailure,
            Self::ImageEncodeFailure(_) => ErrorKind::ImageEncodeFailure,
            Self::CapacityOrDimensionFailure(_) => ErrorKind::CapacityOrDimensionFailure,
            Self::EmptyPayload => ErrorKind::EmptyPayload,
        }
    }
}
