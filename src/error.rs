//! Error types shared across the crate

use thiserror::Error;

/// Configuration problems that make an operation impossible
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Signing secret is not configured")]
    MissingSecret,
}

/// Rejected section input. Callers on the editing side swallow these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Section name must not be empty")]
    EmptyName,

    #[error("Section duration must be a positive number of minutes, got {duration}")]
    NonPositiveDuration { duration: i64 },

    #[error("Section duration of {duration} minutes is too large")]
    DurationTooLarge { duration: i64 },
}

/// Reasons a section list could not be signed into a token
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to serialize token segment: {reason}")]
    Serialize { reason: String },
}

/// Reasons a share token failed to decode.
///
/// These never leave the codec as errors; `decode` collapses all of them
/// into `None` and only logs the cause.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token: {reason}")]
    Malformed { reason: String },

    #[error("Unsupported token header: {alg}")]
    UnsupportedHeader { alg: String },

    #[error("Token signature does not match")]
    BadSignature,

    #[error("Token payload is not a valid section list: {reason}")]
    InvalidPayload { reason: String },
}

/// Failures reading or writing the persisted section slot
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to access section slot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Section slot contains invalid data: {0}")]
    Format(#[from] serde_json::Error),
}
