use thiserror::Error;

use crate::parse::ParseError;

/// Unified error type covering parsing, metadata validation, storage, and I/O.
///
/// Returned by the rule service, configuration loading and other operations
/// that do more than parse.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid metadata: description is required and must be a string")]
    MissingMetadata,

    #[error("rule '{id}' not found")]
    NotFound { id: String },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Serialize(#[from] crate::serial::SerializeError),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Deserialize(#[from] crate::serial::DeserializeError),
}
