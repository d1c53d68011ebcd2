use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Corrupt embedding blob: {0}")]
    CorruptBlob(String),

    #[error("Corrupt record {id}: {reason}")]
    CorruptRecord { id: u64, reason: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index contains no records")]
    EmptyIndex,

    #[error("No products indexed")]
    NoProductsIndexed,

    #[error("Vector contains NaN or infinite components")]
    NonFiniteVector,

    #[error("Vector has no components")]
    EmptyVector,

    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Embedding timed out after {0:?}")]
    EmbeddingTimeout(std::time::Duration),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable code for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::CorruptBlob(_) => "corrupt_blob",
            Error::CorruptRecord { .. } => "corrupt_record",
            Error::DimensionMismatch { .. } => "dimension_mismatch",
            Error::EmptyIndex => "empty_index",
            Error::NoProductsIndexed => "no_products_indexed",
            Error::NonFiniteVector => "non_finite_vector",
            Error::EmptyVector => "empty_vector",
            Error::StoreUnavailable(_) => "store_unavailable",
            Error::Storage(_) => "storage",
            Error::Serialization(_) => "serialization",
            Error::Embedding(_) => "embedding_failed",
            Error::EmbeddingTimeout(_) => "embedding_timeout",
            Error::InvalidConfig(_) => "invalid_config",
            Error::Io(_) => "io",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Structured error returned to query callers in place of a ranking.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}
