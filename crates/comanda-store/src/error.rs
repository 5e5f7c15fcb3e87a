use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    DuplicateKey {
        collection: String,
        field: String,
        value: String,
    },
    /// Unordered bulk insert where some documents were rejected.
    PartialInsert { inserted: usize, message: String },
    InvalidFilter(String),
    InvalidUpdate(String),
    InvalidPipeline(String),
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DuplicateKey {
                collection,
                field,
                value,
            } => write!(
                f,
                "duplicate key error: collection {collection} already has {field}: {value}"
            ),
            StoreError::PartialInsert { inserted, message } => {
                write!(f, "bulk insert wrote {inserted} documents and rejected the rest: {message}")
            }
            StoreError::InvalidFilter(msg) => write!(f, "invalid filter: {msg}"),
            StoreError::InvalidUpdate(msg) => write!(f, "invalid update: {msg}"),
            StoreError::InvalidPipeline(msg) => write!(f, "invalid pipeline: {msg}"),
            StoreError::Backend(msg) => write!(f, "store error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}
