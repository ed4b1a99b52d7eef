use thiserror::Error;

/// Errors raised by the document store and the settings persistence layer.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("BSON: {0}")]
    Bson(String),

    #[error("Collection not found: {0}")]
    NoSuchCollection(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Unsupported query operator: {0}")]
    UnsupportedOperator(String),

    #[error("query exceeded its deadline of {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Settings error: {0}")]
    Settings(String),
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<bson::error::Error> for DbError {
    fn from(e: bson::error::Error) -> Self {
        Self::Bson(e.to_string())
    }
}

/// Failure taxonomy of a search or allow-list administration call.
///
/// Every variant is surfaced to the caller as-is; nothing here is retried.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid resource type: {0}")]
    UnknownCollection(String),

    #[error("The query parameter must be a JSON object: {0}")]
    MalformedQuery(String),

    #[error("{message}")]
    Validation { message: String, field: String },

    #[error("{0}")]
    Authorization(String),

    #[error(transparent)]
    Store(#[from] DbError),
}

impl SearchError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into(), field: "value".to_string() }
    }

    /// Short machine-readable code used in HTTP error bodies.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownCollection(_) => "unknown_collection",
            Self::MalformedQuery(_) => "malformed_query",
            Self::Validation { .. } => "validation",
            Self::Authorization(_) => "authorization",
            Self::Store(_) => "store",
        }
    }
}
