//! Unified error types for the funnel analytics pipeline.
//!
//! Error codes:
//! - NET_001: Source download failed
//! - SCHEMA_001: Parquet file missing columns or holding uncastable values
//! - QUERY_001: SQL failed while building or reading a relation
//! - DB_001: Database file could not be opened
//! - DATA_001: Session carries conflicting single-valued params
//! - IO_001: Local filesystem failure

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error codes, one per failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// NET_001: Source download failed
    Network,
    /// SCHEMA_001: Source file does not match the events schema
    Schema,
    /// QUERY_001: Query execution failed
    Query,
    /// DB_001: Database unreachable or locked
    Connection,
    /// DATA_001: Conflicting product/currency values in a session
    Conflict,
    /// IO_001: Filesystem failure
    Io,
    /// INTERNAL_001: Anything else
    Internal,
}

impl ErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network => "NET_001",
            Self::Schema => "SCHEMA_001",
            Self::Query => "QUERY_001",
            Self::Connection => "DB_001",
            Self::Conflict => "DATA_001",
            Self::Io => "IO_001",
            Self::Internal => "INTERNAL_001",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Network => 502,
            Self::Conflict => 409,
            _ => 500,
        }
    }
}

/// Unified error type for the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("network error: {0}")]
    Network(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("query error in {relation}: {message}")]
    Query { relation: String, message: String },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("conflicting values: {0}")]
    Conflict(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create a query error attributed to the relation being built or read.
    pub fn query(relation: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Query {
            relation: relation.into(),
            message: msg.into(),
        }
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the code classifying this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Network(_) => ErrorCode::Network,
            Self::Schema(_) => ErrorCode::Schema,
            Self::Query { .. } => ErrorCode::Query,
            Self::Connection(_) => ErrorCode::Connection,
            Self::Conflict(_) => ErrorCode::Conflict,
            Self::Io(_) => ErrorCode::Io,
            Self::Serialization(_) | Self::Config(_) | Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Get the code string for this error.
    pub fn code(&self) -> &'static str {
        self.error_code().code()
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        self.error_code().http_status()
    }
}
