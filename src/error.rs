use std::time::Duration;

use thiserror::Error;

use crate::builders::OperationKind;

/// Error type for pgfluent operations
#[derive(Debug, Error)]
pub enum PgFluentError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A driver failure, prefixed with the terminal operation that issued it.
    #[error("{operation}: {source}")]
    Statement {
        operation: OperationKind,
        #[source]
        source: Box<PgFluentError>,
    },

    /// The destination or write argument has an unusable shape.
    #[error("{operation}: {message}")]
    Contract {
        operation: OperationKind,
        message: String,
    },

    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Caller misuse, rejected before anything reaches the database.
    #[error("{operation}: {message}")]
    Usage {
        operation: OperationKind,
        message: String,
    },

    #[error("{operation}: timed out after {after:?}")]
    Timeout {
        operation: OperationKind,
        after: Duration,
    },

    #[error("{0}: query returned no rows")]
    NoRows(OperationKind),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PgFluentError {
    pub(crate) fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    pub(crate) fn usage(operation: OperationKind, message: impl Into<String>) -> Self {
        Self::Usage {
            operation,
            message: message.into(),
        }
    }

    pub(crate) fn contract(operation: OperationKind, message: impl Into<String>) -> Self {
        Self::Contract {
            operation,
            message: message.into(),
        }
    }

    /// True for errors raised before any statement was sent.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage { .. })
    }

    /// True for decode failures, including ones a driver raised while
    /// reading rows (wrapped in `Statement`).
    pub fn is_decode(&self) -> bool {
        match self {
            Self::Decode { .. } => true,
            Self::Statement { source, .. } => source.is_decode(),
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type alias for pgfluent operations
pub type Result<T> = std::result::Result<T, PgFluentError>;
