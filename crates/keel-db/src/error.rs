//! Error types for keel-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Transaction control error (D003)
    #[error("[D003] Transaction failed: {0}")]
    TransactionError(String),

    /// Mutex poisoned (D004)
    #[error("[D004] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// A column value could not be read as the requested type (D005)
    #[error("[D005] Unexpected value in column '{column}': {message}")]
    TypeMismatch { column: String, message: String },
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;
