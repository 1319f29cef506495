//! Custom error types for the common library
//!
//! This module defines the persistence error type shared by every store
//! adapter of the reimbursement service.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[from] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),

    /// A stored row could not be mapped back to a domain value
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// Hashing or verifying a stored credential failed
    #[error("Credential error: {0}")]
    Credential(String),

    /// An insert completed without yielding a generated identity
    #[error("Insert into {0} generated no identity")]
    NoIdentity(&'static str),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
