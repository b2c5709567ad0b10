//! Error types for the store library.

use std::fmt;
use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Cached description of a schema-version mismatch that no registered
/// migration could resolve.
///
/// The gate stores one of these and hands out clones, so every caller sees
/// the identical fault until a later migration clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityFault {
    /// Version the running code expects.
    pub expected: i64,
    /// Version found in the configuration table.
    pub found: i64,
    /// Why the mismatch could not be migrated away, if a migration was tried.
    pub cause: Option<String>,
}

impl CompatibilityFault {
    pub fn new(expected: i64, found: i64) -> Self {
        Self {
            expected,
            found,
            cause: None,
        }
    }

    /// Attaches the migration failure that made this fault sticky.
    pub fn caused_by(mut self, err: &StoreError) -> Self {
        self.cause = Some(err.to_string());
        self
    }
}

impl fmt::Display for CompatibilityFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "db incompatible: need db version '{}', found '{}'",
            self.expected, self.found
        )?;
        if let Some(cause) = &self.cause {
            write!(f, " ({cause})")?;
        }
        Ok(())
    }
}

/// Comprehensive error type for all store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The connector gave up establishing a live handle
    #[error("connect to db: gave up after {attempts} attempt(s): {source}")]
    Connect {
        attempts: u32,
        #[source]
        source: Box<StoreError>,
    },
    /// Unexpected DDL failure while creating the database or its tables
    #[error("instantiating db: {message}: {source}")]
    Instantiate {
        message: String,
        #[source]
        source: rusqlite::Error,
    },
    /// Database connection or query errors
    #[error("{message}: {source}")]
    Database {
        message: String,
        #[source]
        source: rusqlite::Error,
    },
    /// No pooled connection could be handed out in time
    #[error("checkout pooled connection: {source}")]
    Pool {
        #[source]
        source: r2d2::Error,
    },
    /// Expected row(s) were absent
    #[error("not found: {what}")]
    NotFound { what: String },
    /// A write touched a non-zero number of rows other than the expected one
    #[error("expected {expected} affected rows but got {actual}")]
    RowCount { expected: usize, actual: usize },
    /// Persisted schema version differs from the running one
    #[error("{0}")]
    Incompatible(CompatibilityFault),
    /// No migration path is registered for the version pair
    #[error("migrate from version {from} to {to}: not supported")]
    UnsupportedMigration { from: i64, to: i64 },
    /// A registered migration step failed
    #[error("migrate from version {from} to {to}: {source}")]
    Migration {
        from: i64,
        to: i64,
        #[source]
        source: Box<StoreError>,
    },
    /// The unit of work succeeded but the commit did not
    #[error("commit transaction: {source}")]
    Commit {
        #[source]
        source: rusqlite::Error,
    },
    /// Contention persisted through every allowed attempt
    #[error("transaction still contended after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<StoreError>,
    },
    /// The caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,
    /// The caller's deadline passed before the operation finished
    #[error("deadline exceeded")]
    DeadlineExceeded,
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// XDG directory specification errors
    #[error("XDG directory error: {0}")]
    XdgDirectory(String),
    /// Invalid input validation errors
    #[error("Invalid input for field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },
    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
    /// A thread panicked while holding the store lock
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Builder for creating database errors with optional context.
pub struct DatabaseErrorBuilder {
    message: String,
}

impl DatabaseErrorBuilder {
    /// Create a new database error builder with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build the error with the given source.
    pub fn with_source(self, source: rusqlite::Error) -> StoreError {
        StoreError::Database {
            message: self.message,
            source,
        }
    }
}

impl StoreError {
    /// Creates a builder for database errors.
    pub fn database(message: impl Into<String>) -> DatabaseErrorBuilder {
        DatabaseErrorBuilder::new(message)
    }

    /// Creates a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates an input validation error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True when the error means "no such row" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True when the whole transaction should be re-run.
    ///
    /// SQLite reports write contention as `SQLITE_BUSY` or `SQLITE_LOCKED`;
    /// both clear once the competing writer finishes.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database { source, .. } | Self::Commit { source } => is_contention(source),
            _ => false,
        }
    }
}

/// Reports whether a driver error is the engine's "retry this transaction"
/// signal.
pub fn is_contention(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// Specialized extension trait for database-related Results.
pub trait DatabaseResultExt<T> {
    /// Map database errors with a message.
    fn db_context(self, message: &str) -> Result<T>;

    /// Map DDL errors raised while instantiating the schema.
    fn ddl_context(self, message: &str) -> Result<T>;
}

impl<T> DatabaseResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn db_context(self, message: &str) -> Result<T> {
        self.map_err(|e| StoreError::database(message).with_source(e))
    }

    fn ddl_context(self, message: &str) -> Result<T> {
        self.map_err(|source| StoreError::Instantiate {
            message: message.to_string(),
            source,
        })
    }
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use rusqlite::ffi;

    use super::*;

    fn sqlite_error(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), None)
    }

    #[test]
    fn test_busy_and_locked_are_retryable() {
        let busy = StoreError::database("exec").with_source(sqlite_error(ffi::SQLITE_BUSY));
        let locked = StoreError::Commit {
            source: sqlite_error(ffi::SQLITE_LOCKED),
        };
        assert!(busy.is_retryable());
        assert!(locked.is_retryable());
    }

    #[test]
    fn test_other_errors_are_not_retryable() {
        let constraint =
            StoreError::database("exec").with_source(sqlite_error(ffi::SQLITE_CONSTRAINT));
        assert!(!constraint.is_retryable());
        assert!(!StoreError::not_found("row").is_retryable());
        assert!(!StoreError::Cancelled.is_retryable());
    }

    #[test]
    fn test_compatibility_fault_display() {
        let fault = CompatibilityFault::new(2, 1);
        assert_eq!(
            fault.to_string(),
            "db incompatible: need db version '2', found '1'"
        );

        let fault = fault.caused_by(&StoreError::UnsupportedMigration { from: 1, to: 2 });
        assert_eq!(
            fault.to_string(),
            "db incompatible: need db version '2', found '1' \
             (migrate from version 1 to 2: not supported)"
        );
    }
}
