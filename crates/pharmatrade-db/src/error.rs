//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          CoreError (cart / approval rules) │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ◄──────── DbError::Domain                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (apps/api) ← status + code, store text never sent            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  {"error": "...", "code": "PERSISTENCE_FAILURE"}                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use pharmatrade_core::CoreError;
use thiserror::Error;

/// Store errors.
///
/// `Domain` carries a business rule that failed inside a unit of work; every
/// other variant describes the store itself or a missing/duplicate row.
#[derive(Debug, Error)]
pub enum DbError {
    /// Row is absent or soft-deleted.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE constraint rejected the write (e.g. an already registered email).
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A row referenced something that does not exist.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A business rule rejected the operation inside a unit of work.
    ///
    /// ## When This Occurs
    /// - Insufficient stock found at the locked read
    /// - Approving an account that was already reviewed
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error("Could not open database: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    /// SQLite rejected a statement for a reason not classified above.
    #[error("Statement failed: {0}")]
    QueryFailed(String),

    /// Commit failed, or an invariant broke while the write lock was held.
    #[error("Transaction aborted: {0}")]
    TransactionFailed(String),

    /// Waited longer than the busy timeout for another writer's lock.
    #[error("Timed out waiting for a database lock")]
    LockTimeout,

    /// Unit of work exceeded its overall deadline and was rolled back.
    #[error("Transaction exceeded its {0:?} deadline")]
    TransactionTimeout(Duration),

    /// No pooled connection became free within `connect_timeout`.
    #[error("No database connection available")]
    PoolExhausted,

    #[error("Unexpected database error: {0}")]
    Internal(String),
}

impl DbError {
    /// `NotFound` for `entity` with the given id.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// `UniqueViolation` naming the offending field and value.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns true for failures of the store itself, as opposed to rule
    /// violations or missing rows.
    pub fn is_store_failure(&self) -> bool {
        !matches!(
            self,
            DbError::NotFound { .. } | DbError::UniqueViolation { .. } | DbError::Domain(_)
        )
    }
}

/// SQLite primary result codes for lock contention (`SQLITE_BUSY`,
/// `SQLITE_LOCKED`). Extended codes carry the primary code in the low byte.
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

/// Maps sqlx failures onto the store taxonomy.
///
/// ```text
/// Database(kind = UniqueViolation)      → UniqueViolation { field = table.column }
/// Database(kind = ForeignKeyViolation)  → ForeignKeyViolation
/// Database(code & 0xff = BUSY | LOCKED) → LockTimeout (busy_timeout elapsed)
/// Database(anything else)               → QueryFailed
/// PoolTimedOut                          → PoolExhausted
/// PoolClosed                            → ConnectionFailed
/// RowNotFound / other                   → Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        let db_err = match err {
            sqlx::Error::Database(db_err) => db_err,
            sqlx::Error::PoolTimedOut => return DbError::PoolExhausted,
            sqlx::Error::PoolClosed => {
                return DbError::ConnectionFailed("Pool is closed".to_string())
            }
            other => return DbError::Internal(other.to_string()),
        };

        let message = db_err.message().to_string();

        match db_err.kind() {
            sqlx::error::ErrorKind::UniqueViolation => DbError::UniqueViolation {
                field: message
                    .rsplit(": ")
                    .next()
                    .unwrap_or("unknown")
                    .to_string(),
                value: "unknown".to_string(),
            },
            sqlx::error::ErrorKind::ForeignKeyViolation => {
                DbError::ForeignKeyViolation { message }
            }
            _ => {
                let primary = db_err
                    .code()
                    .and_then(|code| code.parse::<i64>().ok())
                    .map(|code| code & 0xff);

                if matches!(primary, Some(SQLITE_BUSY | SQLITE_LOCKED))
                    || message.contains("database is locked")
                {
                    DbError::LockTimeout
                } else {
                    DbError::QueryFailed(message)
                }
            }
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result alias used by every repository.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_failure_classification() {
        assert!(!DbError::not_found("Product", 4).is_store_failure());
        assert!(!DbError::duplicate("email", "a@b.co").is_store_failure());
        assert!(!DbError::Domain(CoreError::EmptyCart).is_store_failure());
        assert!(DbError::LockTimeout.is_store_failure());
        assert!(DbError::TransactionTimeout(Duration::from_secs(1)).is_store_failure());
    }

    #[test]
    fn test_domain_error_is_transparent() {
        let err: DbError = CoreError::ProductNotFound(9).into();
        assert_eq!(err.to_string(), "Product ID 9 not found");
    }
}
