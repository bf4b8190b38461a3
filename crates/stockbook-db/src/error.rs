//! # Database Errors
//!
//! Error types for both storage backends.
//!
//! ## Error Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sqlx::Error ──────────┐                                               │
//! │  MigrateError ─────────┤                                               │
//! │  std::io::Error ───────┼──► DbError ──► InventoryError (inventory)     │
//! │  serde_json::Error ────┤                                               │
//! │  import validation ────┘    SchemaMismatch                             │
//! │  mirror sale path ─────────► PartialCommit                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Row addressed by id does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Primary key already taken.
    #[error("Duplicate {field}")]
    UniqueViolation { field: String },

    /// A stock decrement matched no row or would have gone negative.
    #[error("Stock conflict for {product_id}: cannot remove {quantity}")]
    StockConflict { product_id: String, quantity: i64 },

    /// Bytes offered for import are not a usable store file.
    ///
    /// ## When This Occurs
    /// - Missing SQLite header
    /// - `products` or `transactions` table absent
    /// - A required column absent
    /// - A row that cannot be decoded (unknown `type`, bad `items` JSON)
    #[error("Store schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Operation not offered by this backend variant.
    #[error("{operation} is not supported by the {backend} backend")]
    Unsupported {
        operation: &'static str,
        backend: &'static str,
    },

    /// Mirror sale wrote the ledger document but not the product document.
    #[error("Sale partially committed ({reason}); previous ledger restored: {restored}")]
    PartialCommit { reason: String, restored: bool },

    /// Key-value store or scratch file I/O failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// Document encode/decode failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn schema(reason: impl Into<String>) -> Self {
        DbError::SchemaMismatch(reason.into())
    }

    pub fn unsupported(operation: &'static str, backend: &'static str) -> Self {
        DbError::Unsupported { operation, backend }
    }

    /// Collapses any failure into `SchemaMismatch`.
    ///
    /// Import treats every problem reading a foreign file as "this is not a
    /// store we understand".
    pub fn into_schema_mismatch(self) -> Self {
        match self {
            DbError::SchemaMismatch(_) => self,
            other => DbError::SchemaMismatch(other.to_string()),
        }
    }
}

/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → UniqueViolation or QueryFailed
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "UNIQUE constraint failed: products.id"
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

/// Result type for storage operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mismatch_collapse() {
        let err = DbError::QueryFailed("file is not a database".to_string()).into_schema_mismatch();
        assert!(matches!(err, DbError::SchemaMismatch(msg) if msg.contains("not a database")));

        let err = DbError::schema("missing table `products`").into_schema_mismatch();
        assert_eq!(err.to_string(), "Store schema mismatch: missing table `products`");
    }

    #[test]
    fn test_unsupported_message() {
        let err = DbError::unsupported("export", "mirror");
        assert_eq!(err.to_string(), "export is not supported by the mirror backend");
    }
}
