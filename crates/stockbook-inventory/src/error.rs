//! # Inventory Errors
//!
//! The taxonomy collaborators see.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CoreError ─────────────┐                                               │
//! │    ProductNotFound ─────┼──► NotFound                                   │
//! │    InsufficientStock ───┼──► InsufficientStock                          │
//! │    CartTooLarge, … ─────┼──► Validation                                 │
//! │                         │                                               │
//! │  DbError ───────────────┤                                               │
//! │    NotFound ────────────┼──► NotFound                                   │
//! │    SchemaMismatch ──────┼──► SchemaMismatch                             │
//! │    Unsupported ─────────┼──► Unsupported                                │
//! │    PartialCommit ───────┼──► Persistence                                │
//! │    everything else ─────┼──► Io                                         │
//! │                         │                                               │
//! │  ConfigError ───────────┴──► Config                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is retried. When an operation returns any of these, in-memory
//! state is exactly what it was before the call.

use stockbook_core::{CoreError, ValidationError};
use stockbook_db::DbError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Requested units exceed live stock.
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Imported bytes are not a usable store file.
    #[error("Store schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The connected backend cannot do this (export from the mirror).
    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The backend failed to read or write.
    #[error("Backend I/O error: {0}")]
    Io(String),

    /// A sale reached the mirror only in part.
    ///
    /// `restored` reports whether the previous ledger document was put back.
    /// Memory is not updated either way.
    #[error("Sale may be partially persisted ({reason}); ledger restored: {restored}")]
    Persistence { reason: String, restored: bool },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl InventoryError {
    pub fn product_not_found(id: impl Into<String>) -> Self {
        InventoryError::NotFound {
            entity: "Product".to_string(),
            id: id.into(),
        }
    }

    /// Whether the caller may simply try again after fixing its input.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            InventoryError::NotFound { .. }
                | InventoryError::InsufficientStock { .. }
                | InventoryError::Validation(_)
        )
    }
}

impl From<CoreError> for InventoryError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => InventoryError::product_not_found(id),
            CoreError::InsufficientStock {
                product_id,
                available,
                requested,
            } => InventoryError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            other @ (CoreError::CartTooLarge { .. }
            | CoreError::QuantityTooLarge { .. }
            | CoreError::Validation(_)) => InventoryError::Validation(other.to_string()),
        }
    }
}

impl From<ValidationError> for InventoryError {
    fn from(err: ValidationError) -> Self {
        InventoryError::Validation(err.to_string())
    }
}

impl From<DbError> for InventoryError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => InventoryError::NotFound { entity, id },
            DbError::SchemaMismatch(reason) => InventoryError::SchemaMismatch(reason),
            unsupported @ DbError::Unsupported { .. } => {
                InventoryError::Unsupported(unsupported.to_string())
            }
            DbError::PartialCommit { reason, restored } => {
                InventoryError::Persistence { reason, restored }
            }
            other => InventoryError::Io(other.to_string()),
        }
    }
}

pub type InventoryResult<T> = Result<T, InventoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_into_taxonomy() {
        let err: InventoryError = CoreError::ProductNotFound("prod-9".into()).into();
        assert!(matches!(err, InventoryError::NotFound { ref id, .. } if id == "prod-9"));

        let err: InventoryError = CoreError::InsufficientStock {
            product_id: "prod-3".into(),
            available: 2,
            requested: 5,
        }
        .into();
        assert!(matches!(
            err,
            InventoryError::InsufficientStock { available: 2, requested: 5, .. }
        ));

        let err: InventoryError = CoreError::CartTooLarge { max: 100 }.into();
        assert!(matches!(err, InventoryError::Validation(_)));
    }

    #[test]
    fn test_db_errors_map_into_taxonomy() {
        let err: InventoryError = DbError::schema("missing table `transactions`").into();
        assert!(matches!(err, InventoryError::SchemaMismatch(ref m) if m.contains("transactions")));

        let err: InventoryError = DbError::unsupported("export", "mirror").into();
        assert!(matches!(err, InventoryError::Unsupported(_)));

        let err: InventoryError = DbError::PartialCommit {
            reason: "disk full".into(),
            restored: true,
        }
        .into();
        assert!(matches!(err, InventoryError::Persistence { restored: true, .. }));

        let err: InventoryError = DbError::QueryFailed("no such table".into()).into();
        assert!(matches!(err, InventoryError::Io(_)));

        let err: InventoryError = DbError::StockConflict {
            product_id: "prod-3".into(),
            quantity: 4,
        }
        .into();
        assert!(matches!(err, InventoryError::Io(_)));
    }

    #[test]
    fn test_user_errors() {
        assert!(InventoryError::product_not_found("x").is_user_error());
        assert!(!InventoryError::Io("disk".into()).is_user_error());
    }
}
