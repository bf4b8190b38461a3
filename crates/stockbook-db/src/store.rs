//! # Embedded Relational Store
//!
//! An in-process SQLite database held entirely in memory, whose whole
//! contents can be exported as a SQLite file image and rebuilt from one.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create_seeded(products) ──┐                                            │
//! │                            ├──► open_in_memory() ──► migrations        │
//! │  import(bytes) ────────────┘         │                                  │
//! │    │ header check                    ▼                                  │
//! │    │ scratch file               ┌──────────────────────────┐           │
//! │    │ verify_schema              │ SqlitePool (1 connection,│           │
//! │    │ decode rows                │ never idles out)         │           │
//! │    └─► insert_snapshot ───────► │ products | transactions  │           │
//! │                                 └────────────┬─────────────┘           │
//! │                                              │                          │
//! │                       export_bytes() ◄───────┘  VACUUM INTO scratch    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why One Connection
//! An in-memory SQLite database lives exactly as long as a connection to it.
//! The pool keeps one connection open with no idle timeout or max lifetime,
//! so the data survives until [`RelationalStore::close`].
//!
//! Import always builds a brand-new store. The store currently connected is
//! never touched, so a rejected file cannot damage it.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::backend::{Snapshot, StockDecrement};
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{product, transaction, ProductRepository, TransactionRepository};
use stockbook_core::{Product, Transaction};

/// The 16-byte magic every SQLite database file starts with.
pub const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// Handle to one in-memory SQLite store.
#[derive(Debug, Clone)]
pub struct RelationalStore {
    pool: SqlitePool,
}

impl RelationalStore {
    /// Opens an empty store with the schema applied.
    pub async fn open_in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        migrations::run_migrations(&pool).await?;
        debug!("In-memory store opened");

        Ok(RelationalStore { pool })
    }

    /// Opens a new store holding `products` and an empty ledger.
    pub async fn create_seeded(products: &[Product]) -> DbResult<Self> {
        let store = Self::open_in_memory().await?;
        store
            .insert_snapshot(&Snapshot {
                products: products.to_vec(),
                transactions: Vec::new(),
            })
            .await?;

        info!(products = products.len(), "Created new store");
        Ok(store)
    }

    /// Builds a new store from a SQLite file image.
    ///
    /// ## Validation
    /// 1. The bytes start with the SQLite header
    /// 2. `products` and `transactions` exist with every required column
    /// 3. Every row decodes (known `type`, well-formed `items` and `date`)
    /// 4. Products pass field validation and ids are unique
    ///
    /// Any failure is reported as [`DbError::SchemaMismatch`].
    pub async fn import(bytes: &[u8]) -> DbResult<Self> {
        if bytes.len() < SQLITE_HEADER.len() || &bytes[..SQLITE_HEADER.len()] != SQLITE_HEADER {
            return Err(DbError::schema("not a SQLite database file"));
        }

        let scratch = tempfile::tempdir()?;
        let path = scratch.path().join("import.db");
        tokio::fs::write(&path, bytes).await?;

        let snapshot = read_store_file(&path)
            .await
            .map_err(DbError::into_schema_mismatch)?;
        snapshot.check().map_err(DbError::SchemaMismatch)?;

        let store = Self::open_in_memory().await?;
        store.insert_snapshot(&snapshot).await?;

        info!(
            bytes = bytes.len(),
            products = snapshot.products.len(),
            transactions = snapshot.transactions.len(),
            "Imported store file"
        );
        Ok(store)
    }

    /// Serializes the whole store to a SQLite file image.
    pub async fn export_bytes(&self) -> DbResult<Vec<u8>> {
        let scratch = tempfile::tempdir()?;
        let path = scratch.path().join("export.db");
        let path_text = path
            .to_str()
            .ok_or_else(|| DbError::Io("scratch path is not valid UTF-8".to_string()))?;
        // A plain name would inherit the in-memory mode of the source
        // connection and never reach disk.
        let target = format!("file:{path_text}?mode=rwc");

        sqlx::query("VACUUM INTO ?1")
            .bind(&target)
            .execute(&self.pool)
            .await?;

        let bytes = tokio::fs::read(&path).await?;
        info!(bytes = bytes.len(), "Exported store");
        Ok(bytes)
    }

    /// Reads both tables. Transactions come back most recent first.
    pub async fn load_snapshot(&self) -> DbResult<Snapshot> {
        load_snapshot_from(&self.pool).await
    }

    /// Inserts a whole snapshot in one relational transaction.
    pub async fn insert_snapshot(&self, snapshot: &Snapshot) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        for p in &snapshot.products {
            product::insert(&mut *tx, p).await?;
        }
        // Oldest first, so rowid order matches ledger order.
        for entry in snapshot.transactions.iter().rev() {
            transaction::insert(&mut *tx, entry).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    /// Applies a sale as one relational transaction.
    ///
    /// ```text
    /// BEGIN
    ///   INSERT INTO transactions ...
    ///   UPDATE products SET stock = stock - ? WHERE id = ? AND stock >= ?   (per line)
    /// COMMIT            ◄── all statements succeeded
    /// ROLLBACK          ◄── any statement failed
    /// ```
    pub async fn commit_sale(&self, entry: &Transaction, decrements: &[StockDecrement]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let applied = async {
            transaction::insert(&mut *tx, entry).await?;
            for d in decrements {
                product::decrement_stock(&mut *tx, &d.product_id, d.quantity).await?;
            }
            Ok::<(), DbError>(())
        }
        .await;

        match applied {
            Ok(()) => {
                tx.commit()
                    .await
                    .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
                debug!(id = %entry.id, decrements = decrements.len(), "Sale committed");
                Ok(())
            }
            Err(err) => {
                warn!(id = %entry.id, error = %err, "Sale statement failed, rolling back");
                if let Err(rollback_err) = tx.rollback().await {
                    return Err(DbError::TransactionFailed(format!(
                        "{err}; rollback also failed: {rollback_err}"
                    )));
                }
                Err(err)
            }
        }
    }

    /// Direct pool access for ad-hoc statements.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone())
    }

    /// Closes the pool, which discards the in-memory database.
    pub async fn close(&self) {
        info!("Closing store");
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

async fn load_snapshot_from(pool: &SqlitePool) -> DbResult<Snapshot> {
    let products = product::list_all(pool).await?;
    let transactions = transaction::list_all(pool).await?;
    Ok(Snapshot {
        products,
        transactions,
    })
}

/// Opens a scratch copy of a foreign store file and reads it.
async fn read_store_file(path: &Path) -> DbResult<Snapshot> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(false);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| DbError::schema(format!("cannot open store file: {e}")))?;

    let result = async {
        migrations::verify_schema(&pool).await?;
        load_snapshot_from(&pool).await
    }
    .await;

    pool.close().await;
    result
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use stockbook_core::seed::seed_products;

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = RelationalStore::open_in_memory().await.unwrap();
        assert!(store.health_check().await);
        assert_eq!(store.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stores_are_isolated() {
        let a = RelationalStore::create_seeded(&seed_products()).await.unwrap();
        let b = RelationalStore::open_in_memory().await.unwrap();

        assert_eq!(a.products().count().await.unwrap(), 6);
        assert_eq!(b.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_export_starts_with_header() {
        let store = RelationalStore::create_seeded(&seed_products()).await.unwrap();
        let bytes = store.export_bytes().await.unwrap();
        assert_eq!(&bytes[..16], SQLITE_HEADER);
    }

    #[tokio::test]
    async fn test_export_reimports_into_a_new_store() {
        let store = RelationalStore::create_seeded(&seed_products()).await.unwrap();
        let bytes = store.export_bytes().await.unwrap();

        let copy = RelationalStore::import(&bytes).await.unwrap();
        assert_eq!(copy.load_snapshot().await.unwrap(), store.load_snapshot().await.unwrap());
    }

    #[tokio::test]
    async fn test_import_rejects_negative_stock_and_price() {
        let store = RelationalStore::create_seeded(&seed_products()).await.unwrap();
        sqlx::query("UPDATE products SET price = -75.0, stock = -7 WHERE id = 'prod-3'")
            .execute(store.pool())
            .await
            .unwrap();
        let bytes = store.export_bytes().await.unwrap();

        assert!(matches!(
            RelationalStore::import(&bytes).await,
            Err(DbError::SchemaMismatch(_))
        ));
    }

    #[tokio::test]
    async fn test_close_discards_store() {
        let store = RelationalStore::open_in_memory().await.unwrap();
        store.close().await;
        assert!(!store.health_check().await);
    }
}
