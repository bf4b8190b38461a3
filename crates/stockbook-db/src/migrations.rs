//! # Schema Migrations and Verification
//!
//! The store has exactly one schema. Fresh stores get it from the embedded
//! migration; foreign store files offered for import are checked against it
//! column by column instead of being migrated.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Fresh in-memory store            Imported file                        │
//! │       │                                │                                │
//! │       ▼                                ▼                                │
//! │  MIGRATOR.run()                   verify_schema()                       │
//! │  0001_store_schema.sql            products: id name price stock sku     │
//! │       │                             description imageUrl type category │
//! │       │                           transactions: id items total tax      │
//! │       │                             subtotal date                       │
//! │       ▼                                │                                │
//! │  ready                            missing? → SchemaMismatch             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

/// Embedded migrations from `crates/stockbook-db/migrations`.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Columns every store file must carry in `products`.
pub const PRODUCT_COLUMNS: &[&str] = &[
    "id",
    "name",
    "price",
    "stock",
    "sku",
    "description",
    "imageUrl",
    "type",
    "category",
];

/// Columns every store file must carry in `transactions`.
pub const TRANSACTION_COLUMNS: &[&str] = &["id", "items", "total", "tax", "subtotal", "date"];

/// Applies the store schema to an empty database.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!(
        migrations = MIGRATOR.migrations.len(),
        "Store schema applied"
    );
    Ok(())
}

/// Checks that both tables exist with every required column.
///
/// Extra tables and columns are allowed. Column names compare
/// case-insensitively, as SQLite itself does.
pub async fn verify_schema(pool: &SqlitePool) -> DbResult<()> {
    verify_table(pool, "products", PRODUCT_COLUMNS).await?;
    verify_table(pool, "transactions", TRANSACTION_COLUMNS).await
}

async fn verify_table(pool: &SqlitePool, table: &str, required: &[&str]) -> DbResult<()> {
    let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?1)")
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(|e| DbError::schema(format!("cannot read table `{table}`: {e}")))?;

    if columns.is_empty() {
        return Err(DbError::schema(format!("missing table `{table}`")));
    }

    if let Some(missing) = required
        .iter()
        .find(|col| !columns.iter().any(|c| c.eq_ignore_ascii_case(col)))
    {
        return Err(DbError::schema(format!(
            "table `{table}` is missing column `{missing}`"
        )));
    }

    debug!(table = %table, columns = columns.len(), "Table verified");
    Ok(())
}
