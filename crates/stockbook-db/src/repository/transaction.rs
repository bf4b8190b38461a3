//! # Transaction Repository
//!
//! Statements against the `transactions` table (the ledger).
//!
//! ## Row Layout
//! ```text
//! ┌──────────┬────────────────────────────────────────────┬────────┬───────┬──────────┬──────────────────────────┐
//! │ id       │ items (JSON text)                          │ total  │ tax   │ subtotal │ date                     │
//! ├──────────┼────────────────────────────────────────────┼────────┼───────┼──────────┼──────────────────────────┤
//! │ 7f3c…    │ [{"productId":"prod-5","name":"Lemon Tea", │ 160.5  │ 10.5  │ 150.0    │ 2024-05-01T09:30:00.000Z │
//! │          │   "quantity":3,"price":50.0}]              │        │       │          │                          │
//! └──────────┴────────────────────────────────────────────┴────────┴───────┴──────────┴──────────────────────────┘
//! ```
//!
//! The ledger is append-only: there is no update or delete statement.

use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockbook_core::{parse_timestamp, LineItem, Money, Transaction};

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: String,
    items: String,
    total: f64,
    tax: f64,
    subtotal: f64,
    date: String,
}

fn decode_money(id: &str, column: &str, value: f64) -> DbResult<Money> {
    Money::from_decimal(value)
        .ok_or_else(|| DbError::schema(format!("transaction {id} has invalid {column}")))
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DbError;

    fn try_from(row: TransactionRow) -> DbResult<Self> {
        let items: Vec<LineItem> = serde_json::from_str(&row.items).map_err(|e| {
            DbError::schema(format!("transaction {} has malformed items: {e}", row.id))
        })?;
        let date = parse_timestamp(&row.date).map_err(|e| {
            DbError::schema(format!("transaction {} has malformed date: {e}", row.id))
        })?;

        Ok(Transaction {
            subtotal: decode_money(&row.id, "subtotal", row.subtotal)?,
            tax: decode_money(&row.id, "tax", row.tax)?,
            total: decode_money(&row.id, "total", row.total)?,
            id: row.id,
            items,
            date,
        })
    }
}

/// All entries, most recently inserted first.
pub async fn list_all<'e, E>(executor: E) -> DbResult<Vec<Transaction>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows: Vec<TransactionRow> = sqlx::query_as(
        r#"
        SELECT
            id,
            items,
            CAST(total AS REAL) AS total,
            CAST(tax AS REAL) AS tax,
            CAST(subtotal AS REAL) AS subtotal,
            date
        FROM transactions
        ORDER BY rowid DESC
        "#,
    )
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(Transaction::try_from).collect()
}

pub async fn insert<'e, E>(executor: E, entry: &Transaction) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %entry.id, lines = entry.items.len(), total = %entry.total, "Inserting transaction");

    let items = serde_json::to_string(&entry.items)?;

    sqlx::query(
        r#"
        INSERT INTO transactions (id, items, total, tax, subtotal, date)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(entry.id.as_str())
    .bind(items)
    .bind(entry.total.to_decimal())
    .bind(entry.tax.to_decimal())
    .bind(entry.subtotal.to_decimal())
    .bind(entry.date_text())
    .execute(executor)
    .await?;

    Ok(())
}

/// Pool-bound ledger statements.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    pub async fn list_all(&self) -> DbResult<Vec<Transaction>> {
        list_all(&self.pool).await
    }

    pub async fn insert(&self, entry: &Transaction) -> DbResult<()> {
        insert(&self.pool, entry).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
