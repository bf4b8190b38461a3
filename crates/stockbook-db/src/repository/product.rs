//! # Product Repository
//!
//! Statements against the `products` table.
//!
//! Every statement is a free function generic over the executor, so the same
//! SQL runs on the pool for discrete mutations and inside the sale
//! transaction for stock decrements. [`ProductRepository`] is the pool-bound
//! convenience wrapper.
//!
//! ## Money Columns
//! `price` is `REAL` major units. Rows are read with `CAST(price AS REAL)`
//! so integer-typed values written by other tools decode the same way.

use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockbook_core::{Money, Product, ProductType};

const SELECT_PRODUCTS: &str = r#"
    SELECT
        id,
        name,
        CAST(price AS REAL) AS price,
        CAST(stock AS INTEGER) AS stock,
        sku,
        description,
        imageUrl AS image_url,
        type AS product_type,
        category
    FROM products
"#;

/// Raw `products` row before domain decoding.
#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    name: String,
    price: f64,
    stock: i64,
    sku: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
    product_type: String,
    category: Option<String>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        let product_type: ProductType = row.product_type.parse().map_err(|_| {
            DbError::schema(format!(
                "product {} has unknown type `{}`",
                row.id, row.product_type
            ))
        })?;
        let price = Money::from_decimal(row.price)
            .ok_or_else(|| DbError::schema(format!("product {} has invalid price", row.id)))?;

        Ok(Product {
            id: row.id,
            name: row.name,
            description: row.description.unwrap_or_default(),
            category: row.category.unwrap_or_default(),
            sku: row.sku.unwrap_or_default(),
            image_url: row.image_url.unwrap_or_default(),
            price,
            stock: row.stock,
            product_type,
        })
    }
}

// =============================================================================
// Statements
// =============================================================================

/// All products in insertion order.
pub async fn list_all<'e, E>(executor: E) -> DbResult<Vec<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT_PRODUCTS} ORDER BY rowid");
    let rows: Vec<ProductRow> = sqlx::query_as(&sql).fetch_all(executor).await?;
    rows.into_iter().map(Product::try_from).collect()
}

pub async fn get_by_id<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT_PRODUCTS} WHERE id = ?1");
    let row: Option<ProductRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    row.map(Product::try_from).transpose()
}

pub async fn insert<'e, E>(executor: E, product: &Product) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %product.id, sku = %product.sku, "Inserting product");

    sqlx::query(
        r#"
        INSERT INTO products (
            id, name, price, stock, sku, description, imageUrl, type, category
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(product.id.as_str())
    .bind(product.name.as_str())
    .bind(product.price.to_decimal())
    .bind(product.stock)
    .bind(product.sku.as_str())
    .bind(product.description.as_str())
    .bind(product.image_url.as_str())
    .bind(product.product_type.as_str())
    .bind(product.category.as_str())
    .execute(executor)
    .await?;

    Ok(())
}

/// Replaces every column of an existing row.
pub async fn update<'e, E>(executor: E, product: &Product) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %product.id, "Updating product");

    let result = sqlx::query(
        r#"
        UPDATE products SET
            name = ?2,
            price = ?3,
            stock = ?4,
            sku = ?5,
            description = ?6,
            imageUrl = ?7,
            type = ?8,
            category = ?9
        WHERE id = ?1
        "#,
    )
    .bind(product.id.as_str())
    .bind(product.name.as_str())
    .bind(product.price.to_decimal())
    .bind(product.stock)
    .bind(product.sku.as_str())
    .bind(product.description.as_str())
    .bind(product.image_url.as_str())
    .bind(product.product_type.as_str())
    .bind(product.category.as_str())
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", &product.id));
    }

    Ok(())
}

pub async fn delete<'e, E>(executor: E, id: &str) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %id, "Deleting product");

    let result = sqlx::query("DELETE FROM products WHERE id = ?1")
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

/// Removes `quantity` units from stock.
///
/// Fails with [`DbError::StockConflict`] when the row is missing or holds
/// fewer than `quantity` units, so a sale transaction can never drive stock
/// negative.
pub async fn decrement_stock<'e, E>(executor: E, id: &str, quantity: i64) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %id, qty = quantity, "Decrementing stock");

    let result = sqlx::query("UPDATE products SET stock = stock - ?2 WHERE id = ?1 AND stock >= ?2")
        .bind(id)
        .bind(quantity)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::StockConflict {
            product_id: id.to_string(),
            quantity,
        });
    }

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Pool-bound product statements.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        list_all(&self.pool).await
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        get_by_id(&self.pool, id).await
    }

    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        insert(&self.pool, product).await
    }

    pub async fn update(&self, product: &Product) -> DbResult<()> {
        update(&self.pool, product).await
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        delete(&self.pool, id).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
