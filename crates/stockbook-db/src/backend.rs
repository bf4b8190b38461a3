//! # Backend Adapter
//!
//! One contract over both storage variants.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                             Backend                                     │
//! │                                                                         │
//! │   operation                  Mirror                 Relational          │
//! │   ─────────────────────────  ─────────────────────  ─────────────────  │
//! │   load_snapshot              both keys or None      always Some         │
//! │   apply_product_mutation     rewrite catalog doc    INSERT/UPDATE/DEL   │
//! │   apply_ledger_append        rewrite ledger doc     INSERT              │
//! │   commit_sale                ledger doc, catalog    BEGIN … COMMIT      │
//! │                              doc (PartialCommit)    (ROLLBACK)          │
//! │   export_bytes               Unsupported            VACUUM INTO         │
//! │   import_bytes               Unsupported            new store, swapped  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callers hand every mutation both the discrete operation and the
//! post-mutation collection. The relational variant runs the statement; the
//! mirror writes the collection. Callers never branch on the variant.

use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::mirror::MirrorBackend;
use crate::store::RelationalStore;
use stockbook_core::seed::seed_products;
use stockbook_core::validation::validate_product;
use stockbook_core::{Product, Transaction};

// =============================================================================
// Contract Types
// =============================================================================

/// Full contents of a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Catalog in listing order.
    pub products: Vec<Product>,
    /// Ledger, most recent first.
    pub transactions: Vec<Transaction>,
}

impl Snapshot {
    /// The seed catalog with an empty ledger.
    pub fn seed() -> Self {
        Snapshot {
            products: seed_products(),
            transactions: Vec::new(),
        }
    }

    /// Invariants every loaded snapshot must hold before it becomes memory:
    /// valid products (non-negative price and stock) and unique ids in
    /// both collections. The error names the first offender.
    pub fn check(&self) -> Result<(), String> {
        let mut product_ids = HashSet::new();
        for product in &self.products {
            validate_product(product).map_err(|e| format!("product {}: {e}", product.id))?;
            if !product_ids.insert(product.id.as_str()) {
                return Err(format!("duplicate product id {}", product.id));
            }
        }

        let mut transaction_ids = HashSet::new();
        for entry in &self.transactions {
            if !transaction_ids.insert(entry.id.as_str()) {
                return Err(format!("duplicate transaction id {}", entry.id));
            }
        }
        Ok(())
    }
}

/// One catalog change.
#[derive(Debug, Clone, Copy)]
pub enum ProductMutation<'a> {
    Insert(&'a Product),
    Update(&'a Product),
    Delete(&'a str),
}

impl ProductMutation<'_> {
    pub fn product_id(&self) -> &str {
        match self {
            ProductMutation::Insert(p) | ProductMutation::Update(p) => &p.id,
            ProductMutation::Delete(id) => id,
        }
    }
}

/// Units of an INVENTORY product consumed by a sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDecrement {
    pub product_id: String,
    pub quantity: i64,
}

/// Everything one sale commit needs.
#[derive(Debug, Clone, Copy)]
pub struct SaleCommit<'a> {
    /// The new ledger entry.
    pub entry: &'a Transaction,
    /// One per INVENTORY line.
    pub decrements: &'a [StockDecrement],
    /// Catalog with the decrements applied.
    pub catalog_after: &'a [Product],
    /// Ledger with `entry` at the head.
    pub ledger_after: &'a [Transaction],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Mirror,
    Relational,
}

impl BackendKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Mirror => "mirror",
            BackendKind::Relational => "relational",
        }
    }
}

// =============================================================================
// Backend
// =============================================================================

/// The active storage backend.
#[derive(Debug, Clone)]
pub enum Backend {
    Mirror(MirrorBackend),
    Relational(RelationalStore),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Mirror(_) => BackendKind::Mirror,
            Backend::Relational(_) => BackendKind::Relational,
        }
    }

    /// Full contents, or `None` when the backend has never been written.
    ///
    /// A relational store always has a snapshot, possibly empty.
    pub async fn load_snapshot(&self) -> DbResult<Option<Snapshot>> {
        match self {
            Backend::Mirror(mirror) => mirror.load_snapshot(),
            Backend::Relational(store) => store.load_snapshot().await.map(Some),
        }
    }

    pub async fn apply_product_mutation(
        &self,
        op: ProductMutation<'_>,
        catalog_after: &[Product],
    ) -> DbResult<()> {
        debug!(backend = self.kind().as_str(), id = %op.product_id(), "Applying product mutation");

        match self {
            Backend::Mirror(mirror) => mirror.write_products(catalog_after),
            Backend::Relational(store) => {
                let products = store.products();
                match op {
                    ProductMutation::Insert(p) => products.insert(p).await,
                    ProductMutation::Update(p) => products.update(p).await,
                    ProductMutation::Delete(id) => products.delete(id).await,
                }
            }
        }
    }

    pub async fn apply_ledger_append(
        &self,
        entry: &Transaction,
        ledger_after: &[Transaction],
    ) -> DbResult<()> {
        debug!(backend = self.kind().as_str(), id = %entry.id, "Appending ledger entry");

        match self {
            Backend::Mirror(mirror) => mirror.write_transactions(ledger_after),
            Backend::Relational(store) => store.transactions().insert(entry).await,
        }
    }

    /// Ledger append plus stock decrements as one unit.
    ///
    /// Relational: all or nothing. Mirror: may end in
    /// [`DbError::PartialCommit`].
    pub async fn commit_sale(&self, sale: SaleCommit<'_>) -> DbResult<()> {
        match self {
            Backend::Mirror(mirror) => mirror.commit_sale(sale.ledger_after, sale.catalog_after),
            Backend::Relational(store) => store.commit_sale(sale.entry, sale.decrements).await,
        }
    }

    pub async fn export_bytes(&self) -> DbResult<Vec<u8>> {
        match self {
            Backend::Mirror(_) => Err(DbError::unsupported("export", "mirror")),
            Backend::Relational(store) => store.export_bytes().await,
        }
    }

    /// Replaces the relational store's contents with an imported file.
    ///
    /// The replacement is built and validated first; on any error `self` is
    /// left exactly as it was.
    pub async fn import_bytes(&mut self, bytes: &[u8]) -> DbResult<()> {
        match self {
            Backend::Mirror(_) => Err(DbError::unsupported("import", "mirror")),
            Backend::Relational(store) => {
                let replacement = RelationalStore::import(bytes).await?;
                let previous = std::mem::replace(store, replacement);
                previous.close().await;
                info!("Relational store contents replaced");
                Ok(())
            }
        }
    }

    /// Releases the backend. Closing a relational store discards it.
    pub async fn close(&self) {
        if let Backend::Relational(store) = self {
            store.close().await;
        }
    }
}
