//! # Sale Coordinator
//!
//! Owns the cart and turns it into exactly one ledger entry plus the
//! matching stock decrements, or into nothing at all.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Building ──finalize──► Validating ──► Committing ──► Committed        │
//! │      ▲                       │              │                           │
//! │      │                       ▼              ▼                           │
//! │      │                    Aborted ◄─────────┘                           │
//! │      │                       │                                          │
//! │      └──── any cart edit ────┘  (Committed too)                         │
//! │                                                                         │
//! │   Validating: every line re-checked against the live catalog           │
//! │   Committing: ledger append + INVENTORY decrements as one backend unit │
//! │   Memory (catalog, ledger, cart) changes only after the backend says ok│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::CatalogStore;
use crate::error::{InventoryError, InventoryResult};
use crate::ledger::Ledger;
use stockbook_core::{new_transaction_id, Cart, CartLine, CartTotals, TaxRate, Transaction};
use stockbook_db::{Backend, SaleCommit, StockDecrement};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleState {
    #[default]
    Building,
    Validating,
    Committing,
    Committed,
    Aborted,
}

#[derive(Debug, Default)]
pub struct SaleCoordinator {
    cart: Cart,
    state: SaleState,
}

/// A sale ready to hand to the backend.
struct PreparedSale {
    entry: Transaction,
    decrements: Vec<StockDecrement>,
    catalog_after: CatalogStore,
    ledger_after: Vec<Transaction>,
}

impl SaleCoordinator {
    pub fn new() -> Self {
        SaleCoordinator::default()
    }

    pub fn state(&self) -> SaleState {
        self.state
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    // =========================================================================
    // Cart Editing
    // =========================================================================

    /// Adds units of a catalog product.
    ///
    /// Rejected with `InsufficientStock` when the cart's total for an
    /// INVENTORY product would exceed live stock. The cart is unchanged on
    /// any error.
    pub fn add_item(&mut self, catalog: &CatalogStore, product_id: &str, qty: i64) -> InventoryResult<()> {
        let product = catalog
            .get(product_id)
            .ok_or_else(|| InventoryError::product_not_found(product_id))?;

        self.cart.add_item(product, qty)?;
        self.state = SaleState::Building;
        debug!(id = %product_id, sku = %product.sku, qty, "Added to cart");
        Ok(())
    }

    /// `0` removes the line.
    pub fn set_quantity(&mut self, catalog: &CatalogStore, product_id: &str, qty: i64) -> InventoryResult<()> {
        if qty == 0 {
            return self.remove_item(product_id);
        }

        let product = catalog
            .get(product_id)
            .ok_or_else(|| InventoryError::product_not_found(product_id))?;

        self.cart.set_quantity(product, qty)?;
        self.state = SaleState::Building;
        debug!(id = %product_id, qty, "Cart quantity set");
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &str) -> InventoryResult<()> {
        self.cart.remove_item(product_id)?;
        self.state = SaleState::Building;
        debug!(id = %product_id, "Removed from cart");
        Ok(())
    }

    pub fn clear(&mut self) {
        self.cart.clear();
        self.state = SaleState::Building;
    }

    /// Preview priced against the live catalog.
    pub fn totals(&self, catalog: &CatalogStore, rate: TaxRate) -> CartTotals {
        self.cart.totals(|id| catalog.get(id), rate)
    }

    // =========================================================================
    // Finalize
    // =========================================================================

    /// Turns the cart into a committed sale.
    ///
    /// Returns `Ok(None)` for an empty cart. On any error the catalog, the
    /// ledger, the backend contents and the cart are all as they were, and
    /// the state is `Aborted`.
    pub async fn finalize(
        &mut self,
        catalog: &mut CatalogStore,
        ledger: &mut Ledger,
        backend: &Backend,
        rate: TaxRate,
    ) -> InventoryResult<Option<Transaction>> {
        if self.cart.is_empty() {
            debug!("Finalize on empty cart, nothing to do");
            return Ok(None);
        }

        self.state = SaleState::Validating;
        let prepared = match self.prepare(catalog, ledger, rate) {
            Ok(prepared) => prepared,
            Err(err) => return Err(self.abort(err)),
        };

        self.state = SaleState::Committing;
        let commit = SaleCommit {
            entry: &prepared.entry,
            decrements: &prepared.decrements,
            catalog_after: prepared.catalog_after.list(),
            ledger_after: &prepared.ledger_after,
        };
        if let Err(err) = backend.commit_sale(commit).await {
            return Err(self.abort(err.into()));
        }

        let PreparedSale {
            entry,
            catalog_after,
            ledger_after,
            ..
        } = prepared;
        *catalog = catalog_after;
        ledger.install(ledger_after);
        self.cart.clear();
        self.state = SaleState::Committed;

        info!(
            id = %entry.id,
            items = entry.items.len(),
            qty = entry.quantity(),
            total = %entry.total,
            "Sale committed"
        );
        Ok(Some(entry))
    }

    /// Validating: re-check the cart against live stock and build the
    /// post-sale collections on copies.
    fn prepare(&self, catalog: &CatalogStore, ledger: &Ledger, rate: TaxRate) -> InventoryResult<PreparedSale> {
        let items = self.cart.priced_lines(|id| catalog.get(id))?;
        let entry = Transaction::new(new_transaction_id(), items, rate, Utc::now());

        let mut catalog_after = catalog.clone();
        let mut decrements = Vec::new();
        for item in &entry.items {
            if catalog_after.decrement_stock(&item.product_id, item.quantity)? {
                decrements.push(StockDecrement {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                });
            }
        }

        let ledger_after = ledger.with_head(&entry);
        Ok(PreparedSale {
            entry,
            decrements,
            catalog_after,
            ledger_after,
        })
    }

    fn abort(&mut self, err: InventoryError) -> InventoryError {
        warn!(error = %err, lines = self.cart.len(), "Sale aborted");
        self.state = SaleState::Aborted;
        err
    }

    /// Drops the cart; used when the backend is switched.
    pub(crate) fn reset(&mut self) {
        self.cart.clear();
        self.state = SaleState::Building;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockbook_core::seed::seed_products;
    use stockbook_core::{Money, DEFAULT_TAX_RATE_BPS};
    use stockbook_db::MirrorBackend;

    fn setup() -> (CatalogStore, Ledger, Backend) {
        (
            CatalogStore::new(seed_products()),
            Ledger::default(),
            Backend::Mirror(MirrorBackend::in_memory()),
        )
    }

    fn rate() -> TaxRate {
        TaxRate::from_bps(DEFAULT_TAX_RATE_BPS)
    }

    #[test]
    fn test_add_unknown_product() {
        let (catalog, _, _) = setup();
        let mut sale = SaleCoordinator::new();

        assert!(matches!(
            sale.add_item(&catalog, "nope", 1),
            Err(InventoryError::NotFound { .. })
        ));
        assert!(sale.cart().is_empty());
    }

    #[test]
    fn test_add_beyond_stock_leaves_cart_unchanged() {
        let (catalog, _, _) = setup();
        let mut sale = SaleCoordinator::new();

        sale.add_item(&catalog, "prod-6", 20).unwrap();
        assert!(matches!(
            sale.add_item(&catalog, "prod-6", 11),
            Err(InventoryError::InsufficientStock { available: 30, requested: 31, .. })
        ));
        assert_eq!(sale.cart().quantity_of("prod-6"), 20);
    }

    #[test]
    fn test_set_quantity() {
        let (catalog, _, _) = setup();
        let mut sale = SaleCoordinator::new();

        assert!(matches!(
            sale.set_quantity(&catalog, "prod-3", 2),
            Err(InventoryError::NotFound { .. })
        ));

        sale.add_item(&catalog, "prod-3", 1).unwrap();
        sale.set_quantity(&catalog, "prod-3", 4).unwrap();
        assert_eq!(sale.cart().quantity_of("prod-3"), 4);

        assert!(sale.set_quantity(&catalog, "prod-3", 51).is_err());
        assert_eq!(sale.cart().quantity_of("prod-3"), 4);

        sale.set_quantity(&catalog, "prod-3", 0).unwrap();
        assert!(sale.cart().is_empty());
    }

    #[test]
    fn test_totals_preview() {
        let (catalog, _, _) = setup();
        let mut sale = SaleCoordinator::new();
        sale.add_item(&catalog, "prod-1", 2).unwrap();

        let totals = sale.totals(&catalog, rate());
        assert_eq!(totals.subtotal, Money::from_major_minor(110, 0));
        assert_eq!(totals.tax, Money::from_major_minor(7, 70));
        assert_eq!(totals.total, Money::from_major_minor(117, 70));
    }

    #[tokio::test]
    async fn test_finalize_empty_cart_is_noop() {
        let (mut catalog, mut ledger, backend) = setup();
        let mut sale = SaleCoordinator::new();

        let result = sale
            .finalize(&mut catalog, &mut ledger, &backend, rate())
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(ledger.is_empty());
        assert_eq!(catalog, CatalogStore::new(seed_products()));
        assert_eq!(sale.state(), SaleState::Building);
    }

    #[tokio::test]
    async fn test_finalize_commits_and_clears_cart() {
        let (mut catalog, mut ledger, backend) = setup();
        let mut sale = SaleCoordinator::new();
        sale.add_item(&catalog, "prod-3", 3).unwrap();
        sale.add_item(&catalog, "prod-1", 2).unwrap();

        let entry = sale
            .finalize(&mut catalog, &mut ledger, &backend, rate())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(entry.items.len(), 2);
        assert_eq!(entry.items[0].name, "Croissant");
        assert!(entry.totals_consistent(rate()));
        assert_eq!(catalog.get("prod-3").unwrap().stock, 47);
        // Service stock untouched.
        assert_eq!(catalog.get("prod-1").unwrap().stock, 100);
        assert_eq!(ledger.entries()[0], entry);
        assert!(sale.cart().is_empty());
        assert_eq!(sale.state(), SaleState::Committed);
    }

    #[tokio::test]
    async fn test_finalize_revalidates_against_live_stock() {
        let (mut catalog, mut ledger, backend) = setup();
        let mut sale = SaleCoordinator::new();
        sale.add_item(&catalog, "prod-6", 10).unwrap();

        // Stock drops after the line was added.
        let mut brownie = catalog.get("prod-6").unwrap().clone();
        brownie.stock = 4;
        catalog.update(&backend, brownie).await.unwrap();
        let before = catalog.clone();

        let result = sale.finalize(&mut catalog, &mut ledger, &backend, rate()).await;

        assert!(matches!(result, Err(InventoryError::InsufficientStock { .. })));
        assert_eq!(catalog, before);
        assert!(ledger.is_empty());
        assert_eq!(sale.cart().quantity_of("prod-6"), 10);
        assert_eq!(sale.state(), SaleState::Aborted);

        sale.set_quantity(&catalog, "prod-6", 4).unwrap();
        assert_eq!(sale.state(), SaleState::Building);
    }

    #[tokio::test]
    async fn test_finalize_with_deleted_product_aborts() {
        let (mut catalog, mut ledger, backend) = setup();
        let mut sale = SaleCoordinator::new();
        sale.add_item(&catalog, "prod-2", 1).unwrap();
        catalog.delete(&backend, "prod-2").await.unwrap();

        let result = sale.finalize(&mut catalog, &mut ledger, &backend, rate()).await;
        assert!(matches!(result, Err(InventoryError::NotFound { .. })));
        assert!(ledger.is_empty());
        assert_eq!(sale.state(), SaleState::Aborted);
    }
}
