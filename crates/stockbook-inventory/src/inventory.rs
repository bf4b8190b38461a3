//! # Inventory
//!
//! The single value that owns catalog, ledger, cart and the connected
//! backend. Everything collaborators read or write goes through here.
//!
//! ## Read / Write Surface
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  READ                                 WRITE                             │
//! │  ────                                 ─────                             │
//! │  products / product / search          add / update / delete product     │
//! │  categories / low_stock               cart add / set / remove / clear   │
//! │  ledger_page / ledger_summary         finalize_sale                     │
//! │  identity / backend_kind              create_new_store / load_store     │
//! │  cart_lines / cart_totals / state     export_store / disconnect         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Switching backends replaces catalog and ledger with the new backend's
//! snapshot and discards the cart.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::CatalogStore;
use crate::config::StockbookConfig;
use crate::error::{InventoryError, InventoryResult};
use crate::ledger::{Ledger, LedgerPage, SalesSummary};
use crate::lifecycle::{BackendIdentity, BackendLifecycle};
use crate::sale::{SaleCoordinator, SaleState};
use stockbook_core::{CartLine, CartTotals, NewProduct, Product, TaxRate, Transaction};
use stockbook_db::{Backend, BackendKind, KeyValueStore, MirrorBackend, Snapshot};

#[derive(Debug)]
pub struct Inventory {
    config: StockbookConfig,
    lifecycle: BackendLifecycle,
    catalog: CatalogStore,
    ledger: Ledger,
    sale: SaleCoordinator,
}

impl Inventory {
    /// Opens against the mirror the config points at.
    ///
    /// `storage.ephemeral` selects an in-memory key-value store; otherwise
    /// documents live in the configured (or platform) data directory.
    pub async fn open(config: StockbookConfig) -> InventoryResult<Self> {
        let mirror = if config.storage.ephemeral {
            MirrorBackend::in_memory()
        } else {
            let dir = config
                .data_dir()
                .ok_or_else(|| InventoryError::Io("no data directory available".into()))?;
            debug!(dir = %dir.display(), "Opening mirror directory");
            MirrorBackend::open_dir(dir)?
        };
        Self::open_with_mirror(mirror, config).await
    }

    /// Opens against a caller-supplied key-value store.
    pub async fn open_with_store(
        store: Arc<dyn KeyValueStore>,
        config: StockbookConfig,
    ) -> InventoryResult<Self> {
        Self::open_with_mirror(MirrorBackend::new(store), config).await
    }

    async fn open_with_mirror(mirror: MirrorBackend, config: StockbookConfig) -> InventoryResult<Self> {
        config.validate()?;
        let (lifecycle, snapshot) = BackendLifecycle::open(mirror).await?;

        let mut inventory = Inventory {
            config,
            lifecycle,
            catalog: CatalogStore::default(),
            ledger: Ledger::default(),
            sale: SaleCoordinator::new(),
        };
        inventory.install(snapshot);
        Ok(inventory)
    }

    fn install(&mut self, snapshot: Snapshot) {
        self.catalog.replace(snapshot.products);
        self.ledger.replace(snapshot.transactions);
        self.sale.reset();
        debug!(
            products = self.catalog.len(),
            transactions = self.ledger.len(),
            "Snapshot installed"
        );
    }

    pub fn config(&self) -> &StockbookConfig {
        &self.config
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.config.tax_rate()
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn products(&self) -> &[Product] {
        self.catalog.list()
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.catalog.get(id)
    }

    pub fn search(&self, term: &str, category: Option<&str>) -> InventoryResult<Vec<&Product>> {
        self.catalog.search(term, category)
    }

    pub fn categories(&self) -> Vec<&str> {
        self.catalog.categories()
    }

    /// Low-stock report with the configured threshold and limit.
    pub fn low_stock(&self) -> Vec<&Product> {
        let reports = &self.config.reports;
        self.catalog
            .low_stock(reports.low_stock_threshold, reports.low_stock_limit)
    }

    pub async fn add_product(&mut self, draft: NewProduct) -> InventoryResult<Product> {
        self.catalog.add(self.lifecycle.backend(), draft).await
    }

    pub async fn update_product(&mut self, product: Product) -> InventoryResult<Product> {
        self.catalog.update(self.lifecycle.backend(), product).await
    }

    pub async fn delete_product(&mut self, id: &str) -> InventoryResult<Product> {
        self.catalog.delete(self.lifecycle.backend(), id).await
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// A page at the configured page size.
    pub fn ledger_page(&self, page: usize) -> InventoryResult<LedgerPage> {
        self.ledger.list(page, self.config.ledger.page_size)
    }

    pub fn ledger_summary(&self, day: NaiveDate) -> SalesSummary {
        self.ledger.summary(day)
    }

    /// Records an externally built entry, checked against the configured
    /// tax rate.
    pub async fn append_transaction(&mut self, entry: Transaction) -> InventoryResult<()> {
        let rate = self.tax_rate();
        self.ledger.append(self.lifecycle.backend(), entry, rate).await
    }

    // =========================================================================
    // Cart and Sale
    // =========================================================================

    pub fn cart_lines(&self) -> &[CartLine] {
        self.sale.lines()
    }

    pub fn cart_totals(&self) -> CartTotals {
        self.sale.totals(&self.catalog, self.tax_rate())
    }

    pub fn sale_state(&self) -> SaleState {
        self.sale.state()
    }

    pub fn add_to_cart(&mut self, product_id: &str, qty: i64) -> InventoryResult<()> {
        self.sale.add_item(&self.catalog, product_id, qty)
    }

    pub fn set_cart_quantity(&mut self, product_id: &str, qty: i64) -> InventoryResult<()> {
        self.sale.set_quantity(&self.catalog, product_id, qty)
    }

    pub fn remove_from_cart(&mut self, product_id: &str) -> InventoryResult<()> {
        self.sale.remove_item(product_id)
    }

    pub fn clear_cart(&mut self) {
        self.sale.clear();
    }

    /// Commits the cart. `Ok(None)` when the cart is empty.
    pub async fn finalize_sale(&mut self) -> InventoryResult<Option<Transaction>> {
        let rate = self.tax_rate();
        self.sale
            .finalize(
                &mut self.catalog,
                &mut self.ledger,
                self.lifecycle.backend(),
                rate,
            )
            .await
    }

    // =========================================================================
    // Backend Lifecycle
    // =========================================================================

    pub fn identity(&self) -> &BackendIdentity {
        self.lifecycle.identity()
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.lifecycle.kind()
    }

    pub fn backend(&self) -> &Backend {
        self.lifecycle.backend()
    }

    /// Switches to a new seeded store file.
    pub async fn create_new_store(&mut self) -> InventoryResult<()> {
        let snapshot = self.lifecycle.create_new().await?;
        self.install(snapshot);
        info!(identity = %self.identity(), "New store connected");
        Ok(())
    }

    /// Switches to a store rebuilt from `bytes`. On error nothing changes.
    pub async fn load_store(&mut self, bytes: &[u8], name: &str) -> InventoryResult<()> {
        let snapshot = self.lifecycle.load_from_bytes(bytes, name).await?;
        self.install(snapshot);
        info!(
            identity = %self.identity(),
            products = self.catalog.len(),
            transactions = self.ledger.len(),
            "Store file loaded"
        );
        Ok(())
    }

    pub async fn export_store(&self) -> InventoryResult<Vec<u8>> {
        let bytes = self.lifecycle.export_to_bytes().await?;
        info!(identity = %self.identity(), bytes = bytes.len(), "Store exported");
        Ok(bytes)
    }

    /// Drops any store file and resumes from the mirror's own data.
    pub async fn disconnect(&mut self) -> InventoryResult<()> {
        let snapshot = self.lifecycle.disconnect().await?;
        self.install(snapshot);
        info!("Store disconnected, back on mirror");
        Ok(())
    }

    pub async fn close(&self) {
        self.lifecycle.close().await;
    }
}
