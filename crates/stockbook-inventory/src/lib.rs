//! # stockbook-inventory: Catalog, Ledger, Sales and Backend Lifecycle
//!
//! The in-memory source of truth and everything that keeps it in step with
//! the connected backend.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  collaborator (CLI, UI) ──► InventoryHandle ──► Inventory              │
//! │                                                  │                      │
//! │             ┌──────────────┬────────────────────┼──────────────┐       │
//! │             ▼              ▼                    ▼              ▼       │
//! │       CatalogStore      Ledger          SaleCoordinator   BackendLifecycle
//! │       (catalog.rs)   (ledger.rs)          (sale.rs)       (lifecycle.rs)│
//! │             │              │                    │              │       │
//! │             └──────────────┴─────────┬──────────┘              │       │
//! │                                      ▼                         │       │
//! │                          stockbook_db::Backend ◄───────────────┘       │
//! │                          (Mirror | Relational)   owns + switches       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use stockbook_inventory::{Inventory, StockbookConfig};
//!
//! let mut inventory = Inventory::open(StockbookConfig::load(None)?).await?;
//! inventory.add_to_cart("prod-3", 3)?;
//! let sale = inventory.finalize_sale().await?;
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod handle;
pub mod inventory;
pub mod ledger;
pub mod lifecycle;
pub mod sale;

pub use catalog::CatalogStore;
pub use config::{ConfigError, StockbookConfig};
pub use error::{InventoryError, InventoryResult};
pub use handle::InventoryHandle;
pub use inventory::Inventory;
pub use ledger::{Ledger, LedgerPage, SalesSummary};
pub use lifecycle::{BackendIdentity, BackendLifecycle};
pub use sale::{SaleCoordinator, SaleState};
