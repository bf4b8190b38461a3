//! # stockbook-db: Storage Backends for Stockbook
//!
//! The two interchangeable places the catalog and ledger can live, behind
//! one [`Backend`] enum.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Data Flow                              │
//! │                                                                         │
//! │  stockbook-inventory (Catalog / Ledger / Sales / Lifecycle)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  stockbook-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐ │   │
//! │  │   │   Backend     │    │  Repositories  │    │  Migrations  │ │   │
//! │  │   │ (backend.rs)  │    │ product.rs     │    │  + schema    │ │   │
//! │  │   │               │    │ transaction.rs │    │  verification│ │   │
//! │  │   │ Mirror ───────┼──► mirror.rs (KeyValueStore documents)  │ │   │
//! │  │   │ Relational ───┼──► store.rs (in-memory SQLite)          │ │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                     │                           │
//! │       ▼                                     ▼                           │
//! │  <data_dir>/stockbook.*.json           store file bytes (.db)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use stockbook_db::{Backend, RelationalStore};
//! use stockbook_core::seed::seed_products;
//!
//! let store = RelationalStore::create_seeded(&seed_products()).await?;
//! let backend = Backend::Relational(store);
//! let bytes = backend.export_bytes().await?;
//! ```

pub mod backend;
pub mod error;
pub mod migrations;
pub mod mirror;
pub mod repository;
pub mod store;

pub use backend::{Backend, BackendKind, ProductMutation, SaleCommit, Snapshot, StockDecrement};
pub use error::{DbError, DbResult};
pub use mirror::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, MirrorBackend};
pub use store::RelationalStore;
