//! # Repository Module
//!
//! SQL for the relational store, one module per table.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RelationalStore                                                        │
//! │       │                                                                 │
//! │       ├── products()      → ProductRepository      (pool-bound)        │
//! │       ├── transactions()  → TransactionRepository  (pool-bound)        │
//! │       │                                                                 │
//! │       └── commit_sale()   → product::decrement_stock(&mut *tx, ..)     │
//! │                             transaction::insert(&mut *tx, ..)          │
//! │                             (same SQL, one relational transaction)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod product;
pub mod transaction;

pub use product::ProductRepository;
pub use transaction::TransactionRepository;
