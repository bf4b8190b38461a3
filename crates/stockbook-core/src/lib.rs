//! # stockbook-core: Pure Domain Logic for Stockbook
//!
//! Everything the inventory engine knows about products, sales and money,
//! expressed as plain data and pure functions.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Collaborators (CLI, UI shells, receipt printers)     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │   stockbook-inventory: Catalog, Ledger, Sales, Lifecycle        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockbook-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │   Cart    │  │   rules   │  │   │
//! │  │   │Transaction│  │  TaxRate  │  │ CartLine  │  │   seed    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                ▲                                        │
//! │  ┌─────────────────────────────┴───────────────────────────────────┐   │
//! │  │         stockbook-db: key-value mirror + SQLite store           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, ProductType, LineItem, Transaction
//! - [`money`] - Integer-cents money and basis-point tax rates
//! - [`cart`] - Cart lines and quantity rules
//! - [`validation`] - Input validation
//! - [`seed`] - The starter catalog
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockbook_core::{Money, TaxRate};
//!
//! let subtotal = Money::from_cents(15_000); // 150.00
//! let tax = subtotal.calculate_tax(TaxRate::from_bps(700));
//! assert_eq!(tax.cents(), 1_050);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod seed;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, CartTotals};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, TaxRate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line in the cart.
///
/// Catches slipped keystrokes (1000 instead of 10) before they reach stock.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest accepted unit price, in cents (1,000,000.00).
///
/// A full cart at this price stays far inside the i64 cent range.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

/// Sales tax applied at finalize unless configured otherwise (7%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 700;

/// Identity reported for a freshly created relational store.
pub const DEFAULT_STORE_NAME: &str = "pos-data.db";
