//! # stockbook
//!
//! Command-line collaborator for the Stockbook core.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  stockbook [--config F] [--store F] [--ephemeral] [--json] <command>   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StockbookConfig::load ──► Inventory::open (mirror)                     │
//! │                                 │                                       │
//! │                      --store? ──┴──► load_store(file bytes)             │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │                             command                                     │
//! │                                 │                                       │
//! │         mutated and --store? ───┴──► export_store ──► file              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Startup Sequence
//! 1. Parse arguments
//! 2. Initialize tracing (stderr, `RUST_LOG` aware)
//! 3. Run the command on a multi-threaded tokio runtime

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use stockbook_core::ProductType;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{parse_money, SaleLine};

/// stockbook - inventory and sales ledger
#[derive(Parser, Debug)]
#[command(name = "stockbook")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a stockbook.toml (default: platform config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Work on this store file instead of the mirror; written back after a
    /// successful change
    #[arg(short, long, global = true)]
    pub store: Option<PathBuf>,

    /// Keep the mirror in memory for this run
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Catalog ===
    /// List products
    #[command(alias = "ls")]
    Products {
        /// Case-insensitive match on name or category
        #[arg(long)]
        search: Option<String>,

        /// Only this exact category
        #[arg(long)]
        category: Option<String>,
    },

    /// Add a product
    AddProduct(ProductArgs),

    /// Change fields of an existing product
    UpdateProduct {
        id: String,

        #[command(flatten)]
        changes: ProductChanges,
    },

    /// Remove a product (its sales stay in the ledger)
    DeleteProduct { id: String },

    // === Sales ===
    /// Sell products in one transaction, e.g. `sell prod-3:2 prod-1`
    Sell {
        #[arg(required = true)]
        lines: Vec<SaleLine>,
    },

    /// Ledger, most recent first
    History {
        #[arg(long, default_value = "1")]
        page: usize,
    },

    /// Sales for one UTC day
    Summary {
        /// YYYY-MM-DD (default: today)
        #[arg(long)]
        day: Option<chrono::NaiveDate>,
    },

    /// INVENTORY products running low
    LowStock,

    // === Store files ===
    /// Write a new store file holding the seed catalog
    NewStore {
        #[arg(long)]
        out: PathBuf,
    },

    /// Copy the connected store (`--store`) to another file
    Export {
        #[arg(long)]
        out: PathBuf,
    },

    /// Validate a store file and describe its contents
    Inspect { file: PathBuf },
}

#[derive(Args, Debug)]
pub struct ProductArgs {
    #[arg(long)]
    pub name: String,

    /// Decimal, e.g. 3.25
    #[arg(long, value_parser = parse_money)]
    pub price: stockbook_core::Money,

    #[arg(long, default_value = "0")]
    pub stock: i64,

    /// inventory | service
    #[arg(long = "type", default_value = "inventory")]
    pub product_type: ProductType,

    #[arg(long, default_value = "")]
    pub category: String,

    #[arg(long, default_value = "")]
    pub sku: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long, default_value = "")]
    pub image_url: String,
}

#[derive(Args, Debug, Default)]
pub struct ProductChanges {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, value_parser = parse_money)]
    pub price: Option<stockbook_core::Money>,

    #[arg(long)]
    pub stock: Option<i64>,

    #[arg(long = "type")]
    pub product_type: Option<ProductType>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub sku: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub image_url: Option<String>,
}

impl Commands {
    /// Whether a successful run changed catalog or ledger.
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::AddProduct(_)
                | Commands::UpdateProduct { .. }
                | Commands::DeleteProduct { .. }
                | Commands::Sell { .. }
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    commands::run(cli).await
}

/// Logs go to stderr so stdout stays parseable.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - everything at debug
/// - `RUST_LOG=stockbook=trace` - trace for stockbook crates only
/// - Default: `info,stockbook=debug,sqlx=warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockbook=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sell() {
        let cli = Cli::try_parse_from(["stockbook", "--ephemeral", "sell", "prod-3:2", "prod-1"]).unwrap();
        let Commands::Sell { lines } = cli.command else {
            panic!("expected sell");
        };
        assert_eq!(lines[0], SaleLine { product_id: "prod-3".into(), quantity: 2 });
        assert_eq!(lines[1].quantity, 1);
        assert!(cli.ephemeral);
    }

    #[test]
    fn test_sell_requires_lines() {
        assert!(Cli::try_parse_from(["stockbook", "sell"]).is_err());
    }

    #[test]
    fn test_parse_add_product() {
        let cli = Cli::try_parse_from([
            "stockbook", "add-product", "--name", "Bagel", "--price", "3.25", "--stock", "12",
            "--type", "service",
        ])
        .unwrap();
        let Commands::AddProduct(args) = cli.command else {
            panic!("expected add-product");
        };
        assert_eq!(args.price.cents(), 325);
        assert_eq!(args.product_type, ProductType::Service);
        assert!(cli.store.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["stockbook", "history", "--page", "2", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::History { page: 2 }));
        assert!(!cli.command.mutates());
    }
}
