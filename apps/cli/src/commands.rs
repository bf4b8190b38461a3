//! Command implementations.
//!
//! Each command runs against one `Inventory`, opened for the duration of the
//! process. When `--store` names a file, its bytes are loaded as the
//! relational backend and, after a successful change, exported back to the
//! same path.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::json;
use stockbook_core::{Money, NewProduct, Product, Transaction};
use stockbook_inventory::{Inventory, StockbookConfig};
use tracing::{debug, info};

use crate::{Cli, Commands, ProductArgs, ProductChanges};

// =============================================================================
// Argument Types
// =============================================================================

/// `<product-id>[:<qty>]`, quantity defaulting to 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLine {
    pub product_id: String,
    pub quantity: i64,
}

impl FromStr for SaleLine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, qty) = match s.rsplit_once(':') {
            Some((id, qty)) => {
                let qty = qty
                    .parse::<i64>()
                    .map_err(|_| format!("invalid quantity in '{s}'"))?;
                (id, qty)
            }
            None => (s, 1),
        };

        if id.is_empty() {
            return Err(format!("missing product id in '{s}'"));
        }
        Ok(SaleLine {
            product_id: id.to_string(),
            quantity: qty,
        })
    }
}

/// Decimal major units, rounded to the cent.
pub fn parse_money(s: &str) -> Result<Money, String> {
    let amount: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a decimal amount"))?;
    Money::from_decimal(amount).ok_or_else(|| format!("'{s}' is out of range"))
}

// =============================================================================
// Entry Point
// =============================================================================

pub async fn run(cli: Cli) -> Result<()> {
    let Cli {
        config,
        store,
        ephemeral,
        json,
        command,
    } = cli;
    let out = Output { json };

    // These never touch the configured mirror.
    match &command {
        Commands::NewStore { out: path } => return new_store(path, &out).await,
        Commands::Inspect { file } => return inspect(file, &out).await,
        _ => {}
    }

    let mut config = StockbookConfig::load(config.as_deref()).context("Failed to load config")?;
    if ephemeral {
        config.storage.ephemeral = true;
    }

    let mut inventory = Inventory::open(config)
        .await
        .context("Failed to open inventory")?;

    if let Some(path) = &store {
        connect_store(&mut inventory, path).await?;
    }

    let mutates = command.mutates();
    let result = execute(&mut inventory, command, store.as_deref(), &out).await;

    if result.is_ok() && mutates {
        if let Some(path) = &store {
            write_store(&inventory, path).await?;
        }
    }

    inventory.close().await;
    result
}

async fn execute(
    inventory: &mut Inventory,
    command: Commands,
    store: Option<&Path>,
    out: &Output,
) -> Result<()> {
    match command {
        Commands::Products { search, category } => {
            let products = inventory.search(search.as_deref().unwrap_or(""), category.as_deref())?;
            out.products(&products);
        }

        Commands::AddProduct(args) => {
            let product = inventory.add_product(draft_from(args)).await?;
            out.product(&product, "Added");
        }

        Commands::UpdateProduct { id, changes } => {
            let current = inventory
                .product(&id)
                .cloned()
                .ok_or_else(|| anyhow!("Product not found: {id}"))?;
            let product = inventory.update_product(apply_changes(current, changes)).await?;
            out.product(&product, "Updated");
        }

        Commands::DeleteProduct { id } => {
            let removed = inventory.delete_product(&id).await?;
            out.product(&removed, "Deleted");
        }

        Commands::Sell { lines } => {
            for line in &lines {
                inventory
                    .add_to_cart(&line.product_id, line.quantity)
                    .with_context(|| format!("Cannot add {} × {}", line.quantity, line.product_id))?;
            }
            match inventory.finalize_sale().await? {
                Some(sale) => out.sale(&sale),
                None => bail!("nothing to sell"),
            }
        }

        Commands::History { page } => {
            let page = inventory.ledger_page(page)?;
            if out.json {
                out.print_json(&page)?;
            } else {
                println!(
                    "Page {}/{} ({} transactions)",
                    page.page,
                    page.total_pages.max(1),
                    page.total_entries
                );
                for entry in &page.entries {
                    println!(
                        "{}  {}  {:>3} units  {:>10}",
                        entry.date_text(),
                        entry.id,
                        entry.quantity(),
                        entry.total
                    );
                }
            }
        }

        Commands::Summary { day } => {
            let day = day.unwrap_or_else(|| chrono::Utc::now().date_naive());
            let summary = inventory.ledger_summary(day);
            if out.json {
                out.print_json(&summary)?;
            } else {
                println!("{}: {} sales, revenue {}", summary.day, summary.transactions, summary.revenue);
                println!("All-time revenue: {}", summary.all_time_revenue);
            }
        }

        Commands::LowStock => {
            out.products(&inventory.low_stock());
        }

        Commands::Export { out: target } => {
            if store.is_none() {
                bail!("export needs a connected store file (--store <file>)");
            }
            let bytes = inventory.export_store().await?;
            write_atomically(&target, &bytes).await?;
            info!(path = %target.display(), bytes = bytes.len(), "Store exported");
            println!("Exported {} bytes to {}", bytes.len(), target.display());
        }

        Commands::NewStore { .. } | Commands::Inspect { .. } => {
            bail!("this command does not run against an open inventory")
        }
    }
    Ok(())
}

// =============================================================================
// Store Files
// =============================================================================

async fn connect_store(inventory: &mut Inventory, path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read store file {}", path.display()))?;
    inventory
        .load_store(&bytes, &file_name(path))
        .await
        .with_context(|| format!("Cannot use {} as a store file", path.display()))?;
    debug!(path = %path.display(), "Store file connected");
    Ok(())
}

async fn write_store(inventory: &Inventory, path: &Path) -> Result<()> {
    let bytes = inventory.export_store().await?;
    write_atomically(path, &bytes).await?;
    debug!(path = %path.display(), bytes = bytes.len(), "Store file written back");
    Ok(())
}

async fn new_store(path: &Path, out: &Output) -> Result<()> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        bail!("{} already exists", path.display());
    }

    let mut inventory = Inventory::open(StockbookConfig::ephemeral()).await?;
    inventory.create_new_store().await?;
    let bytes = inventory.export_store().await?;
    write_atomically(path, &bytes).await?;
    inventory.close().await;

    if out.json {
        out.print_json(&json!({ "path": path, "bytes": bytes.len() }))?;
    } else {
        println!("Created {} ({} bytes)", path.display(), bytes.len());
    }
    Ok(())
}

async fn inspect(path: &Path, out: &Output) -> Result<()> {
    let mut inventory = Inventory::open(StockbookConfig::ephemeral()).await?;
    connect_store(&mut inventory, path).await?;

    let report = json!({
        "store": inventory.identity().to_string(),
        "products": inventory.products().len(),
        "categories": inventory.categories(),
        "transactions": inventory.ledger().len(),
        "revenue": inventory.ledger_summary(chrono::Utc::now().date_naive()).all_time_revenue,
    });
    inventory.close().await;

    if out.json {
        out.print_json(&report)?;
    } else {
        println!("Store:        {}", report["store"].as_str().unwrap_or_default());
        println!("Products:     {}", report["products"]);
        println!("Categories:   {}", report["categories"]);
        println!("Transactions: {}", report["transactions"]);
        println!("Revenue:      {}", report["revenue"]);
    }
    Ok(())
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// =============================================================================
// Product Arguments
// =============================================================================

fn draft_from(args: ProductArgs) -> NewProduct {
    NewProduct::new(args.name, args.price, args.stock, args.product_type)
        .category(args.category)
        .sku(args.sku)
        .description(args.description)
        .image_url(args.image_url)
}

fn apply_changes(mut product: Product, changes: ProductChanges) -> Product {
    if let Some(name) = changes.name {
        product.name = name;
    }
    if let Some(price) = changes.price {
        product.price = price;
    }
    if let Some(stock) = changes.stock {
        product.stock = stock;
    }
    if let Some(product_type) = changes.product_type {
        product.product_type = product_type;
    }
    if let Some(category) = changes.category {
        product.category = category;
    }
    if let Some(sku) = changes.sku {
        product.sku = sku;
    }
    if let Some(description) = changes.description {
        product.description = description;
    }
    if let Some(image_url) = changes.image_url {
        product.image_url = image_url;
    }
    product
}

// =============================================================================
// Output
// =============================================================================

struct Output {
    json: bool,
}

impl Output {
    fn print_json<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn products(&self, products: &[&Product]) {
        if self.json {
            if let Err(e) = self.print_json(products) {
                eprintln!("{e}");
            }
            return;
        }
        for p in products {
            println!(
                "{:<38} {:<20} {:<12} {:>9} {:>6} {}",
                p.id, p.name, p.category, p.price, p.stock, p.product_type
            );
        }
    }

    fn product(&self, product: &Product, verb: &str) {
        if self.json {
            if let Err(e) = self.print_json(product) {
                eprintln!("{e}");
            }
        } else {
            println!("{verb} {} ({})", product.name, product.id);
        }
    }

    fn sale(&self, sale: &Transaction) {
        if self.json {
            if let Err(e) = self.print_json(sale) {
                eprintln!("{e}");
            }
            return;
        }
        println!("Sale {} at {}", sale.id, sale.date_text());
        for item in &sale.items {
            println!(
                "  {:>3} × {:<20} {:>9}  {:>10}",
                item.quantity,
                item.name,
                item.price,
                item.line_total()
            );
        }
        println!("  Subtotal {:>10}", sale.subtotal);
        println!("  Tax      {:>10}", sale.tax);
        println!("  Total    {:>10}", sale.total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_sale_line_parsing() {
        assert_eq!(
            "prod-3:4".parse::<SaleLine>().unwrap(),
            SaleLine { product_id: "prod-3".into(), quantity: 4 }
        );
        assert_eq!("prod-1".parse::<SaleLine>().unwrap().quantity, 1);
        assert!("prod-1:many".parse::<SaleLine>().is_err());
        assert!(":2".parse::<SaleLine>().is_err());
    }

    #[test]
    fn test_money_parsing() {
        assert_eq!(parse_money("3.25").unwrap(), Money::from_cents(325));
        assert_eq!(parse_money(" 50 ").unwrap(), Money::from_major_minor(50, 0));
        assert!(parse_money("abc").is_err());
        assert!(parse_money("inf").is_err());
    }

    #[test]
    fn test_apply_changes_only_touches_given_fields() {
        let original = stockbook_core::seed::seed_products().remove(2);
        let changes = ProductChanges {
            stock: Some(7),
            ..Default::default()
        };
        let updated = apply_changes(original.clone(), changes);
        assert_eq!(updated.stock, 7);
        assert_eq!(updated.name, original.name);
        assert_eq!(updated.price, original.price);
    }

    async fn run_args(args: &[&str]) -> Result<()> {
        let mut argv = vec!["stockbook", "--ephemeral"];
        argv.extend_from_slice(args);
        run(Cli::try_parse_from(argv)?).await
    }

    #[tokio::test]
    async fn test_store_file_is_written_back_after_sale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("till.db");
        let path_arg = path.to_str().unwrap();

        run_args(&["new-store", "--out", path_arg]).await.unwrap();
        run_args(&["--store", path_arg, "sell", "prod-3:4"]).await.unwrap();

        let mut inventory = Inventory::open(StockbookConfig::ephemeral()).await.unwrap();
        inventory
            .load_store(&std::fs::read(&path).unwrap(), "till.db")
            .await
            .unwrap();
        assert_eq!(inventory.product("prod-3").unwrap().stock, 46);
        assert_eq!(inventory.ledger().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_sale_leaves_store_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("till.db");
        let path_arg = path.to_str().unwrap();

        run_args(&["new-store", "--out", path_arg]).await.unwrap();
        let before = std::fs::read(&path).unwrap();

        assert!(run_args(&["--store", path_arg, "sell", "prod-6:31"]).await.is_err());
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_new_store_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("till.db");
        std::fs::write(&path, b"keep me").unwrap();

        assert!(run_args(&["new-store", "--out", path.to_str().unwrap()]).await.is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
    }

    #[tokio::test]
    async fn test_inspect_rejects_non_store_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        assert!(run_args(&["inspect", path.to_str().unwrap()]).await.is_err());
    }

    #[tokio::test]
    async fn test_export_without_store_fails() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("copy.db");
        assert!(run_args(&["export", "--out", out.to_str().unwrap()]).await.is_err());
    }
}
