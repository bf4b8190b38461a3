//! # Domain Types
//!
//! The records the engine stores and the shapes they take on disk.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐          ┌──────────────────────────────┐         │
//! │  │    Product      │  sale    │        Transaction           │         │
//! │  │  ─────────────  │ ───────► │  ──────────────────────────  │         │
//! │  │  id             │ snapshot │  id, date                    │         │
//! │  │  name, price    │          │  items: [LineItem]           │         │
//! │  │  stock, type    │          │    productId, name, price,   │         │
//! │  │  sku, category  │          │    quantity (frozen copies)  │         │
//! │  └─────────────────┘          │  subtotal, tax, total        │         │
//! │         ▲                     └──────────────────────────────┘         │
//! │         │ from_draft(id)                                                │
//! │  ┌──────┴──────────┐                                                    │
//! │  │   NewProduct    │  what collaborators submit (no id yet)            │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Document Shape
//! Field names are camelCase on the wire (`imageUrl`, `productId`), the
//! product kind is stored under `type` as `"INVENTORY"` / `"SERVICE"`, money
//! is decimal major units and dates are RFC 3339 UTC with milliseconds.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::{Money, TaxRate};

// =============================================================================
// Product Type
// =============================================================================

/// Whether sales of a product draw down stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    /// Physical goods; `stock` is tracked and decremented on sale.
    Inventory,
    /// Made to order; `stock` is informational and never limits a sale.
    Service,
}

impl ProductType {
    #[inline]
    pub const fn tracks_stock(&self) -> bool {
        matches!(self, ProductType::Inventory)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            ProductType::Inventory => "INVENTORY",
            ProductType::Service => "SERVICE",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = ValidationError;

    /// Case-insensitive, so CLI input like `inventory` works too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INVENTORY" => Ok(ProductType::Inventory),
            "SERVICE" => Ok(ProductType::Service),
            _ => Err(ValidationError::NotAllowed {
                field: "type".to_string(),
                allowed: vec!["INVENTORY".to_string(), "SERVICE".to_string()],
            }),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A sellable item in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Opaque unique id, immutable once assigned.
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub category: String,

    /// Optional business code; empty when unused.
    #[serde(default)]
    pub sku: String,

    #[serde(default)]
    pub image_url: String,

    pub price: Money,

    /// On-hand units. Only meaningful for [`ProductType::Inventory`].
    pub stock: i64,

    #[serde(rename = "type")]
    pub product_type: ProductType,
}

impl Product {
    /// Materializes a draft under a freshly assigned id.
    pub fn from_draft(id: impl Into<String>, draft: NewProduct) -> Self {
        Product {
            id: id.into(),
            name: draft.name,
            description: draft.description,
            category: draft.category,
            sku: draft.sku,
            image_url: draft.image_url,
            price: draft.price,
            stock: draft.stock,
            product_type: draft.product_type,
        }
    }

    /// Whether `quantity` units can be sold against current stock.
    ///
    /// Services are never limited by stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        !self.product_type.tracks_stock() || self.stock >= quantity
    }
}

/// A product as submitted for creation, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub image_url: String,
    pub price: Money,
    pub stock: i64,
    #[serde(rename = "type")]
    pub product_type: ProductType,
}

impl NewProduct {
    /// Minimal draft; the remaining display fields start empty.
    pub fn new(name: impl Into<String>, price: Money, stock: i64, product_type: ProductType) -> Self {
        NewProduct {
            name: name.into(),
            description: String::new(),
            category: String::new(),
            sku: String::new(),
            image_url: String::new(),
            price,
            stock,
            product_type,
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = sku.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One line of a completed sale.
///
/// `name` and `price` are copies taken when the sale was finalized, so later
/// catalog edits never rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub price: Money,
}

impl LineItem {
    /// Snapshot of `product` at sale time.
    pub fn snapshot(product: &Product, quantity: i64) -> Self {
        LineItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            quantity,
            price: product.price,
        }
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// An immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    #[serde(with = "iso_millis")]
    pub date: DateTime<Utc>,
}

impl Transaction {
    /// Builds an entry whose totals satisfy the ledger identities:
    /// `subtotal = Σ price × qty`, `tax = round(subtotal × rate)`,
    /// `total = subtotal + tax`.
    ///
    /// The date is truncated to milliseconds so it survives the text
    /// representation unchanged.
    pub fn new(
        id: impl Into<String>,
        items: Vec<LineItem>,
        rate: TaxRate,
        date: DateTime<Utc>,
    ) -> Self {
        let subtotal: Money = items.iter().map(LineItem::line_total).sum();
        let tax = subtotal.calculate_tax(rate);
        Transaction {
            id: id.into(),
            items,
            subtotal,
            tax,
            total: subtotal + tax,
            date: date.trunc_subsecs(3),
        }
    }

    /// Checks the totals identities against `rate`.
    pub fn totals_consistent(&self, rate: TaxRate) -> bool {
        let subtotal: Money = self.items.iter().map(LineItem::line_total).sum();
        subtotal == self.subtotal
            && self.tax == subtotal.calculate_tax(rate)
            && self.total == self.subtotal + self.tax
    }

    /// Total units across all lines.
    pub fn quantity(&self) -> i64 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// The date as stored: `2024-05-01T09:30:00.000Z`.
    pub fn date_text(&self) -> String {
        format_timestamp(&self.date)
    }
}

// =============================================================================
// Identifiers and Timestamps
// =============================================================================

/// Fresh product id (UUID v4).
pub fn new_product_id() -> String {
    Uuid::new_v4().to_string()
}

/// Fresh transaction id (UUID v4).
pub fn new_transaction_id() -> String {
    Uuid::new_v4().to_string()
}

/// RFC 3339, UTC, millisecond precision.
pub fn format_timestamp(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses any RFC 3339 timestamp into UTC.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(text)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| ValidationError::InvalidFormat {
            field: "date".to_string(),
            reason: e.to_string(),
        })
}

mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_timestamp(&text).map_err(de::Error::custom)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn croissant() -> Product {
        Product::from_draft(
            "prod-3",
            NewProduct::new("Croissant", Money::from_cents(7_500), 50, ProductType::Inventory)
                .category("Bakery"),
        )
    }

    #[test]
    fn test_product_json_shape() {
        let json = serde_json::to_value(croissant()).unwrap();
        assert_eq!(json["type"], "INVENTORY");
        assert_eq!(json["price"], 75.0);
        assert!(json.get("imageUrl").is_some());
        assert!(json.get("product_type").is_none());
    }

    #[test]
    fn test_product_accepts_sparse_documents() {
        let json = r#"{"id":"p1","name":"Tea","price":50,"stock":0,"type":"SERVICE"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.price.cents(), 5_000);
        assert_eq!(product.product_type, ProductType::Service);
        assert!(product.sku.is_empty());
    }

    #[test]
    fn test_can_sell() {
        let mut product = croissant();
        product.stock = 2;
        assert!(product.can_sell(2));
        assert!(!product.can_sell(3));

        product.product_type = ProductType::Service;
        assert!(product.can_sell(1_000));
    }

    #[test]
    fn test_product_type_parse() {
        assert_eq!("inventory".parse::<ProductType>().unwrap(), ProductType::Inventory);
        assert_eq!("SERVICE".parse::<ProductType>().unwrap(), ProductType::Service);
        assert!("GOODS".parse::<ProductType>().is_err());
    }

    #[test]
    fn test_transaction_totals() {
        let mut tea = croissant();
        tea.price = Money::from_cents(5_000);
        let items = vec![LineItem::snapshot(&tea, 3)];
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let tx = Transaction::new("t1", items, TaxRate::from_bps(700), date);

        assert_eq!(tx.subtotal.cents(), 15_000);
        assert_eq!(tx.tax.cents(), 1_050);
        assert_eq!(tx.total.cents(), 16_050);
        assert!(tx.totals_consistent(TaxRate::from_bps(700)));
        assert_eq!(tx.quantity(), 3);
    }

    #[test]
    fn test_transaction_json_shape() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let tx = Transaction::new(
            "t1",
            vec![LineItem::snapshot(&croissant(), 1)],
            TaxRate::from_bps(700),
            date,
        );
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["date"], "2024-05-01T09:30:00.000Z");
        assert_eq!(json["items"][0]["productId"], "prod-3");
        assert_eq!(json["total"], 80.25);

        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn test_date_truncated_to_millis() {
        let date = Utc
            .with_ymd_and_hms(2024, 5, 1, 9, 30, 0)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();
        let tx = Transaction::new("t1", Vec::new(), TaxRate::default(), date);
        assert_eq!(tx.date_text(), "2024-05-01T09:30:00.123Z");
        assert_eq!(parse_timestamp(&tx.date_text()).unwrap(), tx.date);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(new_product_id(), new_product_id());
        assert_ne!(new_transaction_id(), new_transaction_id());
    }
}
