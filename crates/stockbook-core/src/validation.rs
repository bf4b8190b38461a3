//! # Validation Module
//!
//! Input checks run before anything is persisted.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Collaborator input (CLI flags, UI forms)                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  THIS MODULE: field rules (name, price, stock, sku, quantity, page)    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Catalog / Sale Coordinator: cross-record rules (stock, ids)           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Backend: NOT NULL / PRIMARY KEY constraints                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::money::TaxRate;
use crate::types::{NewProduct, Product, Transaction};
use crate::{MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_SKU_LEN: usize = 50;
const MAX_QUERY_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an optional SKU.
///
/// Empty is fine (most café items have none). When present it must be at
/// most 50 letters, digits, `-` or `_`.
///
/// ```rust
/// use stockbook_core::validation::validate_sku;
///
/// assert!(validate_sku("").is_ok());
/// assert!(validate_sku("BAK-001").is_ok());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Ok(());
    }

    if sku.chars().count() > MAX_SKU_LEN {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: MAX_SKU_LEN,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name: required, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Trims a search term; at most 100 characters. Empty matches everything.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_QUERY_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_QUERY_LEN,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart quantity.
///
/// ```text
/// validate_quantity(qty)
///      │
///      ├── qty <= 0?   → MustBePositive
///      ├── qty > 999?  → OutOfRange
///      └── OK          → stock check happens in the cart
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Zero is allowed (complimentary items). At most [`MAX_PRICE_CENTS`].
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        });
    }

    if price.cents() > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "stock".to_string(),
        });
    }

    Ok(())
}

/// 0 to 10000 bps (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

/// Ledger pages are 1-based.
pub fn validate_page(page: usize, page_size: usize) -> ValidationResult<()> {
    if page == 0 {
        return Err(ValidationError::MustBePositive {
            field: "page".to_string(),
        });
    }

    if page_size == 0 {
        return Err(ValidationError::MustBePositive {
            field: "page_size".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

/// Field rules for a product about to be created.
pub fn validate_new_product(draft: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&draft.name)?;
    validate_sku(&draft.sku)?;
    validate_price(draft.price)?;
    validate_stock(draft.stock)
}

/// Field rules for a replacement product record.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    if product.id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }
    validate_product_name(&product.name)?;
    validate_sku(&product.sku)?;
    validate_price(product.price)?;
    validate_stock(product.stock)
}

/// Rules for a ledger entry built outside the sale coordinator.
///
/// At least one line, every line a sellable quantity at a valid price, and
/// totals that satisfy the ledger identities at `rate`.
pub fn validate_transaction(entry: &Transaction, rate: TaxRate) -> ValidationResult<()> {
    if entry.id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }
    if entry.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }
    for item in &entry.items {
        validate_quantity(item.quantity)?;
        validate_price(item.price)?;
    }

    if !entry.totals_consistent(rate) {
        return Err(ValidationError::InvalidFormat {
            field: "totals".to_string(),
            reason: format!(
                "subtotal {} + tax {} at {}% does not give total {}",
                entry.subtotal,
                entry.tax,
                rate.percentage(),
                entry.total
            ),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductType;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("BAK-001").is_ok());
        assert!(validate_sku("bev_2").is_ok());
        assert!(validate_sku("").is_ok());
        assert!(validate_sku("   ").is_ok());

        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Cappuccino").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name("  ").is_err());
        assert!(validate_product_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_and_stock() {
        assert!(validate_price(Money::zero()).is_ok());
        assert!(validate_price(Money::from_cents(-1)).is_err());
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-1).is_err());
    }

    #[test]
    fn test_validate_price_upper_bound() {
        assert!(validate_price(Money::from_cents(MAX_PRICE_CENTS)).is_ok());
        assert!(matches!(
            validate_price(Money::from_cents(MAX_PRICE_CENTS + 1)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_price(Money::from_cents(i64::MAX / 2)).is_err());
    }

    fn sale(total_override: Option<i64>) -> Transaction {
        let mut entry = Transaction::new(
            "t-1",
            vec![crate::types::LineItem {
                product_id: "prod-3".to_string(),
                name: "Croissant".to_string(),
                quantity: 3,
                price: Money::from_cents(5_000),
            }],
            TaxRate::default(),
            chrono::Utc::now(),
        );
        if let Some(cents) = total_override {
            entry.total = Money::from_cents(cents);
        }
        entry
    }

    #[test]
    fn test_validate_transaction() {
        let rate = TaxRate::default();
        assert!(validate_transaction(&sale(None), rate).is_ok());

        // 150.00 + 10.50 is 160.50, not 9999.99.
        assert!(matches!(
            validate_transaction(&sale(Some(999_999)), rate),
            Err(ValidationError::InvalidFormat { .. })
        ));
        // Consistent at 7%, not at 8%.
        assert!(validate_transaction(&sale(None), TaxRate::from_bps(800)).is_err());

        let mut empty = sale(None);
        empty.items.clear();
        assert!(validate_transaction(&empty, rate).is_err());

        let mut negative = sale(None);
        negative.items[0].quantity = -3;
        assert!(validate_transaction(&negative, rate).is_err());
    }

    #[test]
    fn test_validate_page() {
        assert!(validate_page(1, 10).is_ok());
        assert!(validate_page(0, 10).is_err());
        assert!(validate_page(1, 0).is_err());
    }

    #[test]
    fn test_validate_new_product() {
        let draft = NewProduct::new("Brownie", Money::from_cents(8_000), 30, ProductType::Inventory);
        assert!(validate_new_product(&draft).is_ok());

        let mut bad = draft.clone();
        bad.stock = -5;
        assert_eq!(
            validate_new_product(&bad),
            Err(ValidationError::MustNotBeNegative {
                field: "stock".to_string()
            })
        );

        let mut nameless = draft;
        nameless.name = String::new();
        assert!(validate_new_product(&nameless).is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(700).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
    }
}
