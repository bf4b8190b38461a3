//! # Cart
//!
//! The transient list of product references and quantities a sale is being
//! built from.
//!
//! ## What a Cart Line Holds
//! Only `product_id` and `quantity`. Names and prices are read from the live
//! catalog whenever the cart is priced, and copied into the ledger entry only
//! at finalize. A price edit made while an item sits in the cart is
//! therefore what the customer pays.
//!
//! ## Cart Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operation                     Rule                                     │
//! │  ─────────                     ────                                     │
//! │  add_item(product, qty) ─────► merged qty ≤ 999, ≤ live stock          │
//! │                                (INVENTORY only), ≤ 100 distinct lines   │
//! │  set_quantity(product, qty) ─► 0 removes; same checks otherwise        │
//! │  remove_item(id) ────────────► NotFound if absent                       │
//! │  priced_lines(lookup) ───────► re-check every line, snapshot it        │
//! │  totals(lookup, rate) ───────► preview only                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, TaxRate};
use crate::types::{LineItem, Product};
use crate::validation::validate_quantity;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// A product reference plus requested quantity (always > 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
}

/// The cart being built.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding again merges quantities)
/// - Every quantity is in `1..=999`
/// - At most 100 distinct lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Cart::default()
    }

    /// Adds `quantity` units of `product`, merging with an existing line.
    ///
    /// The cart is left unchanged on any error.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        let existing = self.quantity_of(&product.id);
        let requested = existing + quantity;
        check_line(product, requested)?;

        match self.lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => line.quantity = requested,
            None => {
                if self.lines.len() >= MAX_CART_ITEMS {
                    return Err(CoreError::CartTooLarge {
                        max: MAX_CART_ITEMS,
                    });
                }
                self.lines.push(CartLine {
                    product_id: product.id.clone(),
                    quantity,
                });
            }
        }
        Ok(())
    }

    /// Replaces the quantity of an existing line. `0` removes it.
    pub fn set_quantity(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(&product.id);
        }
        validate_quantity(quantity)?;

        let position = self
            .lines
            .iter()
            .position(|l| l.product_id == product.id)
            .ok_or_else(|| CoreError::ProductNotFound(product.id.clone()))?;
        check_line(product, quantity)?;

        self.lines[position].quantity = quantity;
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let initial_len = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);

        if self.lines.len() == initial_len {
            Err(CoreError::ProductNotFound(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Quantity currently requested for `product_id` (0 if absent).
    pub fn quantity_of(&self, product_id: &str) -> i64 {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map(|l| l.quantity)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Re-validates every line against the live catalog and snapshots it.
    ///
    /// Fails on the first line whose product is gone or whose quantity now
    /// exceeds stock. Nothing is mutated either way.
    pub fn priced_lines<'a, F>(&self, lookup: F) -> CoreResult<Vec<LineItem>>
    where
        F: Fn(&str) -> Option<&'a Product>,
    {
        self.lines
            .iter()
            .map(|line| {
                let product = lookup(&line.product_id)
                    .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
                check_line(product, line.quantity)?;
                Ok(LineItem::snapshot(product, line.quantity))
            })
            .collect()
    }

    /// Previews what finalize would charge right now.
    ///
    /// Lines whose product has disappeared are left out of the money totals.
    pub fn totals<'a, F>(&self, lookup: F, rate: TaxRate) -> CartTotals
    where
        F: Fn(&str) -> Option<&'a Product>,
    {
        let subtotal: Money = self
            .lines
            .iter()
            .filter_map(|line| lookup(&line.product_id).map(|p| p.price * line.quantity))
            .sum();
        let tax = subtotal.calculate_tax(rate);

        CartTotals {
            item_count: self.len(),
            total_quantity: self.total_quantity(),
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

fn check_line(product: &Product, requested: i64) -> CoreResult<()> {
    if requested > MAX_ITEM_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested,
            max: MAX_ITEM_QUANTITY,
        });
    }
    if !product.can_sell(requested) {
        return Err(CoreError::InsufficientStock {
            product_id: product.id.clone(),
            available: product.stock,
            requested,
        });
    }
    Ok(())
}

/// Cart totals summary for collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewProduct, ProductType};

    fn product(id: &str, price_cents: i64, stock: i64, product_type: ProductType) -> Product {
        Product::from_draft(
            id,
            NewProduct::new(format!("Product {id}"), Money::from_cents(price_cents), stock, product_type),
        )
    }

    #[test]
    fn test_add_merges_lines() {
        let mut cart = Cart::new();
        let p = product("a", 500, 10, ProductType::Inventory);

        cart.add_item(&p, 2).unwrap();
        cart.add_item(&p, 3).unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of("a"), 5);
    }

    #[test]
    fn test_add_rejects_over_stock_and_leaves_cart() {
        let mut cart = Cart::new();
        let p = product("a", 500, 4, ProductType::Inventory);

        cart.add_item(&p, 3).unwrap();
        let err = cart.add_item(&p, 2).unwrap_err();

        assert_eq!(
            err,
            CoreError::InsufficientStock {
                product_id: "a".to_string(),
                available: 4,
                requested: 5,
            }
        );
        assert_eq!(cart.quantity_of("a"), 3);
    }

    #[test]
    fn test_service_ignores_stock() {
        let mut cart = Cart::new();
        let p = product("s", 500, 0, ProductType::Service);
        cart.add_item(&p, 50).unwrap();
        assert_eq!(cart.total_quantity(), 50);
    }

    #[test]
    fn test_quantity_cap() {
        let mut cart = Cart::new();
        let p = product("s", 100, 0, ProductType::Service);
        cart.add_item(&p, 999).unwrap();
        assert!(matches!(
            cart.add_item(&p, 1),
            Err(CoreError::QuantityTooLarge { .. })
        ));
        assert!(matches!(cart.add_item(&p, 0), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_cart_line_limit() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_ITEMS {
            cart.add_item(&product(&i.to_string(), 100, 0, ProductType::Service), 1)
                .unwrap();
        }
        let extra = product("extra", 100, 0, ProductType::Service);
        assert_eq!(
            cart.add_item(&extra, 1),
            Err(CoreError::CartTooLarge { max: MAX_CART_ITEMS })
        );
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = Cart::new();
        let p = product("a", 500, 5, ProductType::Inventory);
        cart.add_item(&p, 1).unwrap();

        cart.set_quantity(&p, 4).unwrap();
        assert_eq!(cart.quantity_of("a"), 4);

        assert!(cart.set_quantity(&p, 6).is_err());
        assert_eq!(cart.quantity_of("a"), 4);

        cart.set_quantity(&p, 0).unwrap();
        assert!(cart.is_empty());

        let other = product("b", 500, 5, ProductType::Inventory);
        assert_eq!(
            cart.set_quantity(&other, 1),
            Err(CoreError::ProductNotFound("b".to_string()))
        );
    }

    #[test]
    fn test_remove_missing_line() {
        let mut cart = Cart::new();
        assert!(cart.remove_item("nope").is_err());
    }

    #[test]
    fn test_priced_lines_use_live_catalog() {
        let mut cart = Cart::new();
        let mut p = product("a", 500, 5, ProductType::Inventory);
        cart.add_item(&p, 2).unwrap();

        p.price = Money::from_cents(650);
        p.name = "Renamed".to_string();
        let lines = cart
            .priced_lines(|id| (id == "a").then_some(&p))
            .unwrap();
        assert_eq!(lines[0].price.cents(), 650);
        assert_eq!(lines[0].name, "Renamed");

        p.stock = 1;
        assert!(matches!(
            cart.priced_lines(|id| (id == "a").then_some(&p)),
            Err(CoreError::InsufficientStock { .. })
        ));
        assert_eq!(
            cart.priced_lines(|_| None),
            Err(CoreError::ProductNotFound("a".to_string()))
        );
    }

    #[test]
    fn test_totals() {
        let mut cart = Cart::new();
        let tea = product("tea", 5_000, 0, ProductType::Service);
        cart.add_item(&tea, 3).unwrap();

        let totals = cart.totals(|id| (id == "tea").then_some(&tea), TaxRate::from_bps(700));
        assert_eq!(totals.subtotal.cents(), 15_000);
        assert_eq!(totals.tax.cents(), 1_050);
        assert_eq!(totals.total.cents(), 16_050);
        assert_eq!(totals.item_count, 1);
    }
}
