//! # Seed Catalog
//!
//! The starter café menu installed when a backend reports no snapshot:
//! a fresh mirror, or a newly created relational store.
//!
//! ```text
//! ┌────────┬──────────────┬─────────────┬────────┬───────┬───────────┐
//! │ id     │ name         │ category    │ price  │ stock │ type      │
//! ├────────┼──────────────┼─────────────┼────────┼───────┼───────────┤
//! │ prod-1 │ Espresso     │ Hot Drinks  │ 55.00  │ 100   │ SERVICE   │
//! │ prod-2 │ Cappuccino   │ Hot Drinks  │ 65.00  │ 80    │ SERVICE   │
//! │ prod-3 │ Croissant    │ Bakery      │ 75.00  │ 50    │ INVENTORY │
//! │ prod-4 │ Orange Juice │ Cold Drinks │ 60.00  │ 45    │ SERVICE   │
//! │ prod-5 │ Lemon Tea    │ Cold Drinks │ 50.00  │ 90    │ SERVICE   │
//! │ prod-6 │ Brownie      │ Bakery      │ 80.00  │ 30    │ INVENTORY │
//! └────────┴──────────────┴─────────────┴────────┴───────┴───────────┘
//! ```

use crate::money::Money;
use crate::types::{Product, ProductType};

struct SeedRow {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    category: &'static str,
    sku: &'static str,
    price: Money,
    stock: i64,
    product_type: ProductType,
}

const SEED: [SeedRow; 6] = [
    SeedRow {
        id: "prod-1",
        name: "Espresso",
        description: "Single shot of house-roast espresso",
        category: "Hot Drinks",
        sku: "HOT-001",
        price: Money::from_major_minor(55, 0),
        stock: 100,
        product_type: ProductType::Service,
    },
    SeedRow {
        id: "prod-2",
        name: "Cappuccino",
        description: "Espresso with steamed milk and foam",
        category: "Hot Drinks",
        sku: "HOT-002",
        price: Money::from_major_minor(65, 0),
        stock: 80,
        product_type: ProductType::Service,
    },
    SeedRow {
        id: "prod-3",
        name: "Croissant",
        description: "Butter croissant, baked daily",
        category: "Bakery",
        sku: "BAK-001",
        price: Money::from_major_minor(75, 0),
        stock: 50,
        product_type: ProductType::Inventory,
    },
    SeedRow {
        id: "prod-4",
        name: "Orange Juice",
        description: "Freshly squeezed orange juice",
        category: "Cold Drinks",
        sku: "CLD-001",
        price: Money::from_major_minor(60, 0),
        stock: 45,
        product_type: ProductType::Service,
    },
    SeedRow {
        id: "prod-5",
        name: "Lemon Tea",
        description: "Iced black tea with lemon",
        category: "Cold Drinks",
        sku: "CLD-002",
        price: Money::from_major_minor(50, 0),
        stock: 90,
        product_type: ProductType::Service,
    },
    SeedRow {
        id: "prod-6",
        name: "Brownie",
        description: "Dark chocolate brownie",
        category: "Bakery",
        sku: "BAK-002",
        price: Money::from_major_minor(80, 0),
        stock: 30,
        product_type: ProductType::Inventory,
    },
];

/// The seed catalog, in menu order.
pub fn seed_products() -> Vec<Product> {
    SEED.iter()
        .map(|row| Product {
            id: row.id.to_string(),
            name: row.name.to_string(),
            description: row.description.to_string(),
            category: row.category.to_string(),
            sku: row.sku.to_string(),
            image_url: String::new(),
            price: row.price,
            stock: row.stock,
            product_type: row.product_type,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate_product;
    use std::collections::HashSet;

    #[test]
    fn test_seed_is_valid_and_unique() {
        let products = seed_products();
        assert_eq!(products.len(), 6);

        let ids: HashSet<_> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), products.len());

        for product in &products {
            validate_product(product).unwrap();
        }
    }

    #[test]
    fn test_seed_mixes_product_types() {
        let products = seed_products();
        assert!(products.iter().any(|p| p.product_type.tracks_stock()));
        assert!(products.iter().any(|p| !p.product_type.tracks_stock()));
    }
}
