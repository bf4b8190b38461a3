//! # Catalog Store
//!
//! The in-memory, authoritative product list.
//!
//! ## Mutation Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  validate ──► build post-mutation list (copy) ──► backend write         │
//! │                                                        │                │
//! │                                         ┌──────────────┴─────────┐      │
//! │                                         ▼                        ▼      │
//! │                                   Ok: install copy       Err: drop copy │
//! │                                                          memory as it   │
//! │                                                          was            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Memory never runs ahead of the backend.

use tracing::{debug, info};

use crate::error::{InventoryError, InventoryResult};
use stockbook_core::validation::{validate_new_product, validate_product, validate_search_query};
use stockbook_core::{new_product_id, NewProduct, Product};
use stockbook_db::{Backend, ProductMutation};

/// Products in insertion order, unique by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStore {
    products: Vec<Product>,
}

impl CatalogStore {
    pub fn new(products: Vec<Product>) -> Self {
        CatalogStore { products }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Validates `draft`, assigns a fresh id, persists, then inserts.
    pub async fn add(&mut self, backend: &Backend, draft: NewProduct) -> InventoryResult<Product> {
        validate_new_product(&draft)?;

        let product = Product::from_draft(new_product_id(), draft);
        let mut after = self.products.clone();
        after.push(product.clone());

        backend
            .apply_product_mutation(ProductMutation::Insert(&product), &after)
            .await?;
        self.products = after;

        info!(id = %product.id, sku = %product.sku, name = %product.name, "Product added");
        Ok(product)
    }

    /// Replaces the product with the same id.
    pub async fn update(&mut self, backend: &Backend, product: Product) -> InventoryResult<Product> {
        let index = self
            .position(&product.id)
            .ok_or_else(|| InventoryError::product_not_found(&product.id))?;
        validate_product(&product)?;

        let mut after = self.products.clone();
        after[index] = product.clone();

        backend
            .apply_product_mutation(ProductMutation::Update(&product), &after)
            .await?;
        self.products = after;

        info!(id = %product.id, sku = %product.sku, stock = product.stock, "Product updated");
        Ok(product)
    }

    /// Removes a product. Ledger entries that mention it are untouched.
    pub async fn delete(&mut self, backend: &Backend, id: &str) -> InventoryResult<Product> {
        let index = self
            .position(id)
            .ok_or_else(|| InventoryError::product_not_found(id))?;

        let mut after = self.products.clone();
        let removed = after.remove(index);

        backend
            .apply_product_mutation(ProductMutation::Delete(id), &after)
            .await?;
        self.products = after;

        info!(id = %id, sku = %removed.sku, "Product deleted");
        Ok(removed)
    }

    /// Removes `qty` units from an INVENTORY product, in memory only.
    ///
    /// Returns whether stock is tracked for the product; SERVICE products
    /// are left alone. Used on a scratch copy while a sale is prepared.
    pub(crate) fn decrement_stock(&mut self, id: &str, qty: i64) -> InventoryResult<bool> {
        let product = self
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| InventoryError::product_not_found(id))?;

        if !product.product_type.tracks_stock() {
            return Ok(false);
        }
        if qty > product.stock {
            return Err(InventoryError::InsufficientStock {
                product_id: id.to_string(),
                available: product.stock,
                requested: qty,
            });
        }

        product.stock -= qty;
        debug!(id = %id, qty, remaining = product.stock, "Stock decremented");
        Ok(true)
    }

    /// Swaps in a freshly loaded product list.
    pub(crate) fn replace(&mut self, products: Vec<Product>) {
        self.products = products;
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn list(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Case-insensitive substring match on name or category, optionally
    /// limited to one exact category. An empty term matches everything.
    pub fn search(&self, term: &str, category: Option<&str>) -> InventoryResult<Vec<&Product>> {
        let term = validate_search_query(term)?.to_lowercase();

        Ok(self
            .products
            .iter()
            .filter(|p| category.map_or(true, |c| p.category == c))
            .filter(|p| {
                term.is_empty()
                    || p.name.to_lowercase().contains(&term)
                    || p.category.to_lowercase().contains(&term)
            })
            .collect())
    }

    /// Distinct non-empty categories in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for p in &self.products {
            if !p.category.is_empty() && !seen.contains(&p.category.as_str()) {
                seen.push(&p.category);
            }
        }
        seen
    }

    /// INVENTORY products below `threshold`, lowest stock first, at most
    /// `limit` of them.
    pub fn low_stock(&self, threshold: i64, limit: usize) -> Vec<&Product> {
        let mut low: Vec<&Product> = self
            .products
            .iter()
            .filter(|p| p.product_type.tracks_stock() && p.stock < threshold)
            .collect();
        low.sort_by_key(|p| p.stock);
        low.truncate(limit);
        low
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.products.iter().position(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockbook_core::seed::seed_products;
    use stockbook_core::{Money, ProductType};
    use stockbook_db::MirrorBackend;

    fn seeded() -> CatalogStore {
        CatalogStore::new(seed_products())
    }

    fn mirror() -> Backend {
        Backend::Mirror(MirrorBackend::in_memory())
    }

    #[tokio::test]
    async fn test_add_assigns_unique_ids() {
        let backend = mirror();
        let mut catalog = CatalogStore::default();

        let draft = NewProduct::new("Muffin", Money::from_cents(300), 12, ProductType::Inventory);
        let a = catalog.add(&backend, draft.clone()).await.unwrap();
        let b = catalog.add(&backend, draft).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.list()[0].id, a.id);
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_draft() {
        let backend = mirror();
        let mut catalog = CatalogStore::default();

        let draft = NewProduct::new("Muffin", Money::from_cents(300), -1, ProductType::Inventory);
        assert!(matches!(
            catalog.add(&backend, draft).await,
            Err(InventoryError::Validation(_))
        ));
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_id() {
        let backend = mirror();
        let mut catalog = seeded();

        let mut ghost = catalog.list()[0].clone();
        ghost.id = "missing".into();

        assert!(matches!(
            catalog.update(&backend, ghost).await,
            Err(InventoryError::NotFound { .. })
        ));
        assert!(matches!(
            catalog.delete(&backend, "missing").await,
            Err(InventoryError::NotFound { .. })
        ));
        assert_eq!(catalog, seeded());
    }

    #[tokio::test]
    async fn test_update_replaces_in_place() {
        let backend = mirror();
        let mut catalog = seeded();

        let mut croissant = catalog.get("prod-3").unwrap().clone();
        croissant.stock = 7;
        catalog.update(&backend, croissant).await.unwrap();

        assert_eq!(catalog.get("prod-3").unwrap().stock, 7);
        assert_eq!(catalog.list()[2].id, "prod-3");
    }

    #[test]
    fn test_decrement_stock() {
        let mut catalog = seeded();

        assert!(catalog.decrement_stock("prod-3", 5).unwrap());
        assert_eq!(catalog.get("prod-3").unwrap().stock, 45);

        // Services are untracked.
        assert!(!catalog.decrement_stock("prod-1", 500).unwrap());
        assert_eq!(catalog.get("prod-1").unwrap().stock, 100);

        assert!(matches!(
            catalog.decrement_stock("prod-6", 31),
            Err(InventoryError::InsufficientStock { available: 30, requested: 31, .. })
        ));
        assert_eq!(catalog.get("prod-6").unwrap().stock, 30);
    }

    #[test]
    fn test_search() {
        let catalog = seeded();

        let names: Vec<&str> = catalog
            .search("  ESPRESSO ", None)
            .unwrap()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["Espresso"]);

        assert_eq!(catalog.search("bakery", None).unwrap().len(), 2);
        assert_eq!(catalog.search("", Some("Bakery")).unwrap().len(), 2);
        assert_eq!(catalog.search("tea", Some("Bakery")).unwrap().len(), 0);
        assert_eq!(catalog.search("", None).unwrap().len(), 6);
        assert!(catalog.search(&"x".repeat(101), None).is_err());
    }

    #[test]
    fn test_categories_first_seen_order() {
        assert_eq!(
            seeded().categories(),
            vec!["Hot Drinks", "Bakery", "Cold Drinks"]
        );
    }

    #[test]
    fn test_low_stock() {
        let mut catalog = seeded();
        catalog.decrement_stock("prod-3", 45).unwrap(); // 5 left
        catalog.decrement_stock("prod-6", 28).unwrap(); // 2 left

        let low: Vec<&str> = catalog
            .low_stock(10, 5)
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(low, vec!["prod-6", "prod-3"]);

        assert_eq!(catalog.low_stock(10, 1).len(), 1);
        assert!(seeded().low_stock(10, 5).is_empty());
    }
}
