//! # Key-Value Mirror
//!
//! Snapshot-style persistence: two keys, each holding a whole collection as
//! one JSON document.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  KeyValueStore namespace                                                │
//! │                                                                         │
//! │  "stockbook.products"      → [ {id, name, price, stock, type, ...}, … ] │
//! │  "stockbook.transactions"  → [ {id, items, subtotal, tax, total,       │
//! │                                 date}, … ]   (most recent first)        │
//! │                                                                         │
//! │  Every mutation rewrites the whole post-mutation document.              │
//! │  A snapshot exists only when BOTH keys are present.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sale Path
//! Two documents cannot be written atomically. A sale writes the ledger
//! first, then the catalog; if the catalog write fails the previous ledger
//! document is put back and the caller gets [`DbError::PartialCommit`] either
//! way.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use crate::backend::Snapshot;
use crate::error::{DbError, DbResult};
use stockbook_core::{Product, Transaction};

/// Key holding the product document.
pub const PRODUCTS_KEY: &str = "stockbook.products";

/// Key holding the ledger document.
pub const TRANSACTIONS_KEY: &str = "stockbook.transactions";

// =============================================================================
// Key-Value Store
// =============================================================================

/// A durable string-to-string namespace.
///
/// `put` must replace the whole value or leave the old one intact.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> DbResult<Option<String>>;

    fn put(&self, key: &str, value: &str) -> DbResult<()>;
}

/// One file per key inside a data directory.
///
/// Values are written to `<key>.json.tmp` and renamed over `<key>.json`, so a
/// crash mid-write leaves the previous document readable.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Opens (creating if needed) the directory backing the namespace.
    pub fn open(dir: impl Into<PathBuf>) -> DbResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Opened key-value directory");
        Ok(FileKeyValueStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> DbResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &str) -> DbResult<()> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Process-local namespace for tests and `--ephemeral` runs.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        MemoryKeyValueStore::default()
    }

    fn entries(&self) -> DbResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| DbError::Internal("key-value map lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> DbResult<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> DbResult<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// Mirror Backend
// =============================================================================

/// The mirror variant of the backend.
///
/// Cheap to clone: clones share the same namespace.
#[derive(Clone)]
pub struct MirrorBackend {
    store: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for MirrorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MirrorBackend").finish_non_exhaustive()
    }
}

impl MirrorBackend {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        MirrorBackend { store }
    }

    /// Mirror over a fresh [`MemoryKeyValueStore`].
    pub fn in_memory() -> Self {
        MirrorBackend::new(Arc::new(MemoryKeyValueStore::new()))
    }

    /// Mirror over a [`FileKeyValueStore`] in `dir`.
    pub fn open_dir(dir: impl Into<PathBuf>) -> DbResult<Self> {
        Ok(MirrorBackend::new(Arc::new(FileKeyValueStore::open(dir)?)))
    }

    /// Reads both documents.
    ///
    /// Returns `None` unless both keys are present. A document that is
    /// present but unreadable is an error, never silently replaced.
    pub fn load_snapshot(&self) -> DbResult<Option<Snapshot>> {
        let products = self.store.get(PRODUCTS_KEY)?;
        let transactions = self.store.get(TRANSACTIONS_KEY)?;

        let (Some(products), Some(transactions)) = (products, transactions) else {
            debug!("Mirror holds no snapshot");
            return Ok(None);
        };

        let products: Vec<Product> = serde_json::from_str(&products)
            .map_err(|e| DbError::Serialization(format!("{PRODUCTS_KEY}: {e}")))?;
        let transactions: Vec<Transaction> = serde_json::from_str(&transactions)
            .map_err(|e| DbError::Serialization(format!("{TRANSACTIONS_KEY}: {e}")))?;

        let snapshot = Snapshot {
            products,
            transactions,
        };
        snapshot.check().map_err(DbError::Serialization)?;

        info!(
            products = snapshot.products.len(),
            transactions = snapshot.transactions.len(),
            "Loaded mirror snapshot"
        );
        Ok(Some(snapshot))
    }

    pub fn write_products(&self, products: &[Product]) -> DbResult<()> {
        let document = serde_json::to_string(products)?;
        self.store.put(PRODUCTS_KEY, &document)?;
        debug!(products = products.len(), "Wrote product document");
        Ok(())
    }

    pub fn write_transactions(&self, transactions: &[Transaction]) -> DbResult<()> {
        let document = serde_json::to_string(transactions)?;
        self.store.put(TRANSACTIONS_KEY, &document)?;
        debug!(transactions = transactions.len(), "Wrote ledger document");
        Ok(())
    }

    /// Writes both documents (ledger first).
    pub fn write_snapshot(&self, snapshot: &Snapshot) -> DbResult<()> {
        self.write_transactions(&snapshot.transactions)?;
        self.write_products(&snapshot.products)
    }

    /// Writes the post-sale ledger, then the post-sale catalog.
    ///
    /// ```text
    /// read previous ledger document
    ///      │
    ///      ▼
    /// put ledger_after ──── fails ──► error, nothing changed
    ///      │
    ///      ▼
    /// put catalog_after ─── fails ──► put previous ledger back (best effort)
    ///      │                          PartialCommit { restored }
    ///      ▼
    /// Ok
    /// ```
    pub fn commit_sale(&self, ledger_after: &[Transaction], catalog_after: &[Product]) -> DbResult<()> {
        let previous_ledger = self.store.get(TRANSACTIONS_KEY)?;
        let ledger_document = serde_json::to_string(ledger_after)?;
        let catalog_document = serde_json::to_string(catalog_after)?;

        self.store.put(TRANSACTIONS_KEY, &ledger_document)?;

        if let Err(write_err) = self.store.put(PRODUCTS_KEY, &catalog_document) {
            warn!(error = %write_err, "Product document write failed after ledger write, restoring ledger");

            let restored = match previous_ledger {
                Some(previous) => self.store.put(TRANSACTIONS_KEY, &previous).is_ok(),
                // No earlier document: fall back to an empty ledger.
                None => self.store.put(TRANSACTIONS_KEY, "[]").is_ok(),
            };

            error!(restored, "Sale partially committed to mirror");
            return Err(DbError::PartialCommit {
                reason: write_err.to_string(),
                restored,
            });
        }

        debug!(
            transactions = ledger_after.len(),
            products = catalog_after.len(),
            "Mirror sale committed"
        );
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use stockbook_core::seed::seed_products;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.put("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_file_store_replaces_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::open(dir.path().join("data")).unwrap();

        assert_eq!(store.get(PRODUCTS_KEY).unwrap(), None);
        store.put(PRODUCTS_KEY, "[1]").unwrap();
        store.put(PRODUCTS_KEY, "[2]").unwrap();

        assert_eq!(store.get(PRODUCTS_KEY).unwrap().as_deref(), Some("[2]"));
        assert!(!store.dir().join("stockbook.products.json.tmp").exists());
    }

    #[test]
    fn test_snapshot_requires_both_keys() {
        let mirror = MirrorBackend::in_memory();
        assert!(mirror.load_snapshot().unwrap().is_none());

        mirror.write_products(&seed_products()).unwrap();
        assert!(mirror.load_snapshot().unwrap().is_none());

        mirror.write_transactions(&[]).unwrap();
        let snapshot = mirror.load_snapshot().unwrap().unwrap();
        assert_eq!(snapshot.products, seed_products());
        assert!(snapshot.transactions.is_empty());
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store.put(PRODUCTS_KEY, "not json").unwrap();
        store.put(TRANSACTIONS_KEY, "[]").unwrap();

        let mirror = MirrorBackend::new(store);
        assert!(matches!(
            mirror.load_snapshot(),
            Err(DbError::Serialization(_))
        ));
    }

    #[test]
    fn test_duplicate_product_ids_are_rejected() {
        let mut products = seed_products();
        products.push(products[2].clone());

        let mirror = MirrorBackend::in_memory();
        mirror.write_products(&products).unwrap();
        mirror.write_transactions(&[]).unwrap();

        assert!(matches!(
            mirror.load_snapshot(),
            Err(DbError::Serialization(reason)) if reason.contains("prod-3")
        ));
    }

    #[test]
    fn test_negative_stock_is_rejected() {
        let mut products = seed_products();
        products[2].stock = -7;

        let mirror = MirrorBackend::in_memory();
        mirror.write_products(&products).unwrap();
        mirror.write_transactions(&[]).unwrap();

        assert!(matches!(mirror.load_snapshot(), Err(DbError::Serialization(_))));
    }
}
