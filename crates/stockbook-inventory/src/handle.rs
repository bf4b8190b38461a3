//! # Shared Handle
//!
//! `Arc<tokio::sync::Mutex<Inventory>>`: one operation in flight at a time,
//! backend switches included.

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::error;

use crate::error::{InventoryError, InventoryResult};
use crate::inventory::Inventory;
use stockbook_core::Transaction;

#[derive(Debug, Clone)]
pub struct InventoryHandle {
    inner: Arc<Mutex<Inventory>>,
}

impl InventoryHandle {
    pub fn new(inventory: Inventory) -> Self {
        InventoryHandle {
            inner: Arc::new(Mutex::new(inventory)),
        }
    }

    /// Exclusive access for any read or write.
    pub async fn lock(&self) -> MutexGuard<'_, Inventory> {
        self.inner.lock().await
    }

    /// Finalizes the sale on its own task.
    ///
    /// Once the lock is taken the commit runs to completion even if the
    /// caller stops waiting, so memory and backend cannot drift apart.
    pub async fn finalize_sale(&self) -> InventoryResult<Option<Transaction>> {
        let mut guard = Arc::clone(&self.inner).lock_owned().await;

        tokio::spawn(async move { guard.finalize_sale().await })
            .await
            .map_err(|e| {
                error!(error = %e, "Sale task failed");
                InventoryError::Io(format!("sale task failed: {e}"))
            })?
    }
}
