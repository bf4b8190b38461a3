//! # Backend Lifecycle
//!
//! Decides which backend is connected. Every switch hands back the new
//! backend's full [`Snapshot`] so the caller can replace memory wholesale;
//! nothing is ever merged across backends.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │              create_new()                load_from_bytes()              │
//! │   ┌────────┐ ─────────────────────────► ┌──────────────────────┐       │
//! │   │ Mirror │                            │ Relational           │       │
//! │   │ "none" │ ◄───────────────────────── │ File("pos-data.db")  │       │
//! │   └────────┘        disconnect()        └──────────────────────┘       │
//! │                                                                         │
//! │   A failed create/load leaves the previous backend connected.           │
//! │   The mirror is never closed; it is always there to fall back on.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use tracing::info;

use crate::error::InventoryResult;
use stockbook_core::seed::seed_products;
use stockbook_core::DEFAULT_STORE_NAME;
use stockbook_db::{Backend, BackendKind, MirrorBackend, RelationalStore, Snapshot};

/// What the active backend is, as collaborators display it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendIdentity {
    /// No store file connected.
    Mirror,
    /// A relational store, by the file name it was created or loaded as.
    File(String),
}

impl fmt::Display for BackendIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendIdentity::Mirror => write!(f, "none"),
            BackendIdentity::File(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug)]
pub struct BackendLifecycle {
    mirror: MirrorBackend,
    active: Backend,
    identity: BackendIdentity,
}

impl BackendLifecycle {
    /// Connects the mirror and reads its snapshot, seeding it on first run.
    pub async fn open(mirror: MirrorBackend) -> InventoryResult<(Self, Snapshot)> {
        let snapshot = mirror_snapshot(&mirror)?;
        let lifecycle = BackendLifecycle {
            active: Backend::Mirror(mirror.clone()),
            mirror,
            identity: BackendIdentity::Mirror,
        };
        info!(
            products = snapshot.products.len(),
            transactions = snapshot.transactions.len(),
            "Mirror backend connected"
        );
        Ok((lifecycle, snapshot))
    }

    pub fn backend(&self) -> &Backend {
        &self.active
    }

    pub fn identity(&self) -> &BackendIdentity {
        &self.identity
    }

    pub fn kind(&self) -> BackendKind {
        self.active.kind()
    }

    /// Connects a fresh relational store holding the seed catalog.
    pub async fn create_new(&mut self) -> InventoryResult<Snapshot> {
        let store = RelationalStore::create_seeded(&seed_products()).await?;
        let snapshot = match store.load_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                store.close().await;
                return Err(err.into());
            }
        };

        self.switch_to(
            Backend::Relational(store),
            BackendIdentity::File(DEFAULT_STORE_NAME.to_string()),
        )
        .await;
        Ok(snapshot)
    }

    /// Connects a relational store rebuilt from a store file image.
    ///
    /// Bytes that fail validation give `SchemaMismatch` and the current
    /// backend stays connected.
    ///
    /// The store is built beside the active backend rather than through
    /// [`Backend::import_bytes`], which replaces contents in place and is
    /// `Unsupported` while the mirror is active.
    pub async fn load_from_bytes(&mut self, bytes: &[u8], name: &str) -> InventoryResult<Snapshot> {
        let store = RelationalStore::import(bytes).await?;
        let snapshot = match store.load_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                store.close().await;
                return Err(err.into());
            }
        };

        self.switch_to(
            Backend::Relational(store),
            BackendIdentity::File(name.to_string()),
        )
        .await;
        Ok(snapshot)
    }

    /// Store file image of the active backend. `Unsupported` on the mirror.
    pub async fn export_to_bytes(&self) -> InventoryResult<Vec<u8>> {
        Ok(self.active.export_bytes().await?)
    }

    /// Closes any relational store and resumes from the mirror's own data.
    pub async fn disconnect(&mut self) -> InventoryResult<Snapshot> {
        let snapshot = mirror_snapshot(&self.mirror)?;
        self.switch_to(Backend::Mirror(self.mirror.clone()), BackendIdentity::Mirror)
            .await;
        Ok(snapshot)
    }

    /// Releases the active backend.
    pub async fn close(&self) {
        self.active.close().await;
    }

    async fn switch_to(&mut self, next: Backend, identity: BackendIdentity) {
        let previous = std::mem::replace(&mut self.active, next);
        previous.close().await;
        info!(
            from = %self.identity,
            to = %identity,
            backend = self.active.kind().as_str(),
            "Backend switched"
        );
        self.identity = identity;
    }
}

/// The mirror's snapshot, writing the seed first if it has none.
fn mirror_snapshot(mirror: &MirrorBackend) -> InventoryResult<Snapshot> {
    if let Some(snapshot) = mirror.load_snapshot()? {
        return Ok(snapshot);
    }

    let seed = Snapshot::seed();
    mirror.write_snapshot(&seed)?;
    info!(products = seed.products.len(), "Seeded empty mirror");
    Ok(seed)
}
