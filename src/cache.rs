use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::export::SnapshotStore;
use crate::metrics::LatestView;

struct CacheEntry {
    view: Arc<LatestView>,
    expires_at: Instant,
}

/// Latest view of the snapshot file, reloaded after `ttl` or after an
/// explicit [`SnapshotCache::invalidate`]. Failed loads are never cached.
pub struct SnapshotCache {
    store: SnapshotStore,
    ttl: Duration,
    entry: RwLock<Option<CacheEntry>>,
}

impl SnapshotCache {
    pub fn new(store: SnapshotStore, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            entry: RwLock::new(None),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub async fn get(&self) -> Result<Arc<LatestView>, StoreError> {
        if let Some(entry) = self.entry.read().await.as_ref() {
            if Instant::now() < entry.expires_at {
                return Ok(entry.view.clone());
            }
        }

        let mut slot = self.entry.write().await;
        // another request may have reloaded while we waited for the lock
        if let Some(entry) = slot.as_ref() {
            if Instant::now() < entry.expires_at {
                return Ok(entry.view.clone());
            }
        }

        // file reads run on the blocking pool so the lock holder never stalls a worker
        let store = self.store.clone();
        let rows = tokio::task::spawn_blocking(move || store.load_all())
            .await
            .map_err(|e| StoreError::Read {
                path: self.store.latest_path().to_path_buf(),
                source: io::Error::other(e),
            })??;
        let view = Arc::new(LatestView::from_rows(rows));
        debug!(
            "loaded {} symbols from {}",
            view.len(),
            self.store.latest_path().display()
        );
        *slot = Some(CacheEntry {
            view: view.clone(),
            expires_at: Instant::now() + self.ttl,
        });
        Ok(view)
    }

    pub async fn invalidate(&self) {
        self.entry.write().await.take();
        info!("snapshot cache invalidated");
    }
}

impl std::fmt::Debug for SnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("store", &self.store)
            .field("ttl", &self.ttl)
            .finish()
    }
}
