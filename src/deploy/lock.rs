// ABOUTME: Per-project deploy lock so concurrent updates of one project serialize.
// ABOUTME: Keyed by (user, project label); idle entries are pruned on release.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// Registry of project locks shared by every request handled by one server.
#[derive(Debug, Clone, Default)]
pub struct ProjectLocks {
    inner: Arc<Mutex<LockMap>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other request holds the lock for this project.
    pub async fn acquire(&self, user: &str, project: &str) -> ProjectGuard {
        let key = format!("{}/{}", user, project);
        let lock = {
            let mut map = self.inner.lock();
            Arc::clone(map.entry(key.clone()).or_default())
        };

        if lock.try_lock().is_err() {
            tracing::info!(%key, "waiting for another deployment of this project");
        }
        let guard = lock.lock_owned().await;
        tracing::debug!(%key, "acquired project lock");

        ProjectGuard {
            key,
            map: Arc::clone(&self.inner),
            guard: Some(guard),
        }
    }

    /// Number of projects with a held or awaited lock.
    pub fn active(&self) -> usize {
        self.inner.lock().len()
    }
}

/// Held project lock; released on drop.
#[derive(Debug)]
pub struct ProjectGuard {
    key: String,
    map: Arc<Mutex<LockMap>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ProjectGuard {
    fn drop(&mut self) {
        let mut map = self.map.lock();
        // Map entry plus our guard; anyone else waiting holds a third reference.
        if let Some(entry) = map.get(&self.key)
            && Arc::strong_count(entry) <= 2
        {
            map.remove(&self.key);
        }
        self.guard.take();
        tracing::debug!(key = %self.key, "released project lock");
    }
}
