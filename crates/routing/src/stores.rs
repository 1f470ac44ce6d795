use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};

use tokio::sync::Mutex;

use {
    hermod_config::HermodConfig,
    hermod_sessions::{SessionStore, store::persist},
};

use crate::error::Result;

/// Lazily-loaded cache of per-agent session stores.
///
/// One store per agent id, loaded on first access and kept for the process
/// lifetime. All access goes through one async mutex, so concurrent sessions
/// on different keys serialize their in-memory reads and writes; the store's
/// own file lock covers cross-process writers.
pub struct StoreManager {
    config: Arc<HermodConfig>,
    stores: Mutex<HashMap<String, SessionStore>>,
}

impl StoreManager {
    pub fn new(config: Arc<HermodConfig>) -> Self {
        Self {
            config,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Agent ids whose stores have been loaded so far, sorted.
    pub async fn loaded(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.stores.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Run `f` against one agent's store, loading it first if needed.
    pub async fn with_store<R>(
        &self,
        agent_id: &str,
        f: impl FnOnce(&mut SessionStore) -> R,
    ) -> Result<R> {
        let mut stores = self.stores.lock().await;
        let store = match stores.entry(agent_id.to_string()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                let path = self.config.store_path(agent_id);
                tracing::debug!(agent = agent_id, path = %path.display(), "loading session store");
                vacant.insert(SessionStore::load(path)?)
            },
        };
        Ok(f(store))
    }

    /// Persist one agent's store, if loaded.
    ///
    /// The document is snapshotted under the manager lock and written after
    /// releasing it, so one agent's disk write never queues the others.
    pub async fn save(&self, agent_id: &str) -> Result<()> {
        let pending = {
            let stores = self.stores.lock().await;
            match stores.get(agent_id) {
                Some(store) => Some((store.path().to_path_buf(), store.serialized()?)),
                None => None,
            }
        };
        if let Some((path, data)) = pending {
            persist(path, data).await?;
        }
        Ok(())
    }
}
