use std::{
    collections::HashMap,
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use fd_lock::RwLock;

use crate::{
    entry::SessionEntry,
    error::{Error, Result},
    key::SessionKey,
};

/// File-backed session index for one agent.
///
/// The on-disk format is a single JSON object keyed by session key. The
/// in-memory map is the working copy; [`SessionStore::save`] persists it
/// atomically (temp file + rename) under a sidecar file lock so concurrent
/// sessions on the same agent never interleave partial writes.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    entries: HashMap<SessionKey, SessionEntry>,
}

impl SessionStore {
    /// Load the store from disk, or create an empty one.
    ///
    /// A malformed document is logged and replaced with an empty index
    /// rather than refusing to start.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let data = fs::read_to_string(&path)?;
            match serde_json::from_str(&data) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "malformed session store, starting empty");
                    HashMap::new()
                },
            }
        } else {
            HashMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &SessionKey) -> Option<&SessionEntry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &SessionKey) -> Option<&mut SessionEntry> {
        self.entries.get_mut(key)
    }

    /// Get or lazily create the entry for a key.
    pub fn upsert(&mut self, key: &SessionKey) -> &mut SessionEntry {
        self.entries
            .entry(key.clone())
            .or_insert_with(SessionEntry::new)
    }

    /// Find the entry whose `session_id` matches, if any.
    pub fn find_by_session_id(&self, session_id: &str) -> Option<(&SessionKey, &SessionEntry)> {
        self.entries
            .iter()
            .find(|(_, e)| e.session_id == session_id)
    }

    pub fn keys(&self) -> impl Iterator<Item = &SessionKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON document for the current in-memory index. Callers that hold a
    /// lock around the store can snapshot here and write with [`persist`]
    /// after releasing it.
    pub fn serialized(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    /// Persist the full index to disk.
    ///
    /// Runs on the blocking pool. On failure the in-memory map is untouched,
    /// so a caller can retry or surface the error without losing turn state.
    pub async fn save(&self) -> Result<()> {
        persist(self.path.clone(), self.serialized()?).await
    }
}

/// Write an already-serialized index to `path` atomically on the blocking
/// pool.
pub async fn persist(path: PathBuf, data: String) -> Result<()> {
    tokio::task::spawn_blocking(move || write_locked(&path, &data)).await??;
    Ok(())
}

/// Write `data` to `path` atomically while holding a sidecar lock file.
fn write_locked(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let lock_path = path.with_extension("json.lock");
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)?;
    let mut lock = RwLock::new(lock_file);
    let _guard = lock
        .write()
        .map_err(|e| Error::lock_failed(e.to_string()))?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, data)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
