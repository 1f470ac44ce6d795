use std::{collections::HashMap, sync::Mutex};

use crate::key::SessionKey;

/// Append-only per-session queue of human-readable system events
/// ("Model switched to ...", "Elevated mode set to ...").
///
/// Events accumulate until the next reply or heartbeat cycle drains them.
#[derive(Debug, Default)]
pub struct SystemEventQueue {
    inner: Mutex<HashMap<SessionKey, Vec<String>>>,
}

impl SystemEventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, key: &SessionKey, event: impl Into<String>) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(key.clone()).or_default().push(event.into());
    }

    /// Remove and return all pending events for a session.
    pub fn drain(&self, key: &SessionKey) -> Vec<String> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(key).unwrap_or_default()
    }

    /// Pending events without removing them.
    pub fn peek(&self, key: &SessionKey) -> Vec<String> {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.get(key).cloned().unwrap_or_default()
    }
}
