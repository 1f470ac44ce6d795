use std::{collections::HashMap, sync::Mutex};

/// One buffered group message awaiting the next agent reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMessage {
    pub sender: String,
    pub body: String,
}

impl GroupMessage {
    /// Render as a context line for the agent prompt.
    pub fn render(&self) -> String {
        format!("{}: {}", self.sender, self.body)
    }
}

/// Per-scope accumulator of group messages that did not trigger a reply.
///
/// The dispatcher appends non-mention messages here and flushes the whole
/// backlog into the first invocation of the next dispatch. [`take`] removes
/// under the lock, so even concurrent broadcast targets see the backlog
/// exactly once.
///
/// [`take`]: GroupHistoryBuffer::take
#[derive(Debug, Default)]
pub struct GroupHistoryBuffer {
    inner: Mutex<HashMap<String, Vec<GroupMessage>>>,
}

impl GroupHistoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, scope: &str, sender: impl Into<String>, body: impl Into<String>) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(scope.to_string()).or_default().push(GroupMessage {
            sender: sender.into(),
            body: body.into(),
        });
    }

    /// Remove and return the backlog for a scope. Atomic: exactly one caller
    /// observes a non-empty result for any accumulated batch.
    pub fn take(&self, scope: &str) -> Vec<GroupMessage> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(scope).unwrap_or_default()
    }

    /// Put a previously taken backlog back, ahead of anything that
    /// accumulated since. Used when the invocation that consumed the
    /// backlog fails, so the messages are not lost.
    pub fn restore(&self, scope: &str, messages: Vec<GroupMessage>) {
        if messages.is_empty() {
            return;
        }
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let slot = map.entry(scope.to_string()).or_default();
        let newer = std::mem::replace(slot, messages);
        slot.extend(newer);
    }

    /// Number of buffered messages for a scope.
    pub fn pending(&self, scope: &str) -> usize {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.get(scope).map_or(0, Vec::len)
    }
}
