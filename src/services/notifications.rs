use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::models::Notification;

/// Maximum number of undrained notifications kept per session.
const MAX_PENDING: usize = 50;

/// Per-session queue of transient notifications. Readers drain it.
#[derive(Clone, Debug, Default)]
pub struct NotificationStore {
    inner: Arc<Mutex<HashMap<String, Vec<Notification>>>>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, session_id: &str, notification: Notification) {
        self.extend(session_id, std::iter::once(notification));
    }

    pub fn extend(&self, session_id: &str, notifications: impl IntoIterator<Item = Notification>) {
        let mut inner = self.inner.lock().unwrap();
        let queue = inner.entry(session_id.to_string()).or_default();
        queue.extend(notifications);
        // Oldest messages go first when a client never drains.
        if queue.len() > MAX_PENDING {
            let excess = queue.len() - MAX_PENDING;
            queue.drain(..excess);
        }
    }

    pub fn drain(&self, session_id: &str) -> Vec<Notification> {
        self.inner.lock().unwrap().remove(session_id).unwrap_or_default()
    }

    pub fn clear(&self, session_id: &str) {
        self.inner.lock().unwrap().remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_queue() {
        let store = NotificationStore::new();
        store.push("s1", Notification::success("saved"));
        store.push("s2", Notification::error("other session"));
        assert_eq!(store.drain("s1"), vec![Notification::success("saved")]);
        assert!(store.drain("s1").is_empty());
        assert_eq!(store.drain("s2").len(), 1);
    }

    #[test]
    fn oldest_entries_evicted() {
        let store = NotificationStore::new();
        for i in 0..(MAX_PENDING + 5) {
            store.push("s", Notification::success(format!("n{}", i)));
        }
        let drained = store.drain("s");
        assert_eq!(drained.len(), MAX_PENDING);
        assert_eq!(drained[0].message, "n5");
    }
}
