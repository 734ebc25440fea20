use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::api::{KeycloakAdminApi, OpenStackApi};
use crate::models::{ConfigDraft, Credentials};
use crate::services::{NotificationStore, UserDirectory};
use crate::wizard::WizardController;

/// Per-browser state, keyed by the `session_id` cookie.
#[derive(Clone, Default)]
pub struct ConsoleSession {
    /// Held across every await of a step so one session's steps run in order.
    pub wizard: Arc<tokio::sync::Mutex<WizardController>>,
    pub config: Arc<Mutex<ConfigDraft>>,
}

/// Sessions untouched for this long are dropped on the next lookup.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);
/// Oldest sessions are evicted beyond this many.
pub const MAX_SESSIONS: usize = 1024;

struct SessionEntry {
    session: ConsoleSession,
    last_seen: Instant,
}

#[derive(Clone)]
pub struct AppState {
    pub openstack: Arc<dyn OpenStackApi>,
    pub keycloak: Arc<dyn KeycloakAdminApi>,
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
    pub notifications: NotificationStore,
    /// Cached copy of the realm's users shared by every console session.
    pub users: Arc<tokio::sync::Mutex<UserDirectory>>,
    /// Used by wizard submissions that do not carry their own credentials.
    pub default_credentials: Option<Credentials>,
}

impl AppState {
    pub fn new(
        openstack: Arc<dyn OpenStackApi>,
        keycloak: Arc<dyn KeycloakAdminApi>,
        default_credentials: Option<Credentials>,
    ) -> Self {
        Self {
            openstack,
            keycloak,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            notifications: NotificationStore::new(),
            users: Arc::new(tokio::sync::Mutex::new(UserDirectory::new())),
            default_credentials,
        }
    }

    /// Look up a console session, creating an empty one on first use.
    pub fn session(&self, session_id: &str) -> ConsoleSession {
        self.session_at(session_id, Instant::now())
    }

    /// Same as [`AppState::session`] with an explicit clock. Idle sessions
    /// are swept first, then the least recently seen one makes room when
    /// the table is full.
    pub fn session_at(&self, session_id: &str, now: Instant) -> ConsoleSession {
        let (session, evicted) = {
            let mut sessions = self.sessions.lock().unwrap();
            let mut evicted: Vec<String> = sessions
                .iter()
                .filter(|(_, entry)| now.saturating_duration_since(entry.last_seen) > SESSION_IDLE_TTL)
                .map(|(id, _)| id.clone())
                .collect();
            for id in &evicted {
                sessions.remove(id);
            }
            if !sessions.contains_key(session_id) && sessions.len() >= MAX_SESSIONS {
                let oldest = sessions
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_seen)
                    .map(|(id, _)| id.clone());
                if let Some(id) = oldest {
                    sessions.remove(&id);
                    evicted.push(id);
                }
            }
            let entry = sessions.entry(session_id.to_string()).or_insert_with(|| SessionEntry {
                session: ConsoleSession::default(),
                last_seen: now,
            });
            entry.last_seen = now;
            (entry.session.clone(), evicted)
        };
        if !evicted.is_empty() {
            tracing::debug!(count = evicted.len(), "Evicted console sessions");
        }
        for id in &evicted {
            self.notifications.clear(id);
        }
        session
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Forget a session and anything queued for it.
    pub fn drop_session(&self, session_id: &str) {
        self.sessions.lock().unwrap().remove(session_id);
        self.notifications.clear(session_id);
    }
}
