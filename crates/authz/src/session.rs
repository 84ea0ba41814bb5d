use dashmap::DashMap;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::principal::Principal;

#[derive(Debug, Clone)]
struct Session {
    principal: Principal,
    last_access: OffsetDateTime,
}

/// In-memory sessions keyed by an opaque random id; idle sessions expire.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: std::time::Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout: Duration::try_from(idle_timeout).unwrap_or(Duration::MAX),
        }
    }

    /// Open a session for `principal` and return its id.
    ///
    /// Idle sessions that were never touched again are swept first.
    pub fn create(&self, principal: Principal) -> String {
        let now = OffsetDateTime::now_utc();
        let swept = self.sweep(now);
        if swept > 0 {
            tracing::debug!(swept, "expired sessions swept");
        }

        let id = Uuid::new_v4().simple().to_string();
        tracing::debug!(username = %principal.username, "session created");
        self.sessions.insert(
            id.clone(),
            Session {
                principal,
                last_access: now,
            },
        );
        id
    }

    fn sweep(&self, now: OffsetDateTime) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| now - session.last_access < self.idle_timeout);
        before.saturating_sub(self.sessions.len())
    }

    /// Resolve a session id, refreshing its idle clock.
    ///
    /// Unknown ids and expired sessions yield `None`; expired ones are dropped.
    pub fn touch(&self, id: &str) -> Option<Principal> {
        let now = OffsetDateTime::now_utc();
        let principal = {
            let mut session = self.sessions.get_mut(id)?;
            if now - session.last_access >= self.idle_timeout {
                None
            } else {
                session.last_access = now;
                Some(session.principal.clone())
            }
        };
        if principal.is_none() {
            self.sessions.remove(id);
            tracing::debug!("expired session discarded");
        }
        principal
    }

    pub fn invalidate(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
