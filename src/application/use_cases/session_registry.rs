use crate::domain::error::{AppError, Result};
use crate::domain::session::SessionState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

pub type SharedSession = Arc<AsyncMutex<SessionState>>;

pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(4 * 60 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 64;

struct Entry {
    session: SharedSession,
    last_touched: Instant,
}

impl Entry {
    /// Held by a request or a running engine task.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.session) > 1
    }
}

/// One isolated `SessionState` per session id.
///
/// Sessions idle longer than `idle_ttl` are dropped, and when `max_sessions`
/// is reached the least recently touched idle session makes room for a new
/// one. Sessions in use are never evicted.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Entry>>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn evict_expired(&self, sessions: &mut HashMap<String, Entry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.in_use() || now.duration_since(entry.last_touched) < self.idle_ttl
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, "Evicted idle sessions");
        }
    }

    pub fn create(&self) -> Result<String> {
        let now = Instant::now();
        let mut sessions = self.lock();
        self.evict_expired(&mut sessions, now);

        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .filter(|(_, entry)| !entry.in_use())
                .min_by_key(|(_, entry)| entry.last_touched)
                .map(|(id, _)| id.clone());

            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                    tracing::info!(session_id = %id, "Evicted least recently used session");
                }
                None => {
                    return Err(AppError::PreconditionError(format!(
                        "Session limit of {} reached",
                        self.max_sessions
                    )))
                }
            }
        }

        let id = Uuid::new_v4().to_string();
        sessions.insert(
            id.clone(),
            Entry {
                session: Arc::new(AsyncMutex::new(SessionState::new())),
                last_touched: now,
            },
        );
        tracing::info!(session_id = %id, "Created session");
        Ok(id)
    }

    /// Look up a session and mark it as used.
    pub fn get(&self, id: &str) -> Result<SharedSession> {
        let now = Instant::now();
        let mut sessions = self.lock();
        self.evict_expired(&mut sessions, now);

        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Session {}", id)))?;
        entry.last_touched = now;
        Ok(entry.session.clone())
    }

    pub fn remove(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
