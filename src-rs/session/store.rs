use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;

use crate::config::SessionConfig;
use crate::errors::ChatError;

use super::id::generate_session_id;
use super::types::{Role, SessionInfo, Turn};

/// Retention policy applied by [`SessionStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRetention {
    /// Sessions idle for longer than this are dropped by a sweep.
    pub idle_ttl: Duration,
    /// When a new session would exceed this, the least recently active one is evicted.
    pub max_sessions: usize,
    /// Oldest turns are dropped once a session holds this many.
    pub max_turns: usize,
}

impl Default for SessionRetention {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(3600),
            max_sessions: 10_000,
            max_turns: 20,
        }
    }
}

impl From<&SessionConfig> for SessionRetention {
    fn from(c: &SessionConfig) -> Self {
        Self {
            idle_ttl: Duration::from_secs(c.idle_ttl_secs),
            max_sessions: c.max_sessions.max(1),
            max_turns: c.max_turns.max(1),
        }
    }
}

struct Session {
    created_at_ms: i64,
    last_active: Instant,
    turns: VecDeque<Turn>,
}

pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// In-memory conversation history keyed by session id.
///
/// The map lock is only held to look up or insert a session handle; each
/// session's turns sit behind their own mutex, so traffic on one session
/// never blocks or reorders another.
pub struct SessionStore {
    retention: SessionRetention,
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new(retention: SessionRetention) -> Self {
        Self {
            retention,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn retention(&self) -> SessionRetention {
        self.retention
    }

    pub fn create(&self) -> String {
        self.create_at(Instant::now())
    }

    pub(crate) fn create_at(&self, now: Instant) -> String {
        let session_id = generate_session_id();
        let session = Session {
            created_at_ms: now_ms(),
            last_active: now,
            turns: VecDeque::new(),
        };

        let mut sessions = self.write_map();
        if sessions.len() >= self.retention.max_sessions {
            evict_expired(&mut sessions, now, self.retention.idle_ttl);
        }
        while sessions.len() >= self.retention.max_sessions {
            let Some(oldest) = least_recently_active(&sessions) else {
                break;
            };
            log::debug!("evicting session {} to stay under capacity", oldest);
            sessions.remove(&oldest);
        }
        sessions.insert(session_id.clone(), Arc::new(Mutex::new(session)));
        session_id
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.handle(session_id).is_ok()
    }

    /// Marks the session as active without changing its history.
    pub fn touch(&self, session_id: &str) -> Result<(), ChatError> {
        let handle = self.handle(session_id)?;
        lock_session(&handle).last_active = Instant::now();
        Ok(())
    }

    pub fn append_turn(
        &self,
        session_id: &str,
        role: Role,
        content: impl Into<String>,
    ) -> Result<(), ChatError> {
        let handle = self.handle(session_id)?;
        let mut session = lock_session(&handle);
        if session.turns.len() >= self.retention.max_turns {
            session.turns.pop_front();
        }
        session.turns.push_back(Turn {
            role,
            content: content.into(),
        });
        session.last_active = Instant::now();
        Ok(())
    }

    /// Appends a user turn and the reply to it under one lock, so concurrent
    /// traffic on the same session cannot interleave between the two.
    pub fn append_exchange(
        &self,
        session_id: &str,
        user: impl Into<String>,
        assistant: impl Into<String>,
    ) -> Result<(), ChatError> {
        let handle = self.handle(session_id)?;
        let mut session = lock_session(&handle);
        for turn in [Turn::user(user), Turn::assistant(assistant)] {
            if session.turns.len() >= self.retention.max_turns {
                session.turns.pop_front();
            }
            session.turns.push_back(turn);
        }
        session.last_active = Instant::now();
        Ok(())
    }

    /// Last `max_turns` turns, oldest first. Unknown sessions have no context.
    pub fn recent_context(&self, session_id: &str, max_turns: usize) -> Vec<Turn> {
        let Ok(handle) = self.handle(session_id) else {
            return Vec::new();
        };
        let session = lock_session(&handle);
        let skip = session.turns.len().saturating_sub(max_turns);
        session.turns.iter().skip(skip).cloned().collect()
    }

    pub fn info(&self, session_id: &str) -> Option<SessionInfo> {
        let handle = self.handle(session_id).ok()?;
        let session = lock_session(&handle);
        Some(SessionInfo {
            session_id: session_id.to_string(),
            created_at_ms: session.created_at_ms,
            turn_count: session.turns.len(),
        })
    }

    pub fn remove(&self, session_id: &str) -> bool {
        self.write_map().remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_turns(&self) -> usize {
        let handles: Vec<_> = self.read_map().values().cloned().collect();
        handles.iter().map(|h| lock_session(h).turns.len()).sum()
    }

    pub fn list_ids(&self) -> Vec<String> {
        self.read_map().keys().cloned().collect()
    }

    /// Drops sessions idle for longer than the retention TTL. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    pub(crate) fn sweep_expired_at(&self, now: Instant) -> usize {
        let mut sessions = self.write_map();
        evict_expired(&mut sessions, now, self.retention.idle_ttl)
    }

    /// Runs [`sweep_expired`](Self::sweep_expired) every `every` on the current
    /// tokio runtime. The task ends once the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = weak.upgrade() else {
                    break;
                };
                let removed = store.sweep_expired();
                if removed > 0 {
                    log::info!("session sweep removed {} idle sessions", removed);
                }
            }
        })
    }

    /// Looks up a live session. One idle past the TTL is dropped and reported unknown.
    fn handle(&self, session_id: &str) -> Result<Arc<Mutex<Session>>, ChatError> {
        let unknown = || ChatError::UnknownSession(session_id.to_string());
        let handle = self.read_map().get(session_id).cloned().ok_or_else(unknown)?;
        if !self.is_expired(&handle, Instant::now()) {
            return Ok(handle);
        }

        let mut sessions = self.write_map();
        // Re-check under the write lock; another caller may have touched it.
        let still_expired = sessions
            .get(session_id)
            .is_some_and(|h| self.is_expired(h, Instant::now()));
        if still_expired {
            sessions.remove(session_id);
            log::debug!("session {} expired after idling past {:?}", session_id, self.retention.idle_ttl);
            return Err(unknown());
        }
        sessions.get(session_id).cloned().ok_or_else(unknown)
    }

    fn is_expired(&self, handle: &Mutex<Session>, now: Instant) -> bool {
        let last_active = lock_session(handle).last_active;
        now.saturating_duration_since(last_active) > self.retention.idle_ttl
    }

    fn read_map(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Mutex<Session>>>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Mutex<Session>>>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionRetention::default())
    }
}

fn lock_session(handle: &Mutex<Session>) -> MutexGuard<'_, Session> {
    handle.lock().unwrap_or_else(|e| e.into_inner())
}

fn evict_expired(
    sessions: &mut HashMap<String, Arc<Mutex<Session>>>,
    now: Instant,
    idle_ttl: Duration,
) -> usize {
    let before = sessions.len();
    sessions.retain(|_, handle| {
        let last_active = lock_session(handle).last_active;
        now.saturating_duration_since(last_active) <= idle_ttl
    });
    before - sessions.len()
}

fn least_recently_active(sessions: &HashMap<String, Arc<Mutex<Session>>>) -> Option<String> {
    sessions
        .iter()
        .map(|(id, handle)| (id, lock_session(handle).last_active))
        .min_by_key(|(_, last_active)| *last_active)
        .map(|(id, _)| id.clone())
}
