// src/session/store.rs
//! Session storage behind a small trait so a durable store can replace the
//! in-memory map without touching the engine.
//!
//! Locking discipline: one `Mutex` per session id. The map lock is held only
//! to look up or insert a slot; work on different sessions runs in parallel,
//! work on the same session is serialized by its slot lock.
//!
//! Eviction never removes a slot that a caller still holds, and an evicted
//! finalized id comes back finalized, so a session reports at most once.

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::Session;

pub type SessionSlot = Arc<Mutex<Session>>;

pub trait SessionStore: Send + Sync {
    /// Existing slot for `id`, or a fresh session inserted atomically.
    fn get_or_create(&self, id: &str) -> SessionSlot;
    /// Snapshot of one session.
    fn get(&self, id: &str) -> Option<Session>;
    /// Snapshots of every session (analytics/debug).
    fn snapshots(&self) -> Vec<Session>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Drop sessions idle for longer than `ttl`. Sessions still held by a
    /// caller (locked or merely fetched) are skipped.
    fn evict_idle(&self, ttl: Duration) -> usize;
}

/// Lock a slot. A panic in an earlier holder does not make the session unusable.
pub fn lock(slot: &SessionSlot) -> MutexGuard<'_, Session> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run `f` against the session for `id` while holding its lock.
pub fn update<R>(store: &dyn SessionStore, id: &str, f: impl FnOnce(&mut Session) -> R) -> R {
    let slot = store.get_or_create(id);
    let mut guard = lock(&slot);
    f(&mut guard)
}

#[derive(Debug, Default)]
struct Sessions {
    slots: HashMap<String, SessionSlot>,
    /// Ids evicted after finalizing.
    retired: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: RwLock<Sessions>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get_or_create(&self, id: &str) -> SessionSlot {
        {
            let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = map.slots.get(id) {
                return slot.clone();
            }
        }
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let Sessions { slots, retired } = &mut *map;
        // Double-check: another request may have inserted it meanwhile.
        slots
            .entry(id.to_string())
            .or_insert_with(|| {
                let mut session = Session::new(id);
                session.finalized = retired.remove(id);
                tracing::debug!(target: "honeypot", finalized = session.finalized, "session created");
                Arc::new(Mutex::new(session))
            })
            .clone()
    }

    fn get(&self, id: &str) -> Option<Session> {
        let slot = {
            let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            map.slots.get(id).cloned()
        }?;
        let guard = lock(&slot);
        Some(guard.clone())
    }

    fn snapshots(&self) -> Vec<Session> {
        let slots: Vec<SessionSlot> = {
            let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            map.slots.values().cloned().collect()
        };
        slots
            .iter()
            .map(|s| lock(s).clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .len()
    }

    fn evict_idle(&self, ttl: Duration) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        let cutoff = Utc::now() - ttl;

        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let Sessions { slots, retired } = &mut *map;
        let before = slots.len();
        slots.retain(|id, slot| {
            // held outside the map: a turn is in flight
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            let Ok(s) = slot.try_lock() else {
                return true;
            };
            if s.last_activity >= cutoff {
                return true;
            }
            if s.finalized {
                retired.insert(id.clone());
            }
            false
        });
        before - slots.len()
    }
}

/// Periodically evict idle sessions. Checks every `ttl / 4` (at least once a second).
pub fn spawn_ttl_sweeper(store: Arc<dyn SessionStore>, ttl: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let every = (ttl / 4).max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let evicted = store.evict_idle(ttl);
            if evicted > 0 {
                tracing::info!(target: "honeypot", evicted, remaining = store.len(), "session ttl sweep");
            }
        }
    })
}
