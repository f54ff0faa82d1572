//! Per-session credential storage.
//!
//! [`SessionStore`] is a small key-value interface over three fixed slots.
//! Backends decide where the values live (private cookies, server memory, a
//! token cache); the credential-level operations the proxy needs are provided
//! methods on top of `get`/`set`/`delete`.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::types::{AccessToken, RefreshToken};

/// Storage slot for one piece of session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Access,
    Refresh,
    AcceptedTerms,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Access, Slot::Refresh, Slot::AcceptedTerms];
}

/// Snapshot of the credentials held for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCredentials {
    pub access: Option<AccessToken>,
    pub refresh: Option<RefreshToken>,
    /// Client-side cache of the backend's terms acceptance. Advisory only.
    pub accepted_terms: bool,
}

impl SessionCredentials {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none() && !self.accepted_terms
    }
}

/// Key-value storage scoped to a single session.
///
/// Storage is assumed infallible; a backend that cannot reach its medium
/// should treat that as a fatal condition rather than report it here.
pub trait SessionStore: Send + Sync {
    fn get(&self, slot: Slot) -> Option<String>;

    /// Write a slot. `ttl` of `None` means no explicit expiry.
    fn set(&self, slot: Slot, value: &str, ttl: Option<Duration>);

    fn delete(&self, slot: Slot);

    /// Remove every slot.
    ///
    /// Backends with internal locking should override this so no reader can
    /// observe a partially cleared session.
    fn clear(&self) {
        for slot in Slot::ALL {
            self.delete(slot);
        }
    }

    /// Store a fresh access/refresh pair. `ttl_secs` is clamped to at least 1.
    fn store_tokens(&self, access: &AccessToken, refresh: &RefreshToken, ttl_secs: u64) {
        let ttl = Duration::from_secs(ttl_secs.max(1));
        self.set(Slot::Access, access.as_str(), Some(ttl));
        self.set(Slot::Refresh, refresh.as_str(), None);
    }

    /// Cache the terms acceptance flag. `false` removes the slot.
    fn set_accepted_terms(&self, accepted: bool) {
        if accepted {
            self.set(Slot::AcceptedTerms, "1", None);
        } else {
            self.delete(Slot::AcceptedTerms);
        }
    }

    fn access_token(&self) -> Option<AccessToken> {
        self.get(Slot::Access).map(AccessToken::from)
    }

    fn refresh_token(&self) -> Option<RefreshToken> {
        self.get(Slot::Refresh).map(RefreshToken::from)
    }

    fn credentials(&self) -> SessionCredentials {
        SessionCredentials {
            access: self.access_token(),
            refresh: self.refresh_token(),
            accepted_terms: self.get(Slot::AcceptedTerms).is_some(),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Option<Duration>,
    written_at: Instant,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.ttl.is_none_or(|ttl| self.written_at.elapsed() < ttl)
    }
}

/// In-process session store.
///
/// Honours the access TTL: an entry past its TTL reads as absent.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<Slot, Entry>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// TTL the slot was last written with, if any.
    #[must_use]
    pub fn ttl(&self, slot: Slot) -> Option<Duration> {
        self.lock().get(&slot).and_then(|e| e.ttl)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Slot, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, slot: Slot) -> Option<String> {
        self.lock()
            .get(&slot)
            .filter(|e| e.is_live())
            .map(|e| e.value.clone())
    }

    fn set(&self, slot: Slot, value: &str, ttl: Option<Duration>) {
        self.lock().insert(
            slot,
            Entry {
                value: value.to_string(),
                ttl,
                written_at: Instant::now(),
            },
        );
    }

    fn delete(&self, slot: Slot) {
        self.lock().remove(&slot);
    }

    fn clear(&self) {
        self.lock().clear();
    }
}
