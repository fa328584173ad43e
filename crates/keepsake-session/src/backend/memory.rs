//! Process-local backend with per-key TTL.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

use super::{Backend, BackendError, BackendResult};

/// Stored value plus its expiry deadline.
#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, Entry>,
    stats: BackendStats,
    offline: bool,
}

impl MemoryInner {
    /// Fail every call while the backend is switched offline.
    fn check_online(&self) -> BackendResult<()> {
        if self.offline {
            Err(BackendError::Unreachable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    /// Drop `key` if its TTL has run out.
    fn expire(&mut self, key: &str) {
        let now = Instant::now();
        if self.entries.get(key).is_some_and(|e| e.is_expired(now)) {
            trace!(key = %key, "Expired key dropped");
            self.entries.remove(key);
        }
    }
}

/// Counters for calls served by a [`MemoryBackend`].
///
/// Calls rejected while offline are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// `get` calls.
    pub reads: usize,

    /// `set` and `set_with_ttl` calls.
    pub writes: usize,

    /// `delete` calls.
    pub deletes: usize,

    /// `exists` calls.
    pub exists_checks: usize,
}

/// In-memory [`Backend`] with lazy TTL expiry.
///
/// Useful for tests, single-process deployments and rehearsing outages via
/// [`MemoryBackend::set_offline`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<MemoryInner>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the backend becoming unreachable (or recovering).
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    /// Whether the backend is currently simulating an outage.
    pub fn is_offline(&self) -> bool {
        self.inner.lock().offline
    }

    /// Snapshot of the call counters.
    pub fn stats(&self) -> BackendStats {
        self.inner.lock().stats
    }

    /// Reset the call counters.
    pub fn reset_stats(&self) {
        self.inner.lock().stats = BackendStats::default();
    }

    /// Read the raw bytes at `key` without touching the counters.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock();
        inner.expire(key);
        inner.entries.get(key).map(|e| e.value.clone())
    }

    /// Store raw bytes at `key` without touching the counters.
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.inner.lock().entries.insert(
            key.into(),
            Entry {
                value: value.into(),
                expires_at: None,
            },
        );
    }

    /// Remaining time to live for `key`, if it has one.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let mut inner = self.inner.lock();
        inner.expire(key);
        inner
            .entries
            .get(key)
            .and_then(|e| e.expires_at)
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let inner = self.inner.lock();
        inner.entries.values().filter(|e| !e.is_expired(now)).count()
    }

    /// Whether no live keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every expired key and return how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, e| !e.is_expired(now));
        before - inner.entries.len()
    }

    fn store(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> BackendResult<()> {
        let mut inner = self.inner.lock();
        inner.check_online()?;
        inner.stats.writes += 1;
        trace!(key = %key, bytes = value.len(), ttl = ?ttl, "SET");
        // A deadline past what `Instant` can represent never arrives.
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }
}

impl Backend for MemoryBackend {
    fn exists(&self, key: &str) -> BackendResult<bool> {
        let mut inner = self.inner.lock();
        inner.check_online()?;
        inner.stats.exists_checks += 1;
        inner.expire(key);
        Ok(inner.entries.contains_key(key))
    }

    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        let mut inner = self.inner.lock();
        inner.check_online()?;
        inner.stats.reads += 1;
        inner.expire(key);
        trace!(key = %key, "GET");
        Ok(inner.entries.get(key).map(|e| e.value.clone()))
    }

    fn set(&self, key: &str, value: &[u8]) -> BackendResult<()> {
        self.store(key, value, None)
    }

    fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> BackendResult<()> {
        self.store(key, value, Some(ttl))
    }

    fn delete(&self, key: &str) -> BackendResult<()> {
        let mut inner = self.inner.lock();
        inner.check_online()?;
        inner.stats.deletes += 1;
        trace!(key = %key, "DEL");
        inner.entries.remove(key);
        Ok(())
    }
}
