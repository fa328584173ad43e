//! Session records, snapshots and per-request context.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

/// One visitor's session state: string keys mapped to JSON-like values.
pub type SessionRecord = Map<String, Value>;

/// A record as it was when loaded.
///
/// Cheap to clone and immutable once captured. Used as the merge baseline
/// at save time and never persisted itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot(Arc<SessionRecord>);

impl SessionSnapshot {
    /// Capture `record`.
    pub fn capture(record: &SessionRecord) -> Self {
        Self(Arc::new(record.clone()))
    }

    /// The captured record.
    pub fn record(&self) -> &SessionRecord {
        &self.0
    }
}

impl Deref for SessionSnapshot {
    type Target = SessionRecord;

    fn deref(&self) -> &SessionRecord {
        &self.0
    }
}

/// A loaded session: identifier, live record and its load-time snapshot.
///
/// Request handlers mutate the live record through [`Session::insert`],
/// [`Session::remove`] or [`Session::data_mut`]; the snapshot stays as it
/// was so the store can tell what changed.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    data: SessionRecord,
    snapshot: SessionSnapshot,
}

impl Session {
    /// A session that was found in the backend.
    pub fn loaded(id: impl Into<String>, data: SessionRecord) -> Self {
        let snapshot = SessionSnapshot::capture(&data);
        Self {
            id: id.into(),
            data,
            snapshot,
        }
    }

    /// An empty session under a new identifier.
    pub fn fresh(id: impl Into<String>) -> Self {
        Self::loaded(id, SessionRecord::new())
    }

    /// The session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The live record.
    pub fn data(&self) -> &SessionRecord {
        &self.data
    }

    /// Mutable access to the live record.
    pub fn data_mut(&mut self) -> &mut SessionRecord {
        &mut self.data
    }

    /// The record as loaded.
    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    /// Look up a value in the live record.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Set a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }

    /// Remove a value, returning it.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Empty the live record.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Whether the live record differs from the snapshot.
    pub fn is_modified(&self) -> bool {
        self.data != *self.snapshot.record()
    }

    /// Whether the live record is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Split into identifier and live record.
    pub fn into_parts(self) -> (String, SessionRecord) {
        (self.id, self.data)
    }
}

/// Per-request data supplied by the host framework.
///
/// Carries the TTL override for saves and whatever request metadata the
/// host wants passed to the backend-down hook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Overrides the store's configured expiry for saves in this request.
    pub expire_after: Option<Duration>,

    /// Free-form request attributes (request id, path, remote address...).
    pub metadata: BTreeMap<String, String>,
}

impl RequestContext {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-request expiry override.
    pub fn with_expire_after(mut self, ttl: Duration) -> Self {
        self.expire_after = Some(ttl);
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
