//! Session record engine: load, save, exists, destroy.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace};

use crate::backend::{Backend, BackendError, BackendResult};
use crate::codec::{DecodeError, SessionCodec};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::id::{IdGenerator, default_generator};
use crate::merge::{self, Resolution};
use crate::policy::{BackendDownHook, DecodeErrorHook, FailurePolicy, Operation};
use crate::record::{RequestContext, Session, SessionRecord};

/// Result of [`SessionStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The record matched its snapshot; the backend was not contacted.
    Unchanged(String),

    /// The record was written under this identifier.
    Written(String),

    /// The backend was unreachable; nothing was persisted.
    Failed,
}

impl SaveOutcome {
    /// Whether the session is safely persisted (or needed no write).
    pub fn is_success(&self) -> bool {
        !matches!(self, SaveOutcome::Failed)
    }

    /// Identifier of the saved session, if the save succeeded.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            SaveOutcome::Unchanged(id) | SaveOutcome::Written(id) => Some(id),
            SaveOutcome::Failed => None,
        }
    }
}

/// Session store backed by a TTL-capable key-value [`Backend`].
///
/// The store provides:
/// - Loading that never fails on an unreachable backend or a corrupt record
///   (both yield a fresh identifier with an empty record)
/// - Saves that skip untouched records and merge with concurrent writers
/// - Conservative existence checks during outages
/// - Pluggable codecs, including in-place migration from the native format
///
/// The store holds no per-request state; every call is a synchronous round
/// trip to the backend. Clones share the backend and hooks.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn Backend>,
    codec: Arc<dyn SessionCodec>,
    policy: FailurePolicy,
    generate_id: IdGenerator,
    config: StoreConfig,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("codec", &self.codec.name())
            .field("policy", &self.policy)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Start building a store from `config`.
    pub fn builder(config: StoreConfig) -> SessionStoreBuilder {
        SessionStoreBuilder::new(config)
    }

    /// Create a store over `backend` with the configured codec and no hooks.
    pub fn new(config: StoreConfig, backend: Arc<dyn Backend>) -> Self {
        Self {
            codec: config.codec.build(),
            backend,
            policy: FailurePolicy::new(),
            generate_id: default_generator(),
            config,
        }
    }

    /// Get the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The active codec.
    pub fn codec(&self) -> &dyn SessionCodec {
        self.codec.as_ref()
    }

    /// Backend key for `id`.
    pub fn key_for(&self, id: &str) -> String {
        self.config.key_for(id)
    }

    /// Replace the backend-down hook.
    pub fn set_on_backend_down<F>(&mut self, hook: F)
    where
        F: Fn(&BackendError, &RequestContext, Option<&str>) + Send + Sync + 'static,
    {
        self.policy.set_on_backend_down(Some(Arc::new(hook)));
    }

    /// Replace the decode-error hook.
    pub fn set_on_decode_error<F>(&mut self, hook: F)
    where
        F: Fn(&DecodeError, &str) + Send + Sync + 'static,
    {
        self.policy.set_on_decode_error(Some(Arc::new(hook)));
    }

    /// Remove both failure hooks.
    pub fn clear_hooks(&mut self) {
        self.policy = FailurePolicy::new();
    }

    /// Load the session for `id`.
    ///
    /// A missing or empty `id`, a missing record, an undecodable record or an
    /// unreachable backend all yield a freshly generated identifier paired
    /// with an empty record. Only backend command errors are returned.
    pub fn load(&self, ctx: &RequestContext, id: Option<&str>) -> Result<Session> {
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            return Ok(self.fresh_session());
        };

        match self.read_record(ctx, id) {
            Ok(Some(record)) => {
                trace!(session_id = %id, keys = record.len(), "Session loaded");
                Ok(Session::loaded(id, record))
            }
            Ok(None) => {
                debug!(session_id = %id, "No stored session, issuing a new identifier");
                Ok(self.fresh_session())
            }
            Err(err) => {
                self.policy.recover(Operation::Load, err, ctx, Some(id))?;
                Ok(self.fresh_session())
            }
        }
    }

    /// Persist `session`.
    ///
    /// Untouched sessions are not written. Otherwise the backend is re-read
    /// and, if another writer changed the record since it was loaded, the
    /// two are merged with this session's keys winning. The expiry is the
    /// request override, else the configured default, else none.
    pub fn save(&self, ctx: &RequestContext, session: &Session) -> Result<SaveOutcome> {
        let id = session.id();
        match self.write_session(ctx, session) {
            Err(Error::Backend(err)) => {
                self.policy.recover(Operation::Save, err, ctx, Some(id))?;
                Ok(SaveOutcome::Failed)
            }
            other => other,
        }
    }

    /// Whether a record is stored for `id`.
    ///
    /// Returns `true` while the backend is unreachable so an outage does not
    /// trigger mass session recreation. A `true` here does not promise the
    /// record can actually be read.
    pub fn exists(&self, ctx: &RequestContext, id: Option<&str>) -> Result<bool> {
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            return Ok(false);
        };

        match self.backend.exists(&self.key_for(id)) {
            Ok(found) => Ok(found),
            Err(err) => {
                self.policy.recover(Operation::Exists, err, ctx, Some(id))?;
                Ok(true)
            }
        }
    }

    /// Delete the record for `id`.
    ///
    /// With `replace` set, returns a new identifier for the session that
    /// follows (logout then new session); otherwise returns `None`. An
    /// unreachable backend is treated as the record being already gone.
    pub fn destroy(&self, ctx: &RequestContext, id: &str, replace: bool) -> Result<Option<String>> {
        self.delete_record(ctx, id)?;
        debug!(session_id = %id, replace, "Session destroyed");

        Ok(replace.then(|| self.new_identifier()))
    }

    /// Destroy the session named by the identifier cookie, if present.
    ///
    /// No replacement identifier is generated.
    pub fn destroy_from_cookies(
        &self,
        ctx: &RequestContext,
        cookies: &HashMap<String, String>,
    ) -> Result<()> {
        if let Some(id) = cookies.get(&self.config.identifier_cookie_name) {
            self.destroy(ctx, id, false)?;
        }
        Ok(())
    }

    /// A new identifier from the configured generator.
    pub fn new_identifier(&self) -> String {
        (self.generate_id)()
    }

    fn fresh_session(&self) -> Session {
        Session::fresh(self.new_identifier())
    }

    /// Read and decode the record for `id`.
    ///
    /// An undecodable record is deleted, reported to the decode hook, and
    /// read as absent.
    fn read_record(&self, ctx: &RequestContext, id: &str) -> BackendResult<Option<SessionRecord>> {
        let Some(bytes) = self.backend.get(&self.key_for(id))? else {
            return Ok(None);
        };

        match self.decode_record(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                // Unsalvageable: drop it so the next request starts clean.
                self.delete_record(ctx, id)?;
                self.policy.decode_failed(&err, id);
                Ok(None)
            }
        }
    }

    /// Delete the record for `id`; an unreachable backend counts as done.
    fn delete_record(&self, ctx: &RequestContext, id: &str) -> BackendResult<()> {
        if let Err(err) = self.backend.delete(&self.key_for(id)) {
            self.policy.recover(Operation::Destroy, err, ctx, Some(id))?;
        }
        Ok(())
    }

    fn decode_record(&self, bytes: &[u8]) -> std::result::Result<SessionRecord, DecodeError> {
        match self.codec.decode(bytes)? {
            Value::Object(record) => Ok(record),
            other => Err(DecodeError::new(
                self.codec.name(),
                format!("expected a map, found {}", json_kind(&other)),
            )),
        }
    }

    fn write_session(&self, ctx: &RequestContext, session: &Session) -> Result<SaveOutcome> {
        let id = session.id();
        let resolution = merge::resolve(session.data(), session.snapshot(), || {
            self.read_record(ctx, id)
        })?;

        let (record, merged) = match resolution {
            Resolution::Unchanged => {
                trace!(session_id = %id, "Session unchanged, skipping write");
                return Ok(SaveOutcome::Unchanged(id.to_string()));
            }
            Resolution::Write { record, merged } => (record, merged),
        };

        if merged {
            debug!(session_id = %id, "Merged with a concurrent write");
        }

        let bytes = self.codec.encode(&Value::Object(record))?;

        let key = self.key_for(id);
        match self.expiry_for(ctx) {
            Some(ttl) => self.backend.set_with_ttl(&key, &bytes, ttl)?,
            None => self.backend.set(&key, &bytes)?,
        }

        debug!(session_id = %id, bytes = bytes.len(), merged, "Session saved");
        Ok(SaveOutcome::Written(id.to_string()))
    }

    fn expiry_for(&self, ctx: &RequestContext) -> Option<Duration> {
        ctx.expire_after.or(self.config.expire_after)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a map",
    }
}

/// Builder for [`SessionStore`].
///
/// Hooks are typed closures, so a hook that cannot be called is rejected
/// at compile time. [`SessionStoreBuilder::build`] reports the remaining
/// configuration problems.
pub struct SessionStoreBuilder {
    config: StoreConfig,
    backend: Option<Arc<dyn Backend>>,
    codec: Option<Arc<dyn SessionCodec>>,
    on_backend_down: Option<BackendDownHook>,
    on_decode_error: Option<DecodeErrorHook>,
    generate_id: Option<IdGenerator>,
}

impl SessionStoreBuilder {
    fn new(config: StoreConfig) -> Self {
        Self {
            config,
            backend: None,
            codec: None,
            on_backend_down: None,
            on_decode_error: None,
            generate_id: None,
        }
    }

    /// Use a pre-built backend client.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use a custom codec instead of the configured built-in one.
    pub fn codec(mut self, codec: Arc<dyn SessionCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Called when the backend is unreachable.
    pub fn on_backend_down<F>(mut self, hook: F) -> Self
    where
        F: Fn(&BackendError, &RequestContext, Option<&str>) + Send + Sync + 'static,
    {
        self.on_backend_down = Some(Arc::new(hook));
        self
    }

    /// Called when a stored record cannot be decoded.
    pub fn on_decode_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DecodeError, &str) + Send + Sync + 'static,
    {
        self.on_decode_error = Some(Arc::new(hook));
        self
    }

    /// Use a custom identifier generator.
    pub fn id_generator<F>(mut self, generate: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.generate_id = Some(Arc::new(generate));
        self
    }

    /// Build the store.
    ///
    /// Without an explicit backend one is opened from `redis_url`, which
    /// requires the `redis` feature.
    pub fn build(self) -> Result<SessionStore> {
        let backend = match self.backend {
            Some(backend) => backend,
            None => default_backend(&self.config)?,
        };

        let mut policy = FailurePolicy::new();
        policy.set_on_backend_down(self.on_backend_down);
        policy.set_on_decode_error(self.on_decode_error);

        let codec = self.codec.unwrap_or_else(|| self.config.codec.build());
        debug!(
            codec = codec.name(),
            key_prefix = %self.config.key_prefix,
            expire_after = ?self.config.expire_after,
            "Session store ready"
        );

        Ok(SessionStore {
            backend,
            codec,
            policy,
            generate_id: self.generate_id.unwrap_or_else(default_generator),
            config: self.config,
        })
    }
}

#[cfg(feature = "redis")]
fn default_backend(config: &StoreConfig) -> Result<Arc<dyn Backend>> {
    let Some(url) = config.redis_url.as_deref() else {
        return Err(Error::Config(
            "no backend client given and no redis_url configured".to_string(),
        ));
    };
    let backend = crate::backend::RedisBackend::open(url)
        .map_err(|e| Error::Config(format!("invalid redis_url '{url}': {e}")))?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "redis"))]
fn default_backend(config: &StoreConfig) -> Result<Arc<dyn Backend>> {
    let reason = if config.redis_url.is_some() {
        "redis_url is set but the `redis` feature is disabled"
    } else {
        "no backend client given"
    };
    Err(Error::Config(reason.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use serde_json::json;

    fn store() -> (SessionStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = SessionStore::new(
            StoreConfig::new().with_key_prefix("test:"),
            backend.clone(),
        );
        (store, backend)
    }

    #[test]
    fn test_load_without_identifier_is_fresh() {
        let (store, backend) = store();
        let ctx = RequestContext::new();

        let a = store.load(&ctx, None).unwrap();
        let b = store.load(&ctx, Some("")).unwrap();

        assert!(a.is_empty() && b.is_empty());
        assert_ne!(a.id(), b.id());
        assert_eq!(backend.stats().reads, 0);
    }

    #[test]
    fn test_load_unknown_identifier_is_not_reused() {
        let (store, _) = store();
        let session = store.load(&RequestContext::new(), Some("stale")).unwrap();

        assert_ne!(session.id(), "stale");
        assert!(session.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let (store, backend) = store();
        let ctx = RequestContext::new();

        let mut session = store.load(&ctx, None).unwrap();
        session.insert("user_id", 7);
        let outcome = store.save(&ctx, &session).unwrap();
        assert_eq!(outcome, SaveOutcome::Written(session.id().to_string()));
        assert!(backend.raw(&format!("test:{}", session.id())).is_some());

        let loaded = store.load(&ctx, Some(session.id())).unwrap();
        assert_eq!(loaded.id(), session.id());
        assert_eq!(loaded.get("user_id"), Some(&json!(7)));
    }

    #[test]
    fn test_fresh_untouched_session_is_not_written() {
        let (store, backend) = store();
        let ctx = RequestContext::new();

        let session = store.load(&ctx, None).unwrap();
        let outcome = store.save(&ctx, &session).unwrap();

        assert!(matches!(outcome, SaveOutcome::Unchanged(_)));
        assert_eq!(backend.stats().writes, 0);
        assert!(backend.is_empty());
    }

    #[test]
    fn test_non_map_payload_is_discarded() {
        let (store, backend) = store();
        backend.insert_raw("test:abc", crate::NativeCodec.encode(&json!([1, 2])).unwrap());

        let session = store.load(&RequestContext::new(), Some("abc")).unwrap();

        assert_ne!(session.id(), "abc");
        assert!(backend.raw("test:abc").is_none());
    }

    #[test]
    fn test_expiry_precedence() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SessionStore::new(
            StoreConfig::new().with_expire_after(Duration::from_secs(60)),
            backend.clone(),
        );

        let mut session = store.load(&RequestContext::new(), None).unwrap();
        session.insert("a", 1);
        store.save(&RequestContext::new(), &session).unwrap();
        let default_ttl = backend.ttl(session.id()).unwrap();
        assert!(default_ttl > Duration::from_secs(50) && default_ttl <= Duration::from_secs(60));

        let ctx = RequestContext::new().with_expire_after(Duration::from_secs(3600));
        let mut session = store.load(&ctx, Some(session.id())).unwrap();
        session.insert("a", 2);
        store.save(&ctx, &session).unwrap();
        let override_ttl = backend.ttl(session.id()).unwrap();
        assert!(override_ttl > Duration::from_secs(3500));
    }

    #[test]
    fn test_exists() {
        let (store, _) = store();
        let ctx = RequestContext::new();

        let mut session = store.load(&ctx, None).unwrap();
        assert!(!store.exists(&ctx, Some(session.id())).unwrap());

        session.insert("a", 1);
        store.save(&ctx, &session).unwrap();

        assert!(store.exists(&ctx, Some(session.id())).unwrap());
        assert!(!store.exists(&ctx, Some("")).unwrap());
        assert!(!store.exists(&ctx, None).unwrap());
    }

    #[test]
    fn test_destroy_from_cookies() {
        let (store, backend) = store();
        let ctx = RequestContext::new();

        let mut session = store.load(&ctx, None).unwrap();
        session.insert("a", 1);
        store.save(&ctx, &session).unwrap();

        let mut cookies = HashMap::new();
        cookies.insert("other".to_string(), "x".to_string());
        store.destroy_from_cookies(&ctx, &cookies).unwrap();
        assert_eq!(backend.len(), 1);

        cookies.insert("_session_id".to_string(), session.id().to_string());
        store.destroy_from_cookies(&ctx, &cookies).unwrap();
        assert!(backend.is_empty());
    }

    #[test]
    fn test_outage_outcome_per_operation() {
        let (store, backend) = store();
        let ctx = RequestContext::new();

        let mut session = store.load(&ctx, None).unwrap();
        session.insert("a", 1);
        store.save(&ctx, &session).unwrap();
        let id = session.id().to_string();
        backend.set_offline(true);

        let loaded = store.load(&ctx, Some(&id)).unwrap();
        assert_ne!(loaded.id(), id);
        assert!(loaded.is_empty());

        session.insert("b", 2);
        assert_eq!(store.save(&ctx, &session).unwrap(), SaveOutcome::Failed);
        assert!(store.exists(&ctx, Some(&id)).unwrap());
        assert_eq!(store.destroy(&ctx, &id, false).unwrap(), None);

        backend.set_offline(false);
        assert_eq!(backend.len(), 1, "nothing was written or deleted while offline");
    }

    #[test]
    fn test_build_without_backend_is_config_error() {
        let result = SessionStore::builder(StoreConfig::new()).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_uses_custom_generator() {
        let store = SessionStore::builder(StoreConfig::new())
            .backend(Arc::new(MemoryBackend::new()))
            .id_generator(|| "fixed".to_string())
            .build()
            .unwrap();

        assert_eq!(store.load(&RequestContext::new(), None).unwrap().id(), "fixed");
    }

    #[test]
    fn test_save_outcome_accessors() {
        assert!(SaveOutcome::Unchanged("a".into()).is_success());
        assert_eq!(SaveOutcome::Written("a".into()).identifier(), Some("a"));
        assert!(!SaveOutcome::Failed.is_success());
        assert_eq!(SaveOutcome::Failed.identifier(), None);
    }
}
