//! Configuration for the session store.

use std::time::Duration;

use crate::codec::CodecKind;

/// Default name of the cookie carrying the session identifier.
pub const DEFAULT_COOKIE_NAME: &str = "_session_id";

/// Default key prefix (none - keys are the bare identifiers).
pub const DEFAULT_KEY_PREFIX: &str = "";

/// Default expiry for saved records (none - records never expire).
pub const DEFAULT_EXPIRE_AFTER: Option<Duration> = None;

/// Immutable configuration for a [`SessionStore`](crate::SessionStore).
///
/// Built once at construction. Per-request overrides travel in
/// [`RequestContext`](crate::RequestContext) instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Cookie (or parameter) the host reads the identifier from.
    pub identifier_cookie_name: String,

    /// Prepended to every identifier to form the backend key.
    pub key_prefix: String,

    /// Expiry applied to saves that carry no per-request override.
    pub expire_after: Option<Duration>,

    /// Built-in codec, unless a custom one is given to the builder.
    pub codec: CodecKind,

    /// Redis URL used to build a backend when none is supplied.
    pub redis_url: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            identifier_cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            expire_after: DEFAULT_EXPIRE_AFTER,
            codec: CodecKind::default(),
            redis_url: None,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the identifier cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.identifier_cookie_name = name.into();
        self
    }

    /// Set the backend key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the default expiry for saved records.
    pub fn with_expire_after(mut self, ttl: Duration) -> Self {
        self.expire_after = Some(ttl);
        self
    }

    /// Saved records never expire unless a request overrides it.
    pub fn without_expiry(mut self) -> Self {
        self.expire_after = None;
        self
    }

    /// Select a built-in codec.
    pub fn with_codec(mut self, codec: CodecKind) -> Self {
        self.codec = codec;
        self
    }

    /// Set the Redis URL for the default backend.
    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    /// Backend key for `id`.
    pub fn key_for(&self, id: &str) -> String {
        format!("{}{}", self.key_prefix, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::new();
        assert_eq!(config.identifier_cookie_name, "_session_id");
        assert_eq!(config.key_prefix, "");
        assert_eq!(config.expire_after, None);
        assert_eq!(config.codec, CodecKind::Native);
        assert_eq!(config.key_for("abc"), "abc");
    }

    #[test]
    fn test_builders() {
        let config = StoreConfig::new()
            .with_cookie_name("_app_session")
            .with_key_prefix("app:session:")
            .with_expire_after(Duration::from_secs(120))
            .with_codec(CodecKind::Migrating)
            .with_redis_url("redis://localhost:6379/2");

        assert_eq!(config.identifier_cookie_name, "_app_session");
        assert_eq!(config.key_for("abc"), "app:session:abc");
        assert_eq!(config.expire_after, Some(Duration::from_secs(120)));
        assert_eq!(config.codec, CodecKind::Migrating);
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379/2"));

        assert_eq!(config.without_expiry().expire_after, None);
    }
}
