//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [session]
//! cookie_name = "_myapp_session"
//! key_prefix = "myapp:session:"
//! expire_after_secs = 7200
//! codec = "migrating"
//!
//! [redis]
//! url = "redis://127.0.0.1:6379/0"
//!
//! [logging]
//! filter = "keepsake=debug"
//! ```

use std::time::Duration;

use keepsake_session::{CodecKind, StoreConfig};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeepsakeConfig {
    /// Session store settings.
    pub session: Option<SessionSection>,

    /// Redis connection settings.
    pub redis: Option<RedisSection>,

    /// Logging settings.
    pub logging: Option<LoggingSection>,
}

impl KeepsakeConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: KeepsakeConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections merge field by field, so a project file can override just
    /// the key prefix of a user-level session section.
    pub fn merge(&mut self, other: KeepsakeConfig) {
        if let Some(session) = other.session {
            match &mut self.session {
                Some(existing) => existing.merge(session),
                None => self.session = Some(session),
            }
        }

        if let Some(redis) = other.redis {
            match &mut self.redis {
                Some(existing) => {
                    if redis.url.is_some() {
                        existing.url = redis.url;
                    }
                }
                None => self.redis = Some(redis),
            }
        }

        if let Some(logging) = other.logging {
            match &mut self.logging {
                Some(existing) => {
                    if logging.filter.is_some() {
                        existing.filter = logging.filter;
                    }
                }
                None => self.logging = Some(logging),
            }
        }
    }

    /// Reject values that parse but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if let Some(session) = &self.session {
            if session.expire_after_secs == Some(0) {
                return Err(ConfigError::Invalid {
                    field: "session.expire_after_secs".to_string(),
                    reason: "must be greater than zero (omit it for no expiry)".to_string(),
                });
            }
            if session.cookie_name.as_deref().is_some_and(str::is_empty) {
                return Err(ConfigError::Invalid {
                    field: "session.cookie_name".to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Build the engine configuration, filling unset fields with defaults.
    pub fn store_config(&self) -> StoreConfig {
        let mut config = StoreConfig::new();

        if let Some(session) = &self.session {
            if let Some(name) = &session.cookie_name {
                config = config.with_cookie_name(name.clone());
            }
            if let Some(prefix) = &session.key_prefix {
                config = config.with_key_prefix(prefix.clone());
            }
            if let Some(ttl) = session.expire_after() {
                config = config.with_expire_after(ttl);
            }
            if let Some(codec) = session.codec {
                config = config.with_codec(codec);
            }
        }

        if let Some(url) = self.redis.as_ref().and_then(|r| r.url.clone()) {
            config = config.with_redis_url(url);
        }

        config
    }

    /// The configured log filter, if any.
    pub fn log_filter(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.filter.as_deref())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// The `[session]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSection {
    /// Cookie carrying the session identifier.
    pub cookie_name: Option<String>,

    /// Prefix prepended to every backend key.
    pub key_prefix: Option<String>,

    /// Default record expiry in seconds; omit for no expiry.
    pub expire_after_secs: Option<u64>,

    /// Codec: `native`, `json` or `migrating`.
    pub codec: Option<CodecKind>,
}

impl SessionSection {
    /// Default expiry as a duration.
    pub fn expire_after(&self) -> Option<Duration> {
        self.expire_after_secs.map(Duration::from_secs)
    }

    fn merge(&mut self, other: SessionSection) {
        if other.cookie_name.is_some() {
            self.cookie_name = other.cookie_name;
        }
        if other.key_prefix.is_some() {
            self.key_prefix = other.key_prefix;
        }
        if other.expire_after_secs.is_some() {
            self.expire_after_secs = other.expire_after_secs;
        }
        if other.codec.is_some() {
            self.codec = other.codec;
        }
    }
}

/// The `[redis]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedisSection {
    /// Connection URL, e.g. `redis://127.0.0.1:6379/0`.
    pub url: Option<String>,
}

/// The `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// `tracing` filter directive, e.g. `keepsake=debug,warn`.
    pub filter: Option<String>,
}
