//! Session records persisted in a TTL-capable key-value store.
//!
//! This crate provides the session lifecycle for web-style hosts:
//! - Load, save, existence check and destroy against a pluggable [`Backend`]
//! - Save-time merging so concurrent requests don't clobber each other's keys
//! - Untouched sessions are never rewritten
//! - Pluggable codecs, including one that migrates native records to JSON
//! - Outage and corruption fallbacks that hand out fresh sessions instead of
//!   failing the request
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use keepsake_session::{
//!     CodecKind, MemoryBackend, RequestContext, SessionStore, StoreConfig,
//! };
//!
//! let config = StoreConfig::new()
//!     .with_key_prefix("myapp:session:")
//!     .with_expire_after(Duration::from_secs(7200))
//!     .with_codec(CodecKind::Migrating);
//!
//! let store = SessionStore::builder(config)
//!     .backend(Arc::new(MemoryBackend::new()))
//!     .on_backend_down(|err, _ctx, id| eprintln!("session backend down for {id:?}: {err}"))
//!     .build()?;
//!
//! let ctx = RequestContext::new();
//! let mut session = store.load(&ctx, None)?;
//! session.insert("user_id", 42);
//! assert!(store.save(&ctx, &session)?.is_success());
//! # Ok::<(), keepsake_session::Error>(())
//! ```

pub mod backend;
mod codec;
mod config;
mod error;
mod id;
pub mod merge;
mod policy;
mod record;
mod store;

pub use backend::{Backend, BackendError, BackendResult, BackendStats, MemoryBackend};
#[cfg(feature = "redis")]
pub use backend::RedisBackend;
pub use codec::{
    CodecKind, DecodeError, EncodeError, JsonCodec, MigratingCodec, NATIVE_SIGNATURE, NativeCodec,
    SessionCodec, UnknownCodec,
};
pub use config::{DEFAULT_COOKIE_NAME, DEFAULT_EXPIRE_AFTER, DEFAULT_KEY_PREFIX, StoreConfig};
pub use error::{Error, Result};
pub use id::{IdGenerator, default_generator, generate_identifier};
pub use policy::{BackendDownHook, DecodeErrorHook, FailurePolicy, Operation};
pub use record::{RequestContext, Session, SessionRecord, SessionSnapshot};
pub use store::{SaveOutcome, SessionStore, SessionStoreBuilder};
