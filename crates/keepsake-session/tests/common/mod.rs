//! Shared fixtures for session store integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use keepsake_session::{
    Backend, BackendError, BackendResult, CodecKind, MemoryBackend, SessionStore, StoreConfig,
};
use parking_lot::Mutex;

pub const PREFIX: &str = "test:session:";

/// One backend-down hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDownCall {
    pub error: BackendError,
    pub request_id: Option<String>,
    pub session_id: Option<String>,
}

/// One decode-error hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeErrorCall {
    pub codec: String,
    pub session_id: String,
}

/// Collects hook invocations.
#[derive(Debug, Default)]
pub struct Recorder {
    pub backend_down: Mutex<Vec<BackendDownCall>>,
    pub decode_errors: Mutex<Vec<DecodeErrorCall>>,
}

impl Recorder {
    pub fn backend_down_calls(&self) -> Vec<BackendDownCall> {
        self.backend_down.lock().clone()
    }

    pub fn decode_error_calls(&self) -> Vec<DecodeErrorCall> {
        self.decode_errors.lock().clone()
    }
}

/// Store over `backend` with both hooks wired into a fresh [`Recorder`].
pub fn recording_store(
    backend: Arc<dyn Backend>,
    codec: CodecKind,
) -> (SessionStore, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let down = Arc::clone(&recorder);
    let decode = Arc::clone(&recorder);

    let store = SessionStore::builder(
        StoreConfig::new()
            .with_key_prefix(PREFIX)
            .with_codec(codec),
    )
    .backend(backend)
    .on_backend_down(move |err, ctx, id| {
        down.backend_down.lock().push(BackendDownCall {
            error: err.clone(),
            request_id: ctx.metadata.get("request_id").cloned(),
            session_id: id.map(str::to_string),
        });
    })
    .on_decode_error(move |err, id| {
        decode.decode_errors.lock().push(DecodeErrorCall {
            codec: err.codec.clone(),
            session_id: id.to_string(),
        });
    })
    .build()
    .expect("store should build with an explicit backend");

    (store, recorder)
}

/// Memory backend plus a recording store over it.
pub fn memory_store(codec: CodecKind) -> (SessionStore, Arc<MemoryBackend>, Arc<Recorder>) {
    let backend = Arc::new(MemoryBackend::new());
    let (store, recorder) = recording_store(backend.clone(), codec);
    (store, backend, recorder)
}

/// Backend whose every call is rejected by the server.
#[derive(Debug, Default)]
pub struct RejectingBackend;

impl RejectingBackend {
    fn reject<T>() -> BackendResult<T> {
        Err(BackendError::Command(
            "WRONGTYPE Operation against a key holding the wrong kind of value".to_string(),
        ))
    }
}

impl Backend for RejectingBackend {
    fn exists(&self, _key: &str) -> BackendResult<bool> {
        Self::reject()
    }

    fn get(&self, _key: &str) -> BackendResult<Option<Vec<u8>>> {
        Self::reject()
    }

    fn set(&self, _key: &str, _value: &[u8]) -> BackendResult<()> {
        Self::reject()
    }

    fn set_with_ttl(&self, _key: &str, _value: &[u8], _ttl: Duration) -> BackendResult<()> {
        Self::reject()
    }

    fn delete(&self, _key: &str) -> BackendResult<()> {
        Self::reject()
    }
}

/// Backend that goes offline right before the first write.
///
/// Models an outage that starts between a request's re-read and its write.
#[derive(Debug, Default)]
pub struct DropsOnWrite {
    pub inner: MemoryBackend,
}

impl Backend for DropsOnWrite {
    fn exists(&self, key: &str) -> BackendResult<bool> {
        self.inner.exists(key)
    }

    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> BackendResult<()> {
        self.inner.set_offline(true);
        self.inner.set(key, value)
    }

    fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> BackendResult<()> {
        self.inner.set_offline(true);
        self.inner.set_with_ttl(key, value, ttl)
    }

    fn delete(&self, key: &str) -> BackendResult<()> {
        self.inner.delete(key)
    }
}
