//! Backend failure handling.
//!
//! Connectivity failures are never returned to callers. The policy notifies
//! the optional `on_backend_down` hook and lets the store substitute the safe
//! outcome of the operation that failed:
//!
//! | operation | outcome                                 |
//! |-----------|-----------------------------------------|
//! | load      | fresh identifier with an empty record   |
//! | save      | [`SaveOutcome::Failed`], nothing stored |
//! | exists    | `true`                                  |
//! | destroy   | nothing; the record counts as gone      |
//!
//! Any other backend error is handed back untouched so the store can
//! propagate it.
//!
//! Decode failures go through [`FailurePolicy::decode_failed`], which only
//! notifies; discarding the record is the store's job.
//!
//! [`SaveOutcome::Failed`]: crate::SaveOutcome::Failed

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::backend::BackendError;
use crate::codec::DecodeError;
use crate::record::RequestContext;

/// Called with the error, the request context and the identifier in play
/// when the backend is unreachable. Purely observational.
pub type BackendDownHook = Arc<dyn Fn(&BackendError, &RequestContext, Option<&str>) + Send + Sync>;

/// Called with the error and the identifier whose stored bytes could not be
/// decoded. Purely observational.
pub type DecodeErrorHook = Arc<dyn Fn(&DecodeError, &str) + Send + Sync>;

/// The store operation a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    Save,
    Exists,
    Destroy,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Load => write!(f, "load"),
            Operation::Save => write!(f, "save"),
            Operation::Exists => write!(f, "exists"),
            Operation::Destroy => write!(f, "destroy"),
        }
    }
}

/// Failure hooks plus the recover-or-propagate decision.
#[derive(Clone, Default)]
pub struct FailurePolicy {
    on_backend_down: Option<BackendDownHook>,
    on_decode_error: Option<DecodeErrorHook>,
}

impl fmt::Debug for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailurePolicy")
            .field("on_backend_down", &self.on_backend_down.is_some())
            .field("on_decode_error", &self.on_decode_error.is_some())
            .finish()
    }
}

impl FailurePolicy {
    /// A policy with no hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear the backend-down hook.
    pub fn set_on_backend_down(&mut self, hook: Option<BackendDownHook>) {
        self.on_backend_down = hook;
    }

    /// Set or clear the decode-error hook.
    pub fn set_on_decode_error(&mut self, hook: Option<DecodeErrorHook>) {
        self.on_decode_error = hook;
    }

    /// Whether a backend-down hook is registered.
    pub fn has_backend_down_hook(&self) -> bool {
        self.on_backend_down.is_some()
    }

    /// Whether a decode-error hook is registered.
    pub fn has_decode_error_hook(&self) -> bool {
        self.on_decode_error.is_some()
    }

    /// Classify `err` raised during `op`.
    ///
    /// Connectivity errors are logged, reported to the hook and swallowed;
    /// anything else is returned as `Err` for the caller to propagate.
    pub fn recover(
        &self,
        op: Operation,
        err: BackendError,
        ctx: &RequestContext,
        id: Option<&str>,
    ) -> Result<(), BackendError> {
        if !err.is_connectivity() {
            return Err(err);
        }

        warn!(
            operation = %op,
            session_id = id.unwrap_or(""),
            error = %err,
            "Session backend unreachable, falling back"
        );
        if let Some(hook) = &self.on_backend_down {
            hook(&err, ctx, id);
        }
        Ok(())
    }

    /// Report that the record stored for `id` could not be decoded.
    pub fn decode_failed(&self, err: &DecodeError, id: &str) {
        warn!(session_id = %id, error = %err, "Discarding undecodable session record");
        if let Some(hook) = &self.on_decode_error {
            hook(err, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_connectivity_error_notifies_hook() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut policy = FailurePolicy::new();
        policy.set_on_backend_down(Some(Arc::new(
            move |err: &BackendError, ctx: &RequestContext, id: Option<&str>| {
                sink.lock().push((
                    err.clone(),
                    ctx.metadata.get("path").cloned(),
                    id.map(str::to_string),
                ));
            },
        )));

        let ctx = RequestContext::new().with_metadata("path", "/login");
        let err = BackendError::Unreachable("connection refused".into());
        policy
            .recover(Operation::Save, err.clone(), &ctx, Some("abc"))
            .unwrap();

        assert_eq!(
            *seen.lock(),
            vec![(err, Some("/login".to_string()), Some("abc".to_string()))]
        );
    }

    #[test]
    fn test_command_error_is_not_recovered() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);

        let mut policy = FailurePolicy::new();
        policy.set_on_backend_down(Some(Arc::new(
            move |_: &BackendError, _: &RequestContext, _: Option<&str>| *counter.lock() += 1,
        )));

        let err = BackendError::Command("WRONGTYPE".into());
        let result = policy.recover(Operation::Load, err.clone(), &RequestContext::new(), None);

        assert_eq!(result, Err(err));
        assert_eq!(*calls.lock(), 0);
    }

    #[test]
    fn test_recover_without_hook() {
        let policy = FailurePolicy::new();
        let err = BackendError::Unreachable("timed out".into());

        let result = policy.recover(Operation::Exists, err, &RequestContext::new(), Some("abc"));
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_decode_failed_notifies_hook() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut policy = FailurePolicy::new();
        policy.set_on_decode_error(Some(Arc::new(move |err: &DecodeError, id: &str| {
            sink.lock().push((err.codec.clone(), id.to_string()));
        })));

        policy.decode_failed(&DecodeError::new("json", "eof"), "abc");

        assert_eq!(*seen.lock(), vec![("json".to_string(), "abc".to_string())]);
    }
}
