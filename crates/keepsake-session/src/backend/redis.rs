//! Redis-backed [`Backend`].

use std::time::Duration;

use redis::{Commands, Connection, RedisError};
use tracing::trace;

use super::{Backend, BackendError, BackendResult};

impl From<RedisError> for BackendError {
    fn from(err: RedisError) -> Self {
        if err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
            || err.is_io_error()
        {
            BackendError::Unreachable(err.to_string())
        } else {
            BackendError::Command(err.to_string())
        }
    }
}

/// [`Backend`] talking to a Redis server.
///
/// Every call opens its own connection, so concurrent requests never queue
/// behind one another and the first call after an outage simply reconnects.
pub struct RedisBackend {
    client: redis::Client,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("addr", &self.client.get_connection_info().addr)
            .finish_non_exhaustive()
    }
}

impl RedisBackend {
    /// Build a client for `url` (e.g. `redis://127.0.0.1:6379/0`).
    ///
    /// Only the URL is validated here; no connection is made.
    pub fn open(url: &str) -> BackendResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self::from_client(client))
    }

    /// Wrap an already configured client.
    pub fn from_client(client: redis::Client) -> Self {
        Self { client }
    }

    fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> redis::RedisResult<T>,
    ) -> BackendResult<T> {
        let mut conn = self.client.get_connection()?;
        Ok(f(&mut conn)?)
    }
}

impl Backend for RedisBackend {
    fn exists(&self, key: &str) -> BackendResult<bool> {
        trace!(key = %key, "EXISTS");
        self.with_connection(|conn| conn.exists(key))
    }

    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        trace!(key = %key, "GET");
        self.with_connection(|conn| conn.get(key))
    }

    fn set(&self, key: &str, value: &[u8]) -> BackendResult<()> {
        trace!(key = %key, bytes = value.len(), "SET");
        self.with_connection(|conn| conn.set(key, value))
    }

    fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> BackendResult<()> {
        let millis = ttl_millis(ttl);
        trace!(key = %key, bytes = value.len(), millis, "PSETEX");
        self.with_connection(|conn| conn.pset_ex(key, value, millis))
    }

    fn delete(&self, key: &str) -> BackendResult<()> {
        trace!(key = %key, "DEL");
        self.with_connection(|conn| conn.del(key))
    }
}

/// `PSETEX` expiry for `ttl`: whole milliseconds, rounded up, at least one.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_nanos().div_ceil(1_000_000))
        .unwrap_or(u64::MAX)
        .max(1)
}
