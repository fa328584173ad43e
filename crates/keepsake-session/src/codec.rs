//! Encoding of session values to and from bytes.
//!
//! Three codecs ship with the crate:
//!
//! - [`NativeCodec`]: a two-byte signature followed by a MessagePack body.
//! - [`JsonCodec`]: plain JSON; any top-level JSON value is accepted.
//! - [`MigratingCodec`]: writes JSON, but reads both JSON and native
//!   payloads, so records written by [`NativeCodec`] are rewritten as JSON
//!   the next time they are saved.
//!
//! Custom formats implement [`SessionCodec`] and are handed to the store
//! builder directly.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Leading bytes of every [`NativeCodec`] payload.
pub const NATIVE_SIGNATURE: [u8; 2] = [0x04, 0x08];

/// Stored bytes could not be turned back into a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{codec}: {message}")]
pub struct DecodeError {
    /// Name of the codec that failed.
    pub codec: String,
    /// What went wrong.
    pub message: String,
}

impl DecodeError {
    pub fn new(codec: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            codec: codec.into(),
            message: message.into(),
        }
    }
}

/// A value could not be turned into bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{codec}: {message}")]
pub struct EncodeError {
    /// Name of the codec that failed.
    pub codec: String,
    /// What went wrong.
    pub message: String,
}

impl EncodeError {
    pub fn new(codec: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            codec: codec.into(),
            message: message.into(),
        }
    }
}

/// Encode/decode pair for persisting session values.
pub trait SessionCodec: Send + Sync + fmt::Debug {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Serialize `value` to bytes.
    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError>;

    /// Parse bytes produced by [`SessionCodec::encode`] (or a format this
    /// codec knows how to migrate from).
    fn decode(&self, bytes: &[u8]) -> Result<Value, DecodeError>;
}

/// Self-describing binary format: [`NATIVE_SIGNATURE`] + MessagePack.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCodec;

impl NativeCodec {
    /// Whether `bytes` start with the native signature.
    pub fn is_native(bytes: &[u8]) -> bool {
        bytes.starts_with(&NATIVE_SIGNATURE)
    }
}

impl SessionCodec for NativeCodec {
    fn name(&self) -> &str {
        "native"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        let mut out = NATIVE_SIGNATURE.to_vec();
        rmp_serde::encode::write(&mut out, value)
            .map_err(|e| EncodeError::new(self.name(), e.to_string()))?;
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, DecodeError> {
        let Some(body) = bytes.strip_prefix(&NATIVE_SIGNATURE) else {
            return Err(DecodeError::new(self.name(), "missing format signature"));
        };
        rmp_serde::from_slice(body).map_err(|e| DecodeError::new(self.name(), e.to_string()))
    }
}

/// JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl SessionCodec for JsonCodec {
    fn name(&self) -> &str {
        "json"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        serde_json::to_vec(value).map_err(|e| EncodeError::new(self.name(), e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, DecodeError> {
        serde_json::from_slice(bytes).map_err(|e| DecodeError::new(self.name(), e.to_string()))
    }
}

/// JSON on write; native or JSON on read.
///
/// Detection is a prefix check on [`NATIVE_SIGNATURE`] made before any JSON
/// parsing. JSON text never starts with `0x04`, so the two cannot collide.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigratingCodec;

impl SessionCodec for MigratingCodec {
    fn name(&self) -> &str {
        "migrating"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        JsonCodec.encode(value)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, DecodeError> {
        if NativeCodec::is_native(bytes) {
            tracing::debug!("Native payload detected, migrating to JSON");
            NativeCodec.decode(bytes)
        } else {
            JsonCodec.decode(bytes)
        }
    }
}

/// Built-in codec selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// [`NativeCodec`].
    #[default]
    #[serde(alias = "marshal")]
    Native,
    /// [`JsonCodec`].
    #[serde(alias = "structured-text")]
    Json,
    /// [`MigratingCodec`].
    #[serde(alias = "hybrid")]
    Migrating,
}

impl CodecKind {
    /// Instantiate the codec this kind names.
    pub fn build(self) -> Arc<dyn SessionCodec> {
        match self {
            CodecKind::Native => Arc::new(NativeCodec),
            CodecKind::Json => Arc::new(JsonCodec),
            CodecKind::Migrating => Arc::new(MigratingCodec),
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecKind::Native => write!(f, "native"),
            CodecKind::Json => write!(f, "json"),
            CodecKind::Migrating => write!(f, "migrating"),
        }
    }
}

/// Unrecognised codec name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown codec '{0}' (expected native, json or migrating)")]
pub struct UnknownCodec(pub String);

impl FromStr for CodecKind {
    type Err = UnknownCodec;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "marshal" => Ok(CodecKind::Native),
            "json" | "structured-text" => Ok(CodecKind::Json),
            "migrating" | "hybrid" => Ok(CodecKind::Migrating),
            _ => Err(UnknownCodec(s.to_string())),
        }
    }
}
