//! Storage - Opaque node-local payloads
//!
//! A node may keep configuration next to the graph topology (a constant's
//! value, an easing curve name, a format string). The runtime never looks
//! inside; it carries the payload through save and restore unchanged.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors converting a storage payload to or from a concrete type
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage payload does not match the requested type: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage payload is not UTF-8 text")]
    NotText,
}

/// Tagged, serializable node payload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum Storage {
    /// Structured document
    Json(serde_json::Value),
    /// Plain text
    Text(String),
    /// Raw bytes, base64 encoded when persisted
    Bytes(#[serde(with = "base64_bytes")] Vec<u8>),
}

impl Storage {
    /// Store any serializable value as a JSON document
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self, StorageError> {
        Ok(Storage::Json(serde_json::to_value(value)?))
    }

    /// Read the payload back as `T`
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, StorageError> {
        match self {
            Storage::Json(value) => Ok(T::deserialize(value)?),
            Storage::Text(text) => Ok(serde_json::from_str(text)?),
            Storage::Bytes(bytes) => Ok(serde_json::from_slice(bytes)?),
        }
    }

    /// Get the payload as text, if it is text or UTF-8 bytes
    pub fn as_text(&self) -> Result<&str, StorageError> {
        match self {
            Storage::Text(text) => Ok(text),
            Storage::Bytes(bytes) => std::str::from_utf8(bytes).map_err(|_| StorageError::NotText),
            Storage::Json(serde_json::Value::String(text)) => Ok(text),
            Storage::Json(_) => Err(StorageError::NotText),
        }
    }

    /// Name of the payload kind
    pub fn kind(&self) -> &'static str {
        match self {
            Storage::Json(_) => "json",
            Storage::Text(_) => "text",
            Storage::Bytes(_) => "bytes",
        }
    }
}

impl From<String> for Storage {
    fn from(text: String) -> Self {
        Storage::Text(text)
    }
}

impl From<&str> for Storage {
    fn from(text: &str) -> Self {
        Storage::Text(text.to_string())
    }
}

mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}
