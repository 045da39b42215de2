//! Engine types
//!
//! Options passed through to engines and configuration for the in-memory
//! engine.

use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};

/// Engine-specific options passed through to every `find` call
///
/// The stitcher never interprets these. The Parse engine understands
/// `useMasterKey` and `sessionToken`; other engines may ignore them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindOptions(JsonObject);

impl FindOptions {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Get an option
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Whether the caller asked for master-key access
    pub fn use_master_key(&self) -> bool {
        self.0
            .get("useMasterKey")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
    }

    /// Session token to act as, if any
    pub fn session_token(&self) -> Option<&str> {
        self.0.get("sessionToken").and_then(JsonValue::as_str)
    }

    /// Check if no options are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the raw option map
    pub fn as_object(&self) -> &JsonObject {
        &self.0
    }
}

impl From<JsonObject> for FindOptions {
    fn from(map: JsonObject) -> Self {
        Self(map)
    }
}

/// Limits enforced by [`MemoryEngine`](super::MemoryEngine)
///
/// Defaults mirror a stock Parse server: 100 results when no limit is
/// given, at most 1000 per request, and no skip ceiling.
#[derive(Debug, Clone)]
pub struct MemoryEngineConfig {
    /// Limit applied when the query sets none
    pub default_limit: usize,
    /// Larger limits are clamped to this
    pub max_limit: usize,
    /// Skips beyond this fail the request
    pub max_skip: Option<usize>,
}

impl Default for MemoryEngineConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 1000,
            max_skip: None,
        }
    }
}

impl MemoryEngineConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-request limit ceiling
    #[must_use]
    pub fn with_max_limit(mut self, max_limit: usize) -> Self {
        self.max_limit = max_limit;
        self
    }

    /// Set the skip ceiling
    #[must_use]
    pub fn with_max_skip(mut self, max_skip: usize) -> Self {
        self.max_skip = Some(max_skip);
        self
    }
}
