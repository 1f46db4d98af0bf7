// record.rs — The record shape accepted by emission sinks.
//
// Mirrors a structured log record: an identifier, a timestamp, the logger
// scope that produced it, and a flat attributes map from string keys to
// JSON values. Page-view fields live under the `event.*` keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ATTR_EVENT_DOMAIN: &str = "event.domain";
pub const ATTR_EVENT_NAME: &str = "event.name";
pub const ATTR_EVENT_TYPE: &str = "event.type";
pub const ATTR_EVENT_DATA: &str = "event.data";

/// A single record handed to an [`crate::EmissionSink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Unique identifier for this record.
    pub record_id: Uuid,

    /// When the described occurrence happened (UTC).
    pub timestamp: DateTime<Utc>,

    /// Name of the logger that emitted the record, if stamped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl LogRecord {
    /// Create an empty record stamped with the current time.
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create an empty record with an explicit timestamp.
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            timestamp,
            scope: None,
            attributes: serde_json::Map::new(),
        }
    }

    /// Set one attribute and return self (builder pattern).
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Set the logger scope and return self.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    /// The `event.type` attribute as an integer, if present.
    pub fn event_type(&self) -> Option<u64> {
        self.attribute(ATTR_EVENT_TYPE).and_then(|v| v.as_u64())
    }

    /// A string field inside `event.data`, if present.
    pub fn data_field(&self, field: &str) -> Option<&str> {
        self.attribute(ATTR_EVENT_DATA)
            .and_then(|data| data.get(field))
            .and_then(|v| v.as_str())
    }
}

impl Default for LogRecord {
    fn default() -> Self {
        Self::new()
    }
}
