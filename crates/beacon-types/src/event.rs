//! Recorded event shapes.
//!
//! An event exists in two forms. [`ParsedRumEvent`] carries structured
//! metadata and details and is what bus subscribers receive.
//! [`RumEvent`] carries the same fields serialised to JSON strings and is
//! what the buffer stores and batch consumers receive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered string-keyed attribute map used for metadata and custom
/// attributes. Insertion order is preserved through serialisation.
pub type Attributes = serde_json::Map<String, Value>;

/// An event in the serialised form held by the buffer and sent in batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RumEvent {
    /// Unique event identifier (v4 UUID).
    pub id: String,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Schema identifier.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Enrichment metadata as a JSON object string.
    pub metadata: String,
    /// Event-specific payload as a JSON string.
    pub details: String,
}

/// An event in the structured form delivered to bus subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRumEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub metadata: Attributes,
    pub details: Value,
}

impl ParsedRumEvent {
    /// Produces the serialised form stored in the buffer.
    pub fn to_rum_event(&self) -> RumEvent {
        RumEvent {
            id: self.id.clone(),
            timestamp: self.timestamp,
            event_type: self.event_type.clone(),
            metadata: Value::Object(self.metadata.clone()).to_string(),
            details: self.details.to_string(),
        }
    }
}

impl RumEvent {
    /// Parses the serialised metadata back into attributes.
    pub fn parsed_metadata(&self) -> Result<Attributes, serde_json::Error> {
        serde_json::from_str(&self.metadata)
    }

    /// Parses the serialised details back into a JSON value.
    pub fn parsed_details(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.details)
    }
}
