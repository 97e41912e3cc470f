//! Event types: raw (as received), validated, and scored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InvalidEvent;

/// Event as received from the transport. Every field is optional; anything
/// absent, `null`, or of the wrong JSON type is left as `None` and rejected
/// later by [`RawEvent::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub features: Option<Vec<f64>>,
}

/// An event with all required fields present.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub user_id: String,
    pub timestamp: i64,
    pub features: Vec<f64>,
}

/// One scored observation kept in a user's window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredSample {
    pub timestamp: i64,
    pub score: f64,
}

impl RawEvent {
    pub fn new(user_id: impl Into<String>, timestamp: i64, features: Vec<f64>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            timestamp: Some(timestamp),
            features: Some(features),
        }
    }

    /// Lenient per-field extraction from an arbitrary JSON value.
    ///
    /// A bad field never fails the whole batch; it only invalidates this item.
    /// `timestamp` accepts integers, floats (truncated) and integer strings.
    pub fn from_json(v: &Value) -> Self {
        let Some(obj) = v.as_object() else {
            return Self::default();
        };

        let user_id = obj
            .get("user_id")
            .and_then(Value::as_str)
            .map(str::to_owned);

        let timestamp = obj.get("timestamp").and_then(|t| match t {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            }),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        });

        let features = obj.get("features").and_then(Value::as_array).and_then(|arr| {
            arr.iter().map(Value::as_f64).collect::<Option<Vec<f64>>>()
        });

        Self {
            user_id,
            timestamp,
            features,
        }
    }

    /// Check that `user_id`, `timestamp` and `features` are all present.
    pub fn validate(self) -> Result<Event, InvalidEvent> {
        let user_id = self.user_id.ok_or(InvalidEvent::missing("user_id"))?;
        let timestamp = self.timestamp.ok_or(InvalidEvent::missing("timestamp"))?;
        let features = self.features.ok_or(InvalidEvent::missing("features"))?;
        Ok(Event {
            user_id,
            timestamp,
            features,
        })
    }
}
