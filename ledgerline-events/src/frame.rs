//! Realtime channel frames.
//!
//! The push channel delivers JSON text frames in one of two shapes:
//!
//! ```text
//! {"event": "ar_payment", "data": {...}}
//! ["ar_payment", {...}]
//! ```
//!
//! `payload` is accepted as an alias of `data`. A frame without a payload
//! carries `null`.

use crate::event::RealtimeEvent;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Frame has no event name")]
    MissingEventName,
    #[error("Unsupported frame shape")]
    UnsupportedShape,
}

/// A decoded frame: event name plus raw payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeFrame {
    pub event: String,
    pub payload: Value,
}

impl RealtimeFrame {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, FrameError> {
        match value {
            Value::Object(mut map) => {
                let event = match map.remove("event") {
                    Some(Value::String(name)) if !name.is_empty() => name,
                    _ => return Err(FrameError::MissingEventName),
                };
                let payload = map
                    .remove("data")
                    .or_else(|| map.remove("payload"))
                    .unwrap_or(Value::Null);
                Ok(Self { event, payload })
            }
            Value::Array(items) => {
                let mut items = items.into_iter();
                let event = match items.next() {
                    Some(Value::String(name)) if !name.is_empty() => name,
                    _ => return Err(FrameError::MissingEventName),
                };
                let payload = items.next().unwrap_or(Value::Null);
                Ok(Self { event, payload })
            }
            _ => Err(FrameError::UnsupportedShape),
        }
    }

    pub fn into_event(self) -> RealtimeEvent {
        RealtimeEvent::decode(&self.event, &self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_object_frames() {
        let frame = RealtimeFrame::parse(r#"{"event":"account_update_info","data":"a1"}"#).unwrap();
        assert_eq!(frame.event, "account_update_info");
        assert_eq!(frame.payload, json!("a1"));

        let frame = RealtimeFrame::parse(r#"{"event":"booking_added","payload":{"x":1}}"#).unwrap();
        assert_eq!(frame.payload, json!({ "x": 1 }));
    }

    #[test]
    fn parses_array_frames() {
        let frame = RealtimeFrame::parse(r#"["accounts_deleted", ["a1"]]"#).unwrap();
        assert_eq!(frame.event, "accounts_deleted");
        assert_eq!(frame.payload, json!(["a1"]));

        let frame = RealtimeFrame::parse(r#"["account_added"]"#).unwrap();
        assert_eq!(frame.payload, Value::Null);
    }

    #[test]
    fn rejects_frames_without_names() {
        assert!(matches!(
            RealtimeFrame::parse(r#"{"data":{}}"#),
            Err(FrameError::MissingEventName)
        ));
        assert!(matches!(
            RealtimeFrame::parse(r#"[42, {}]"#),
            Err(FrameError::MissingEventName)
        ));
        assert!(matches!(
            RealtimeFrame::parse("17"),
            Err(FrameError::UnsupportedShape)
        ));
        assert!(matches!(RealtimeFrame::parse("{"), Err(FrameError::Json(_))));
    }
}
