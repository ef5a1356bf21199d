//! JSON text codec for the callwatch channel.
//!
//! Every frame is a UTF-8 JSON object carrying a string `type` field.

use serde_json::Value;
use thiserror::Error;

use crate::events::{
    names, CallCreated, CallDeleted, CallUpdated, ClientMessage, ConnectionEstablished,
    ServerEvent, StatusUpdate, TranscriptionCompleted, TranscriptionError, TranscriptionProgress,
};

/// Default maximum frame size (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame exceeds maximum size.
    #[error("Frame size {size} exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    /// Frame is not valid JSON.
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame is JSON but not an object.
    #[error("Expected a JSON object")]
    NotAnObject,

    /// Object has no string `type` field.
    #[error("Missing or non-string \"type\" field")]
    MissingType,

    /// Known event type with a payload that does not match its schema.
    #[error("Invalid payload for {event_type}: {source}")]
    InvalidPayload {
        event_type: String,
        source: serde_json::Error,
    },

    /// Endpoint could not be built.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(&'static str),
}

/// Decode a text frame into a [`ServerEvent`].
///
/// # Errors
///
/// Returns an error if the frame is too large, not a JSON object, has no
/// `type`, or carries a known type with an invalid payload.
pub fn decode(text: &str) -> Result<ServerEvent, ProtocolError> {
    EventCodec::default().decode(text)
}

/// Decode an already-parsed JSON value into a [`ServerEvent`].
///
/// # Errors
///
/// Same as [`decode`], minus the size check.
pub fn decode_value(value: Value) -> Result<ServerEvent, ProtocolError> {
    let event_type = match value.as_object() {
        None => return Err(ProtocolError::NotAnObject),
        Some(obj) => match obj.get("type").and_then(Value::as_str) {
            Some(t) => t.to_string(),
            None => return Err(ProtocolError::MissingType),
        },
    };

    fn typed<T: serde::de::DeserializeOwned>(
        event_type: &str,
        value: Value,
    ) -> Result<T, ProtocolError> {
        serde_json::from_value(value).map_err(|source| ProtocolError::InvalidPayload {
            event_type: event_type.to_string(),
            source,
        })
    }

    let event = match event_type.as_str() {
        names::CONNECTION_ESTABLISHED => {
            ServerEvent::ConnectionEstablished(typed::<ConnectionEstablished>(&event_type, value)?)
        }
        names::TRANSCRIPTION_PROGRESS => {
            ServerEvent::TranscriptionProgress(typed::<TranscriptionProgress>(&event_type, value)?)
        }
        names::TRANSCRIPTION_COMPLETED => {
            ServerEvent::TranscriptionCompleted(typed::<TranscriptionCompleted>(&event_type, value)?)
        }
        names::TRANSCRIPTION_ERROR => {
            ServerEvent::TranscriptionError(typed::<TranscriptionError>(&event_type, value)?)
        }
        names::STATUS_UPDATE => ServerEvent::StatusUpdate(typed::<StatusUpdate>(&event_type, value)?),
        names::PONG => ServerEvent::Pong,
        names::CALL_CREATED => ServerEvent::CallCreated(typed::<CallCreated>(&event_type, value)?),
        names::CALL_UPDATED => ServerEvent::CallUpdated(typed::<CallUpdated>(&event_type, value)?),
        names::CALL_DELETED => ServerEvent::CallDeleted(typed::<CallDeleted>(&event_type, value)?),
        _ => ServerEvent::Unknown {
            event_type,
            payload: value,
        },
    };

    Ok(event)
}

/// Encode an outbound message to a text frame.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(message: &ClientMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

/// Codec carrying a per-connection frame size limit.
#[derive(Debug, Clone, Copy)]
pub struct EventCodec {
    max_frame_size: usize,
}

impl EventCodec {
    /// Create a codec with a custom size limit.
    #[must_use]
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Decode a text frame.
    ///
    /// # Errors
    ///
    /// See [`decode`].
    pub fn decode(&self, text: &str) -> Result<ServerEvent, ProtocolError> {
        if text.len() > self.max_frame_size {
            return Err(ProtocolError::FrameTooLarge {
                size: text.len(),
                max: self.max_frame_size,
            });
        }
        let value: Value = serde_json::from_str(text)?;
        decode_value(value)
    }
}

impl Default for EventCodec {
    fn default() -> Self {
        Self::new(MAX_FRAME_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_progress() {
        let event =
            decode(r#"{"type":"transcription_progress","progress":42,"text":"hello"}"#).unwrap();
        match event {
            ServerEvent::TranscriptionProgress(p) => {
                assert_eq!(p.progress, 42.0);
                assert_eq!(p.text, "hello");
                assert!(p.call_id.is_none());
            }
            other => panic!("Expected progress, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_backend_shapes() {
        let completed = decode(
            r#"{"type":"transcription_completed","call_id":"c1","transcription":{"text":"hi","confidence":0.9,"segments":[]}}"#,
        )
        .unwrap();
        assert!(matches!(completed, ServerEvent::TranscriptionCompleted(ref c) if c.call_id.as_deref() == Some("c1")));

        let status = decode(r#"{"type":"status_update","call_id":"c1","status":"analysis_completed","message":"done"}"#).unwrap();
        assert!(matches!(status, ServerEvent::StatusUpdate(ref s) if s.status.as_deref() == Some("analysis_completed")));

        let error = decode(r#"{"type":"transcription_error","call_id":"c1","error":"bad audio"}"#).unwrap();
        assert!(matches!(error, ServerEvent::TranscriptionError(ref e) if e.error == "bad audio"));

        let established = decode(
            r#"{"type":"connection_established","call_id":"c1","status":{"status":"processing","has_transcription":false,"has_analysis":false}}"#,
        )
        .unwrap();
        assert!(matches!(established, ServerEvent::ConnectionEstablished(ref e) if e.status.status == "processing"));

        assert_eq!(decode(r#"{"type":"pong"}"#).unwrap(), ServerEvent::Pong);
        assert!(matches!(
            decode(r#"{"type":"call_deleted","call_id":"c9"}"#).unwrap(),
            ServerEvent::CallDeleted(_)
        ));
    }

    #[test]
    fn test_decode_bare_completed_and_status() {
        assert_eq!(
            decode(r#"{"type":"transcription_completed"}"#).unwrap(),
            ServerEvent::TranscriptionCompleted(TranscriptionCompleted::default())
        );
        assert_eq!(
            decode(r#"{"type":"status_update"}"#).unwrap(),
            ServerEvent::StatusUpdate(StatusUpdate::default())
        );
    }

    #[test]
    fn test_decode_unknown_keeps_payload() {
        let event = decode(r#"{"type":"queue_position","position":3}"#).unwrap();
        match event {
            ServerEvent::Unknown {
                event_type,
                payload,
            } => {
                assert_eq!(event_type, "queue_position");
                assert_eq!(payload["position"], 3);
            }
            other => panic!("Expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(decode("not json"), Err(ProtocolError::Json(_))));
        assert!(matches!(decode("[1,2]"), Err(ProtocolError::NotAnObject)));
        assert!(matches!(decode(r#"{"progress":1}"#), Err(ProtocolError::MissingType)));
        assert!(matches!(decode(r#"{"type":7}"#), Err(ProtocolError::MissingType)));
        assert!(matches!(
            decode(r#"{"type":"transcription_progress","text":"no progress"}"#),
            Err(ProtocolError::InvalidPayload { .. })
        ));
        assert!(matches!(
            decode(r#"{"type":"transcription_error"}"#),
            Err(ProtocolError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_frame_too_large() {
        let codec = EventCodec::new(16);
        match codec.decode(r#"{"type":"status_update","status":"processing"}"#) {
            Err(ProtocolError::FrameTooLarge { max: 16, .. }) => {}
            other => panic!("Expected FrameTooLarge error, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_ping() {
        assert_eq!(encode(&ClientMessage::Ping).unwrap(), r#"{"type":"ping"}"#);
    }
}
