//! Event types for the callwatch realtime channel.
//!
//! The backend pushes JSON objects tagged by a `type` field. Known event
//! names decode into dedicated variants; anything else is kept as
//! [`ServerEvent::Unknown`] so a newer server never breaks an older client.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Wire names of the `type` discriminator.
pub mod names {
    pub const CONNECTION_ESTABLISHED: &str = "connection_established";
    pub const TRANSCRIPTION_PROGRESS: &str = "transcription_progress";
    pub const TRANSCRIPTION_COMPLETED: &str = "transcription_completed";
    pub const TRANSCRIPTION_ERROR: &str = "transcription_error";
    pub const STATUS_UPDATE: &str = "status_update";
    pub const PONG: &str = "pong";
    pub const CALL_CREATED: &str = "call_created";
    pub const CALL_UPDATED: &str = "call_updated";
    pub const CALL_DELETED: &str = "call_deleted";
    pub const PING: &str = "ping";
}

/// Known inbound event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ConnectionEstablished,
    TranscriptionProgress,
    TranscriptionCompleted,
    TranscriptionError,
    StatusUpdate,
    Pong,
    CallCreated,
    CallUpdated,
    CallDeleted,
}

impl EventKind {
    /// All known kinds, in wire-name order.
    pub const ALL: [EventKind; 9] = [
        EventKind::ConnectionEstablished,
        EventKind::TranscriptionProgress,
        EventKind::TranscriptionCompleted,
        EventKind::TranscriptionError,
        EventKind::StatusUpdate,
        EventKind::Pong,
        EventKind::CallCreated,
        EventKind::CallUpdated,
        EventKind::CallDeleted,
    ];

    /// The wire name used in the `type` field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ConnectionEstablished => names::CONNECTION_ESTABLISHED,
            EventKind::TranscriptionProgress => names::TRANSCRIPTION_PROGRESS,
            EventKind::TranscriptionCompleted => names::TRANSCRIPTION_COMPLETED,
            EventKind::TranscriptionError => names::TRANSCRIPTION_ERROR,
            EventKind::StatusUpdate => names::STATUS_UPDATE,
            EventKind::Pong => names::PONG,
            EventKind::CallCreated => names::CALL_CREATED,
            EventKind::CallUpdated => names::CALL_UPDATED,
            EventKind::CallDeleted => names::CALL_DELETED,
        }
    }
}

impl TryFrom<&str> for EventKind {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or("Unknown event type")
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> String {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a call's processing state sent on connect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallStatus {
    /// Processing status (`pending`, `processing`, `completed`, `failed`,
    /// or `not_found`).
    pub status: String,
    #[serde(default)]
    pub has_transcription: bool,
    #[serde(default)]
    pub has_analysis: bool,
}

/// First message after the server accepts the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEstablished {
    pub call_id: String,
    pub status: CallStatus,
}

/// Incremental transcription progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionProgress {
    #[serde(default)]
    pub call_id: Option<String>,
    /// Percentage in `0..=100`.
    pub progress: f64,
    /// Partial text recognised so far.
    #[serde(default)]
    pub text: String,
    /// Raw segment as produced by the recogniser.
    #[serde(default)]
    pub segment: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
}

/// Transcription finished.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TranscriptionCompleted {
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub transcription: Option<Value>,
    #[serde(default)]
    pub analysis: Option<Value>,
}

/// Transcription failed on the backend. The channel stays open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionError {
    #[serde(default)]
    pub call_id: Option<String>,
    pub error: String,
}

/// Generic status change of a call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A call was created for the current user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CallCreated {
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub call: Option<Value>,
}

impl CallCreated {
    /// Id of the new call. The backend sends it inside the serialized
    /// `call` object; a top-level `call_id` is accepted as a fallback.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.call
            .as_ref()
            .and_then(|call| call.get("id"))
            .and_then(Value::as_str)
            .or(self.call_id.as_deref())
    }
}

/// A call owned by the current user changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallUpdated {
    pub call_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub updates: Option<Value>,
}

/// A call owned by the current user was deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallDeleted {
    pub call_id: String,
}

/// An inbound message, decoded at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    ConnectionEstablished(ConnectionEstablished),
    TranscriptionProgress(TranscriptionProgress),
    TranscriptionCompleted(TranscriptionCompleted),
    TranscriptionError(TranscriptionError),
    StatusUpdate(StatusUpdate),
    Pong,
    CallCreated(CallCreated),
    CallUpdated(CallUpdated),
    CallDeleted(CallDeleted),
    /// Any message whose `type` this client does not know.
    Unknown {
        event_type: String,
        /// The whole message object, `type` included.
        payload: Value,
    },
}

impl ServerEvent {
    /// The `type` discriminator this event arrived with.
    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            ServerEvent::Unknown { event_type, .. } => event_type,
            other => other.kind().map(|k| k.as_str()).unwrap_or_default(),
        }
    }

    /// The known kind, or `None` for [`ServerEvent::Unknown`].
    #[must_use]
    pub fn kind(&self) -> Option<EventKind> {
        Some(match self {
            ServerEvent::ConnectionEstablished(_) => EventKind::ConnectionEstablished,
            ServerEvent::TranscriptionProgress(_) => EventKind::TranscriptionProgress,
            ServerEvent::TranscriptionCompleted(_) => EventKind::TranscriptionCompleted,
            ServerEvent::TranscriptionError(_) => EventKind::TranscriptionError,
            ServerEvent::StatusUpdate(_) => EventKind::StatusUpdate,
            ServerEvent::Pong => EventKind::Pong,
            ServerEvent::CallCreated(_) => EventKind::CallCreated,
            ServerEvent::CallUpdated(_) => EventKind::CallUpdated,
            ServerEvent::CallDeleted(_) => EventKind::CallDeleted,
            ServerEvent::Unknown { .. } => return None,
        })
    }
}

/// An outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Liveness probe; the server answers with `pong`.
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_names() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::try_from(kind.as_str()), Ok(kind));
        }
        assert!(EventKind::try_from("ping").is_err());
        assert_eq!(
            String::from(EventKind::StatusUpdate),
            "status_update".to_string()
        );
    }

    #[test]
    fn test_event_type_of_unknown() {
        let event = ServerEvent::Unknown {
            event_type: "queue_position".to_string(),
            payload: serde_json::json!({"type": "queue_position", "position": 3}),
        };
        assert_eq!(event.event_type(), "queue_position");
        assert!(event.kind().is_none());
        assert_eq!(ServerEvent::Pong.event_type(), "pong");
    }

    #[test]
    fn test_call_created_id() {
        let created: CallCreated = serde_json::from_str(
            r#"{"call":{"id":"c7","status":"pending","user_name":"operator"}}"#,
        )
        .unwrap();
        assert_eq!(created.id(), Some("c7"));

        let created: CallCreated = serde_json::from_str(r#"{"call_id":"c2"}"#).unwrap();
        assert_eq!(created.id(), Some("c2"));

        let created: CallCreated = serde_json::from_str(r#"{"call":{"id":42}}"#).unwrap();
        assert_eq!(created.id(), None);
    }

    #[test]
    fn test_ping_wire_shape() {
        let json = serde_json::to_string(&ClientMessage::Ping).unwrap();
        assert_eq!(json, r#"{"type":"ping"}"#);
    }
}
