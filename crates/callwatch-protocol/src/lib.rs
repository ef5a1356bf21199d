//! # callwatch-protocol
//!
//! Wire protocol definitions for the callwatch realtime channel.
//!
//! The backend speaks JSON text frames shaped `{ "type": <string>, ...payload }`.
//! This crate decodes them into a closed [`ServerEvent`] type at the boundary,
//! encodes the few client messages, and builds channel URLs.
//!
//! ## Event Types
//!
//! - `transcription_progress` / `transcription_completed` / `transcription_error`
//! - `status_update` / `connection_established` / `pong`
//! - `call_created` / `call_updated` / `call_deleted` (user-wide feed)
//!
//! ## Example
//!
//! ```rust
//! use callwatch_protocol::codec;
//!
//! let event = codec::decode(r#"{"type":"transcription_progress","progress":42,"text":"hello"}"#).unwrap();
//! assert_eq!(event.event_type(), "transcription_progress");
//! ```

pub mod codec;
pub mod endpoint;
pub mod events;

pub use codec::{decode, encode, EventCodec, ProtocolError};
pub use endpoint::ChannelTarget;
pub use events::{ClientMessage, EventKind, ServerEvent};
