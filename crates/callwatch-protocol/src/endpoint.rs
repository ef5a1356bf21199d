//! Channel endpoints.
//!
//! The backend exposes one channel per call and one per user:
//!
//! - `{base}/ws/transcription/{call_id}/?token={token}`
//! - `{base}/ws/calls/?token={token}`

use std::fmt;

use crate::codec::ProtocolError;

/// Maximum resource id length.
pub const MAX_RESOURCE_ID_LENGTH: usize = 128;

/// Validate a resource id before it is placed in a URL path.
///
/// # Errors
///
/// Returns an error message if the id is empty, too long, or contains
/// anything other than ASCII alphanumerics, `-` and `_`.
pub fn validate_resource_id(id: &str) -> Result<(), &'static str> {
    if id.is_empty() {
        return Err("Resource id cannot be empty");
    }
    if id.len() > MAX_RESOURCE_ID_LENGTH {
        return Err("Resource id too long");
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("Resource id contains invalid characters");
    }
    Ok(())
}

/// What a channel session is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelTarget {
    /// Progress stream of a single call.
    Transcription(String),
    /// Feed of all calls owned by the authenticated user.
    Calls,
}

impl ChannelTarget {
    /// Target for a single call.
    #[must_use]
    pub fn transcription(call_id: impl Into<String>) -> Self {
        ChannelTarget::Transcription(call_id.into())
    }

    /// URL path of the channel, with trailing slash.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            ChannelTarget::Transcription(id) => format!("/ws/transcription/{}/", id),
            ChannelTarget::Calls => "/ws/calls/".to_string(),
        }
    }

    /// Build the full channel URL. The token travels as a query parameter
    /// because browsers cannot set headers on a WebSocket handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the base is not a `ws://`/`wss://` URL or the
    /// resource id is invalid.
    pub fn url(&self, base: &str, token: &str) -> Result<String, ProtocolError> {
        if !(base.starts_with("ws://") || base.starts_with("wss://")) {
            return Err(ProtocolError::InvalidEndpoint(
                "Base URL must start with ws:// or wss://",
            ));
        }
        if let ChannelTarget::Transcription(id) = self {
            validate_resource_id(id).map_err(ProtocolError::InvalidEndpoint)?;
        }

        Ok(format!(
            "{}{}?token={}",
            base.trim_end_matches('/'),
            self.path(),
            urlencoding::encode(token)
        ))
    }
}

impl fmt::Display for ChannelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelTarget::Transcription(id) => write!(f, "transcription:{}", id),
            ChannelTarget::Calls => f.write_str("calls"),
        }
    }
}
