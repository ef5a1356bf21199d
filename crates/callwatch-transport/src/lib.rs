//! # callwatch-transport
//!
//! Transport abstraction layer for the callwatch realtime client.
//!
//! The client dials a channel URL through a [`Connector`] and exchanges text
//! frames over the resulting [`Connection`]. The WebSocket implementation is
//! the only production transport; tests plug in scripted connectors.
//!
//! ```rust,ignore
//! use callwatch_transport::{Connector, WebSocketConnector};
//!
//! async fn tail(url: &str) {
//!     let mut conn = WebSocketConnector::default().connect(url).await.unwrap();
//!     while let Ok(Some(text)) = conn.recv().await {
//!         println!("{text}");
//!     }
//! }
//! ```

pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use traits::{Connection, ConnectionId, Connector, TransportError};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConfig, WebSocketConnector};
