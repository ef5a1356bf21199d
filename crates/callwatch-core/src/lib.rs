//! # callwatch-core
//!
//! Realtime channel client for the callwatch dashboard.
//!
//! - **Registry** - event name to ordered handler lists
//! - **Reconnect** - linear backoff with an attempt ceiling
//! - **State** - observable liveness of a session
//! - **Client** - owns the session task and ties the pieces together
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Connector  │────▶│   Session   │────▶│  Registry   │──▶ handlers
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │ watch<State>│
//!                     └─────────────┘
//! ```

pub mod client;
pub mod reconnect;
pub mod registry;
pub mod state;

pub use client::{ClientConfig, ClientError, RealtimeClient};
pub use reconnect::ReconnectPolicy;
pub use registry::{handler, EventRegistry, Handler, RegistryStats};
pub use state::ChannelState;
