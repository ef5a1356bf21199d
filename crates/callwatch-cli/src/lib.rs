//! # callwatch-cli
//!
//! Terminal consumer of the callwatch realtime channel: configuration,
//! token storage, the REST snapshot client and the call detail controller
//! behind the `callwatch` binary.

pub mod api;
pub mod auth;
pub mod config;
pub mod controller;
pub mod feed;
pub mod metrics;
pub mod view;

#[cfg(test)]
mod testing;
