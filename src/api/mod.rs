//! API module for HTTP, WebSocket and SSE endpoints
//!
//! REST commands drive the scoring service; the WebSocket and SSE feeds
//! relay what the service publishes into the [`websocket::ChannelHub`].

pub mod auth;
pub mod http;
pub mod rest;
pub mod sse;
pub mod websocket;

pub use http::{create_router, AppState};
