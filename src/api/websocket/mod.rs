//! WebSocket module for live match feeds
//!
//! Provides the `/ws?channel=` endpoint. Each connection follows exactly one
//! channel: `match:<id>` for a single fixture or `dashboard` for every
//! match update.
//!
//! ## Features
//! - Welcome message carrying the current sequence id
//! - Sequence ids on every message for gap detection
//! - Lag notice when a client falls behind, after which it should re-fetch

pub mod events;
pub mod handler;
pub mod hub;

pub use events::WsMessage;
pub use hub::ChannelHub;
