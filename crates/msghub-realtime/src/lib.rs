//! # msghub-realtime
//!
//! Session/message hub. Provides:
//!
//! - A registry of live connections held by non-owning handles, plus an
//!   identity index mapping principal names to connection ids
//! - A bounded, coalescing delivery queue drained by a dispatch loop
//! - A bounded worker pool that serializes each message once and fans it
//!   out with per-connection locking and failure isolation
//! - Targeting by identity (optionally narrowed to an origin host) or role
//! - In-band authentication linking decoupled from the connection handshake

pub mod auth;
pub mod connection;
pub mod dispatch;
pub mod hub;
pub mod listener;
pub mod message;
pub mod metrics;
pub mod targeting;

pub use connection::{ChannelTransport, ConnectionHandle, ConnectionRegistry, Transport};
pub use hub::MessageHub;
pub use listener::{HubListener, ListenerId};
pub use message::{HubMessage, MessageType};
pub use metrics::{HubMetrics, MetricsSnapshot};
