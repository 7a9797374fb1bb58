//! Room lifecycle management for Seatrelay.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! two seats, its member list and the last known game snapshot. Rooms are
//! created lazily by the [`RoomRegistry`] and live as long as it does.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — room table and per-connection [`Session`] records
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`Seats`] — seat bookkeeping and the seat-assignment policy
//! - [`Recipient`] / [`DeliveryReport`] — best-effort broadcast
//! - [`RoomConfig`] — settings shared by all rooms

mod broadcast;
mod config;
mod error;
mod registry;
mod room;
mod seating;

pub use broadcast::{
    deliver, outbound_channel, DeliveryReport, Outbound, OutboundReceiver,
    OutboundSender, Recipient, DEFAULT_OUTBOUND_BUFFER,
};
pub use config::RoomConfig;
pub use error::RoomError;
pub use registry::{Binding, RoomRegistry, Session};
pub use room::{join_notice, RoomHandle, RoomInfo, DISCONNECT_NOTICE};
pub use seating::Seats;
