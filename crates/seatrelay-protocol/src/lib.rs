//! Wire protocol for Seatrelay.
//!
//! This crate defines the "language" that clients and the relay speak:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`RoomId`],
//!   [`Role`], [`Want`]) — the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! The protocol layer doesn't know about connections or rooms. It only
//! knows how to serialize and deserialize messages.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Room (seats, snapshot)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ClientMessage, MAX_ROOM_ID_LEN, Payload, Role, RoomId, ServerMessage,
    Want,
};
