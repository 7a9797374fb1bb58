//! # Seatrelay
//!
//! A room-based relay for two-seat games with spectators.
//!
//! Clients join a named room, get one of two seats (or become a
//! spectator), and from then on every move, new-game reset and snapshot
//! request is forwarded to the right members of that room. The relay
//! keeps the last snapshot each room reported so late joiners can catch
//! up, and it never interprets game rules.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use seatrelay::prelude::*;
//!
//! # async fn start() -> Result<(), RelayError> {
//! let server = RelayServer::builder().bind("0.0.0.0:3001").build().await?;
//! server.run().await
//! # }
//! ```

mod engine;
mod error;
mod handler;
mod server;

pub use engine::{RelayEngine, ALREADY_JOINED, ROOM_REQUIRED};
pub use error::RelayError;
pub use server::{RelayServer, RelayServerBuilder, DEFAULT_BIND_ADDR};

/// Everything needed to run a relay or talk to one in tests.
pub mod prelude {
    pub use crate::{
        RelayEngine, RelayError, RelayServer, RelayServerBuilder,
        ALREADY_JOINED, DEFAULT_BIND_ADDR, ROOM_REQUIRED,
    };
    pub use seatrelay_protocol::{
        ClientMessage, Codec, JsonCodec, Payload, ProtocolError, Role, RoomId,
        ServerMessage, Want, MAX_ROOM_ID_LEN,
    };
    pub use seatrelay_room::{
        join_notice, Binding, DeliveryReport, RoomConfig, RoomError,
        RoomInfo, RoomRegistry, DISCONNECT_NOTICE,
    };
    pub use seatrelay_transport::{ConnectionId, TransportError};
}
