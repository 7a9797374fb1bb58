//! Error types for the room layer.

use seatrelay_protocol::RoomId;
use seatrelay_transport::ConnectionId;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room's command channel is closed; its actor is gone.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),

    /// The connection is already bound to a room. Room and role are
    /// set once per connection.
    #[error("connection {0} already joined room {1}")]
    AlreadyJoined(ConnectionId, RoomId),

    /// The connection was never registered, or has already closed.
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    /// The connection id is already in use.
    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),

    /// The recipient's outbound channel is closed (its transport is
    /// going away). Only ever recorded in a delivery report.
    #[error("connection {0} can no longer receive messages")]
    Undeliverable(ConnectionId),
}
