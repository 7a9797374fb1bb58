//! Unified error type for Seatrelay.

use seatrelay_protocol::ProtocolError;
use seatrelay_room::RoomError;
use seatrelay_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (unknown connection, double join, dead room).
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use seatrelay_protocol::{RoomId, MAX_ROOM_ID_LEN};
    use seatrelay_transport::ConnectionId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Transport(_)));
        assert!(relay_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Protocol(_)));
        assert_eq!(relay_err.to_string(), "invalid message: bad");
    }

    #[test]
    fn test_from_room_error() {
        let room = RoomId::parse("r1", MAX_ROOM_ID_LEN).unwrap();
        let err = RoomError::AlreadyJoined(ConnectionId::new(3), room);
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Room(_)));
        assert_eq!(
            relay_err.to_string(),
            "connection conn-3 already joined room r1"
        );
    }
}
