//! Seat bookkeeping and the seat-assignment policy.

use seatrelay_protocol::{Role, Want};
use seatrelay_transport::ConnectionId;

/// The two seats of a room and who (if anyone) sits in each.
///
/// At most one connection holds each seat. Spectators are not tracked
/// here; they only exist as room members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Seats {
    pub seat_a: Option<ConnectionId>,
    pub seat_b: Option<ConnectionId>,
}

impl Seats {
    /// Picks a role for a newcomer.
    ///
    /// The wanted seat wins if it is free; otherwise the first free seat
    /// (A before B); otherwise spectator. Joining never fails, and
    /// nothing here ever promotes an existing spectator.
    pub fn assign(&self, want: Want) -> Role {
        match want {
            Want::SeatA if self.seat_a.is_none() => Role::SeatA,
            Want::SeatB if self.seat_b.is_none() => Role::SeatB,
            _ if self.seat_a.is_none() => Role::SeatA,
            _ if self.seat_b.is_none() => Role::SeatB,
            _ => Role::Spectator,
        }
    }

    /// Records `conn_id` in the seat matching `role`. Spectator is a no-op.
    pub fn occupy(&mut self, role: Role, conn_id: ConnectionId) {
        match role {
            Role::SeatA => self.seat_a = Some(conn_id),
            Role::SeatB => self.seat_b = Some(conn_id),
            Role::Spectator => {}
        }
    }

    /// Clears whichever seat `conn_id` holds and returns it.
    pub fn vacate(&mut self, conn_id: ConnectionId) -> Option<Role> {
        if self.seat_a == Some(conn_id) {
            self.seat_a = None;
            return Some(Role::SeatA);
        }
        if self.seat_b == Some(conn_id) {
            self.seat_b = None;
            return Some(Role::SeatB);
        }
        None
    }

    /// Returns the connection in the given seat.
    pub fn holder(&self, role: Role) -> Option<ConnectionId> {
        match role {
            Role::SeatA => self.seat_a,
            Role::SeatB => self.seat_b,
            Role::Spectator => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn full() -> Seats {
        Seats {
            seat_a: Some(cid(1)),
            seat_b: Some(cid(2)),
        }
    }

    #[test]
    fn test_empty_room_honours_request() {
        let seats = Seats::default();
        assert_eq!(seats.assign(Want::SeatA), Role::SeatA);
        assert_eq!(seats.assign(Want::SeatB), Role::SeatB);
        assert_eq!(seats.assign(Want::Any), Role::SeatA);
    }

    #[test]
    fn test_taken_seat_falls_back_to_other_seat() {
        let seats = Seats {
            seat_a: Some(cid(1)),
            seat_b: None,
        };
        assert_eq!(seats.assign(Want::SeatA), Role::SeatB);
        assert_eq!(seats.assign(Want::Any), Role::SeatB);

        let seats = Seats {
            seat_a: None,
            seat_b: Some(cid(1)),
        };
        assert_eq!(seats.assign(Want::SeatB), Role::SeatA);
    }

    #[test]
    fn test_full_room_yields_spectator() {
        for want in [Want::SeatA, Want::SeatB, Want::Any] {
            assert_eq!(full().assign(want), Role::Spectator);
        }
    }

    #[test]
    fn test_occupy_and_vacate() {
        let mut seats = Seats::default();
        seats.occupy(Role::SeatB, cid(7));
        seats.occupy(Role::Spectator, cid(8));
        assert_eq!(seats.holder(Role::SeatB), Some(cid(7)));
        assert_eq!(seats.holder(Role::SeatA), None);

        assert_eq!(seats.vacate(cid(8)), None);
        assert_eq!(seats.vacate(cid(7)), Some(Role::SeatB));
        assert_eq!(seats, Seats::default());
    }

    #[test]
    fn test_vacated_seat_is_reassigned() {
        let mut seats = full();
        seats.vacate(cid(1));
        assert_eq!(seats.assign(Want::Any), Role::SeatA);
        assert_eq!(seats.assign(Want::SeatB), Role::SeatA);
    }
}
