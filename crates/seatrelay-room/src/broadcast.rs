//! Per-connection outbound channels and best-effort delivery.

use std::sync::Arc;

use seatrelay_protocol::ServerMessage;
use seatrelay_transport::ConnectionId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::RoomError;

/// A message queued for one or more connections.
///
/// Shared via `Arc` so a broadcast to N members doesn't clone the
/// snapshot N times.
pub type Outbound = Arc<ServerMessage>;

/// Default number of messages queued for one connection before further
/// deliveries to it fail.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

/// Channel sender for delivering outbound messages to a connection.
pub type OutboundSender = mpsc::Sender<Outbound>;

/// Receiving end, drained by the connection's writer task.
pub type OutboundReceiver = mpsc::Receiver<Outbound>;

/// Creates the outbound channel for a new connection.
///
/// The queue holds at most `capacity` messages. A client that stops
/// reading fills it, and deliveries to it then fail instead of growing
/// memory.
pub fn outbound_channel(capacity: usize) -> (OutboundSender, OutboundReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Who inside a room should receive a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every member.
    All,
    /// One member.
    Only(ConnectionId),
    /// Every member except one (usually the sender).
    AllExcept(ConnectionId),
}

impl Recipient {
    /// Returns `true` if `conn_id` is targeted.
    pub fn includes(&self, conn_id: ConnectionId) -> bool {
        match self {
            Self::All => true,
            Self::Only(id) => *id == conn_id,
            Self::AllExcept(id) => *id != conn_id,
        }
    }
}

/// Outcome of one broadcast, per recipient.
///
/// Failures never abort a broadcast; they are collected here for
/// logging only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Number of recipients the message was queued for.
    pub delivered: usize,
    /// Recipients whose channel was already closed.
    pub failed: Vec<ConnectionId>,
}

impl DeliveryReport {
    /// Folds one delivery result into the report.
    pub fn record(&mut self, result: Result<(), RoomError>) {
        match result {
            Ok(()) => self.delivered += 1,
            Err(RoomError::Undeliverable(id)) => self.failed.push(id),
            Err(e) => tracing::debug!(error = %e, "unexpected delivery error"),
        }
    }

    /// Returns `true` if nothing failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Queues `msg` on one connection's channel without waiting.
///
/// Fails with [`RoomError::Undeliverable`] when the channel is closed or
/// its queue is full.
pub fn deliver(
    conn_id: ConnectionId,
    sender: &OutboundSender,
    msg: Outbound,
) -> Result<(), RoomError> {
    sender.try_send(msg).map_err(|e| {
        if let TrySendError::Full(_) = e {
            tracing::debug!(%conn_id, "outbound queue full, dropping message");
        }
        RoomError::Undeliverable(conn_id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_includes() {
        let a = ConnectionId::new(1);
        let b = ConnectionId::new(2);
        assert!(Recipient::All.includes(a));
        assert!(Recipient::Only(a).includes(a));
        assert!(!Recipient::Only(a).includes(b));
        assert!(!Recipient::AllExcept(a).includes(a));
        assert!(Recipient::AllExcept(a).includes(b));
    }

    #[test]
    fn test_deliver_to_closed_channel_is_undeliverable() {
        let (tx, rx) = outbound_channel(DEFAULT_OUTBOUND_BUFFER);
        drop(rx);
        let id = ConnectionId::new(9);
        let err = deliver(id, &tx, Arc::new(ServerMessage::info("x")))
            .unwrap_err();
        assert!(matches!(err, RoomError::Undeliverable(got) if got == id));
    }

    #[test]
    fn test_report_collects_failures_without_stopping() {
        let (open_tx, mut open_rx) = outbound_channel(DEFAULT_OUTBOUND_BUFFER);
        let (closed_tx, closed_rx) = outbound_channel(DEFAULT_OUTBOUND_BUFFER);
        drop(closed_rx);

        let msg: Outbound = Arc::new(ServerMessage::info("hello"));
        let mut report = DeliveryReport::default();
        report.record(deliver(ConnectionId::new(1), &closed_tx, msg.clone()));
        report.record(deliver(ConnectionId::new(2), &open_tx, msg));

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, vec![ConnectionId::new(1)]);
        assert!(!report.is_complete());
        assert_eq!(
            *open_rx.try_recv().unwrap(),
            ServerMessage::info("hello")
        );
    }

    #[test]
    fn test_deliver_to_full_queue_is_undeliverable() {
        let (tx, mut rx) = outbound_channel(1);
        let id = ConnectionId::new(3);

        assert!(deliver(id, &tx, Arc::new(ServerMessage::info("first"))).is_ok());
        let err = deliver(id, &tx, Arc::new(ServerMessage::info("second")))
            .unwrap_err();
        assert!(matches!(err, RoomError::Undeliverable(got) if got == id));

        assert_eq!(*rx.try_recv().unwrap(), ServerMessage::info("first"));
        assert!(rx.try_recv().is_err());

        // Draining frees the slot again.
        assert!(deliver(id, &tx, Arc::new(ServerMessage::info("third"))).is_ok());
    }
}
