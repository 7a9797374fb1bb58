//! Room actor: an isolated Tokio task that owns one room's state.
//!
//! Each room runs in its own task and is driven through an mpsc channel.
//! Commands are applied one at a time, so two racing joins can never both
//! take the same seat and snapshot writes are strictly last-write-wins.
//! Different rooms never share a lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use seatrelay_protocol::{Payload, Role, RoomId, ServerMessage, Want};
use seatrelay_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::broadcast::{deliver, DeliveryReport, Outbound, OutboundSender, Recipient};
use crate::{RoomError, Seats};

/// Notice sent to everyone still in a room when a member's transport closes.
pub const DISCONNECT_NOTICE: &str = "player disconnected";

/// Builds the notice other members see when someone joins.
pub fn join_notice(role: Role) -> String {
    format!("new player joined ({role})")
}

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel: the caller
/// waits on it for the outcome.
pub(crate) enum RoomCommand {
    /// Seat a connection and greet it.
    Join {
        conn_id: ConnectionId,
        want: Want,
        outbound: OutboundSender,
        reply: oneshot::Sender<Role>,
    },

    /// Forward a move to the other members.
    Move {
        sender: ConnectionId,
        r#move: Payload,
        snapshot: Option<Payload>,
    },

    /// Reset the game for every member.
    Newgame {
        sender: ConnectionId,
        snapshot: Option<Payload>,
    },

    /// Send the current snapshot back to one member.
    SnapshotRequest { conn_id: ConnectionId },

    /// Drop a member whose transport closed.
    Leave {
        conn_id: ConnectionId,
        reply: oneshot::Sender<Option<Role>>,
    },

    /// Deliver an arbitrary message.
    Broadcast {
        msg: Outbound,
        recipient: Recipient,
        reply: oneshot::Sender<DeliveryReport>,
    },

    /// Report seats and snapshot.
    GetInfo { reply: oneshot::Sender<RoomInfo> },
}

/// A point-in-time view of a room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub created_at: SystemTime,
    pub seat_a: Option<ConnectionId>,
    pub seat_b: Option<ConnectionId>,
    /// Seated players plus spectators.
    pub member_count: usize,
    pub snapshot: Option<Payload>,
}

/// Handle to a running room actor.
///
/// Cheap to clone (an `mpsc::Sender` and the room name). Every clone
/// talks to the same actor, so the same seats and snapshot.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's id.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Returns `true` if both handles drive the same actor.
    pub fn same_room(&self, other: &RoomHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    async fn wait<T>(&self, rx: oneshot::Receiver<T>) -> Result<T, RoomError> {
        rx.await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    /// Seats a connection and returns the role it was given.
    ///
    /// By the time this returns, the `joined` reply is queued on
    /// `outbound` and the other members have been notified.
    pub async fn join(
        &self,
        conn_id: ConnectionId,
        want: Want,
        outbound: OutboundSender,
    ) -> Result<Role, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            conn_id,
            want,
            outbound,
            reply,
        })
        .await?;
        self.wait(rx).await
    }

    /// Relays a move to every other member (fire-and-forget).
    pub async fn relay_move(
        &self,
        sender: ConnectionId,
        r#move: Payload,
        snapshot: Option<Payload>,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Move {
            sender,
            r#move,
            snapshot,
        })
        .await
    }

    /// Starts a new game for every member, sender included (fire-and-forget).
    pub async fn new_game(
        &self,
        sender: ConnectionId,
        snapshot: Option<Payload>,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Newgame { sender, snapshot }).await
    }

    /// Queues the current snapshot for `conn_id` (fire-and-forget).
    pub async fn request_snapshot(
        &self,
        conn_id: ConnectionId,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::SnapshotRequest { conn_id }).await
    }

    /// Removes a member, freeing its seat if it had one.
    ///
    /// Returns the role the member held, or `None` if it wasn't a member.
    pub async fn leave(
        &self,
        conn_id: ConnectionId,
    ) -> Result<Option<Role>, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Leave { conn_id, reply }).await?;
        self.wait(rx).await
    }

    /// Delivers `msg` to the selected members.
    pub async fn broadcast(
        &self,
        msg: ServerMessage,
        recipient: Recipient,
    ) -> Result<DeliveryReport, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Broadcast {
            msg: Arc::new(msg),
            recipient,
            reply,
        })
        .await?;
        self.wait(rx).await
    }

    /// Requests the current room info.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply }).await?;
        self.wait(rx).await
    }
}

struct Member {
    role: Role,
    outbound: OutboundSender,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room_id: RoomId,
    created_at: SystemTime,
    seats: Seats,
    members: HashMap<ConnectionId, Member>,
    snapshot: Option<Payload>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs until every handle is dropped.
    async fn run(mut self) {
        tracing::debug!(room_id = %self.room_id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    conn_id,
                    want,
                    outbound,
                    reply,
                } => {
                    let role = self.handle_join(conn_id, want, outbound);
                    let _ = reply.send(role);
                }
                RoomCommand::Move {
                    sender,
                    r#move,
                    snapshot,
                } => self.handle_move(sender, r#move, snapshot),
                RoomCommand::Newgame { sender, snapshot } => {
                    self.handle_newgame(sender, snapshot);
                }
                RoomCommand::SnapshotRequest { conn_id } => {
                    let msg = ServerMessage::Snapshot {
                        snapshot: self.snapshot.clone(),
                    };
                    self.dispatch(Arc::new(msg), Recipient::Only(conn_id));
                }
                RoomCommand::Leave { conn_id, reply } => {
                    let _ = reply.send(self.handle_leave(conn_id));
                }
                RoomCommand::Broadcast {
                    msg,
                    recipient,
                    reply,
                } => {
                    let _ = reply.send(self.dispatch(msg, recipient));
                }
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
            }
        }

        tracing::debug!(room_id = %self.room_id, "room actor stopped");
    }

    fn handle_join(
        &mut self,
        conn_id: ConnectionId,
        want: Want,
        outbound: OutboundSender,
    ) -> Role {
        if let Some(existing) = self.members.get(&conn_id) {
            tracing::warn!(
                room_id = %self.room_id,
                %conn_id,
                "duplicate join, keeping existing role"
            );
            return existing.role;
        }

        let role = self.seats.assign(want);
        self.seats.occupy(role, conn_id);

        let joined = ServerMessage::Joined {
            room: self.room_id.clone(),
            color: role,
            created: self.snapshot.is_none(),
            snapshot: self.snapshot.clone(),
        };
        if let Err(e) = deliver(conn_id, &outbound, Arc::new(joined)) {
            tracing::debug!(room_id = %self.room_id, error = %e, "joined reply dropped");
        }
        self.members.insert(conn_id, Member { role, outbound });

        tracing::info!(
            room_id = %self.room_id,
            %conn_id,
            %role,
            members = self.members.len(),
            "connection joined"
        );

        let notice = ServerMessage::info(join_notice(role));
        self.dispatch(Arc::new(notice), Recipient::AllExcept(conn_id));
        role
    }

    fn handle_move(
        &mut self,
        sender: ConnectionId,
        r#move: Payload,
        snapshot: Option<Payload>,
    ) {
        if !self.is_member(sender) {
            return;
        }
        if snapshot.is_some() {
            self.snapshot = snapshot;
        }
        let msg = ServerMessage::Move { r#move };
        self.dispatch(Arc::new(msg), Recipient::AllExcept(sender));
    }

    fn handle_newgame(&mut self, sender: ConnectionId, snapshot: Option<Payload>) {
        if !self.is_member(sender) {
            return;
        }
        if snapshot.is_some() {
            self.snapshot = snapshot;
        }
        let msg = ServerMessage::Newgame {
            snapshot: self.snapshot.clone(),
        };
        self.dispatch(Arc::new(msg), Recipient::All);
    }

    fn handle_leave(&mut self, conn_id: ConnectionId) -> Option<Role> {
        let member = self.members.remove(&conn_id)?;
        self.seats.vacate(conn_id);

        tracing::info!(
            room_id = %self.room_id,
            %conn_id,
            role = %member.role,
            members = self.members.len(),
            "connection left"
        );

        let notice = ServerMessage::info(DISCONNECT_NOTICE);
        self.dispatch(Arc::new(notice), Recipient::All);
        Some(member.role)
    }

    fn is_member(&self, conn_id: ConnectionId) -> bool {
        let known = self.members.contains_key(&conn_id);
        if !known {
            tracing::warn!(
                room_id = %self.room_id,
                %conn_id,
                "message from non-member, ignoring"
            );
        }
        known
    }

    /// Best-effort fan-out. A closed recipient is recorded and skipped.
    fn dispatch(&self, msg: Outbound, recipient: Recipient) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for (conn_id, member) in &self.members {
            if recipient.includes(*conn_id) {
                report.record(deliver(*conn_id, &member.outbound, Arc::clone(&msg)));
            }
        }
        if !report.is_complete() {
            tracing::debug!(
                room_id = %self.room_id,
                delivered = report.delivered,
                failed = ?report.failed,
                "broadcast partially undelivered"
            );
        }
        report
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            created_at: self.created_at,
            seat_a: self.seats.seat_a,
            seat_b: self.seats.seat_b,
            member_count: self.members.len(),
            snapshot: self.snapshot.clone(),
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
///
/// `channel_size` bounds the command queue; senders wait when it is full.
pub(crate) fn spawn_room(room_id: RoomId, channel_size: usize) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size.max(1));

    let actor = RoomActor {
        room_id: room_id.clone(),
        created_at: SystemTime::now(),
        seats: Seats::default(),
        members: HashMap::new(),
        snapshot: None,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
