//! The relay engine: interprets client messages and drives the rooms.
//!
//! The engine is transport-agnostic. A connection handler calls
//! [`RelayEngine::open`] when a client arrives, feeds every inbound frame
//! to [`RelayEngine::handle_frame`], drains the returned outbound
//! receiver to the socket, and calls [`RelayEngine::close`] when the
//! transport goes away.
//!
//! Nothing a client sends can fail the engine. Undecodable frames and
//! messages from connections without a room are dropped; the only
//! replies to bad input are `error{"room required"}` and
//! `error{"already joined"}`.

use std::sync::Arc;

use seatrelay_protocol::{
    ClientMessage, Codec, JsonCodec, Payload, ProtocolError, RoomId,
    ServerMessage, Want,
};
use seatrelay_room::{
    deliver, outbound_channel, Binding, DeliveryReport, OutboundReceiver,
    Recipient, RoomError, RoomHandle, RoomInfo, RoomRegistry,
};
use seatrelay_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::RelayError;

/// Error text sent when a join carries no usable room name.
pub const ROOM_REQUIRED: &str = "room required";

/// Error text sent when a connection tries to join a second time.
pub const ALREADY_JOINED: &str = "already joined";

/// Routes client messages to rooms.
///
/// Owns its [`RoomRegistry`]; two engines never share rooms.
pub struct RelayEngine<C: Codec = JsonCodec> {
    registry: Mutex<RoomRegistry>,
    codec: C,
    max_room_id_len: usize,
    outbound_buffer: usize,
}

impl RelayEngine<JsonCodec> {
    /// Creates an engine with an empty registry and the JSON codec.
    pub fn new() -> Self {
        Self::with_registry(RoomRegistry::new(), JsonCodec)
    }
}

impl Default for RelayEngine<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> RelayEngine<C> {
    /// Creates an engine around an existing registry.
    pub fn with_registry(registry: RoomRegistry, codec: C) -> Self {
        let max_room_id_len = registry.config().max_room_id_len;
        let outbound_buffer = registry.config().outbound_buffer;
        Self {
            registry: Mutex::new(registry),
            codec,
            max_room_id_len,
            outbound_buffer,
        }
    }

    /// Serializes an outbound message with the engine's codec.
    pub fn encode(&self, msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
        self.codec.encode(msg)
    }

    /// Registers a new connection and returns the receiver its writer
    /// should drain.
    ///
    /// # Errors
    /// Fails if `conn_id` is already open.
    pub async fn open(
        &self,
        conn_id: ConnectionId,
    ) -> Result<OutboundReceiver, RelayError> {
        let (tx, rx) = outbound_channel(self.outbound_buffer);
        self.registry.lock().await.register(conn_id, tx)?;
        tracing::debug!(%conn_id, "connection opened");
        Ok(rx)
    }

    /// Decodes one inbound frame and handles it. Undecodable frames are
    /// dropped.
    pub async fn handle_frame(&self, conn_id: ConnectionId, data: &[u8]) {
        match self.codec.decode::<ClientMessage>(data) {
            Ok(msg) => self.handle_message(conn_id, msg).await,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "dropping undecodable frame");
            }
        }
    }

    /// Handles one decoded client message.
    ///
    /// Errors are logged and absorbed here; they never reach other
    /// connections.
    pub async fn handle_message(&self, conn_id: ConnectionId, msg: ClientMessage) {
        if let Err(e) = self.dispatch(conn_id, msg).await {
            tracing::debug!(%conn_id, error = %e, "message rejected");
        }
    }

    async fn dispatch(
        &self,
        conn_id: ConnectionId,
        msg: ClientMessage,
    ) -> Result<(), RelayError> {
        match msg {
            ClientMessage::Join { room, want } => {
                self.join(conn_id, &room, want).await
            }
            ClientMessage::Move { r#move, snapshot } => {
                if let Some(handle) = self.route(conn_id).await {
                    handle.relay_move(conn_id, r#move, snapshot).await?;
                }
                Ok(())
            }
            ClientMessage::Newgame { snapshot } => {
                if let Some(handle) = self.route(conn_id).await {
                    handle.new_game(conn_id, snapshot).await?;
                }
                Ok(())
            }
            ClientMessage::SnapshotPlease => {
                if let Some(handle) = self.route(conn_id).await {
                    handle.request_snapshot(conn_id).await?;
                }
                Ok(())
            }
        }
    }

    async fn join(
        &self,
        conn_id: ConnectionId,
        room: &str,
        want: Want,
    ) -> Result<(), RelayError> {
        let Some(room_id) = RoomId::parse(room, self.max_room_id_len) else {
            self.reply(conn_id, ServerMessage::error(ROOM_REQUIRED)).await?;
            return Err(ProtocolError::InvalidMessage(ROOM_REQUIRED.into()).into());
        };

        let (handle, outbound) = {
            let mut registry = self.registry.lock().await;
            let session = registry
                .session(conn_id)
                .ok_or(RoomError::UnknownConnection(conn_id))?;
            if let Some(binding) = session.binding() {
                let err = RoomError::AlreadyJoined(conn_id, binding.room_id.clone());
                deliver(
                    conn_id,
                    session.outbound(),
                    Arc::new(ServerMessage::error(ALREADY_JOINED)),
                )?;
                return Err(err.into());
            }
            let outbound = session.outbound().clone();
            (registry.get_or_create(&room_id), outbound)
        };

        let role = handle.join(conn_id, want, outbound).await?;

        let bound = self.registry.lock().await.bind(conn_id, room_id, role);
        if let Err(e) = bound {
            // The session vanished mid-join; don't leave a ghost seat.
            handle.leave(conn_id).await?;
            return Err(e.into());
        }
        Ok(())
    }

    /// Queues `msg` for a single connection.
    async fn reply(
        &self,
        conn_id: ConnectionId,
        msg: ServerMessage,
    ) -> Result<(), RelayError> {
        let registry = self.registry.lock().await;
        let session = registry
            .session(conn_id)
            .ok_or(RoomError::UnknownConnection(conn_id))?;
        deliver(conn_id, session.outbound(), Arc::new(msg))?;
        Ok(())
    }

    /// The room a connection joined, if any.
    async fn route(&self, conn_id: ConnectionId) -> Option<RoomHandle> {
        let handle = self.registry.lock().await.route(conn_id);
        if handle.is_none() {
            tracing::trace!(%conn_id, "no room bound, ignoring");
        }
        handle
    }

    /// Tears down a closed connection.
    ///
    /// Frees its seat, tells the rest of the room, and returns where it
    /// sat. Closing an unknown or never-joined connection is a no-op.
    pub async fn close(&self, conn_id: ConnectionId) -> Option<Binding> {
        let (binding, handle) = {
            let mut registry = self.registry.lock().await;
            let session = registry.unregister(conn_id)?;
            let binding = session.binding().cloned()?;
            let handle = registry.get(&binding.room_id);
            (binding, handle)
        };

        if let Some(handle) = handle {
            if let Err(e) = handle.leave(conn_id).await {
                tracing::debug!(%conn_id, error = %e, "leave failed");
            }
        }
        tracing::debug!(%conn_id, room_id = %binding.room_id, "connection closed");
        Some(binding)
    }

    /// Sends `msg` to every member of `room_id`, optionally skipping one.
    ///
    /// Best effort: an unknown room yields an empty report, and closed
    /// recipients are listed in the report rather than failing the call.
    pub async fn broadcast(
        &self,
        room_id: &RoomId,
        msg: ServerMessage,
        except: Option<ConnectionId>,
    ) -> DeliveryReport {
        let Some(handle) = self.registry.lock().await.get(room_id) else {
            return DeliveryReport::default();
        };
        let recipient = except.map_or(Recipient::All, Recipient::AllExcept);
        match handle.broadcast(msg, recipient).await {
            Ok(report) => report,
            Err(e) => {
                tracing::debug!(%room_id, error = %e, "broadcast failed");
                DeliveryReport::default()
            }
        }
    }

    /// Returns seats and snapshot of a room, if it exists.
    pub async fn room_info(&self, room_id: &RoomId) -> Option<RoomInfo> {
        let handle = self.registry.lock().await.get(room_id)?;
        handle.info().await.ok()
    }

    /// Returns the current snapshot of a room, if one was recorded.
    pub async fn snapshot(&self, room_id: &RoomId) -> Option<Payload> {
        self.room_info(room_id).await?.snapshot
    }

    /// Returns where a connection sits, if it has joined.
    pub async fn binding(&self, conn_id: ConnectionId) -> Option<Binding> {
        let registry = self.registry.lock().await;
        registry.session(conn_id)?.binding().cloned()
    }

    /// Returns the number of rooms created so far.
    pub async fn room_count(&self) -> usize {
        self.registry.lock().await.room_count()
    }
}
