//! Room registry: the room table plus one session record per connection.

use std::collections::HashMap;

use seatrelay_protocol::{Role, RoomId};
use seatrelay_transport::ConnectionId;

use crate::broadcast::OutboundSender;
use crate::room::spawn_room;
use crate::{RoomConfig, RoomError, RoomHandle};

/// Where a connection sits once it has joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub room_id: RoomId,
    pub role: Role,
}

/// Session state for one open connection.
///
/// Lives in the registry rather than on the transport handle, so the
/// transport layer knows nothing about rooms. A session starts unbound
/// and is bound at most once.
#[derive(Debug, Clone)]
pub struct Session {
    outbound: OutboundSender,
    binding: Option<Binding>,
}

impl Session {
    /// The connection's outbound channel.
    pub fn outbound(&self) -> &OutboundSender {
        &self.outbound
    }

    /// Room and role, if the connection has joined.
    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    /// The room this connection joined.
    pub fn room_id(&self) -> Option<&RoomId> {
        self.binding.as_ref().map(|b| &b.room_id)
    }

    /// The role handed out at join time; `None` means unassigned.
    pub fn role(&self) -> Option<Role> {
        self.binding.as_ref().map(|b| b.role)
    }
}

/// Owns every room and every connection's session record.
///
/// Not thread-safe by itself: the relay engine keeps it behind a mutex
/// and holds that lock only for map operations, never across room I/O.
/// Several registries can coexist, each with fully independent rooms.
///
/// Rooms are never removed; they live as long as the registry.
pub struct RoomRegistry {
    rooms: HashMap<RoomId, RoomHandle>,
    sessions: HashMap<ConnectionId, Session>,
    config: RoomConfig,
}

impl RoomRegistry {
    /// Creates an empty registry with default settings.
    pub fn new() -> Self {
        Self::with_config(RoomConfig::default())
    }

    /// Creates an empty registry with the given settings.
    pub fn with_config(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            sessions: HashMap::new(),
            config,
        }
    }

    /// Returns the registry's settings.
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Returns the room called `room_id`, spawning it on first use.
    ///
    /// Idempotent: every call with the same id yields a handle to the
    /// same room actor. Must be called from within a Tokio runtime.
    pub fn get_or_create(&mut self, room_id: &RoomId) -> RoomHandle {
        if let Some(handle) = self.rooms.get(room_id) {
            return handle.clone();
        }
        let handle = spawn_room(room_id.clone(), self.config.command_buffer);
        self.rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, rooms = self.rooms.len(), "room created");
        handle
    }

    /// Returns the room called `room_id` if it exists.
    pub fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.rooms.get(room_id).cloned()
    }

    /// Starts tracking a freshly accepted connection.
    pub fn register(
        &mut self,
        conn_id: ConnectionId,
        outbound: OutboundSender,
    ) -> Result<(), RoomError> {
        if self.sessions.contains_key(&conn_id) {
            return Err(RoomError::AlreadyRegistered(conn_id));
        }
        self.sessions.insert(
            conn_id,
            Session {
                outbound,
                binding: None,
            },
        );
        Ok(())
    }

    /// Returns the session record of a connection.
    pub fn session(&self, conn_id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&conn_id)
    }

    /// Records the room and role a connection was given.
    ///
    /// # Errors
    /// [`RoomError::UnknownConnection`] if the connection isn't
    /// registered, [`RoomError::AlreadyJoined`] if it was bound before.
    pub fn bind(
        &mut self,
        conn_id: ConnectionId,
        room_id: RoomId,
        role: Role,
    ) -> Result<(), RoomError> {
        let session = self
            .sessions
            .get_mut(&conn_id)
            .ok_or(RoomError::UnknownConnection(conn_id))?;
        if let Some(existing) = &session.binding {
            return Err(RoomError::AlreadyJoined(
                conn_id,
                existing.room_id.clone(),
            ));
        }
        session.binding = Some(Binding { room_id, role });
        Ok(())
    }

    /// Returns the room a connection is bound to, if any.
    pub fn route(&self, conn_id: ConnectionId) -> Option<RoomHandle> {
        let room_id = self.sessions.get(&conn_id)?.room_id()?;
        self.rooms.get(room_id).cloned()
    }

    /// Forgets a connection and returns its last session record.
    pub fn unregister(&mut self, conn_id: ConnectionId) -> Option<Session> {
        self.sessions.remove(&conn_id)
    }

    /// Returns the number of rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Lists all room ids.
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().cloned().collect()
    }

    /// Returns the number of tracked connections.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
