//! Core protocol types for Seatrelay's wire format.
//!
//! Every type here travels "on the wire": clients send JSON text frames
//! that decode into [`ClientMessage`], and the relay answers with
//! [`ServerMessage`] values encoded the same way.
//!
//! Game payloads (moves, snapshots) are opaque to the relay. They are
//! carried as [`Payload`] — an arbitrary JSON value — and forwarded
//! untouched.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ProtocolError;

/// An opaque game payload (a move or a full snapshot).
///
/// The relay never looks inside. Whatever JSON the client sent is what
/// the other room members receive.
pub type Payload = serde_json::Value;

/// Maximum length of a room identifier, in characters.
pub const MAX_ROOM_ID_LEN: usize = 40;

// ---------------------------------------------------------------------------
// RoomId
// ---------------------------------------------------------------------------

/// A client-chosen room name.
///
/// Rooms are addressed by whatever string the first joiner picked, so
/// this is a newtype over `String` rather than a generated number.
/// A `RoomId` is only constructed through [`RoomId::parse`], which
/// enforces the length bound and rejects empty names. Deserializing goes
/// through the same check and refuses ids `parse` would have changed.
///
/// On the wire it is the bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Builds a room id from raw client input.
    ///
    /// The input is cut to its first `max_len` characters (not bytes, so
    /// a multi-byte name is never split mid-character). Returns `None`
    /// when nothing but whitespace survives the cut.
    pub fn parse(raw: &str, max_len: usize) -> Option<Self> {
        let truncated: String = raw.chars().take(max_len).collect();
        if truncated.trim().is_empty() {
            return None;
        }
        Some(Self(truncated))
    }

    /// Returns the room name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ProtocolError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        match Self::parse(&raw, MAX_ROOM_ID_LEN) {
            Some(id) if id.0 == raw => Ok(id),
            _ => Err(ProtocolError::InvalidMessage(format!(
                "invalid room id {raw:?}"
            ))),
        }
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Role / Want
// ---------------------------------------------------------------------------

/// The role a connection holds inside its room.
///
/// A room has two seats and any number of spectators. On the wire the
/// seats keep the names existing clients already use: `"white"` for
/// seat A and `"black"` for seat B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The first seat.
    #[serde(rename = "white")]
    SeatA,
    /// The second seat.
    #[serde(rename = "black")]
    SeatB,
    /// Watches the room; never holds a seat.
    #[serde(rename = "spectator")]
    Spectator,
}

impl Role {
    /// Returns `true` for [`Role::SeatA`] and [`Role::SeatB`].
    pub fn is_seat(self) -> bool {
        matches!(self, Self::SeatA | Self::SeatB)
    }

    /// The wire name of this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SeatA => "white",
            Self::SeatB => "black",
            Self::Spectator => "spectator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The seat a joining client asks for.
///
/// The request is a preference, not a demand: the seating policy may
/// hand out a different seat (or none) when the wanted one is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Want {
    /// Prefer seat A.
    SeatA,
    /// Prefer seat B.
    SeatB,
    /// No preference.
    #[default]
    Any,
}

impl Want {
    /// Maps a wire value onto a preference.
    ///
    /// Both the seat names (`SeatA`, `SeatB`) and the colour names
    /// (`white`, `black`) are accepted. Anything else, including
    /// non-strings, means "no preference".
    pub fn from_wire(value: &serde_json::Value) -> Self {
        match value.as_str() {
            Some("SeatA" | "white") => Self::SeatA,
            Some("SeatB" | "black") => Self::SeatB,
            _ => Self::Any,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::SeatA => "SeatA",
            Self::SeatB => "SeatB",
            Self::Any => "any",
        }
    }
}

impl Serialize for Want {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Want {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_wire(&value))
    }
}

/// Reads a room name leniently, the way browsers coerce a value to text.
///
/// Falsy values (`null`, `false`, `0`, `""`) become the empty string and
/// are later rejected as "room required". Arrays join their elements
/// with commas and objects read as `[object Object]`.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if is_falsy(&value) {
        return Ok(String::new());
    }
    Ok(coerce_to_text(&value))
}

fn is_falsy(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn coerce_to_text(value: &serde_json::Value) -> String {
    use serde_json::Value;
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(coerce_to_text)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// ClientMessage — inbound
// ---------------------------------------------------------------------------

/// Messages a client sends to the relay.
///
/// Internally tagged by `type`, e.g.
/// `{ "type": "join", "room": "lobby", "want": "white" }`.
/// An unknown `type` or a missing required field fails to decode; the
/// relay drops such frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Enter a room (creating it if needed) and take a role.
    Join {
        /// Raw room name, validated by [`RoomId::parse`].
        #[serde(default, deserialize_with = "lenient_string")]
        room: String,
        /// Seat preference.
        #[serde(default)]
        want: Want,
    },

    /// Relay a move to everyone else in the room.
    Move {
        /// The move itself, forwarded verbatim.
        r#move: Payload,
        /// The sender's view of the game after the move.
        #[serde(default)]
        snapshot: Option<Payload>,
    },

    /// Restart the game for the whole room.
    Newgame {
        #[serde(default)]
        snapshot: Option<Payload>,
    },

    /// Ask for the last recorded snapshot of the room.
    SnapshotPlease,
}

// ---------------------------------------------------------------------------
// ServerMessage — outbound
// ---------------------------------------------------------------------------

/// Messages the relay sends to clients.
///
/// `None` snapshots serialize as `null`, which clients read as "no game
/// recorded yet".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Reply to a successful join.
    Joined {
        room: RoomId,
        /// The role handed out by the seating policy.
        color: Role,
        /// `true` when the room had no snapshot yet, meaning the joiner
        /// should set up a fresh game.
        created: bool,
        snapshot: Option<Payload>,
    },

    /// Human-readable notice (someone joined or left).
    Info { text: String },

    /// A move made by another member.
    Move { r#move: Payload },

    /// The room restarted; `snapshot` is the new authoritative state.
    Newgame { snapshot: Option<Payload> },

    /// Reply to `snapshot-please`.
    Snapshot { snapshot: Option<Payload> },

    /// A request was rejected.
    Error { message: String },
}

impl ServerMessage {
    /// Shorthand for an [`ServerMessage::Info`] notice.
    pub fn info(text: impl Into<String>) -> Self {
        Self::Info { text: text.into() }
    }

    /// Shorthand for an [`ServerMessage::Error`] reply.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
