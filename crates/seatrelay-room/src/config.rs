//! Room configuration.

use serde::{Deserialize, Serialize};

use seatrelay_protocol::MAX_ROOM_ID_LEN;

use crate::DEFAULT_OUTBOUND_BUFFER;

/// Settings shared by every room in a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Room names are cut to this many characters before lookup.
    pub max_room_id_len: usize,

    /// Capacity of each room actor's command channel. When it fills,
    /// senders wait (backpressure) instead of growing memory.
    pub command_buffer: usize,

    /// Messages queued per connection before deliveries to it fail.
    pub outbound_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_room_id_len: MAX_ROOM_ID_LEN,
            command_buffer: 64,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}
