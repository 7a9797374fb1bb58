//! `RelayServer` builder and server loop.
//!
//! This ties the layers together: transport → engine → rooms.

use std::sync::Arc;
use std::time::Duration;

use seatrelay_protocol::{Codec, JsonCodec};
use seatrelay_room::{RoomConfig, RoomRegistry};
use seatrelay_transport::{
    Incoming, IncomingWebSocket, Transport, TransportError, WebSocketTransport,
};

use crate::handler::handle_connection;
use crate::{RelayEngine, RelayError};

/// Address used when the builder is not told otherwise.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3001";

/// How long a client may take to finish the WebSocket upgrade.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Builder for configuring and starting a relay server.
///
/// # Example
///
/// ```rust,no_run
/// use seatrelay::prelude::*;
///
/// # async fn start() -> Result<(), RelayError> {
/// let server = RelayServer::builder()
///     .bind("0.0.0.0:3001")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RelayServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    registry: Option<RoomRegistry>,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            room_config: RoomConfig::default(),
            registry: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the room configuration. Ignored when a registry is supplied,
    /// since the registry carries its own.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Uses an existing registry instead of creating a fresh one.
    pub fn registry(mut self, registry: RoomRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Binds the listener and assembles the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<RelayServer<JsonCodec>, RelayError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let registry = self
            .registry
            .unwrap_or_else(|| RoomRegistry::with_config(self.room_config));
        let engine = Arc::new(RelayEngine::with_registry(registry, JsonCodec));
        Ok(RelayServer { transport, engine })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound relay server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RelayServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    engine: Arc<RelayEngine<C>>,
}

impl RelayServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }
}

impl<C: Codec> RelayServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns the engine, for inspecting rooms from outside the
    /// connection tasks.
    pub fn engine(&self) -> Arc<RelayEngine<C>> {
        Arc::clone(&self.engine)
    }

    /// Runs the accept loop.
    ///
    /// Each client's upgrade handshake and message handling run on a
    /// task of their own, so a client that stalls mid-handshake never
    /// holds up the next accept. A failed accept is logged and the loop
    /// keeps going; this only returns if the process ends.
    pub async fn run(mut self) -> Result<(), RelayError> {
        tracing::info!("Seatrelay server running");

        loop {
            match self.transport.accept().await {
                Ok(incoming) => {
                    let engine = Arc::clone(&self.engine);
                    tokio::spawn(async move {
                        if let Err(e) = serve(incoming, engine).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Finishes the handshake, then hands the connection to the handler.
async fn serve<C: Codec>(
    incoming: IncomingWebSocket,
    engine: Arc<RelayEngine<C>>,
) -> Result<(), RelayError> {
    let addr = incoming.peer_addr();
    let conn = tokio::time::timeout(HANDSHAKE_TIMEOUT, incoming.upgrade())
        .await
        .map_err(|_| {
            TransportError::HandshakeFailed(format!("{addr} timed out"))
        })??;
    handle_connection(conn, engine).await
}
