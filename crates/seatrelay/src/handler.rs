//! Per-connection handler: pumps frames between a transport connection
//! and the relay engine.
//!
//! Each accepted connection gets its own Tokio task running this handler:
//!   1. Register with the engine → get the outbound receiver
//!   2. Spawn a writer task draining that receiver to the socket
//!   3. Loop: receive frames → hand them to the engine, one at a time
//!   4. On close (or panic), the guard tells the engine to clean up

use std::sync::Arc;

use seatrelay_protocol::Codec;
use seatrelay_room::OutboundReceiver;
use seatrelay_transport::{Connection, ConnectionId, WebSocketConnection};

use crate::{RelayEngine, RelayError};

/// Drop guard that removes a connection from its room when the handler
/// exits.
///
/// `Drop` is synchronous, so the async cleanup is spawned as a
/// fire-and-forget task.
struct ConnectionGuard<C: Codec> {
    conn_id: ConnectionId,
    engine: Arc<RelayEngine<C>>,
}

impl<C: Codec> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            engine.close(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    engine: Arc<RelayEngine<C>>,
) -> Result<(), RelayError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let outbound = engine.open(conn_id).await?;
    let _guard = ConnectionGuard {
        conn_id,
        engine: Arc::clone(&engine),
    };

    tokio::spawn(write_loop(Arc::clone(&conn), Arc::clone(&engine), outbound));

    loop {
        match conn.recv().await {
            Ok(Some(data)) => engine.handle_frame(conn_id, &data).await,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        }
    }

    // _guard drops here → engine.close fires, which drops the last
    // outbound senders and ends the writer.
    Ok(())
}

/// Drains a connection's outbound queue to its socket.
///
/// Stops at the first failed send. Later messages for this connection
/// then fail at the channel and show up in delivery reports.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    engine: Arc<RelayEngine<C>>,
    mut outbound: OutboundReceiver,
) {
    let conn_id = conn.id();
    while let Some(msg) = outbound.recv().await {
        let bytes = match engine.encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to encode message");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}
