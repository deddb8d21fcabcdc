//! Websocket endpoint for the driving simulator

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{info, warn};

use super::protocol::handle_message;
use crate::common::PlannerResult;
use crate::planner::HighwayPlanner;

/// Planner context shared by all connections
pub type SharedPlanner = Arc<Mutex<HighwayPlanner>>;

/// Accept simulator connections until the listener fails
pub async fn serve(listener: TcpListener, planner: SharedPlanner) -> PlannerResult<()> {
    info!("listening on ws://{}", listener.local_addr()?);

    loop {
        let (stream, peer) = listener.accept().await?;
        let planner = Arc::clone(&planner);
        tokio::spawn(async move {
            handle_connection(stream, peer, planner).await;
        });
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, planner: SharedPlanner) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("websocket handshake with {} failed: {}", peer, e);
            return;
        }
    };
    info!("simulator connected: {}", peer);

    let (mut write, mut read) = ws.split();
    while let Some(msg) = read.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("connection {} errored: {}", peer, e);
                break;
            }
        };

        // one frame at a time across every connection
        let reply = {
            let mut planner = planner.lock().await;
            handle_message(&mut planner, &text)
        };

        if let Some(reply) = reply {
            if let Err(e) = write.send(Message::Text(reply)).await {
                warn!("failed to send to {}: {}", peer, e);
                break;
            }
        }
    }

    info!("simulator disconnected: {}", peer);
}
