// WebSocket preview feed.
//
// Mirrors navigation to any connected client: each client receives the
// current frame on connect and a new JSON text frame whenever the router
// moves. Inbound messages are ignored.

use futures_util::{Sink, SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use xb2bx_core::model::{Role, User};

use crate::router::{Screen, View};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewFrame {
    pub view: View,
    pub active_rfq_id: Option<i64>,
    pub screen: Screen,
    pub user: Option<PreviewUser>,
}

/// The part of the signed-in user a preview client may see.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewUser {
    pub id: i64,
    pub role: Role,
}

impl From<&User> for PreviewUser {
    fn from(user: &User) -> Self {
        PreviewUser {
            id: user.id,
            role: user.role,
        }
    }
}

impl Default for PreviewFrame {
    fn default() -> Self {
        PreviewFrame {
            view: View::Home,
            active_rfq_id: None,
            screen: Screen::Login,
            user: None,
        }
    }
}

/// Serve the feed on `host:port` until the process exits.
pub async fn run(host: &str, port: u16, frames: watch::Receiver<PreviewFrame>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    info!("Preview feed listening on ws://{}", listener.local_addr()?);

    loop {
        let (stream, addr) = listener.accept().await?;
        let mut frames = frames.clone();
        tokio::spawn(async move {
            let ws = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("Preview handshake failed for {addr}: {e}");
                    return;
                }
            };
            info!("Preview client connected from {addr}");
            let (write, mut read) = ws.split();
            // Drain inbound frames so close and ping are processed.
            let reader = tokio::spawn(async move { while let Some(Ok(_)) = read.next().await {} });
            frames.mark_changed();
            forward_frames(&mut frames, write).await;
            reader.abort();
            info!("Preview client {addr} disconnected");
        });
    }
}

/// Push every frame change into `sink` until either side closes.
///
/// Generic over the sink so it can be driven without a socket.
pub async fn forward_frames<S>(frames: &mut watch::Receiver<PreviewFrame>, mut sink: S)
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while frames.changed().await.is_ok() {
        let json = match serde_json::to_string(&*frames.borrow_and_update()) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode preview frame: {e}");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(json.into())).await {
            debug!("Preview sink closed: {e}");
            break;
        }
    }
}
