//! WebSocket transport for the router: one accept loop plus one send task
//! per connected client. The handshake is a single JSON frame,
//! `{"subscribe": [tag, ...]}`, sent by the client immediately after
//! connecting.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use palaver_foundation::error::{PalaverError, RouterError};

use crate::router::EventRouter;
use crate::subscription::Subscription;

#[derive(Debug, Deserialize)]
struct SubscribeRequest {
    subscribe: Vec<String>,
}

/// Accepts connections on `addr` until the returned task is aborted.
pub async fn serve(addr: SocketAddr, router: Arc<EventRouter>) -> Result<(), PalaverError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| PalaverError::Router(RouterError::WebSocket(e.to_string())))?;
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| PalaverError::Router(RouterError::WebSocket(e.to_string())))?;
        let router = router.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, peer, router).await {
                warn!(%peer, error = %err, "router client connection ended with error");
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Arc<EventRouter>,
) -> Result<(), PalaverError> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| PalaverError::Router(RouterError::WebSocket(e.to_string())))?;
    let (mut sink, mut stream) = ws.split();

    let subscription = match stream.next().await {
        Some(Ok(Message::Text(text))) => parse_subscription(&text),
        _ => {
            return Err(PalaverError::Router(RouterError::RemoteProtocolError(
                "expected a subscribe handshake frame".into(),
            )))
        }
    };

    let (client_id, mut outbox) = router.register_client(subscription);
    debug!(%peer, client = %client_id, "router client registered");

    loop {
        tokio::select! {
            outgoing = outbox.recv() => {
                match outgoing {
                    Some(text) => {
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => break,
                }
            }
        }
    }

    router.unregister_client(client_id);
    let _ = sink.close().await;
    Ok(())
}

fn parse_subscription(text: &str) -> Subscription {
    match serde_json::from_str::<SubscribeRequest>(text) {
        Ok(req) => Subscription::from_tags(req.subscribe),
        Err(_) => Subscription::from_tags(std::iter::empty()),
    }
}
