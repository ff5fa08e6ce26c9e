//! Registered remote subscribers. Each client owns an unbounded channel of
//! already-serialized JSON text; the caller (typically [`crate::server`])
//! drains it from its own send task (one per remote subscriber).

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::subscription::Subscription;

pub type ClientId = Uuid;

pub struct Client {
    pub id: ClientId,
    pub subscription: Subscription,
    tx: mpsc::UnboundedSender<String>,
}

impl Client {
    /// Attempts to deliver `text`. A failure means the peer disconnected;
    /// the caller should drop this client from the registry.
    pub fn send(&self, text: String) -> bool {
        self.tx.send(text).is_ok()
    }
}

/// Registers a new client, returning its handle plus the receiving half of
/// its outbound channel for the caller to forward over a real transport.
pub fn register(subscription: Subscription) -> (Client, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let client = Client {
        id: Uuid::new_v4(),
        subscription,
        tx,
    };
    (client, rx)
}
