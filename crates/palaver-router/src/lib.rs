//! EventRouter: typed publish/subscribe fan-out to remote
//! WebSocket consumers, with pre-buffering of silent audio and author URI
//! stamping.

pub mod client;
pub mod pre_buffer;
pub mod router;
pub mod server;
pub mod subscription;
pub mod wire;

pub use client::{Client, ClientId};
pub use router::{EventRouter, RouterConfig};
pub use subscription::Subscription;
