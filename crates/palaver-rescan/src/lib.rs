//! Rescanner: replays a remote draft's audio through a local
//! pipeline and submits the re-transcribed revision back to the source.

pub mod net_listener;
pub mod rescanner;
pub mod revision;

pub use net_listener::{NetListener, RemoteEvent};
pub use rescanner::{Rescanner, RescannerConfig};
pub use revision::{HttpRevisionSink, RevisionSink};
