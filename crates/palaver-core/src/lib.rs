//! Shared data model, AudioMerge, CommandDispatch, DraftMaker,
//! StreamMonitor, TopErrorHandler, and the typed event bus that wires
//! them together.

pub mod audio_merge;
pub mod command_dispatch;
pub mod draft_maker;
pub mod event_bus;
pub mod fuzzy;
pub mod patterns;
pub mod stream_monitor;
pub mod supervisor;
pub mod types;

pub use audio_merge::{AudioMerge, MergedEvent};
pub use command_dispatch::{CommandDispatch, CommandDispatchConfig};
pub use draft_maker::DraftMaker;
pub use event_bus::EventBus;
pub use patterns::{CommandDefinition, Pattern};
pub use stream_monitor::StreamMonitor;
pub use supervisor::{RecoveryCallbacks, TopErrorHandler};
pub use types::*;
