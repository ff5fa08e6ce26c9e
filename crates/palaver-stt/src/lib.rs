//! Speech-to-text abstraction layer for Palaver
//!
//! This crate provides the core abstractions for speech-to-text functionality,
//! including transcription events, configuration, the plugin architecture,
//! and the Transcriber job-queue worker.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

pub mod constants;
pub mod plugin;
pub mod plugin_adapter;
pub mod plugin_types;
pub mod plugins;
pub mod transcriber;
pub mod types;
pub mod validation;

pub use palaver_foundation::error::PalaverError;
pub use plugin::SttPlugin;
pub use plugin_adapter::PluginAdapter;
pub use transcriber::{Transcriber, TranscriberConfig};
pub use types::{TranscriptionConfig, TranscriptionEvent, WordInfo};

/// Generates unique utterance IDs
static UTTERANCE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique utterance ID
pub fn next_utterance_id() -> u64 {
    UTTERANCE_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Streaming STT interface used by [`PluginAdapter`]: per-frame processing,
/// finalize at speech end, and reset.
#[async_trait]
pub trait StreamingStt: Send + Sync {
    async fn on_speech_frame(&mut self, samples: &[i16]) -> Option<TranscriptionEvent>;
    async fn on_speech_end(&mut self) -> Option<TranscriptionEvent>;
    async fn reset(&mut self);
}
