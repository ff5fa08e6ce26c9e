//! Shared data model: audio chunks, lifecycle events, text/command events,
//! and drafts. All identifiers are opaque 128-bit values; timestamps are
//! seconds against a monotonic epoch shared by the event's producer.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub type SourceId = Uuid;
pub type EventId = Uuid;
pub type DraftId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelCount {
    Mono(u16),
    Pair { input: u16, output: u16 },
}

impl ChannelCount {
    /// Normalizes either a scalar or an input/output pair to an input
    /// channel count, per the router's tolerant handling of this field.
    pub fn input_channels(&self) -> u16 {
        match self {
            ChannelCount::Mono(n) => *n,
            ChannelCount::Pair { input, .. } => *input,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleType {
    F32,
    I16,
}

/// An immutable buffer of PCM samples. `duration` is approximately
/// `blocksize / sample_rate`; samples are normalized to `[-1.0, 1.0]`
/// once converted to float32.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub source_id: SourceId,
    pub stream_start_time: f64,
    pub timestamp: f64,
    pub duration: f64,
    pub sample_rate: u32,
    pub channels: ChannelCount,
    pub blocksize: usize,
    pub sample_type: SampleType,
    pub in_speech: bool,
    pub data: Arc<[f32]>,
}

impl AudioChunk {
    pub fn end_time(&self) -> f64 {
        self.timestamp + self.duration
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    Normal,
    Error,
    Eof,
}

/// Lifecycle events from AudioSource/VADFilter, forwarded unchanged by AudioMerge except that the
/// post-VAD flavor carries `SpeechStart`/`SpeechStop` in place of AudioSource's raw
/// stream.
#[derive(Debug, Clone)]
pub enum AudioLifecycleEvent {
    Start {
        source: SourceId,
        sample_rate: u32,
        channels: ChannelCount,
    },
    Stop {
        source: SourceId,
        reason: StopReason,
    },
    Error {
        source: SourceId,
        message: String,
    },
    SpeechStart {
        source: SourceId,
        silence_ms: u32,
        threshold: f32,
        pad_ms: u32,
        sample_rate: u32,
        at: f64,
    },
    SpeechStop {
        source: SourceId,
        last_in_speech_chunk_time: f64,
    },
}

/// One transcribed segment within a `TextEvent`, with the segment's offset
/// in milliseconds relative to `audio_start_time`.
#[derive(Debug, Clone)]
pub struct TextSegment {
    pub text: String,
    pub start_ms: u32,
    pub end_ms: u32,
}

#[derive(Debug, Clone)]
pub struct TextEvent {
    pub event_id: EventId,
    pub audio_source_id: SourceId,
    pub audio_start_time: f64,
    pub audio_end_time: f64,
    pub text: String,
    pub segments: Vec<TextSegment>,
}

impl TextEvent {
    pub fn new(
        audio_source_id: SourceId,
        audio_start_time: f64,
        audio_end_time: f64,
        text: impl Into<String>,
    ) -> Self {
        debug_assert!(audio_end_time >= audio_start_time);
        Self {
            event_id: Uuid::new_v4(),
            audio_source_id,
            audio_start_time,
            audio_end_time,
            text: text.into(),
            segments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    StartBlock,
    StopBlock,
    Custom(String),
}

/// Emitted by CommandDispatch on a fuzzy-match hit against an attention or command
/// phrase set.
#[derive(Debug, Clone)]
pub struct CommandEvent {
    pub command: CommandKind,
    pub matched_pattern: String,
    pub match_offset: usize,
    pub matched_text: String,
    pub text_event: TextEvent,
    pub alert_text_event: Option<TextEvent>,
}

/// Sentinel `end_text` used by [`crate::draft_maker::DraftMaker::force_end`]
/// when a draft closes without an explicit stop phrase.
pub const FORCED_END_TEXT: &str = "forced end";

/// Body of text bracketed by a recognized start phrase and a recognized end
/// phrase (or a forced end). `end_text` is empty while open; once set the
/// draft is immutable.
#[derive(Debug, Clone)]
pub struct Draft {
    pub draft_id: DraftId,
    pub parent_draft_id: Option<DraftId>,
    pub timestamp: f64,
    pub audio_start_time: f64,
    pub audio_end_time: f64,
    pub start_text: String,
    pub end_text: String,
    pub full_text: String,
    pub start_matched_events: Vec<EventId>,
    pub end_matched_events: Vec<EventId>,
}

impl Draft {
    pub fn is_open(&self) -> bool {
        self.end_text.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum DraftEvent {
    DraftStart(Draft),
    DraftEnd(Draft),
    DraftRescan {
        original_id: DraftId,
        revised_draft: Draft,
    },
}
