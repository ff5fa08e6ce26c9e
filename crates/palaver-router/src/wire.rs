//! JSON wire shape for outgoing events. `event_class` is the dispatch tag a
//! remote listener switches on (and the subscription tag clients register
//! with); `author_uri` is stamped separately by [`crate::router::EventRouter`]
//! so every envelope carries the same optional provenance field regardless
//! of family.

use serde_json::{json, Value};

use palaver_core::types::{
    AudioChunk, AudioLifecycleEvent, CommandEvent, Draft, DraftEvent, StopReason, TextEvent,
};

#[derive(Debug, Clone)]
pub struct WireEnvelope {
    pub event_class: &'static str,
    pub author_uri: Option<String>,
    pub payload: Value,
}

impl WireEnvelope {
    pub fn to_json(&self) -> Value {
        let mut value = self.payload.clone();
        if let Value::Object(map) = &mut value {
            map.insert("event_class".into(), json!(self.event_class));
            map.insert("author_uri".into(), json!(self.author_uri));
        }
        value
    }
}

/// `Arc<[f32]>` flattens to a plain JSON number array, matching how the
/// original server turned numpy buffers into portable sequences.
pub fn audio_chunk_envelope(chunk: &AudioChunk) -> WireEnvelope {
    let samples: Vec<f32> = chunk.data.iter().copied().collect();
    WireEnvelope {
        event_class: "AudioChunkEvent",
        author_uri: None,
        payload: json!({
            "event_type": "AUDIO_CHUNK",
            "source_id": chunk.source_id,
            "stream_start_time": chunk.stream_start_time,
            "timestamp": chunk.timestamp,
            "duration": chunk.duration,
            "sample_rate": chunk.sample_rate,
            "channels": chunk.channels.input_channels(),
            "sample_type": match chunk.sample_type {
                palaver_core::types::SampleType::F32 => "f32",
                palaver_core::types::SampleType::I16 => "i16",
            },
            "blocksize": chunk.blocksize,
            "in_speech": chunk.in_speech,
            "data": samples,
        }),
    }
}

pub fn audio_lifecycle_envelope(event: &AudioLifecycleEvent) -> WireEnvelope {
    let (event_type, payload) = match event {
        AudioLifecycleEvent::Start {
            source,
            sample_rate,
            channels,
        } => (
            "AUDIO_START",
            json!({
                "source": source,
                "sample_rate": sample_rate,
                "channels": channels.input_channels(),
            }),
        ),
        AudioLifecycleEvent::Stop { source, reason } => (
            "AUDIO_STOP",
            json!({
                "source": source,
                "reason": match reason {
                    StopReason::Normal => "normal",
                    StopReason::Error => "error",
                    StopReason::Eof => "eof",
                },
            }),
        ),
        AudioLifecycleEvent::Error { source, message } => (
            "AUDIO_ERROR",
            json!({ "source": source, "message": message }),
        ),
        AudioLifecycleEvent::SpeechStart {
            source,
            silence_ms,
            threshold,
            pad_ms,
            sample_rate,
            at,
        } => (
            "AUDIO_SPEECH_START",
            json!({
                "source": source,
                "silence_ms": silence_ms,
                "threshold": threshold,
                "pad_ms": pad_ms,
                "sample_rate": sample_rate,
                "at": at,
            }),
        ),
        AudioLifecycleEvent::SpeechStop {
            source,
            last_in_speech_chunk_time,
        } => (
            "AUDIO_SPEECH_STOP",
            json!({
                "source": source,
                "last_in_speech_chunk_time": last_in_speech_chunk_time,
            }),
        ),
    };
    WireEnvelope {
        event_class: "AudioLifecycleEvent",
        author_uri: None,
        payload: merge_event_type(payload, event_type),
    }
}

pub fn text_envelope(event: &TextEvent) -> WireEnvelope {
    WireEnvelope {
        event_class: "TextEvent",
        author_uri: None,
        payload: json!({
            "event_type": "TextEvent",
            "event_id": event.event_id,
            "audio_source_id": event.audio_source_id,
            "audio_start_time": event.audio_start_time,
            "audio_end_time": event.audio_end_time,
            "text": event.text,
            "segments": event.segments.iter().map(|s| json!({
                "text": s.text,
                "start_ms": s.start_ms,
                "end_ms": s.end_ms,
            })).collect::<Vec<_>>(),
        }),
    }
}

pub fn command_envelope(event: &CommandEvent) -> WireEnvelope {
    WireEnvelope {
        event_class: "CommandEvent",
        author_uri: None,
        payload: json!({
            "event_type": "CommandEvent",
            "command": format!("{:?}", event.command),
            "matched_pattern": event.matched_pattern,
            "match_offset": event.match_offset,
            "matched_text": event.matched_text,
            "text_event": text_envelope(&event.text_event).payload,
        }),
    }
}

fn draft_json(draft: &Draft) -> Value {
    json!({
        "draft_id": draft.draft_id,
        "parent_draft_id": draft.parent_draft_id,
        "timestamp": draft.timestamp,
        "audio_start_time": draft.audio_start_time,
        "audio_end_time": draft.audio_end_time,
        "start_text": draft.start_text,
        "end_text": draft.end_text,
        "full_text": draft.full_text,
    })
}

pub fn draft_envelope(event: &DraftEvent) -> WireEnvelope {
    match event {
        DraftEvent::DraftStart(draft) => WireEnvelope {
            event_class: "DraftStartEvent",
            author_uri: None,
            payload: json!({ "event_type": "DraftStartEvent", "draft": draft_json(draft) }),
        },
        DraftEvent::DraftEnd(draft) => WireEnvelope {
            event_class: "DraftEndEvent",
            author_uri: None,
            payload: json!({ "event_type": "DraftEndEvent", "draft": draft_json(draft) }),
        },
        DraftEvent::DraftRescan {
            original_id,
            revised_draft,
        } => WireEnvelope {
            event_class: "DraftRescanEvent",
            author_uri: None,
            payload: json!({
                "event_type": "DraftRescanEvent",
                "original_id": original_id,
                "revised_draft": draft_json(revised_draft),
            }),
        },
    }
}

fn merge_event_type(mut payload: Value, event_type: &str) -> Value {
    if let Value::Object(map) = &mut payload {
        map.insert("event_type".into(), json!(event_type));
    }
    payload
}
