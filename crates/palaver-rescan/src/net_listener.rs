//! WebSocket client to a source node's EventRouter (the remote side of
//! `palaver-router`). Mirrors the original `NetListener`: subscribes once at
//! connect time, dispatches incoming frames by `event_class`, and can be
//! paused without dropping the socket so the connection stays warm while the
//! rescanner is between segments.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use palaver_core::types::{AudioChunk, ChannelCount, Draft, SampleType};
use palaver_foundation::error::{PalaverError, RouterError};

/// The three families the rescanner needs.
const SUBSCRIBE_TAGS: [&str; 3] = ["AudioChunkEvent", "DraftStartEvent", "DraftEndEvent"];

#[derive(Debug, Clone)]
pub enum RemoteEvent {
    AudioChunk(AudioChunk),
    DraftStart(Draft),
    DraftEnd(Draft),
}

pub struct NetListener {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    paused: Arc<AtomicBool>,
}

impl NetListener {
    /// Connects to `url` (e.g. `ws://host:port/events`) and sends the
    /// subscribe handshake immediately.
    pub async fn connect(url: &str) -> Result<Self, PalaverError> {
        let (mut socket, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| PalaverError::Router(RouterError::WebSocket(e.to_string())))?;
        let handshake = json!({ "subscribe": SUBSCRIBE_TAGS }).to_string();
        socket
            .send(Message::Text(handshake.into()))
            .await
            .map_err(|e| PalaverError::Router(RouterError::WebSocket(e.to_string())))?;
        Ok(Self {
            socket,
            paused: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Stops emitting parsed events without closing the socket: frames are
    /// still read (and discarded) so the connection does not go idle.
    pub fn pause_streaming(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume_streaming(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Awaits the next dispatchable event. Returns `Ok(None)` on a frame
    /// that parsed but is irrelevant (unrecognized class, or swallowed while
    /// paused), and on a clean connection close.
    pub async fn recv(&mut self) -> Result<Option<RemoteEvent>, PalaverError> {
        loop {
            let Some(msg) = self.socket.next().await else {
                return Ok(None);
            };
            let msg = msg.map_err(|e| PalaverError::Router(RouterError::WebSocket(e.to_string())))?;
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => return Ok(None),
                _ => continue,
            };
            let Ok(value) = serde_json::from_str::<Value>(&text) else {
                continue;
            };
            if self.paused.load(Ordering::SeqCst) {
                continue;
            }
            if let Some(event) = parse_remote_event(&value) {
                return Ok(Some(event));
            }
        }
    }

    pub async fn close(mut self) -> Result<(), PalaverError> {
        self.socket
            .close(None)
            .await
            .map_err(|e| PalaverError::Router(RouterError::WebSocket(e.to_string())))
    }
}

fn parse_remote_event(value: &Value) -> Option<RemoteEvent> {
    let event_class = value.get("event_class")?.as_str()?;
    match event_class {
        "AudioChunkEvent" => parse_audio_chunk(value).map(RemoteEvent::AudioChunk),
        "DraftStartEvent" => parse_draft(value.get("draft")?).map(RemoteEvent::DraftStart),
        "DraftEndEvent" => parse_draft(value.get("draft")?).map(RemoteEvent::DraftEnd),
        _ => None,
    }
}

fn parse_audio_chunk(value: &Value) -> Option<AudioChunk> {
    let source_id = Uuid::parse_str(value.get("source_id")?.as_str()?).ok()?;
    let samples: Vec<f32> = value
        .get("data")?
        .as_array()?
        .iter()
        .filter_map(|v| v.as_f64())
        .map(|v| v as f32)
        .collect();
    let sample_type = match value.get("sample_type").and_then(Value::as_str) {
        Some("i16") => SampleType::I16,
        _ => SampleType::F32,
    };
    Some(AudioChunk {
        source_id,
        stream_start_time: value.get("stream_start_time")?.as_f64()?,
        timestamp: value.get("timestamp")?.as_f64()?,
        duration: value.get("duration")?.as_f64()?,
        sample_rate: value.get("sample_rate")?.as_u64()? as u32,
        channels: ChannelCount::Mono(value.get("channels").and_then(Value::as_u64).unwrap_or(1) as u16),
        blocksize: value.get("blocksize")?.as_u64()? as usize,
        sample_type,
        in_speech: value.get("in_speech")?.as_bool()?,
        data: samples.into(),
    })
}

fn parse_draft(value: &Value) -> Option<Draft> {
    Some(Draft {
        draft_id: Uuid::parse_str(value.get("draft_id")?.as_str()?).ok()?,
        parent_draft_id: value
            .get("parent_draft_id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok()),
        timestamp: value.get("timestamp")?.as_f64()?,
        audio_start_time: value.get("audio_start_time")?.as_f64()?,
        audio_end_time: value.get("audio_end_time")?.as_f64()?,
        start_text: value.get("start_text")?.as_str()?.to_string(),
        end_text: value.get("end_text")?.as_str()?.to_string(),
        full_text: value.get("full_text")?.as_str()?.to_string(),
        start_matched_events: Vec::new(),
        end_matched_events: Vec::new(),
    })
}
