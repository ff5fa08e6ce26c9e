//! EventRouter: fans pipeline events out to registered remote clients,
//! applying the `in_speech` chunk filter, the pre-buffer flush, and author
//! URI stamping.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use palaver_core::types::{AudioChunk, AudioLifecycleEvent, CommandEvent, DraftEvent, TextEvent};

use crate::client::{register, Client, ClientId};
use crate::pre_buffer::PreBuffer;
use crate::subscription::Subscription;
use crate::wire::{
    audio_chunk_envelope, audio_lifecycle_envelope, command_envelope, draft_envelope,
    text_envelope, WireEnvelope,
};

#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    /// Base URL stamped into `author_uri`; `None` leaves it null.
    pub server_uri: Option<String>,
    /// Pre-buffer retention in seconds; `0.0` disables the pre-buffer
    /// entirely (the default).
    pub pre_buffer_seconds: f64,
}

struct State {
    clients: HashMap<ClientId, Client>,
    pre_buffer: Option<PreBuffer>,
}

pub struct EventRouter {
    config: RouterConfig,
    state: Mutex<State>,
}

impl EventRouter {
    pub fn new(config: RouterConfig) -> Self {
        let pre_buffer = (config.pre_buffer_seconds > 0.0)
            .then(|| PreBuffer::new(config.pre_buffer_seconds));
        Self {
            config,
            state: Mutex::new(State {
                clients: HashMap::new(),
                pre_buffer,
            }),
        }
    }

    #[cfg(test)]
    fn has_pre_buffer(&self) -> bool {
        self.state.lock().pre_buffer.is_some()
    }

    pub fn register_client(&self, subscription: Subscription) -> (ClientId, mpsc::UnboundedReceiver<String>) {
        let (client, rx) = register(subscription);
        let id = client.id;
        self.state.lock().clients.insert(id, client);
        (id, rx)
    }

    pub fn unregister_client(&self, id: ClientId) {
        self.state.lock().clients.remove(&id);
    }

    pub fn client_count(&self) -> usize {
        self.state.lock().clients.len()
    }

    /// Chunks outside speech are buffered (or dropped, if the pre-buffer is
    /// disabled) and never delivered directly — `in_speech` chunks alone
    /// reach subscribers from this path.
    pub fn on_audio_chunk(&self, chunk: AudioChunk) {
        if !chunk.in_speech {
            let mut state = self.state.lock();
            if let Some(buffer) = state.pre_buffer.as_mut() {
                buffer.push(chunk);
            }
            return;
        }
        let envelope = audio_chunk_envelope(&chunk);
        self.dispatch(envelope);
    }

    pub fn on_audio_lifecycle(&self, event: AudioLifecycleEvent) {
        if matches!(event, AudioLifecycleEvent::SpeechStart { .. }) {
            let buffered = {
                let mut state = self.state.lock();
                state
                    .pre_buffer
                    .as_mut()
                    .map(|b| b.drain())
                    .unwrap_or_default()
            };
            for chunk in buffered {
                self.dispatch(audio_chunk_envelope(&chunk));
            }
        }
        self.dispatch(audio_lifecycle_envelope(&event));
    }

    pub fn on_text(&self, event: TextEvent) {
        self.dispatch(text_envelope(&event));
    }

    pub fn on_command(&self, event: CommandEvent) {
        self.dispatch(command_envelope(&event));
    }

    pub fn on_draft(&self, event: DraftEvent) {
        self.dispatch(draft_envelope(&event));
    }

    fn author_uri(&self, event_class: &str) -> Option<String> {
        let base = self.config.server_uri.as_ref()?;
        let service = service_for(event_class);
        Some(format!("{base}/{service}/v1"))
    }

    fn dispatch(&self, mut envelope: WireEnvelope) {
        envelope.author_uri = self.author_uri(envelope.event_class);
        let text = envelope.to_json().to_string();
        let event_class = envelope.event_class;

        let mut dead = Vec::new();
        {
            let state = self.state.lock();
            for client in state.clients.values() {
                if client.subscription.wants(event_class) && !client.send(text.clone()) {
                    dead.push(client.id);
                }
            }
        }
        if !dead.is_empty() {
            let mut state = self.state.lock();
            for id in dead {
                debug!(client = %id, "removing dead router client");
                state.clients.remove(&id);
            }
        }
    }
}

fn service_for(event_class: &str) -> &'static str {
    if event_class.starts_with("Audio") {
        "audio"
    } else if event_class == "TextEvent" {
        "transcription"
    } else if event_class.starts_with("Draft") {
        "drafts"
    } else {
        "commands"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palaver_core::types::{ChannelCount, SampleType};
    use std::sync::Arc;
    use uuid::Uuid;

    fn chunk(timestamp: f64, in_speech: bool) -> AudioChunk {
        AudioChunk {
            source_id: Uuid::new_v4(),
            stream_start_time: 0.0,
            timestamp,
            duration: 0.03,
            sample_rate: 16_000,
            channels: ChannelCount::Mono(1),
            blocksize: 480,
            sample_type: SampleType::F32,
            in_speech,
            data: Arc::from(vec![0.0f32; 480]),
        }
    }

    fn speech_start(at: f64) -> AudioLifecycleEvent {
        AudioLifecycleEvent::SpeechStart {
            source: Uuid::new_v4(),
            silence_ms: 500,
            threshold: 0.02,
            pad_ms: 300,
            sample_rate: 16_000,
            at,
        }
    }

    #[test]
    fn zero_pre_buffer_seconds_disables_buffering() {
        let router = EventRouter::new(RouterConfig {
            server_uri: None,
            pre_buffer_seconds: 0.0,
        });
        assert!(!router.has_pre_buffer());
    }

    #[test]
    fn nonzero_pre_buffer_seconds_enables_buffering() {
        let router = EventRouter::new(RouterConfig {
            server_uri: None,
            pre_buffer_seconds: 1.5,
        });
        assert!(router.has_pre_buffer());
    }

    #[test]
    fn all_subscription_drops_out_of_speech_chunks_but_not_in_speech() {
        let router = EventRouter::new(RouterConfig::default());
        let (_id, mut rx) = router.register_client(Subscription::from_tags([
            "all".to_string(),
            "AudioChunkEvent".to_string(),
        ]));
        router.on_audio_chunk(chunk(0.0, false));
        router.on_audio_chunk(chunk(0.1, true));
        let received = rx.try_recv().unwrap();
        assert!(received.contains("\"in_speech\":true"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn pre_buffer_flushes_before_speech_start_in_order() {
        let router = EventRouter::new(RouterConfig {
            server_uri: None,
            pre_buffer_seconds: 5.0,
        });
        let (_id, mut rx) = router.register_client(Subscription::from_tags([
            "all".to_string(),
            "AudioChunkEvent".to_string(),
        ]));

        router.on_audio_chunk(chunk(0.0, false));
        router.on_audio_chunk(chunk(0.1, false));
        router.on_audio_chunk(chunk(0.2, false));
        router.on_audio_lifecycle(speech_start(0.3));

        let c1 = rx.try_recv().unwrap();
        let c2 = rx.try_recv().unwrap();
        let c3 = rx.try_recv().unwrap();
        let start = rx.try_recv().unwrap();
        assert!(c1.contains("\"timestamp\":0.0") || c1.contains("\"timestamp\":0"));
        assert!(c2.contains("0.1"));
        assert!(c3.contains("0.2"));
        assert!(start.contains("AUDIO_SPEECH_START"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn pre_buffer_resets_per_segment() {
        let router = EventRouter::new(RouterConfig {
            server_uri: None,
            pre_buffer_seconds: 5.0,
        });
        let (_id, mut rx) = router.register_client(Subscription::from_tags([
            "all".to_string(),
            "AudioChunkEvent".to_string(),
        ]));

        router.on_audio_chunk(chunk(0.0, false));
        router.on_audio_lifecycle(speech_start(0.1));
        let _ = rx.try_recv().unwrap(); // buffered chunk
        let _ = rx.try_recv().unwrap(); // speech start

        router.on_audio_lifecycle(speech_start(0.2));
        let second = rx.try_recv().unwrap();
        assert!(second.contains("AUDIO_SPEECH_START"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn narrow_subscription_never_sees_audio_chunks_without_explicit_opt_in() {
        let router = EventRouter::new(RouterConfig::default());
        let (_id, mut rx) = router.register_client(Subscription::all());
        router.on_audio_chunk(chunk(0.0, true));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn author_uri_is_stamped_per_service_when_configured() {
        let router = EventRouter::new(RouterConfig {
            server_uri: Some("https://palaver.example".into()),
            pre_buffer_seconds: 0.0,
        });
        let (_id, mut rx) = router.register_client(Subscription::from_tags([
            "all".to_string(),
            "AudioChunkEvent".to_string(),
        ]));
        router.on_audio_chunk(chunk(0.0, true));
        let text = rx.try_recv().unwrap();
        assert!(text.contains("https://palaver.example/audio/v1"));
    }

    #[test]
    fn author_uri_is_null_when_unconfigured() {
        let router = EventRouter::new(RouterConfig::default());
        let (_id, mut rx) = router.register_client(Subscription::all());
        router.on_text(TextEvent::new(Uuid::new_v4(), 0.0, 1.0, "hi"));
        let text = rx.try_recv().unwrap();
        assert!(text.contains("\"author_uri\":null"));
    }

    #[test]
    fn dead_client_is_removed_without_affecting_others() {
        let router = EventRouter::new(RouterConfig::default());
        let (dead_id, dead_rx) = router.register_client(Subscription::all());
        let (_good_id, mut good_rx) = router.register_client(Subscription::all());
        drop(dead_rx);

        router.on_text(TextEvent::new(Uuid::new_v4(), 0.0, 1.0, "hi"));
        assert!(good_rx.try_recv().is_ok());
        assert_eq!(router.client_count(), 1);
        assert!(!router.state.lock().clients.contains_key(&dead_id));
    }
}
