//! Rescanner state machine: acts as the `AudioSource` for a
//! second, local pipeline that re-transcribes a draft with a (presumably
//! better) local model, then submits the revision back to the source node.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;
use tracing::{debug, warn};

use palaver_core::event_bus::EventBus;
use palaver_core::types::{AudioChunk, AudioLifecycleEvent, Draft, DraftEvent, DraftId};
use palaver_foundation::error::PalaverError;
use palaver_foundation::ring_buffer::{TimeIndexedRingBuffer, Timestamped};
use palaver_stt::Transcriber;

use crate::net_listener::RemoteEvent;
use crate::revision::RevisionSink;

struct BufferedChunk(AudioChunk);

impl Timestamped for BufferedChunk {
    fn timestamp(&self) -> f64 {
        self.0.timestamp
    }
}

#[derive(Debug, Clone)]
pub struct RescannerConfig {
    pub pre_draft_seconds: f64,
    pub local_draft_wait: Duration,
    pub poll_interval: Duration,
}

impl Default for RescannerConfig {
    fn default() -> Self {
        Self {
            pre_draft_seconds: 30.0,
            local_draft_wait: Duration::from_secs(15),
            poll_interval: Duration::from_millis(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Collecting { original_id: DraftId },
    Rescanning { original_id: DraftId },
}

struct Inner {
    state: State,
    pre_draft_buffer: TimeIndexedRingBuffer<BufferedChunk>,
    held_speech_stop: Option<AudioLifecycleEvent>,
}

/// `force_end` closes over the local `DraftMaker` owned by the app runtime;
/// the rescanner only needs to trigger it, never to own the draft assembler.
pub struct Rescanner {
    config: RescannerConfig,
    bus: EventBus,
    transcriber: Transcriber,
    revision_sink: Arc<dyn RevisionSink>,
    force_end: Arc<dyn Fn() -> Option<DraftEvent> + Send + Sync>,
    inner: Mutex<Inner>,
}

impl Rescanner {
    pub fn new(
        config: RescannerConfig,
        bus: EventBus,
        transcriber: Transcriber,
        revision_sink: Arc<dyn RevisionSink>,
        force_end: Arc<dyn Fn() -> Option<DraftEvent> + Send + Sync>,
    ) -> Self {
        let pre_draft_buffer = TimeIndexedRingBuffer::new(config.pre_draft_seconds);
        Self {
            config,
            bus,
            transcriber,
            revision_sink,
            force_end,
            inner: Mutex::new(Inner {
                state: State::Idle,
                pre_draft_buffer,
                held_speech_stop: None,
            }),
        }
    }

    pub async fn handle_remote_event(&self, event: RemoteEvent) -> Result<(), PalaverError> {
        match event {
            RemoteEvent::AudioChunk(chunk) => self.on_audio_chunk(chunk).await,
            RemoteEvent::DraftStart(draft) => self.on_draft_start(draft).await,
            RemoteEvent::DraftEnd(draft) => self.on_draft_end(draft).await,
        }
    }

    async fn on_audio_chunk(&self, chunk: AudioChunk) -> Result<(), PalaverError> {
        let collecting = {
            let mut inner = self.inner.lock().await;
            inner.pre_draft_buffer.push(BufferedChunk(chunk.clone()));
            matches!(inner.state, State::Collecting { .. })
        };
        if collecting {
            self.bus.publish_audio_chunk(chunk.clone());
            self.transcriber
                .accept_chunk(chunk.source_id, chunk.timestamp, chunk.duration, &chunk.data)
                .await?;
        }
        Ok(())
    }

    async fn on_draft_start(&self, draft: Draft) -> Result<(), PalaverError> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            State::Idle => {
                inner.state = State::Collecting {
                    original_id: draft.draft_id,
                };
                debug!(draft_id = %draft.draft_id, "rescanner collecting remote draft");
            }
            State::Collecting { .. } | State::Rescanning { .. } => {
                warn!(
                    draft_id = %draft.draft_id,
                    "rejecting second concurrent DraftStart (prototype limitation)"
                );
            }
        }
        Ok(())
    }

    async fn on_draft_end(&self, remote_draft: Draft) -> Result<(), PalaverError> {
        {
            let inner = self.inner.lock().await;
            match inner.state {
                State::Collecting { original_id } if original_id == remote_draft.draft_id => {}
                _ => {
                    warn!(
                        draft_id = %remote_draft.draft_id,
                        "DraftEnd with no matching Collecting state, ignoring"
                    );
                    return Ok(());
                }
            }
        }

        self.transcriber
            .flush_pending(false, Duration::from_secs(0))
            .await?;
        {
            let mut inner = self.inner.lock().await;
            inner.state = State::Rescanning {
                original_id: remote_draft.draft_id,
            };
        }

        let mut draft_rx = self.bus.subscribe_draft();
        let local_draft = self.wait_for_local_draft_end(&mut draft_rx).await;

        let held = {
            let mut inner = self.inner.lock().await;
            inner.held_speech_stop.take()
        };
        if let Some(event) = held {
            self.bus.publish_audio_lifecycle(event);
        }

        if let Some(mut local_draft) = local_draft {
            local_draft.parent_draft_id = Some(remote_draft.draft_id);
            if let Err(err) = self.revision_sink.submit(&local_draft).await {
                warn!(error = %err, "revision submission failed");
            }
        } else {
            warn!(draft_id = %remote_draft.draft_id, "no local draft produced for rescan, dropping");
        }

        let mut inner = self.inner.lock().await;
        inner.state = State::Idle;
        inner.pre_draft_buffer.clear();
        Ok(())
    }

    /// Waits up to `local_draft_wait` for the local pipeline to close its
    /// own draft, nudging the STT worker ("bump") whenever unflushed audio
    /// remains. Falls back to `force_end` on timeout.
    async fn wait_for_local_draft_end(
        &self,
        draft_rx: &mut broadcast::Receiver<DraftEvent>,
    ) -> Option<Draft> {
        let deadline = Instant::now() + self.config.local_draft_wait;
        loop {
            if Instant::now() >= deadline {
                break;
            }
            tokio::select! {
                event = draft_rx.recv() => {
                    match event {
                        Ok(DraftEvent::DraftEnd(draft)) => return Some(draft),
                        Ok(_) => continue,
                        Err(_) => continue,
                    }
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {
                    if self.transcriber.sound_pending() {
                        let _ = self
                            .transcriber
                            .flush_pending(false, Duration::from_millis(0))
                            .await;
                    }
                }
            }
        }

        match (self.force_end)() {
            Some(DraftEvent::DraftEnd(draft)) => Some(draft),
            _ => None,
        }
    }

    /// Called by the app wiring on every local `AudioLifecycleEvent` before
    /// it is re-published: suppresses `SpeechStop` while rescanning so the
    /// STT buffer isn't flushed mid-segment, releasing it once the local
    /// draft closes.
    pub async fn filter_local_lifecycle(
        &self,
        event: AudioLifecycleEvent,
    ) -> Option<AudioLifecycleEvent> {
        let mut inner = self.inner.lock().await;
        let rescanning = matches!(inner.state, State::Rescanning { .. });
        if rescanning && matches!(event, AudioLifecycleEvent::SpeechStop { .. }) {
            inner.held_speech_stop = Some(event);
            None
        } else {
            Some(event)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palaver_core::types::{ChannelCount, SampleType};
    use palaver_stt::transcriber::TranscriberConfig;
    use std::sync::atomic::{AtomicBool, Ordering};
    use uuid::Uuid;

    #[derive(Debug)]
    struct NullPlugin;

    #[async_trait::async_trait]
    impl palaver_stt::SttPlugin for NullPlugin {
        fn info(&self) -> palaver_stt::plugin::PluginInfo {
            palaver_stt::plugin::PluginInfo {
                id: "null".into(),
                name: "null".into(),
                description: "test double".into(),
                requires_network: false,
                is_local: true,
                is_available: true,
                supported_languages: vec!["en".into()],
                memory_usage_mb: None,
            }
        }

        fn capabilities(&self) -> palaver_stt::plugin::PluginCapabilities {
            palaver_stt::plugin::PluginCapabilities::default()
        }

        async fn is_available(&self) -> Result<bool, PalaverError> {
            Ok(true)
        }

        async fn initialize(
            &mut self,
            _config: palaver_stt::types::TranscriptionConfig,
        ) -> Result<(), PalaverError> {
            Ok(())
        }

        async fn process_audio(
            &mut self,
            _samples: &[i16],
        ) -> Result<Option<palaver_stt::types::TranscriptionEvent>, PalaverError> {
            Ok(None)
        }

        async fn finalize(
            &mut self,
        ) -> Result<Option<palaver_stt::types::TranscriptionEvent>, PalaverError> {
            Ok(None)
        }

        async fn reset(&mut self) -> Result<(), PalaverError> {
            Ok(())
        }
    }

    struct RecordingSink {
        called: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl RevisionSink for RecordingSink {
        async fn submit(&self, revised: &Draft) -> Result<(), PalaverError> {
            assert!(revised.parent_draft_id.is_some());
            self.called.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_draft(id: DraftId) -> Draft {
        Draft {
            draft_id: id,
            parent_draft_id: None,
            timestamp: 0.0,
            audio_start_time: 0.0,
            audio_end_time: 1.0,
            start_text: "rupert take this down".into(),
            end_text: String::new(),
            full_text: String::new(),
            start_matched_events: Vec::new(),
            end_matched_events: Vec::new(),
        }
    }

    fn chunk(source: Uuid, timestamp: f64) -> AudioChunk {
        AudioChunk {
            source_id: source,
            stream_start_time: 0.0,
            timestamp,
            duration: 0.03,
            sample_rate: 16_000,
            channels: ChannelCount::Mono(1),
            blocksize: 480,
            sample_type: SampleType::F32,
            in_speech: true,
            data: std::sync::Arc::from(vec![0.0f32; 480]),
        }
    }

    fn build_rescanner(
        force_end_result: Arc<std::sync::Mutex<Option<DraftEvent>>>,
        called: Arc<AtomicBool>,
    ) -> Rescanner {
        let bus = EventBus::default();
        let transcriber = Transcriber::spawn(Box::new(NullPlugin), TranscriberConfig::default(), bus.clone());
        let revision_sink: Arc<dyn RevisionSink> = Arc::new(RecordingSink { called });
        let force_end: Arc<dyn Fn() -> Option<DraftEvent> + Send + Sync> =
            Arc::new(move || force_end_result.lock().unwrap().take());
        Rescanner::new(
            RescannerConfig {
                pre_draft_seconds: 30.0,
                local_draft_wait: Duration::from_millis(50),
                poll_interval: Duration::from_millis(5),
            },
            bus,
            transcriber,
            revision_sink,
            force_end,
        )
    }

    #[tokio::test]
    async fn second_draft_start_while_collecting_is_rejected() {
        let called = Arc::new(AtomicBool::new(false));
        let rescanner = build_rescanner(Arc::new(std::sync::Mutex::new(None)), called);
        let first = Uuid::new_v4();
        rescanner.on_draft_start(test_draft(first)).await.unwrap();
        let second = Uuid::new_v4();
        rescanner.on_draft_start(test_draft(second)).await.unwrap();

        let inner = rescanner.inner.lock().await;
        assert_eq!(inner.state, State::Collecting { original_id: first });
    }

    #[tokio::test]
    async fn draft_end_without_matching_collecting_state_is_ignored() {
        let called = Arc::new(AtomicBool::new(false));
        let rescanner = build_rescanner(Arc::new(std::sync::Mutex::new(None)), called.clone());
        rescanner.on_draft_end(test_draft(Uuid::new_v4())).await.unwrap();
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn falls_back_to_force_end_after_timeout_and_submits_revision() {
        let original_id = Uuid::new_v4();
        let forced = DraftEvent::DraftEnd(Draft {
            full_text: "forced".into(),
            ..test_draft(Uuid::new_v4())
        });
        let force_end_result = Arc::new(std::sync::Mutex::new(Some(forced)));
        let called = Arc::new(AtomicBool::new(false));
        let rescanner = build_rescanner(force_end_result, called.clone());

        rescanner.on_draft_start(test_draft(original_id)).await.unwrap();
        rescanner.on_draft_end(test_draft(original_id)).await.unwrap();

        assert!(called.load(Ordering::SeqCst));
        let inner = rescanner.inner.lock().await;
        assert_eq!(inner.state, State::Idle);
    }

    #[tokio::test]
    async fn speech_stop_is_held_only_while_rescanning() {
        let called = Arc::new(AtomicBool::new(false));
        let rescanner = build_rescanner(Arc::new(std::sync::Mutex::new(None)), called);
        let stop = AudioLifecycleEvent::SpeechStop {
            source: Uuid::new_v4(),
            last_in_speech_chunk_time: 1.0,
        };

        let passthrough = rescanner.clone_for_test_filter(stop.clone()).await;
        assert!(passthrough.is_some());

        {
            let mut inner = rescanner.inner.lock().await;
            inner.state = State::Rescanning {
                original_id: Uuid::new_v4(),
            };
        }
        let held = rescanner.clone_for_test_filter(stop).await;
        assert!(held.is_none());
    }

    impl Rescanner {
        async fn clone_for_test_filter(
            &self,
            event: AudioLifecycleEvent,
        ) -> Option<AudioLifecycleEvent> {
            self.filter_local_lifecycle(event).await
        }
    }

    #[tokio::test]
    async fn pre_draft_buffer_collects_idle_audio() {
        let called = Arc::new(AtomicBool::new(false));
        let rescanner = build_rescanner(Arc::new(std::sync::Mutex::new(None)), called);
        let source = Uuid::new_v4();
        rescanner.on_audio_chunk(chunk(source, 0.0)).await.unwrap();
        rescanner.on_audio_chunk(chunk(source, 0.03)).await.unwrap();
        let inner = rescanner.inner.lock().await;
        assert_eq!(inner.pre_draft_buffer.len(), 2);
    }
}
