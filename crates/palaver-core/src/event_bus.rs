//! Typed publish/subscribe bus. The many `*Listener` protocols of the
//! pipeline collapse to one broadcast channel per event variant; components
//! subscribe to the variants they care about and never see the others.

use tokio::sync::broadcast;

use crate::types::{AudioChunk, AudioLifecycleEvent, CommandEvent, DraftEvent, TextEvent};

const DEFAULT_CAPACITY: usize = 256;

/// Owns one broadcast channel per event family. Cloning is cheap (each
/// sender is an `Arc`-backed handle); every clone shares the same
/// subscriber set.
#[derive(Clone)]
pub struct EventBus {
    audio_chunk: broadcast::Sender<AudioChunk>,
    audio_lifecycle: broadcast::Sender<AudioLifecycleEvent>,
    text: broadcast::Sender<TextEvent>,
    command: broadcast::Sender<CommandEvent>,
    draft: broadcast::Sender<DraftEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            audio_chunk: broadcast::channel(capacity).0,
            audio_lifecycle: broadcast::channel(capacity).0,
            text: broadcast::channel(capacity).0,
            command: broadcast::channel(capacity).0,
            draft: broadcast::channel(capacity).0,
        }
    }

    pub fn publish_audio_chunk(&self, chunk: AudioChunk) {
        let _ = self.audio_chunk.send(chunk);
    }

    pub fn subscribe_audio_chunk(&self) -> broadcast::Receiver<AudioChunk> {
        self.audio_chunk.subscribe()
    }

    pub fn publish_audio_lifecycle(&self, event: AudioLifecycleEvent) {
        let _ = self.audio_lifecycle.send(event);
    }

    pub fn subscribe_audio_lifecycle(&self) -> broadcast::Receiver<AudioLifecycleEvent> {
        self.audio_lifecycle.subscribe()
    }

    pub fn publish_text(&self, event: TextEvent) {
        let _ = self.text.send(event);
    }

    pub fn subscribe_text(&self) -> broadcast::Receiver<TextEvent> {
        self.text.subscribe()
    }

    pub fn publish_command(&self, event: CommandEvent) {
        let _ = self.command.send(event);
    }

    pub fn subscribe_command(&self) -> broadcast::Receiver<CommandEvent> {
        self.command.subscribe()
    }

    pub fn publish_draft(&self, event: DraftEvent) {
        let _ = self.draft.send(event);
    }

    pub fn subscribe_draft(&self) -> broadcast::Receiver<DraftEvent> {
        self.draft.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChannelCount, SampleType};
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn subscriber_receives_published_chunk() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_audio_chunk();
        let chunk = AudioChunk {
            source_id: Uuid::new_v4(),
            stream_start_time: 0.0,
            timestamp: 0.0,
            duration: 0.03,
            sample_rate: 16_000,
            channels: ChannelCount::Mono(1),
            blocksize: 480,
            sample_type: SampleType::F32,
            in_speech: false,
            data: Arc::from(vec![0.0f32; 480]),
        };
        bus.publish_audio_chunk(chunk.clone());
        let received = rx.recv().await.unwrap();
        assert_eq!(received.source_id, chunk.source_id);
    }

    #[tokio::test]
    async fn multiple_subscribers_each_get_a_copy() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe_text();
        let mut rx2 = bus.subscribe_text();
        bus.publish_text(TextEvent::new(Uuid::new_v4(), 0.0, 1.0, "hello"));
        assert_eq!(rx1.recv().await.unwrap().text, "hello");
        assert_eq!(rx2.recv().await.unwrap().text, "hello");
    }
}
