//! AudioMerge: fan-in of the raw source stream and the VAD-augmented
//! stream into one totally-ordered output per subscriber. Forwards the raw
//! `AudioChunk` from the source side but substitutes lifecycle events from
//! the VAD side, so `SpeechStart`/`SpeechStop` reach downstream consumers.

use tokio::sync::broadcast;

use crate::types::{AudioChunk, AudioLifecycleEvent};

#[derive(Debug, Clone)]
pub enum MergedEvent {
    Chunk(AudioChunk),
    Lifecycle(AudioLifecycleEvent),
}

pub struct AudioMerge {
    raw_chunks: broadcast::Receiver<AudioChunk>,
    vad_lifecycle: broadcast::Receiver<AudioLifecycleEvent>,
    out: broadcast::Sender<MergedEvent>,
}

impl AudioMerge {
    pub fn new(
        raw_chunks: broadcast::Receiver<AudioChunk>,
        vad_lifecycle: broadcast::Receiver<AudioLifecycleEvent>,
        capacity: usize,
    ) -> (Self, broadcast::Receiver<MergedEvent>) {
        let (out, rx) = broadcast::channel(capacity);
        (
            Self {
                raw_chunks,
                vad_lifecycle,
                out,
            },
            rx,
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MergedEvent> {
        self.out.subscribe()
    }

    /// Runs until both upstream channels close. Cancellation-safe: each
    /// branch only commits a receive once selected.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                chunk = self.raw_chunks.recv() => {
                    match chunk {
                        Ok(chunk) => { let _ = self.out.send(MergedEvent::Chunk(chunk)); }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "audio merge: raw chunk stream lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                event = self.vad_lifecycle.recv() => {
                    match event {
                        Ok(event) => { let _ = self.out.send(MergedEvent::Lifecycle(event)); }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "audio merge: lifecycle stream lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    }
}
