//! Time-bounded ring of silent chunks, flushed ahead of `SpeechStart` so a
//! subscriber sees the leading context of a segment exactly once.

use palaver_core::types::AudioChunk;
use palaver_foundation::ring_buffer::{Timestamped, TimeIndexedRingBuffer};

struct BufferedChunk(AudioChunk);

impl Timestamped for BufferedChunk {
    fn timestamp(&self) -> f64 {
        self.0.timestamp
    }
}

pub struct PreBuffer {
    ring: TimeIndexedRingBuffer<BufferedChunk>,
}

impl PreBuffer {
    pub fn new(max_seconds: f64) -> Self {
        Self {
            ring: TimeIndexedRingBuffer::new(max_seconds),
        }
    }

    pub fn push(&mut self, chunk: AudioChunk) {
        self.ring.push(BufferedChunk(chunk));
    }

    /// Drains every buffered chunk in arrival order and clears the buffer.
    pub fn drain(&mut self) -> Vec<AudioChunk> {
        self.ring.get_all(true).into_iter().map(|b| b.0).collect()
    }
}
