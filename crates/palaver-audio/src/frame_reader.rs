//! Drains the lock-free capture ring buffer into fixed-ish [`super::capture::AudioFrame`]s
//! on the scheduler side. This is the thread-to-task boundary described in
//! the concurrency model: the capture thread only ever pushes samples into
//! the ring buffer, never blocks, and this reader is the sole consumer.

use super::capture::AudioFrame;
use super::ring_buffer::AudioConsumer;
use std::time::Instant;

pub struct FrameReader {
    consumer: AudioConsumer,
    sample_rate: u32,
    channels: u16,
    blocksize: usize,
    scratch: Vec<i16>,
}

impl FrameReader {
    pub fn new(
        consumer: AudioConsumer,
        sample_rate: u32,
        channels: u16,
        blocksize: usize,
        _watchdog: Option<super::watchdog::WatchdogTimer>,
    ) -> Self {
        Self {
            consumer,
            sample_rate,
            channels,
            blocksize,
            scratch: Vec::with_capacity(blocksize),
        }
    }

    /// Reads up to `max` samples (never more than `blocksize`) from the
    /// ring buffer. Returns `None` when nothing is available yet so the
    /// caller can back off instead of emitting an empty frame.
    pub fn read_frame(&mut self, max: usize) -> Option<AudioFrame> {
        self.scratch.clear();
        let want = max.min(self.blocksize.max(max));
        let read = self.consumer.read(&mut self.scratch, want);
        if read == 0 {
            return None;
        }
        Some(AudioFrame {
            samples: std::mem::take(&mut self.scratch),
            timestamp: Instant::now(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        })
    }

    /// Applied when AudioSource reports a device format change (e.g. after a hotplug
    /// reconnect negotiates a different rate/channel count).
    pub fn update_device_config(&mut self, sample_rate: u32, channels: u16) {
        self.sample_rate = sample_rate;
        self.channels = channels;
    }
}

#[cfg(test)]
mod tests {
    use super::super::ring_buffer::AudioRingBuffer;
    use super::*;

    #[test]
    fn returns_none_when_empty() {
        let rb = AudioRingBuffer::new(64);
        let (_prod, cons) = rb.split();
        let mut reader = FrameReader::new(cons, 16_000, 1, 32, None);
        assert!(reader.read_frame(32).is_none());
    }

    #[test]
    fn reads_available_samples() {
        let rb = AudioRingBuffer::new(64);
        let (mut prod, cons) = rb.split();
        prod.write(&[1, 2, 3, 4]).unwrap();
        let mut reader = FrameReader::new(cons, 16_000, 1, 32, None);
        let frame = reader.read_frame(32).expect("frame");
        assert_eq!(frame.samples, vec![1, 2, 3, 4]);
        assert_eq!(frame.sample_rate, 16_000);
    }

    #[test]
    fn device_config_update_changes_subsequent_frames() {
        let rb = AudioRingBuffer::new(64);
        let (mut prod, cons) = rb.split();
        prod.write(&[1, 2]).unwrap();
        let mut reader = FrameReader::new(cons, 48_000, 2, 32, None);
        reader.update_device_config(16_000, 1);
        let frame = reader.read_frame(32).unwrap();
        assert_eq!(frame.sample_rate, 16_000);
        assert_eq!(frame.channels, 1);
    }
}
