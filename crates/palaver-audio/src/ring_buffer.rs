//! Lock-free SPSC ring buffer carrying raw `i16` samples from the audio
//! callback thread (AudioSource's producer side) to the chunker/resampler running on
//! the scheduler . Built on `rtrb` so the producer side never blocks or
//! allocates inside the real-time audio callback.

use rtrb::{Consumer, Producer, RingBuffer};

pub struct AudioRingBuffer {
    capacity: usize,
}

impl AudioRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Splits into the producer half (used by the capture thread) and the
    /// consumer half (used by [`crate::frame_reader::FrameReader`]).
    pub fn split(self) -> (AudioProducer, AudioConsumer) {
        let (producer, consumer) = RingBuffer::<i16>::new(self.capacity);
        (AudioProducer { inner: producer }, AudioConsumer { inner: consumer })
    }
}

pub struct AudioProducer {
    inner: Producer<i16>,
}

impl AudioProducer {
    /// Writes as many samples as fit without blocking; returns the count
    /// actually written. The caller (capture callback) must not block, so
    /// excess samples are dropped and counted by the caller as overflow.
    pub fn write(&mut self, samples: &[i16]) -> Result<usize, rtrb::PushError<i16>> {
        let mut written = 0;
        for &s in samples {
            match self.inner.push(s) {
                Ok(()) => written += 1,
                Err(e) => return if written == 0 { Err(e) } else { Ok(written) },
            }
        }
        Ok(written)
    }

    pub fn slots(&self) -> usize {
        self.inner.slots()
    }
}

pub struct AudioConsumer {
    inner: Consumer<i16>,
}

impl AudioConsumer {
    /// Drains up to `max` available samples into `out`, returning the count read.
    pub fn read(&mut self, out: &mut Vec<i16>, max: usize) -> usize {
        let mut read = 0;
        while read < max {
            match self.inner.pop() {
                Ok(sample) => {
                    out.push(sample);
                    read += 1;
                }
                Err(_) => break,
            }
        }
        read
    }

    pub fn slots(&self) -> usize {
        self.inner.slots()
    }
}
