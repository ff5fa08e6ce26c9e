//! Time-indexed bounded ring buffer shared by the pre-speech ring (held by
//! the audio pipeline) and the pre-draft ring (held by the rescanner).

use std::collections::VecDeque;

/// Anything that can report the stream-relative timestamp it was produced
/// at, so the ring can prune by age rather than by count.
pub trait Timestamped {
    fn timestamp(&self) -> f64;
}

/// Bounded queue that prunes items older than `retention_secs` relative to
/// the most recently inserted item's timestamp, on every insert.
pub struct TimeIndexedRingBuffer<T: Timestamped> {
    items: VecDeque<T>,
    retention_secs: f64,
}

impl<T: Timestamped> TimeIndexedRingBuffer<T> {
    pub fn new(retention_secs: f64) -> Self {
        Self {
            items: VecDeque::new(),
            retention_secs,
        }
    }

    pub fn push(&mut self, item: T) {
        let now = item.timestamp();
        self.items.push_back(item);
        let cutoff = now - self.retention_secs;
        while let Some(front) = self.items.front() {
            if front.timestamp() < cutoff {
                self.items.pop_front();
            } else {
                break;
            }
        }
    }

    /// Items with `timestamp() >= t`, oldest first.
    pub fn get_from(&self, t: f64) -> Vec<&T> {
        self.items.iter().filter(|i| i.timestamp() >= t).collect()
    }

    pub fn has_data(&self) -> bool {
        !self.items.is_empty()
    }

    /// Returns a copy of every buffered item, clearing the buffer if
    /// `clear` is true.
    pub fn get_all(&mut self, clear: bool) -> Vec<T>
    where
        T: Clone,
    {
        let all: Vec<T> = self.items.iter().cloned().collect();
        if clear {
            self.items.clear();
        }
        all
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Sample {
        t: f64,
        v: i32,
    }

    impl Timestamped for Sample {
        fn timestamp(&self) -> f64 {
            self.t
        }
    }

    #[test]
    fn prunes_items_older_than_retention() {
        let mut ring = TimeIndexedRingBuffer::new(1.0);
        ring.push(Sample { t: 0.0, v: 1 });
        ring.push(Sample { t: 0.5, v: 2 });
        ring.push(Sample { t: 1.2, v: 3 });
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.get_from(0.0)[0].v, 2);
    }

    #[test]
    fn get_all_with_clear_empties_buffer() {
        let mut ring = TimeIndexedRingBuffer::new(5.0);
        ring.push(Sample { t: 0.0, v: 1 });
        ring.push(Sample { t: 0.1, v: 2 });
        let all = ring.get_all(true);
        assert_eq!(all.len(), 2);
        assert!(!ring.has_data());
    }

    #[test]
    fn get_all_without_clear_retains_items() {
        let mut ring = TimeIndexedRingBuffer::new(5.0);
        ring.push(Sample { t: 0.0, v: 1 });
        let _ = ring.get_all(false);
        assert!(ring.has_data());
    }
}
