//! VADFilter: reassembles arbitrary-size 16 kHz mono chunks into fixed
//! 512-sample VAD frames, drives a [`VadEngine`], and emits the
//! `SpeechStart`/`SpeechStop` markers in the ordering requires —
//! `SpeechStart` before the chunk that carries it, `SpeechStop` after.

use crate::engine::VadEngine;
use crate::types::VadState;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy)]
pub struct VadFilterConfig {
    /// 0..1 activation threshold, forwarded to the underlying engine.
    pub threshold: f32,
    /// Normal-mode default 800ms, long-note mode 5000ms.
    pub min_silence_ms: u32,
    /// Prefix pad added to in-speech audio once `SpeechStart` fires.
    pub speech_pad_ms: u32,
    pub sampling_rate: u32,
}

impl Default for VadFilterConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_silence_ms: 800,
            speech_pad_ms: 200,
            sampling_rate: 16_000,
        }
    }
}

/// A transition derived from the VAD engine, carried in stream-relative
/// seconds. `pad_from` on `SpeechStart` is the point `speech_pad_ms` earlier
/// that pre-speech audio should be spliced in from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VadTransition {
    SpeechStart { at: f64, pad_from: f64 },
    SpeechStop { at: f64 },
}

/// Per-chunk output: whether the chunk itself should be marked in-speech,
/// plus any transitions to emit (before the chunk for Start, after for Stop).
pub struct FilterOutput {
    pub in_speech: bool,
    pub leading: Vec<VadTransition>,
    pub trailing: Vec<VadTransition>,
}

pub struct VadFilter<E: VadEngine> {
    engine: E,
    config: VadFilterConfig,
    frame_size: usize,
    pending: VecDeque<i16>,
    /// Stream-relative seconds at the start of `pending`'s first sample.
    pending_start_time: f64,
    last_in_speech_chunk_time: f64,
}

impl<E: VadEngine> VadFilter<E> {
    pub fn new(engine: E, config: VadFilterConfig) -> Self {
        let frame_size = engine.required_frame_size_samples();
        Self {
            engine,
            config,
            frame_size,
            pending: VecDeque::with_capacity(frame_size * 2),
            pending_start_time: 0.0,
            last_in_speech_chunk_time: 0.0,
        }
    }

    pub fn state(&self) -> VadState {
        self.engine.current_state()
    }

    /// Feeds one chunk's worth of samples, timestamped at `chunk_time`
    /// (stream-relative seconds, the wall time of the chunk's first sample).
    /// Runs the engine over every complete 512-sample frame formed from the
    /// accumulated samples and returns the chunk's resulting `in_speech`
    /// flag plus any transitions to splice before/after it.
    pub fn process_chunk(&mut self, samples: &[i16], chunk_time: f64) -> FilterOutput {
        if self.pending.is_empty() {
            self.pending_start_time = chunk_time;
        }
        self.pending.extend(samples.iter().copied());

        let mut leading = Vec::new();
        let mut trailing = Vec::new();
        let state_before = self.engine.current_state();
        let mut state_now = state_before;

        while self.pending.len() >= self.frame_size {
            let frame: Vec<i16> = self.pending.drain(..self.frame_size).collect();
            let frame_time = self.pending_start_time;
            let frame_duration = self.frame_size as f64 / self.config.sampling_rate as f64;
            self.pending_start_time += frame_duration;

            match self.engine.process(&frame) {
                Ok(Some(event)) => match event {
                    crate::types::VadEvent::SpeechStart { .. } => {
                        let pad_secs = self.config.speech_pad_ms as f64 / 1000.0;
                        leading.push(VadTransition::SpeechStart {
                            at: frame_time,
                            pad_from: frame_time - pad_secs,
                        });
                        state_now = VadState::Speech;
                    }
                    crate::types::VadEvent::SpeechEnd { .. } => {
                        trailing.push(VadTransition::SpeechStop {
                            at: self.last_in_speech_chunk_time,
                        });
                        state_now = VadState::Silence;
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("VAD engine error, holding state: {}", e);
                }
            }

            if state_now == VadState::Speech {
                self.last_in_speech_chunk_time = frame_time + frame_duration;
            }
        }

        FilterOutput {
            in_speech: state_now == VadState::Speech,
            leading,
            trailing,
        }
    }

    /// Synthesizes a `SpeechStop` if the stream ends mid-speech, per the
    /// `Speech × AudioStop -> Silence` row of the state table.
    pub fn force_stop_on_audio_stop(&mut self) -> Option<VadTransition> {
        if self.engine.current_state() == VadState::Speech {
            self.engine.reset();
            Some(VadTransition::SpeechStop {
                at: self.last_in_speech_chunk_time,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceVad;
    use crate::types::VadConfig;

    fn filter() -> VadFilter<ReferenceVad> {
        let config = VadConfig {
            onset_threshold_db: -30.0,
            offset_threshold_db: -35.0,
            initial_floor_db: -60.0,
            speech_debounce_ms: 32,
            silence_debounce_ms: 32,
            ..Default::default()
        };
        VadFilter::new(ReferenceVad::new(config), VadFilterConfig::default())
    }

    fn speech_frame() -> Vec<i16> {
        (0..512)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0;
                (phase.sin() * 8000.0) as i16
            })
            .collect()
    }

    #[test]
    fn silence_stays_silence_and_not_in_speech() {
        let mut f = filter();
        let out = f.process_chunk(&vec![0i16; 512], 0.0);
        assert!(!out.in_speech);
        assert!(out.leading.is_empty());
    }

    #[test]
    fn speech_start_precedes_in_speech_flag() {
        let mut f = filter();
        let mut saw_start = false;
        for i in 0..5 {
            let out = f.process_chunk(&speech_frame(), i as f64 * 0.032);
            if !out.leading.is_empty() {
                saw_start = true;
                assert!(out.in_speech);
            }
        }
        assert!(saw_start);
        assert_eq!(f.state(), VadState::Speech);
    }

    #[test]
    fn force_stop_emits_only_when_in_speech() {
        let mut f = filter();
        assert!(f.force_stop_on_audio_stop().is_none());
        for i in 0..5 {
            f.process_chunk(&speech_frame(), i as f64 * 0.032);
        }
        assert_eq!(f.state(), VadState::Speech);
        let stop = f.force_stop_on_audio_stop();
        assert!(matches!(stop, Some(VadTransition::SpeechStop { .. })));
        assert_eq!(f.state(), VadState::Silence);
    }
}
