//! StreamMonitor: derived liveness/completeness tracker used to decide
//! end-of-input. Observes the post-merge bus without altering it.

const COMPLETION_TOLERANCE_SECS: f64 = 0.5;

#[derive(Debug, Clone, Default)]
pub struct StreamMonitor {
    audio_stopped: bool,
    last_chunk_time: f64,
    last_speech_stop_time: Option<f64>,
    last_text_event_end_time: Option<f64>,
    block_open: bool,
    transcription_pending: bool,
    done_latched: bool,
}

impl StreamMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_audio_chunk(&mut self, timestamp: f64) {
        self.last_chunk_time = timestamp;
    }

    pub fn on_audio_stop(&mut self) {
        self.audio_stopped = true;
    }

    pub fn on_speech_stop(&mut self, at: f64) {
        self.last_speech_stop_time = Some(at);
    }

    pub fn on_text_event(&mut self, audio_end_time: f64) {
        self.last_text_event_end_time = Some(audio_end_time);
    }

    pub fn on_transcription_pending(&mut self, pending: bool) {
        self.transcription_pending = pending;
    }

    pub fn on_start_block(&mut self) {
        self.block_open = true;
    }

    pub fn on_stop_block(&mut self) {
        self.block_open = false;
    }

    /// True once `AudioStop` has been seen and either no block is open, or
    /// the last in-speech chunk is within tolerance of the last emitted
    /// text with nothing still transcribing. Latches: never un-flips once
    /// true, per the "never oscillates" invariant.
    pub fn check_done(&mut self) -> bool {
        if self.done_latched {
            return true;
        }
        if !self.audio_stopped {
            return false;
        }
        let ready = if !self.block_open {
            true
        } else {
            match self.last_text_event_end_time {
                Some(text_end) => {
                    !self.transcription_pending
                        && (self.last_chunk_time - text_end).abs() <= COMPLETION_TOLERANCE_SECS
                }
                None => false,
            }
        };
        if ready {
            self.done_latched = true;
        }
        ready
    }

    pub fn is_all_done(&self) -> bool {
        self.done_latched
    }
}
