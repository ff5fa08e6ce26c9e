use crate::{
    energy::EnergyCalculator,
    engine::VadEngine,
    state::VadStateMachine,
    threshold::AdaptiveThreshold,
    types::{VadConfig, VadEvent, VadMetrics, VadState},
    VadProcessor,
};

/// Concrete [`VadEngine`] implementing a simple adaptive-threshold energy
/// detector. Used as the default engine in tests and as a fallback when no
/// ML-based VAD model is configured.
pub struct ReferenceVad {
    config: VadConfig,
    energy_calc: EnergyCalculator,
    threshold: AdaptiveThreshold,
    state_machine: VadStateMachine,
    metrics: VadMetrics,
}

impl ReferenceVad {
    pub fn new(config: VadConfig) -> Self {
        Self {
            threshold: AdaptiveThreshold::new(&config),
            state_machine: VadStateMachine::new(&config),
            energy_calc: EnergyCalculator::new(),
            metrics: VadMetrics::default(),
            config,
        }
    }

    pub fn builder() -> ReferenceVadBuilder {
        ReferenceVadBuilder::new()
    }

    pub fn metrics(&self) -> &VadMetrics {
        &self.metrics
    }

    fn update_metrics(&mut self, energy_db: f32, event: Option<&VadEvent>) {
        self.metrics.frames_processed += 1;
        self.metrics.last_energy_db = energy_db;
        self.metrics.current_noise_floor_db = self.threshold.current_floor();

        let frame_duration_ms = self.config.frame_duration_ms() as u64;

        match self.state_machine.current_state() {
            VadState::Speech => {
                self.metrics.total_speech_ms += frame_duration_ms;
            }
            VadState::Silence => {
                self.metrics.total_silence_ms += frame_duration_ms;
            }
        }

        if let Some(VadEvent::SpeechStart { .. }) = event {
            self.metrics.speech_segments += 1;
        }
    }
}

impl VadProcessor for ReferenceVad {
    fn process(&mut self, frame: &[i16]) -> Result<Option<VadEvent>, String> {
        if frame.len() != self.config.frame_size_samples {
            return Err(format!(
                "Expected {} samples, got {}",
                self.config.frame_size_samples,
                frame.len()
            ));
        }

        let energy_db = self.energy_calc.calculate_dbfs(frame);

        let current_state = self.state_machine.current_state();
        let is_speech_candidate = match current_state {
            VadState::Silence => self.threshold.should_activate(energy_db),
            VadState::Speech => !self.threshold.should_deactivate(energy_db),
        };

        self.threshold
            .update(energy_db, current_state == VadState::Speech);

        let event = self.state_machine.process(is_speech_candidate, energy_db);

        self.update_metrics(energy_db, event.as_ref());

        Ok(event)
    }

    fn reset(&mut self) {
        self.state_machine.reset();
        self.threshold.reset(self.config.initial_floor_db);
        self.metrics = VadMetrics::default();
    }

    fn current_state(&self) -> VadState {
        self.state_machine.current_state()
    }
}

impl VadEngine for ReferenceVad {
    fn process(&mut self, frame: &[i16]) -> Result<Option<VadEvent>, String> {
        VadProcessor::process(self, frame)
    }

    fn reset(&mut self) {
        VadProcessor::reset(self)
    }

    fn current_state(&self) -> VadState {
        VadProcessor::current_state(self)
    }

    fn required_sample_rate(&self) -> u32 {
        self.config.sample_rate_hz
    }

    fn required_frame_size_samples(&self) -> usize {
        self.config.frame_size_samples
    }
}

pub struct ReferenceVadBuilder {
    config: VadConfig,
}

impl ReferenceVadBuilder {
    pub fn new() -> Self {
        Self {
            config: VadConfig::default(),
        }
    }

    pub fn onset_threshold(mut self, db: f32) -> Self {
        self.config.onset_threshold_db = db;
        self
    }

    pub fn offset_threshold(mut self, db: f32) -> Self {
        self.config.offset_threshold_db = db;
        self
    }

    pub fn ema_alpha(mut self, alpha: f32) -> Self {
        self.config.ema_alpha = alpha.clamp(0.001, 1.0);
        self
    }

    pub fn speech_debounce_ms(mut self, ms: u32) -> Self {
        self.config.speech_debounce_ms = ms;
        self
    }

    pub fn silence_debounce_ms(mut self, ms: u32) -> Self {
        self.config.silence_debounce_ms = ms;
        self
    }

    pub fn initial_floor_db(mut self, db: f32) -> Self {
        self.config.initial_floor_db = db;
        self
    }

    pub fn frame_size(mut self, samples: usize) -> Self {
        self.config.frame_size_samples = samples;
        self
    }

    pub fn sample_rate(mut self, hz: u32) -> Self {
        self.config.sample_rate_hz = hz;
        self
    }

    pub fn build(self) -> ReferenceVad {
        ReferenceVad::new(self.config)
    }
}

impl Default for ReferenceVadBuilder {
    fn default() -> Self {
        Self::new()
    }
}
