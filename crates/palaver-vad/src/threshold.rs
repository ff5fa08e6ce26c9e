//! Adaptive noise-floor threshold used by the energy-based reference VAD
//! engine. Tracks a slowly-adapting noise floor via an EMA over silence
//! frames and gates speech candidacy against onset/offset margins above it.

use crate::types::VadConfig;

pub struct AdaptiveThreshold {
    floor_db: f32,
    ema_alpha: f32,
    onset_margin_db: f32,
    offset_margin_db: f32,
}

impl AdaptiveThreshold {
    pub fn new(config: &VadConfig) -> Self {
        Self {
            floor_db: config.initial_floor_db,
            ema_alpha: config.ema_alpha,
            onset_margin_db: config.onset_threshold_db,
            offset_margin_db: config.offset_threshold_db,
        }
    }

    pub fn should_activate(&self, energy_db: f32) -> bool {
        energy_db >= self.floor_db + self.onset_margin_db
    }

    pub fn should_deactivate(&self, energy_db: f32) -> bool {
        energy_db < self.floor_db + self.offset_margin_db
    }

    /// Only adapts the floor while in silence; speech energy must not pull
    /// the noise floor upward or onset detection would starve.
    pub fn update(&mut self, energy_db: f32, is_speech: bool) {
        if !is_speech {
            self.floor_db = (1.0 - self.ema_alpha) * self.floor_db + self.ema_alpha * energy_db;
        }
    }

    pub fn current_floor(&self) -> f32 {
        self.floor_db
    }

    pub fn reset(&mut self, initial_floor_db: f32) {
        self.floor_db = initial_floor_db;
    }
}
