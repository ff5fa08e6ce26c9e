//! `PipelineConfig`-equivalent root settings struct: TOML file + `PALAVER_*`
//! environment overrides, loaded once at startup (see each settings struct's `Default` impl).

use serde::{Deserialize, Serialize};

use palaver_audio::ResamplerQuality;
use palaver_foundation::error::{ConfigError, PalaverError};

fn default_resampler_quality() -> String {
    "balanced".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    pub device: Option<String>,
    pub capture_buffer_samples: usize,
    #[serde(default = "default_resampler_quality")]
    pub resampler_quality: String,
    pub simulate_timing: bool,
    /// When set, `main` opens this WAV file instead of a live device.
    pub input_file: Option<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            device: None,
            capture_buffer_samples: 65_536,
            resampler_quality: default_resampler_quality(),
            simulate_timing: true,
            input_file: None,
        }
    }
}

impl AudioSettings {
    pub fn resampler_quality(&self) -> ResamplerQuality {
        match self.resampler_quality.to_lowercase().as_str() {
            "fast" => ResamplerQuality::Fast,
            "quality" => ResamplerQuality::Quality,
            _ => ResamplerQuality::Balanced,
        }
    }
}

/// VAD onset/offset thresholds and debounce windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadSettings {
    pub onset_threshold_db: f32,
    pub offset_threshold_db: f32,
    pub ema_alpha: f32,
    pub speech_debounce_ms: u32,
    /// Normal-mode default 800ms; set higher for long-note dictation.
    pub silence_debounce_ms: u32,
    pub initial_floor_db: f32,
    pub speech_pad_ms: u32,
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            onset_threshold_db: 9.0,
            offset_threshold_db: 6.0,
            ema_alpha: 0.02,
            speech_debounce_ms: 60,
            silence_debounce_ms: 800,
            initial_floor_db: -60.0,
            speech_pad_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttSettings {
    /// "whisper", "mock", or "noop"; falls back down this preference order
    /// when the preferred plugin's requirements aren't met.
    pub preferred: String,
    pub fallbacks: Vec<String>,
    pub buffer_capacity_samples: usize,
    pub queue_size: usize,
}

impl Default for SttSettings {
    fn default() -> Self {
        Self {
            preferred: "whisper".to_string(),
            fallbacks: vec!["noop".to_string()],
            buffer_capacity_samples: 30_000,
            queue_size: 1,
        }
    }
}

/// Attention/command/draft phrase names and the two-stage match thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseSettings {
    pub names: Vec<String>,
    pub require_alerts: bool,
    pub attention_score: u32,
    pub command_score: u32,
}

impl Default for PhraseSettings {
    fn default() -> Self {
        Self {
            names: vec!["rupert".to_string(), "freddy".to_string()],
            require_alerts: true,
            attention_score: 70,
            command_score: 75,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSettings {
    pub enabled: bool,
    pub bind_addr: String,
    pub server_uri: Option<String>,
    pub pre_buffer_seconds: f64,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_addr: "127.0.0.1:9731".to_string(),
            server_uri: None,
            pre_buffer_seconds: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    pub db_path: String,
    pub enable_file_storage: bool,
    pub side_file_dir: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            db_path: "palaver-drafts.sqlite3".to_string(),
            enable_file_storage: false,
            side_file_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescanSettings {
    pub enabled: bool,
    pub remote_ws_url: Option<String>,
    pub revision_endpoint: Option<String>,
    pub pre_draft_seconds: f64,
    pub local_draft_wait_secs: u64,
}

impl Default for RescanSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            remote_ws_url: None,
            revision_endpoint: None,
            pre_draft_seconds: 30.0,
            local_draft_wait_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub audio: AudioSettings,
    pub vad: VadSettings,
    pub stt: SttSettings,
    pub phrases: PhraseSettings,
    pub router: RouterSettings,
    pub store: StoreSettings,
    pub rescan: RescanSettings,
}

impl Settings {
    /// Loads `palaver.toml` (if present) layered under `PALAVER_*`
    /// environment overrides (double-underscore nesting, e.g.
    /// `PALAVER_VAD__SILENCE_DEBOUNCE_MS=500`).
    pub fn new() -> Result<Self, PalaverError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("palaver").required(false))
            .add_source(
                config::Environment::with_prefix("PALAVER")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: Settings = builder
            .build()
            .map_err(ConfigError::Parse)?
            .try_deserialize()
            .map_err(ConfigError::Parse)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Clamps/rejects settings that would otherwise produce a silently
    /// broken pipeline.
    pub fn validate(&self) -> Result<(), PalaverError> {
        if self.vad.silence_debounce_ms == 0 {
            return Err(PalaverError::Config(ConfigError::Validation {
                field: "vad.silence_debounce_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            }));
        }
        if self.stt.buffer_capacity_samples == 0 {
            return Err(PalaverError::Config(ConfigError::Validation {
                field: "stt.buffer_capacity_samples".to_string(),
                reason: "must be greater than zero".to_string(),
            }));
        }
        if self.phrases.names.is_empty() {
            return Err(PalaverError::Config(ConfigError::Validation {
                field: "phrases.names".to_string(),
                reason: "at least one attention name is required".to_string(),
            }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let settings = Settings::default();
        assert_eq!(settings.phrases.attention_score, 70);
        assert_eq!(settings.phrases.command_score, 75);
        assert_eq!(settings.vad.silence_debounce_ms, 800);
        assert_eq!(settings.stt.buffer_capacity_samples, 30_000);
        assert_eq!(settings.rescan.local_draft_wait_secs, 15);
    }

    #[test]
    fn validate_rejects_zero_silence_debounce() {
        let mut settings = Settings::default();
        settings.vad.silence_debounce_ms = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_names() {
        let mut settings = Settings::default();
        settings.phrases.names.clear();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn resampler_quality_parses_case_insensitively() {
        let mut settings = AudioSettings::default();
        settings.resampler_quality = "FAST".to_string();
        assert!(matches!(settings.resampler_quality(), ResamplerQuality::Fast));
    }
}
