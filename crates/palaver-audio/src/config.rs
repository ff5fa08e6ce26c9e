//! Configuration for AudioSource / DownSampler.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Preferred input device name; `None` lets [`crate::device::DeviceManager`]
    /// pick from its candidate priority list.
    pub device_name: Option<String>,
    /// RMS threshold (raw i16 scale) below which [`crate::detector::SilenceDetector`]
    /// considers a frame silent. This is a capture-side diagnostic only — it
    /// is not the VAD gate.
    pub silence_threshold: i16,
    /// Target chunk duration fed to the resampler/chunker (commonly 30ms).
    pub chunk_duration_ms: u32,
    /// If set, paces WAV file playback to real time instead of running as
    /// fast as possible ( `simulate_timing`).
    pub simulate_timing: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            silence_threshold: 500,
            chunk_duration_ms: crate::constants::DEFAULT_CHUNK_MS,
            simulate_timing: true,
        }
    }
}
