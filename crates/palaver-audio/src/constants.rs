//! Shared constants for the capture/downsample pipeline (AudioSource/DownSampler).

/// Target sample rate downstream VAD/STT components require.
pub const TARGET_SAMPLE_RATE_HZ: u32 = 16_000;

/// Target channel count after downmixing.
pub const TARGET_CHANNELS: u16 = 1;

/// Default fixed audio callback cadence in milliseconds.
pub const DEFAULT_CHUNK_MS: u32 = 30;
