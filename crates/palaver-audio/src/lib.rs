pub mod capture;
pub mod chunker;
pub mod config;
pub mod constants;
pub mod detector;
pub mod device;
pub mod frame_reader;
pub mod monitor;
pub mod resampler;
pub mod ring_buffer;
pub mod source;
#[cfg(unix)]
pub mod stderr_suppressor;
pub mod watchdog;

// Public API
pub use capture::{AudioCaptureThread, DeviceConfig};
pub use chunker::{AudioChunker, AudioFrame, ChunkerConfig, ResamplerQuality};
pub use config::AudioConfig;
pub use device::{DeviceInfo, DeviceManager};
pub use frame_reader::FrameReader;
pub use monitor::{DeviceEvent, DeviceMonitor, DeviceStatus};
pub use ring_buffer::AudioRingBuffer;
pub use source::{DeviceAudioSource, FileAudioSource};
pub use watchdog::WatchdogTimer;
