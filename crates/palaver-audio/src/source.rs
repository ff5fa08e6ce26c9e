//! AudioSource: the device and file backends, each
//! publishing `palaver_core::types::AudioChunk`/`AudioLifecycleEvent`
//! straight onto the shared [`EventBus`] rather than invoking a callback —
//! the Rust-native form of the `start(callback)` contract, consistent with
//! every other component in this pipeline.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use uuid::Uuid;

use palaver_core::event_bus::EventBus;
use palaver_core::types::{AudioChunk, AudioLifecycleEvent, ChannelCount, SampleType, SourceId, StopReason};
use palaver_foundation::error::{AudioError, PalaverError};

use crate::capture::AudioCaptureThread;
use crate::chunker::{AudioChunker, ChunkerConfig, ResamplerQuality};
use crate::config::AudioConfig;
use crate::constants::TARGET_SAMPLE_RATE_HZ;
use crate::frame_reader::FrameReader;
use crate::resampler::StreamResampler;
use crate::ring_buffer::AudioRingBuffer;

/// Device-backed AudioSource: opens the platform audio interface via
/// [`AudioCaptureThread`], downsamples through [`AudioChunker`], and
/// forwards the result onto the bus as [`AudioChunk`]s.
pub struct DeviceAudioSource {
    source_id: SourceId,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    capture: Option<AudioCaptureThread>,
    chunker_handle: Option<JoinHandle<()>>,
    forward_handle: Option<JoinHandle<()>>,
}

impl DeviceAudioSource {
    /// Opens the device and begins streaming. `capture_buffer_samples` sizes
    /// the lock-free ring between the audio callback thread and the async
    /// frame reader.
    pub fn start(
        bus: EventBus,
        config: AudioConfig,
        device_name: Option<String>,
        resampler_quality: ResamplerQuality,
        capture_buffer_samples: usize,
    ) -> Result<Self, PalaverError> {
        let source_id = Uuid::new_v4();
        let ring = AudioRingBuffer::new(capture_buffer_samples);
        let (producer, consumer) = ring.split();

        let (capture, device_cfg, device_cfg_rx) =
            AudioCaptureThread::spawn(config, producer, device_name)
                .map_err(PalaverError::Audio)?;

        let frame_reader = FrameReader::new(
            consumer,
            device_cfg.sample_rate,
            device_cfg.channels,
            4096,
            None,
        );

        let chunker_cfg = ChunkerConfig {
            resampler_quality,
            ..ChunkerConfig::default()
        };
        let blocksize = chunker_cfg.frame_size_samples;
        let sample_rate = chunker_cfg.sample_rate_hz;

        let (chunk_tx, mut chunk_rx) = tokio::sync::broadcast::channel(256);
        let chunker = AudioChunker::new(frame_reader, chunk_tx, chunker_cfg)
            .with_device_config(device_cfg_rx);
        let chunker_handle = chunker.spawn();

        let running = Arc::new(AtomicBool::new(true));
        let paused = Arc::new(AtomicBool::new(false));

        let forward_bus = bus;
        let forward_running = running.clone();
        let forward_paused = paused.clone();
        let forward_handle = tokio::spawn(async move {
            let mut started = false;
            loop {
                match chunk_rx.recv().await {
                    Ok(frame) => {
                        if !forward_running.load(Ordering::Acquire) {
                            break;
                        }
                        if forward_paused.load(Ordering::Acquire) {
                            continue;
                        }
                        if !started {
                            started = true;
                            forward_bus.publish_audio_lifecycle(AudioLifecycleEvent::Start {
                                source: source_id,
                                sample_rate,
                                channels: ChannelCount::Mono(1),
                            });
                        }
                        let timestamp = frame.timestamp.elapsed().as_secs_f64();
                        let chunk = AudioChunk {
                            source_id,
                            stream_start_time: 0.0,
                            timestamp,
                            duration: blocksize as f64 / sample_rate as f64,
                            sample_rate,
                            channels: ChannelCount::Mono(1),
                            blocksize,
                            sample_type: SampleType::F32,
                            in_speech: false,
                            data: Arc::from(frame.samples),
                        };
                        forward_bus.publish_audio_chunk(chunk);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            forward_bus.publish_audio_lifecycle(AudioLifecycleEvent::Stop {
                source: source_id,
                reason: StopReason::Normal,
            });
        });

        Ok(Self {
            source_id,
            running,
            paused,
            capture: Some(capture),
            chunker_handle: Some(chunker_handle),
            forward_handle: Some(forward_handle),
        })
    }

    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    pub fn is_streaming(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    /// Stops the source. After this returns, no further chunks are
    /// published for this `source_id`.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.chunker_handle.take() {
            handle.abort();
        }
        if let Some(handle) = self.forward_handle.take() {
            handle.abort();
        }
        if let Some(capture) = self.capture.take() {
            capture.stop();
        }
    }
}

/// WAV-file-backed AudioSource. Decodes the whole file up front, mixes to
/// mono, resamples to 16 kHz, then emits fixed-`blocksize` chunks, padding
/// the final chunk with zeros.
pub struct FileAudioSource {
    source_id: SourceId,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FileAudioSource {
    pub fn start(
        bus: EventBus,
        path: impl AsRef<Path>,
        simulate_timing: bool,
        resampler_quality: ResamplerQuality,
    ) -> Result<Self, PalaverError> {
        let path = path.as_ref();
        let mut reader = hound::WavReader::open(path)
            .map_err(|e| PalaverError::Audio(AudioError::WavDecode(e.to_string())))?;
        let spec = reader.spec();
        let in_rate = spec.sample_rate;
        let channels = spec.channels.max(1) as usize;

        let samples_i16: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 16) => reader
                .samples::<i16>()
                .collect::<Result<_, _>>()
                .map_err(|e| PalaverError::Audio(AudioError::WavDecode(e.to_string())))?,
            (hound::SampleFormat::Int, 32) => reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v >> 16) as i16))
                .collect::<Result<_, _>>()
                .map_err(|e| PalaverError::Audio(AudioError::WavDecode(e.to_string())))?,
            (hound::SampleFormat::Float, _) => reader
                .samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * 32767.0).round() as i16))
                .collect::<Result<_, _>>()
                .map_err(|e| PalaverError::Audio(AudioError::WavDecode(e.to_string())))?,
            (format, bits) => {
                return Err(PalaverError::Audio(AudioError::FormatNotSupported {
                    format: format!("{format:?}/{bits}"),
                }));
            }
        };

        let mono: Vec<i16> = if channels <= 1 {
            samples_i16
        } else {
            samples_i16
                .chunks_exact(channels)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                    (sum / channels as i32) as i16
                })
                .collect()
        };

        let resampled = if in_rate == TARGET_SAMPLE_RATE_HZ {
            mono
        } else {
            let mut resampler =
                StreamResampler::new_with_quality(in_rate, TARGET_SAMPLE_RATE_HZ, resampler_quality);
            resampler.process(&mono)
        };

        let source_id = Uuid::new_v4();
        let running = Arc::new(AtomicBool::new(true));
        let paused = Arc::new(AtomicBool::new(false));
        let blocksize = ChunkerConfig::default().frame_size_samples;

        let task_running = running.clone();
        let task_paused = paused.clone();
        let handle = tokio::spawn(async move {
            bus.publish_audio_lifecycle(AudioLifecycleEvent::Start {
                source: source_id,
                sample_rate: TARGET_SAMPLE_RATE_HZ,
                channels: ChannelCount::Mono(1),
            });

            let frame_duration = Duration::from_secs_f64(blocksize as f64 / TARGET_SAMPLE_RATE_HZ as f64);
            let total = resampled.len();
            let mut offset = 0usize;
            let mut timestamp = 0.0f64;

            loop {
                while task_paused.load(Ordering::Acquire) && task_running.load(Ordering::Acquire) {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
                if !task_running.load(Ordering::Acquire) {
                    break;
                }

                let end = (offset + blocksize).min(total);
                let mut samples: Vec<f32> = resampled[offset..end]
                    .iter()
                    .map(|&s| s as f32 / i16::MAX as f32)
                    .collect();
                samples.resize(blocksize, 0.0);

                bus.publish_audio_chunk(AudioChunk {
                    source_id,
                    stream_start_time: 0.0,
                    timestamp,
                    duration: blocksize as f64 / TARGET_SAMPLE_RATE_HZ as f64,
                    sample_rate: TARGET_SAMPLE_RATE_HZ,
                    channels: ChannelCount::Mono(1),
                    blocksize,
                    sample_type: SampleType::F32,
                    in_speech: false,
                    data: Arc::from(samples),
                });

                timestamp += blocksize as f64 / TARGET_SAMPLE_RATE_HZ as f64;
                offset += blocksize;

                if offset >= total {
                    break;
                }
                if simulate_timing {
                    tokio::time::sleep(frame_duration).await;
                }
            }

            bus.publish_audio_lifecycle(AudioLifecycleEvent::Stop {
                source: source_id,
                reason: StopReason::Eof,
            });
            task_running.store(false, Ordering::Release);
        });

        Ok(Self {
            source_id,
            running,
            paused,
            handle: Some(handle),
        })
    }

    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    pub fn is_streaming(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    /// Awaits completion (EOF) of the file playback task.
    pub async fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}
