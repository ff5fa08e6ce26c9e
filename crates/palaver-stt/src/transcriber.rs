//! Transcriber: accumulates in-speech samples into a bounded buffer,
//! submits completed windows as jobs to a single worker task, and emits at
//! most one `TextEvent` per completed job.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use palaver_core::event_bus::EventBus;
use palaver_core::types::{SourceId, TextEvent};
use palaver_foundation::error::{PalaverError, SttError};
use parking_lot::Mutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::plugin::SttPlugin;
use crate::types::TranscriptionEvent;

/// Sentinel text produced by engines (e.g. whisper.cpp) for silent/noise-only
/// windows. Jobs resolving to exactly this text are dropped without emitting
/// a `TextEvent`.
pub const BLANK_AUDIO_SENTINEL: &str = "[BLANK_AUDIO]";

const SHUTDOWN_JOB_ID: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backpressure {
    /// Submitter blocks until the queue has room.
    Block,
    /// Submitter drops the job and logs a warning.
    Drop,
}

#[derive(Debug, Clone)]
pub struct TranscriberConfig {
    /// Samples accumulated before a job is submitted regardless of VAD
    /// state. ~30,000 samples is ~1.9s at 16 kHz.
    pub buffer_capacity_samples: usize,
    /// Bounded job queue depth.
    pub queue_size: usize,
    pub backpressure: Backpressure,
    pub shutdown_timeout: Duration,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            buffer_capacity_samples: 30_000,
            queue_size: 1,
            backpressure: Backpressure::Block,
            shutdown_timeout: Duration::from_secs(3),
        }
    }
}

struct Job {
    job_id: i64,
    samples: Vec<i16>,
    source_id: SourceId,
    audio_start_time: f64,
    audio_end_time: f64,
    initial_prompt: Option<String>,
}

/// Accumulates in-speech audio and drives a single STT worker task in
/// submission order. Cheap to clone; the accumulation buffer lives behind
/// an internal lock shared by every clone.
#[derive(Clone)]
pub struct Transcriber {
    inner: Arc<Inner>,
}

struct Inner {
    config: TranscriberConfig,
    job_tx: mpsc::Sender<Job>,
    worker: AsyncMutex<Option<JoinHandle<()>>>,
    error_rx: AsyncMutex<mpsc::Receiver<PalaverError>>,
    next_job_id: AtomicI64,
    last_completed_job_id: AtomicI64,
    pending_jobs: AtomicUsize,
    buffer: Mutex<Accumulator>,
}

#[derive(Default)]
struct Accumulator {
    samples: Vec<i16>,
    source_id: Option<SourceId>,
    start_time: Option<f64>,
    end_time: Option<f64>,
    /// Rolling initial-prompt string, carried forward into every job drained
    /// from this buffer until replaced.
    prompt: Option<String>,
}

impl Transcriber {
    /// Spawns the worker task that owns `engine` and publishes completed
    /// transcriptions onto `bus`. Worker errors are funneled through a
    /// dedicated channel (read with [`Transcriber::error_handle`]) rather
    /// than being dropped.
    pub fn spawn(
        mut engine: Box<dyn SttPlugin>,
        config: TranscriberConfig,
        bus: EventBus,
    ) -> Self {
        let (job_tx, mut job_rx) = mpsc::channel::<Job>(config.queue_size.max(1));
        let (error_tx, error_rx) = mpsc::channel::<PalaverError>(8);

        let inner = Arc::new(Inner {
            config: config.clone(),
            job_tx,
            worker: AsyncMutex::new(None),
            error_rx: AsyncMutex::new(error_rx),
            next_job_id: AtomicI64::new(1),
            last_completed_job_id: AtomicI64::new(0),
            pending_jobs: AtomicUsize::new(0),
            buffer: Mutex::new(Accumulator::default()),
        });

        let pending_ref = inner.clone();
        let worker = tokio::spawn(async move {
            loop {
                let Some(job) = job_rx.recv().await else {
                    break;
                };
                if job.job_id == SHUTDOWN_JOB_ID {
                    info!(target: "stt", "transcriber worker received shutdown sentinel");
                    break;
                }

                let result = run_job(engine.as_mut(), &job).await;
                pending_ref.pending_jobs.fetch_sub(1, Ordering::SeqCst);

                match result {
                    Ok(Some(event)) => bus.publish_text(event),
                    Ok(None) => {}
                    Err(err) => {
                        warn!(target: "stt", job_id = job.job_id, error = %err, "transcription job failed");
                        let _ = error_tx.send(err).await;
                    }
                }
                pending_ref
                    .last_completed_job_id
                    .store(job.job_id, Ordering::SeqCst);
            }
        });

        let transcriber = Self { inner };
        // Safe: no other clone can have observed `worker` yet.
        *transcriber.inner.worker.try_lock().expect("fresh transcriber") = Some(worker);
        transcriber
    }

    /// Feeds in-speech samples, submitting a job if the buffer fills.
    pub async fn accept_chunk(
        &self,
        source_id: SourceId,
        timestamp: f64,
        duration: f64,
        samples: &[f32],
    ) -> Result<(), PalaverError> {
        let pcm = f32_to_i16(samples);
        let job = {
            let mut buf = self.inner.buffer.lock();
            if buf.samples.is_empty() {
                buf.source_id = Some(source_id);
                buf.start_time = Some(timestamp);
            }
            buf.end_time = Some(timestamp + duration);

            let capacity = self.inner.config.buffer_capacity_samples;
            let space = capacity.saturating_sub(buf.samples.len());
            if pcm.len() <= space {
                buf.samples.extend_from_slice(&pcm);
                None
            } else {
                buf.samples.extend_from_slice(&pcm[..space]);
                let job = drain_job(&mut buf, self.inner.next_job_id.fetch_add(1, Ordering::SeqCst));
                buf.samples.extend_from_slice(&pcm[space..]);
                buf.source_id = Some(source_id);
                buf.start_time = Some(timestamp);
                buf.end_time = Some(timestamp + duration);
                job
            }
        };
        if let Some(job) = job {
            self.submit(job).await?;
        }

        if self.inner.buffer.lock().samples.len() >= self.inner.config.buffer_capacity_samples {
            self.flush_pending(false, Duration::from_secs(0)).await?;
        }
        Ok(())
    }

    /// Submits whatever is buffered (if non-empty) as a job. Used on
    /// `SpeechStop`, `AudioStop`, and explicit flush requests.
    pub async fn flush_pending(
        &self,
        wait_for_result: bool,
        timeout: Duration,
    ) -> Result<(), PalaverError> {
        let job = {
            let mut buf = self.inner.buffer.lock();
            if buf.samples.is_empty() {
                None
            } else {
                drain_job(&mut buf, self.inner.next_job_id.fetch_add(1, Ordering::SeqCst))
            }
        };
        let Some(job) = job else { return Ok(()) };
        let job_id = job.job_id;
        self.submit(job).await?;

        if wait_for_result {
            let deadline = tokio::time::Instant::now() + timeout;
            while self.inner.last_completed_job_id.load(Ordering::SeqCst) < job_id {
                if tokio::time::Instant::now() >= deadline {
                    return Err(PalaverError::Stt(SttError::ShutdownTimeout(timeout)));
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
        Ok(())
    }

    /// Sets the rolling initial-prompt string applied to the next submitted
    /// job (and every job after, until changed again).
    pub fn set_initial_prompt(&self, prompt: Option<String>) {
        self.inner.buffer.lock().prompt = prompt;
    }

    /// True when there is unflushed audio or in-flight jobs.
    pub fn sound_pending(&self) -> bool {
        !self.inner.buffer.lock().samples.is_empty()
            || self.inner.pending_jobs.load(Ordering::SeqCst) > 0
    }

    /// Reads the next worker error, if any is queued. Intended to be driven
    /// by the owning supervised task and routed to the TopErrorHandler.
    pub async fn next_error(&self) -> Option<PalaverError> {
        self.inner.error_rx.lock().await.recv().await
    }

    /// Enqueues the shutdown sentinel and waits (up to `config.shutdown_timeout`)
    /// for the worker to exit, aborting it if the deadline passes.
    pub async fn shutdown(&self) -> Result<(), PalaverError> {
        let _ = self
            .inner
            .job_tx
            .send(Job {
                job_id: SHUTDOWN_JOB_ID,
                samples: Vec::new(),
                source_id: SourceId::nil(),
                audio_start_time: 0.0,
                audio_end_time: 0.0,
                initial_prompt: None,
            })
            .await;

        let mut guard = self.inner.worker.lock().await;
        if let Some(handle) = guard.take() {
            match tokio::time::timeout(self.inner.config.shutdown_timeout, handle).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(join_err)) => Err(PalaverError::from(join_err)),
                Err(_) => {
                    error!(target: "stt", "transcriber worker did not shut down in time, aborting");
                    Err(PalaverError::Stt(SttError::ShutdownTimeout(
                        self.inner.config.shutdown_timeout,
                    )))
                }
            }
        } else {
            Ok(())
        }
    }

    async fn submit(&self, job: Job) -> Result<(), PalaverError> {
        self.inner.pending_jobs.fetch_add(1, Ordering::SeqCst);
        match self.inner.config.backpressure {
            Backpressure::Block => {
                self.inner
                    .job_tx
                    .send(job)
                    .await
                    .map_err(|_| PalaverError::Stt(SttError::JobFailed("worker channel closed".into())))
            }
            Backpressure::Drop => match self.inner.job_tx.try_send(job) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(target: "stt", "job queue full, dropping transcription job");
                    self.inner.pending_jobs.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    self.inner.pending_jobs.fetch_sub(1, Ordering::SeqCst);
                    Err(PalaverError::Stt(SttError::JobFailed("worker channel closed".into())))
                }
            },
        }
    }
}

fn drain_job(buf: &mut Accumulator, job_id: i64) -> Option<Job> {
    if buf.samples.is_empty() {
        return None;
    }
    let samples = std::mem::take(&mut buf.samples);
    let source_id = buf.source_id.take().unwrap_or_else(SourceId::nil);
    let audio_start_time = buf.start_time.take().unwrap_or(0.0);
    let audio_end_time = buf.end_time.take().unwrap_or(audio_start_time);
    Some(Job {
        job_id,
        samples,
        source_id,
        audio_start_time,
        audio_end_time,
        initial_prompt: buf.prompt.clone(),
    })
}

async fn run_job(
    engine: &mut dyn SttPlugin,
    job: &Job,
) -> Result<Option<TextEvent>, PalaverError> {
    debug!(
        target: "stt",
        job_id = job.job_id,
        samples = job.samples.len(),
        "submitting transcription job"
    );

    engine.set_initial_prompt(job.initial_prompt.as_deref()).await?;

    let event = match engine.process_audio(&job.samples).await? {
        Some(event) => Some(event),
        None => engine.finalize().await?,
    };

    let Some(event) = event else { return Ok(None) };
    let text = match event {
        TranscriptionEvent::Final { text, .. } => text,
        TranscriptionEvent::Partial { text, .. } => text,
        TranscriptionEvent::Error { code, message } => {
            return Err(PalaverError::Stt(SttError::JobFailed(format!(
                "{code}: {message}"
            ))));
        }
    };

    if text.trim() == BLANK_AUDIO_SENTINEL || text.trim().is_empty() {
        debug!(target: "stt", job_id = job.job_id, "blank transcription, dropping");
        return Ok(None);
    }

    Ok(Some(TextEvent::new(
        job.source_id,
        job.audio_start_time,
        job.audio_end_time,
        text,
    )))
}

fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}
