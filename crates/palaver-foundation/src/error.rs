use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PalaverError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Stt(#[from] SttError),

    #[error(transparent)]
    Vad(#[from] VadError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("component failed health check: {component}")]
    HealthCheckFailed { component: String },

    #[error("shutdown requested")]
    ShutdownRequested,

    #[error("fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("transient error, will retry: {0}")]
    Transient(String),
}

impl From<std::io::Error> for PalaverError {
    fn from(err: std::io::Error) -> Self {
        PalaverError::Fatal(format!("io error: {err}"))
    }
}

impl From<tokio::task::JoinError> for PalaverError {
    fn from(err: tokio::task::JoinError) -> Self {
        PalaverError::Transient(format!("task join failed: {err}"))
    }
}

/// Errors from AudioSource / DownSampler.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("device not found: {name:?}")]
    DeviceNotFound { name: Option<String> },

    #[error("device disconnected")]
    DeviceDisconnected,

    #[error("invalid format: sample_rate={sample_rate} channels={channels}")]
    InvalidFormat { sample_rate: u32, channels: u16 },

    #[error("buffer overflow, dropped {count} samples")]
    BufferOverflow { count: usize },

    #[error("no audio data for {duration:?}")]
    NoDataTimeout { duration: Duration },

    #[error("cpal error: {0}")]
    Cpal(#[from] cpal::StreamError),

    #[error("build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("wav decode error: {0}")]
    WavDecode(String),

    #[error("driver error: {0}")]
    Driver(String),

    #[error("unsupported sample format: {format}")]
    FormatNotSupported { format: String },

    #[error("fatal audio error: {0}")]
    Fatal(String),
}

/// VADFilter errors.
#[derive(Debug, thiserror::Error)]
pub enum VadError {
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    #[error("invalid frame size: expected {expected}, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },

    #[error("model initialization failed: {0}")]
    ModelInitFailed(String),
}

/// Transcriber errors.
#[derive(Debug, thiserror::Error)]
pub enum SttError {
    #[error("plugin not available: {plugin}: {reason}")]
    NotAvailable { plugin: String, reason: String },

    #[error("model load failed: {0}")]
    ModelLoadFailed(String),

    #[error("model not found: {path}")]
    ModelNotFound { path: PathBuf },

    #[error("transcription job failed: {0}")]
    JobFailed(String),

    #[error("job queue full")]
    QueueFull,

    #[error("worker shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// CommandDispatch / DraftMaker / StreamMonitor / supervisor TopErrorHandler errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("pattern index error: {0} (internal invariant broken)")]
    PatternIndexError(String),

    #[error("draft not found: {0}")]
    DraftNotFound(String),

    #[error("error handling exhausted all recovery callbacks: {0}")]
    ErrorHandlingException(String),
}

/// EventRouter / Rescanner errors.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("remote protocol error: {0}")]
    RemoteProtocolError(String),

    #[error("websocket error: {0}")]
    WebSocket(String),

    #[error("revision submission failed: {status}: {message}")]
    RevisionSubmission { status: u16, message: String },
}

/// DraftStore errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("draft id already exists: {0}")]
    DuplicateId(String),

    #[error("parent draft not found: {0}")]
    ParentNotFound(String),

    #[error("draft not found: {0}")]
    NotFound(String),

    #[error("sqlite error: {0}")]
    Sqlite(String),

    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration parsing error: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("missing required field: {0}")]
    MissingField(String),
}

#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    Retry { max_attempts: u32, delay: Duration },
    Fallback { to: String },
    Restart,
    Ignore,
    Fatal,
}

impl PalaverError {
    /// Local-vs-supervisor routing: invariant-violating errors escalate to a
    /// full restart or shutdown, everything else is retried, faded back to a
    /// fallback, or silently ignored.
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            PalaverError::Audio(AudioError::DeviceDisconnected) => RecoveryStrategy::Retry {
                max_attempts: 5,
                delay: Duration::from_secs(2),
            },
            PalaverError::Audio(AudioError::DeviceNotFound { .. }) => RecoveryStrategy::Fallback {
                to: "default".into(),
            },
            PalaverError::Audio(AudioError::BufferOverflow { .. }) => RecoveryStrategy::Ignore,
            PalaverError::Stt(SttError::JobFailed(_)) => RecoveryStrategy::Ignore,
            PalaverError::Core(CoreError::PatternIndexError(_)) => RecoveryStrategy::Fatal,
            PalaverError::Fatal(_) | PalaverError::ShutdownRequested => RecoveryStrategy::Fatal,
            _ => RecoveryStrategy::Restart,
        }
    }
}
