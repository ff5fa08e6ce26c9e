//! Foundation crate tests
//!
//! Tests cover:
//! - Clock abstraction (RealClock, TestClock, SharedClock)
//! - Error types (PalaverError variants and their component error enums)
//! - Recovery strategy routing

use palaver_foundation::clock::{real_clock, test_clock, Clock, RealClock, TestClock};
use palaver_foundation::error::{
    AudioError, ConfigError, CoreError, PalaverError, RecoveryStrategy, RouterError, StoreError,
    SttError, VadError,
};
use std::time::{Duration, Instant};

// ─── RealClock Tests ────────────────────────────────────────────────

#[test]
fn real_clock_now_returns_current_time() {
    let clock = RealClock::new();
    let before = Instant::now();
    let clock_time = clock.now();
    let after = Instant::now();
    assert!(clock_time >= before);
    assert!(clock_time <= after);
}

#[test]
fn real_clock_factory_function() {
    let clock = real_clock();
    let t = clock.now();
    assert!(t.elapsed() < Duration::from_secs(1));
}

// ─── TestClock Tests ────────────────────────────────────────────────

#[test]
fn test_clock_starts_at_current_time() {
    let before = Instant::now();
    let clock = TestClock::new();
    let clock_time = clock.now();
    assert!(clock_time.duration_since(before) < Duration::from_millis(100));
}

#[test]
fn test_clock_advance() {
    let clock = TestClock::new();
    let t0 = clock.now();
    clock.advance(Duration::from_secs(5));
    let t1 = clock.now();
    assert_eq!(t1.duration_since(t0), Duration::from_secs(5));
}

#[test]
fn test_clock_advance_accumulates() {
    let clock = TestClock::new();
    let start = clock.now();
    clock.advance(Duration::from_millis(100));
    clock.advance(Duration::from_millis(200));
    clock.advance(Duration::from_millis(300));
    let elapsed = clock.now().duration_since(start);
    assert_eq!(elapsed, Duration::from_millis(600));
}

#[test]
fn test_clock_sleep_advances_time() {
    let clock = TestClock::new();
    let t0 = clock.now();
    clock.sleep(Duration::from_secs(10));
    let t1 = clock.now();
    assert_eq!(t1.duration_since(t0), Duration::from_secs(10));
}

#[test]
fn test_clock_set_time() {
    let clock = TestClock::new();
    let target = Instant::now() + Duration::from_secs(1000);
    clock.set_time(target);
    assert_eq!(clock.now(), target);
}

#[test]
fn test_clock_factory_function() {
    let clock = test_clock();
    let t = clock.now();
    clock.sleep(Duration::from_secs(1));
    let t2 = clock.now();
    assert_eq!(t2.duration_since(t), Duration::from_secs(1));
}

// ─── Error Type Tests ───────────────────────────────────────────────

#[test]
fn audio_error_device_not_found() {
    let err = AudioError::DeviceNotFound {
        name: Some("test_mic".to_string()),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("test_mic"));
}

#[test]
fn audio_error_buffer_overflow() {
    let err = AudioError::BufferOverflow { count: 512 };
    let msg = format!("{}", err);
    assert!(msg.contains("512"));
}

#[test]
fn audio_error_format_not_supported() {
    let err = AudioError::FormatNotSupported {
        format: "f64".to_string(),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("f64"));
}

#[test]
fn stt_error_job_failed() {
    let err = SttError::JobFailed("timeout".to_string());
    let msg = format!("{}", err);
    assert!(msg.contains("timeout"));
}

#[test]
fn stt_error_model_not_found() {
    let err = SttError::ModelNotFound {
        path: "/models/whisper".into(),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("whisper"));
}

#[test]
fn vad_error_invalid_frame_size() {
    let err = VadError::InvalidFrameSize {
        expected: 512,
        actual: 256,
    };
    let msg = format!("{}", err);
    assert!(msg.contains("512"));
    assert!(msg.contains("256"));
}

#[test]
fn core_error_pattern_index() {
    let err = CoreError::PatternIndexError("search offset past pattern length".to_string());
    let msg = format!("{}", err);
    assert!(msg.contains("search offset"));
}

#[test]
fn router_error_revision_submission() {
    let err = RouterError::RevisionSubmission {
        status: 409,
        message: "stale revision".to_string(),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("409"));
    assert!(msg.contains("stale revision"));
}

#[test]
fn store_error_duplicate_id() {
    let err = StoreError::DuplicateId("draft-42".to_string());
    let msg = format!("{}", err);
    assert!(msg.contains("draft-42"));
}

#[test]
fn palaver_error_from_audio_error() {
    let audio_err = AudioError::DeviceDisconnected;
    let err: PalaverError = audio_err.into();
    assert!(matches!(err, PalaverError::Audio(_)));
}

#[test]
fn palaver_error_from_stt_error() {
    let stt_err = SttError::JobFailed("test".to_string());
    let err: PalaverError = stt_err.into();
    assert!(matches!(err, PalaverError::Stt(_)));
}

#[test]
fn palaver_error_from_vad_error() {
    let vad_err = VadError::ProcessingFailed("test".to_string());
    let err: PalaverError = vad_err.into();
    assert!(matches!(err, PalaverError::Vad(_)));
}

#[test]
fn palaver_error_from_core_error() {
    let core_err = CoreError::DraftNotFound("draft-1".to_string());
    let err: PalaverError = core_err.into();
    assert!(matches!(err, PalaverError::Core(_)));
}

#[test]
fn palaver_error_from_router_error() {
    let router_err = RouterError::WebSocket("connection reset".to_string());
    let err: PalaverError = router_err.into();
    assert!(matches!(err, PalaverError::Router(_)));
}

#[test]
fn palaver_error_from_store_error() {
    let store_err = StoreError::NotFound("draft-1".to_string());
    let err: PalaverError = store_err.into();
    assert!(matches!(err, PalaverError::Store(_)));
}

#[test]
fn palaver_error_shutdown() {
    let err = PalaverError::ShutdownRequested;
    let msg = format!("{}", err);
    assert!(msg.contains("shutdown"));
}

#[test]
fn palaver_error_fatal() {
    let err = PalaverError::Fatal("critical failure".to_string());
    let msg = format!("{}", err);
    assert!(msg.contains("critical failure"));
}

#[test]
fn config_error_validation() {
    let err = ConfigError::Validation {
        field: "sample_rate".to_string(),
        reason: "must be 16000".to_string(),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("sample_rate"));
}

#[test]
fn config_error_missing_field() {
    let err = ConfigError::MissingField("stt.model_path".to_string());
    let msg = format!("{}", err);
    assert!(msg.contains("stt.model_path"));
}

// ─── Recovery Strategy Tests ────────────────────────────────────────

#[test]
fn device_disconnected_retries() {
    let err: PalaverError = AudioError::DeviceDisconnected.into();
    assert!(matches!(
        err.recovery_strategy(),
        RecoveryStrategy::Retry { .. }
    ));
}

#[test]
fn device_not_found_falls_back() {
    let err: PalaverError = AudioError::DeviceNotFound { name: None }.into();
    assert!(matches!(
        err.recovery_strategy(),
        RecoveryStrategy::Fallback { .. }
    ));
}

#[test]
fn buffer_overflow_is_ignored() {
    let err: PalaverError = AudioError::BufferOverflow { count: 10 }.into();
    assert!(matches!(err.recovery_strategy(), RecoveryStrategy::Ignore));
}

#[test]
fn pattern_index_error_is_fatal() {
    let err: PalaverError = CoreError::PatternIndexError("broken invariant".to_string()).into();
    assert!(matches!(err.recovery_strategy(), RecoveryStrategy::Fatal));
}

#[test]
fn shutdown_requested_is_fatal() {
    let err = PalaverError::ShutdownRequested;
    assert!(matches!(err.recovery_strategy(), RecoveryStrategy::Fatal));
}

#[test]
fn unmatched_error_restarts_by_default() {
    let err: PalaverError = VadError::ModelInitFailed("no model file".to_string()).into();
    assert!(matches!(err.recovery_strategy(), RecoveryStrategy::Restart));
}
