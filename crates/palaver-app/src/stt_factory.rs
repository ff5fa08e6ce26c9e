//! Picks and initializes a concrete Transcriber STT backend from `SttSettings`,
//! falling back down `fallbacks` in order when the preferred plugin's
//! `is_available()` check fails.

use tracing::{info, warn};

use palaver_foundation::error::{PalaverError, SttError};
use palaver_stt::plugin::SttPlugin;
use palaver_stt::plugins::mock::MockPlugin;
use palaver_stt::plugins::noop::NoOpPlugin;
use palaver_stt::types::TranscriptionConfig;

use crate::config::SttSettings;

#[cfg(feature = "whisper")]
fn make(id: &str) -> Option<Box<dyn SttPlugin>> {
    match id {
        "whisper" => Some(Box::new(palaver_stt_whisper::WhisperPlugin::new())),
        "mock" => Some(Box::new(MockPlugin::default())),
        "noop" => Some(Box::new(NoOpPlugin::new())),
        _ => None,
    }
}

#[cfg(not(feature = "whisper"))]
fn make(id: &str) -> Option<Box<dyn SttPlugin>> {
    match id {
        "mock" => Some(Box::new(MockPlugin::default())),
        "noop" => Some(Box::new(NoOpPlugin::new())),
        _ => None,
    }
}

/// Tries `settings.preferred`, then each of `settings.fallbacks` in order;
/// the first plugin whose `is_available`/`initialize`/`load_model` all
/// succeed is returned. `noop` is always appended as a last resort so
/// plugin selection itself is never a fatal startup error (model load
/// failure for the *chosen* plugin still is).
pub async fn build_plugin(settings: &SttSettings) -> Result<Box<dyn SttPlugin>, PalaverError> {
    let mut candidates: Vec<String> = Vec::with_capacity(settings.fallbacks.len() + 2);
    candidates.push(settings.preferred.clone());
    candidates.extend(settings.fallbacks.iter().cloned());
    if !candidates.iter().any(|c| c == "noop") {
        candidates.push("noop".to_string());
    }

    for id in &candidates {
        let Some(mut plugin) = make(id) else {
            warn!(plugin = %id, "unknown stt plugin id, skipping");
            continue;
        };
        match plugin.is_available().await {
            Ok(true) => {}
            Ok(false) => {
                warn!(plugin = %id, "stt plugin unavailable, trying next candidate");
                continue;
            }
            Err(err) => {
                warn!(plugin = %id, error = %err, "stt plugin availability check failed");
                continue;
            }
        }

        let config = TranscriptionConfig::default();
        if let Err(err) = plugin.initialize(config.clone()).await {
            warn!(plugin = %id, error = %err, "stt plugin initialize failed");
            continue;
        }
        if let Err(err) = plugin.load_model(None).await {
            warn!(plugin = %id, error = %err, "stt plugin model load failed");
            continue;
        }

        info!(plugin = %id, "stt plugin selected");
        return Ok(plugin);
    }

    Err(PalaverError::Stt(SttError::ModelLoadFailed(
        "no stt plugin candidate could be initialized".to_string(),
    )))
}
