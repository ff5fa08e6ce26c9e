// Logging behavior:
// - Writes logs to both stderr and a daily-rotated file at logs/palaver.log.
// - Default log level is INFO. Control via RUST_LOG environment variable:
//   * RUST_LOG=info                          # Standard logging (default)
//   * RUST_LOG=debug                         # Verbose debugging
//   * RUST_LOG=palaver_app=info,palaver_core=trace  # Fine-grained per-module control
// - The logs/ directory is created on startup if missing; file output uses a non-blocking writer.
// - File layer disables ANSI to keep logs clean for analysis.
use std::fs;
use std::path::Path;
use std::time::Duration;
use std::time::SystemTime;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use palaver_app::{pipeline, Settings};
use palaver_audio::DeviceManager;
use palaver_foundation::{AppState, HealthMonitor, ShutdownHandler, StateManager};

fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>>
{
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "palaver.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr);
    let file_layer = fmt::layer().with_writer(non_blocking_file).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

/// Prune rotated log files in `logs/` older than `retention_days` days.
/// If `retention_days` is `Some(0)` pruning is disabled. Default is 7 days when `None`.
fn prune_old_logs(retention_days: Option<u64>) {
    let retention = retention_days.unwrap_or(7);
    if retention == 0 {
        tracing::debug!("Log retention disabled (retention_days=0)");
        return;
    }

    let cutoff = match SystemTime::now().checked_sub(Duration::from_secs(retention * 24 * 60 * 60))
    {
        Some(t) => t,
        None => return,
    };

    let logs_dir = Path::new("logs");
    if !logs_dir.exists() {
        return;
    }

    match fs::read_dir(logs_dir) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let path = entry.path();
                if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                    if name.starts_with("palaver.log.") {
                        if let Ok(meta) = entry.metadata() {
                            if let Ok(modified) = meta.modified() {
                                if modified < cutoff {
                                    if let Err(e) = fs::remove_file(&path) {
                                        tracing::warn!(
                                            "Failed to remove old log {}: {}",
                                            path.display(),
                                            e
                                        );
                                    } else {
                                        tracing::info!("Removed old log file: {}", path.display());
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        Err(e) => tracing::warn!("Failed to read logs directory for pruning: {}", e),
    }
}

#[derive(Parser, Debug)]
#[command(name = "palaver", author, version, about = "Palaver voice pipeline")]
struct Cli {
    /// List available input devices and exit
    #[arg(long = "list-devices")]
    list_devices: bool,

    /// Override the input device named in config
    #[arg(long = "device")]
    device: Option<String>,

    /// Log retention in days for rotated files (0 disables pruning)
    #[arg(long = "log-retention-days", env = "PALAVER_LOG_RETENTION_DAYS")]
    log_retention_days: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Give PipeWire better routing hints if using its ALSA bridge (Linux only)
    #[cfg(target_os = "linux")]
    std::env::set_var(
        "PIPEWIRE_PROPS",
        "{ application.name=Palaver media.role=capture }",
    );
    let _log_guard = init_logging()?;

    let cli = Cli::parse();
    prune_old_logs(cli.log_retention_days);
    tracing::info!("Starting Palaver application");

    if cli.list_devices {
        let dm = DeviceManager::new()?;
        tracing::info!("CPAL host: {:?}", dm.host_id());
        let devices = dm.enumerate_devices();
        println!("Input devices (host: {:?}):", dm.host_id());
        for d in devices {
            let def = if d.is_default { " (default)" } else { "" };
            println!("- {}{}", d.name, def);
        }
        return Ok(());
    }

    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::error!("Failed to load settings: {}", e);
        Settings::default()
    });

    let state_manager = StateManager::new();
    let _health_monitor = HealthMonitor::new(Duration::from_secs(10)).start();
    let shutdown = ShutdownHandler::new().install().await;

    state_manager.transition(AppState::Running)?;
    tracing::info!("Application state: Running");

    let handle = pipeline::start(settings, cli.device)
        .await
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)?;

    let mut stats_interval = tokio::time::interval(Duration::from_secs(30));
    let metrics = handle.metrics.clone();
    tokio::select! {
        _ = shutdown.wait() => {
            tracing::debug!("Shutdown signal received");
        }
        _ = async {
            loop {
                stats_interval.tick().await;
                tracing::info!(
                    capture_fps = metrics.capture_fps.load(std::sync::atomic::Ordering::Relaxed),
                    chunker_fps = metrics.chunker_fps.load(std::sync::atomic::Ordering::Relaxed),
                    speech_segments = metrics.speech_segments_count.load(std::sync::atomic::Ordering::Relaxed),
                    stt_success = metrics.stt_transcription_success.load(std::sync::atomic::Ordering::Relaxed),
                    stt_failures = metrics.stt_transcription_failures.load(std::sync::atomic::Ordering::Relaxed),
                    "Pipeline running..."
                );
            }
        } => {}
    }

    tracing::debug!("Beginning graceful shutdown");
    state_manager.transition(AppState::Stopping)?;
    handle.shutdown().await;
    state_manager.transition(AppState::Stopped)?;
    tracing::debug!("Shutdown complete");

    Ok(())
}
