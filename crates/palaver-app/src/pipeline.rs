//! Wires the pipeline stages together:
//! audio source -> downsampler -> VAD -> merge -> transcriber -> {command
//! dispatch, draft maker}, with drafts/commands feeding the router and
//! store, the stream monitor observing the whole bus, the supervisor
//! owning every spawned task, and the rescanner plugging in as an
//! alternate audio source when rescan mode is enabled.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use palaver_audio::{AudioConfig, DeviceAudioSource, FileAudioSource, ResamplerQuality};
use palaver_core::event_bus::EventBus;
use palaver_core::patterns::{
    default_attention_patterns, default_commands, default_draft_end_patterns,
    default_draft_start_patterns,
};
use palaver_core::types::AudioLifecycleEvent;
use palaver_core::{
    AudioMerge, CommandDispatch, CommandDispatchConfig, DraftMaker, MergedEvent, RecoveryCallbacks,
    StreamMonitor, TopErrorHandler,
};
use palaver_foundation::error::PalaverError;
use palaver_rescan::{HttpRevisionSink, NetListener, Rescanner, RescannerConfig};
use palaver_router::{server as router_server, EventRouter, RouterConfig};
use palaver_stt::plugin::SttPlugin;
use palaver_stt::{Transcriber, TranscriberConfig};
use palaver_store::DraftStore;
use palaver_telemetry::PipelineMetrics;
use palaver_vad::filter::{VadFilter, VadFilterConfig};
use palaver_vad::reference::ReferenceVad;
use palaver_vad::types::VadConfig;

use crate::config::Settings;
use crate::stt_factory::build_plugin;

enum AudioSource {
    Device(DeviceAudioSource),
    File(FileAudioSource),
}

impl AudioSource {
    fn stop(self) {
        match self {
            AudioSource::Device(s) => s.stop(),
            AudioSource::File(mut s) => s.stop(),
        }
    }
}

/// Handle to a running pipeline: every spawned task, plus the shared
/// pieces (bus, store, metrics, optional router) a caller might want to
/// reach into.
pub struct PipelineHandle {
    pub bus: EventBus,
    pub metrics: PipelineMetrics,
    pub supervisor: Arc<TopErrorHandler>,
    pub store: Arc<DraftStore>,
    pub router: Option<Arc<EventRouter>>,
    source: Option<AudioSource>,
    tasks: Vec<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Cooperative shutdown: stops AudioSource (which cascades an `AudioStop` down
    /// the bus), then waits for every spawned task to drain and exit.
    pub async fn shutdown(mut self) {
        info!("pipeline shutdown: stopping audio source");
        if let Some(source) = self.source.take() {
            source.stop();
        }
        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                warn!(error = %err, "pipeline task ended with a join error");
            }
        }
        info!("pipeline shutdown complete");
    }
}

/// Starts the full pipeline (or, when `settings.rescan.enabled`, the
/// rescan-side pipeline) per `settings`.
pub async fn start(settings: Settings, device: Option<String>) -> Result<PipelineHandle, PalaverError> {
    let bus = EventBus::new(1024);
    let metrics = PipelineMetrics::default();
    let supervisor = TopErrorHandler::new(RecoveryCallbacks::default());
    let store = Arc::new(open_store(&settings)?);

    let names: Vec<&str> = settings.phrases.names.iter().map(String::as_str).collect();
    let draft_maker = DraftMaker::new(
        default_draft_start_patterns(&names),
        default_draft_end_patterns(&names),
    );
    let command_dispatch = CommandDispatch::new(
        CommandDispatchConfig {
            require_alerts: settings.phrases.require_alerts,
            attention_score: settings.phrases.attention_score,
            command_score: settings.phrases.command_score,
        },
        default_attention_patterns(&names),
        default_commands(&names),
    );

    let mut tasks = Vec::new();

    // --- audio source (device or file) ---------------------------------------
    let source = if let Some(path) = settings.audio.input_file.clone() {
        AudioSource::File(FileAudioSource::start(
            bus.clone(),
            PathBuf::from(path),
            settings.audio.simulate_timing,
            settings.audio.resampler_quality(),
        )?)
    } else {
        AudioSource::Device(DeviceAudioSource::start(
            bus.clone(),
            AudioConfig {
                device_name: device.clone().or_else(|| settings.audio.device.clone()),
                silence_threshold: 500,
                chunk_duration_ms: 30,
                simulate_timing: settings.audio.simulate_timing,
            },
            device.or_else(|| settings.audio.device.clone()),
            settings.audio.resampler_quality(),
            settings.audio.capture_buffer_samples,
        )?)
    };

    // --- VAD, run against the raw chunk/lifecycle streams ----------------------
    let vad_lifecycle_tx = spawn_vad_task(&bus, &settings, &supervisor, &mut tasks);

    // --- fan-in raw chunks with the VAD-augmented lifecycle stream -------------
    let (merge, merged_for_stt) =
        AudioMerge::new(bus.subscribe_audio_chunk(), vad_lifecycle_tx.subscribe(), 1024);
    let merged_for_router = merge.subscribe();
    let merged_for_monitor = merge.subscribe();
    tasks.push(tokio::spawn(merge.run()));

    // --- transcriber worker -----------------------------------------------------
    let plugin: Box<dyn SttPlugin> = build_plugin(&settings.stt).await?;
    let transcriber = Transcriber::spawn(
        plugin,
        TranscriberConfig {
            buffer_capacity_samples: settings.stt.buffer_capacity_samples,
            queue_size: settings.stt.queue_size,
            ..TranscriberConfig::default()
        },
        bus.clone(),
    );
    tasks.push(spawn_transcriber_feed(
        merged_for_stt,
        transcriber.clone(),
        settings.phrases.names.clone(),
    ));
    tasks.push(spawn_transcriber_error_watch(transcriber.clone(), supervisor.clone()));

    // --- command dispatch + draft maker, fed from TextEvents -------------------
    let router = if settings.router.enabled {
        let router = Arc::new(EventRouter::new(RouterConfig {
            server_uri: settings.router.server_uri.clone(),
            pre_buffer_seconds: settings.router.pre_buffer_seconds,
        }));
        let addr = settings
            .router
            .bind_addr
            .parse()
            .map_err(|e| PalaverError::Fatal(format!("invalid router.bind_addr: {e}")))?;
        let serve_router = router.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(err) = router_server::serve(addr, serve_router).await {
                error!(error = %err, "router server exited");
            }
        }));
        Some(router)
    } else {
        None
    };

    tasks.push(spawn_draft_command_task(
        bus.clone(),
        draft_maker,
        command_dispatch,
        store.clone(),
        router.clone(),
    ));

    // --- stream monitor, observes the merged bus --------------------------------
    tasks.push(spawn_stream_monitor(bus.clone(), merged_for_monitor));

    // --- router forwarding of audio/command/draft events ------------------------
    if let Some(router) = router.clone() {
        tasks.push(spawn_router_forwarding(bus.clone(), merged_for_router, router));
    }

    // --- rescan listener, if this node is a rescan client ------------------------
    if settings.rescan.enabled {
        tasks.push(spawn_rescan_client(&settings, bus.clone(), supervisor.clone())?);
    }

    Ok(PipelineHandle {
        bus,
        metrics,
        supervisor,
        store,
        router,
        source: Some(source),
        tasks,
    })
}

fn open_store(settings: &Settings) -> Result<DraftStore, PalaverError> {
    DraftStore::open(
        &settings.store.db_path,
        settings.store.enable_file_storage,
        settings
            .store
            .side_file_dir
            .as_ref()
            .map(PathBuf::from),
    )
}

/// VADFilter: reassembles chunks into VAD frames and republishes a lifecycle
/// stream carrying `SpeechStart`/`SpeechStop` plus every forwarded
/// `Start`/`Stop`/`Error` from the source, in the ordering requires.
fn spawn_vad_task(
    bus: &EventBus,
    settings: &Settings,
    supervisor: &Arc<TopErrorHandler>,
    tasks: &mut Vec<JoinHandle<()>>,
) -> broadcast::Sender<AudioLifecycleEvent> {
    let (vad_tx, _) = broadcast::channel(1024);
    let out = vad_tx.clone();
    let mut chunk_rx = bus.subscribe_audio_chunk();
    let mut lifecycle_rx = bus.subscribe_audio_lifecycle();

    let engine = ReferenceVad::new(VadConfig {
        onset_threshold_db: settings.vad.onset_threshold_db,
        offset_threshold_db: settings.vad.offset_threshold_db,
        ema_alpha: settings.vad.ema_alpha,
        speech_debounce_ms: settings.vad.speech_debounce_ms,
        silence_debounce_ms: settings.vad.silence_debounce_ms,
        initial_floor_db: settings.vad.initial_floor_db,
        ..VadConfig::default()
    });
    let filter_config = VadFilterConfig {
        threshold: 0.5,
        min_silence_ms: settings.vad.silence_debounce_ms,
        speech_pad_ms: settings.vad.speech_pad_ms,
        sampling_rate: 16_000,
    };
    let sup = supervisor.clone();

    let handle = sup.wrap_task(async move {
        let mut filter = VadFilter::new(engine, filter_config);
        loop {
            tokio::select! {
                chunk = chunk_rx.recv() => {
                    match chunk {
                        Ok(chunk) => {
                            let samples: Vec<i16> = chunk
                                .data
                                .iter()
                                .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                                .collect();
                            let output = filter.process_chunk(&samples, chunk.timestamp);
                            for transition in output.leading {
                                emit_transition(&out, chunk.source_id, transition, &filter_config);
                            }
                            for transition in output.trailing {
                                emit_transition(&out, chunk.source_id, transition, &filter_config);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "vad: chunk stream lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                event = lifecycle_rx.recv() => {
                    match event {
                        Ok(AudioLifecycleEvent::Stop { source, reason }) => {
                            if let Some(palaver_vad::filter::VadTransition::SpeechStop { at }) =
                                filter.force_stop_on_audio_stop()
                            {
                                let _ = out.send(AudioLifecycleEvent::SpeechStop {
                                    source,
                                    last_in_speech_chunk_time: at,
                                });
                            }
                            let _ = out.send(AudioLifecycleEvent::Stop { source, reason });
                        }
                        Ok(other) => { let _ = out.send(other); }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "vad: lifecycle stream lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
        Ok(())
    });
    tasks.push(handle);
    vad_tx
}

fn emit_transition(
    out: &broadcast::Sender<AudioLifecycleEvent>,
    source: palaver_core::types::SourceId,
    transition: palaver_vad::filter::VadTransition,
    config: &VadFilterConfig,
) {
    let event = match transition {
        palaver_vad::filter::VadTransition::SpeechStart { at, .. } => AudioLifecycleEvent::SpeechStart {
            source,
            silence_ms: config.min_silence_ms,
            threshold: config.threshold,
            pad_ms: config.speech_pad_ms,
            sample_rate: config.sampling_rate,
            at,
        },
        palaver_vad::filter::VadTransition::SpeechStop { at } => AudioLifecycleEvent::SpeechStop {
            source,
            last_in_speech_chunk_time: at,
        },
    };
    let _ = out.send(event);
}

/// Transcriber feed: tracks VAD state from the merged stream and pushes in-speech
/// samples into the transcriber, flushing on `SpeechStop`/`Stop`.
fn spawn_transcriber_feed(
    mut merged: broadcast::Receiver<MergedEvent>,
    transcriber: Transcriber,
    wake_words: Vec<String>,
) -> JoinHandle<()> {
    transcriber.set_initial_prompt(Some(wake_words.join(", ")));
    tokio::spawn(async move {
        let mut in_speech = false;
        loop {
            match merged.recv().await {
                Ok(MergedEvent::Chunk(chunk)) => {
                    if in_speech {
                        if let Err(err) = transcriber
                            .accept_chunk(chunk.source_id, chunk.timestamp, chunk.duration, &chunk.data)
                            .await
                        {
                            warn!(error = %err, "transcriber: failed to accept chunk");
                        }
                    }
                }
                Ok(MergedEvent::Lifecycle(AudioLifecycleEvent::SpeechStart { .. })) => {
                    in_speech = true;
                }
                Ok(MergedEvent::Lifecycle(AudioLifecycleEvent::SpeechStop { .. })) => {
                    in_speech = false;
                    let _ = transcriber.flush_pending(false, Duration::from_secs(0)).await;
                }
                Ok(MergedEvent::Lifecycle(AudioLifecycleEvent::Stop { .. })) => {
                    let _ = transcriber.flush_pending(false, Duration::from_secs(0)).await;
                    break;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "transcriber feed: merged stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        let _ = transcriber.shutdown().await;
    })
}

/// Drains the transcriber's dedicated error channel and routes failures
/// through the supervisor (a job decode failure would not reach here;
/// only fatal worker errors are funneled through this channel).
fn spawn_transcriber_error_watch(
    transcriber: Transcriber,
    supervisor: Arc<TopErrorHandler>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(err) = transcriber.next_error().await {
            error!(error = %err, "transcription worker error");
            let _ = supervisor.wrap_task(async move { Err(err) }).await;
        }
    })
}

/// CommandDispatch/DraftMaker: one task owns both `CommandDispatch` and `DraftMaker` since they
/// share the same `TextEvent` stream and must process each event in order.
fn spawn_draft_command_task(
    bus: EventBus,
    mut draft_maker: DraftMaker,
    mut command_dispatch: CommandDispatch,
    store: Arc<DraftStore>,
    router: Option<Arc<EventRouter>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut text_rx = bus.subscribe_text();
        loop {
            match text_rx.recv().await {
                Ok(event) => {
                    for command_event in command_dispatch.process(&event) {
                        if let Some(router) = &router {
                            router.on_command(command_event.clone());
                        }
                        bus.publish_command(command_event);
                    }
                    for draft_event in draft_maker.process(event) {
                        handle_draft_event(&draft_event, &store).await;
                        if let Some(router) = &router {
                            router.on_draft(draft_event.clone());
                        }
                        bus.publish_draft(draft_event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "draft/command task: text stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        if let Some(event) = draft_maker.force_end() {
            handle_draft_event(&event, &store).await;
            bus.publish_draft(event);
        }
    })
}

async fn handle_draft_event(event: &palaver_core::types::DraftEvent, store: &Arc<DraftStore>) {
    if let palaver_core::types::DraftEvent::DraftEnd(draft) = event {
        if let Err(err) = store.put(draft.clone()).await {
            warn!(draft_id = %draft.draft_id, error = %err, "failed to persist draft");
        }
    }
}

/// StreamMonitor: observes the merged bus plus raw text/command events to decide
/// end-of-input; logged for now since nothing in-process currently blocks
/// on `is_all_done()`.
fn spawn_stream_monitor(bus: EventBus, mut merged: broadcast::Receiver<MergedEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut monitor = StreamMonitor::new();
        let mut text_rx = bus.subscribe_text();
        let mut command_rx = bus.subscribe_command();
        loop {
            tokio::select! {
                event = merged.recv() => {
                    match event {
                        Ok(MergedEvent::Chunk(chunk)) => monitor.on_audio_chunk(chunk.timestamp),
                        Ok(MergedEvent::Lifecycle(AudioLifecycleEvent::Stop { .. })) => {
                            monitor.on_audio_stop();
                            if monitor.check_done() {
                                debug!("stream monitor: pipeline is done");
                                break;
                            }
                        }
                        Ok(MergedEvent::Lifecycle(AudioLifecycleEvent::SpeechStop { last_in_speech_chunk_time, .. })) => {
                            monitor.on_speech_stop(last_in_speech_chunk_time);
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                event = text_rx.recv() => {
                    if let Ok(event) = event { monitor.on_text_event(event.audio_end_time); }
                }
                event = command_rx.recv() => {
                    match event {
                        Ok(palaver_core::types::CommandEvent { command: palaver_core::types::CommandKind::StartBlock, .. }) => monitor.on_start_block(),
                        Ok(palaver_core::types::CommandEvent { command: palaver_core::types::CommandKind::StopBlock, .. }) => monitor.on_stop_block(),
                        _ => {}
                    }
                }
            }
        }
    })
}

/// EventRouter: forwards the merged audio stream and the command/draft buses to
/// the router, stamping `in_speech` on chunks from the tracked VAD state
/// (the raw chunk as published by AudioSource always carries `in_speech=false`).
fn spawn_router_forwarding(
    bus: EventBus,
    mut merged: broadcast::Receiver<MergedEvent>,
    router: Arc<EventRouter>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut command_rx = bus.subscribe_command();
        let mut draft_rx = bus.subscribe_draft();
        let mut in_speech = false;
        loop {
            tokio::select! {
                event = merged.recv() => {
                    match event {
                        Ok(MergedEvent::Chunk(mut chunk)) => {
                            chunk.in_speech = in_speech;
                            router.on_audio_chunk(chunk);
                        }
                        Ok(MergedEvent::Lifecycle(event)) => {
                            match &event {
                                AudioLifecycleEvent::SpeechStart { .. } => in_speech = true,
                                AudioLifecycleEvent::SpeechStop { .. } => in_speech = false,
                                _ => {}
                            }
                            router.on_audio_lifecycle(event);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                    }
                }
                event = command_rx.recv() => {
                    if let Ok(event) = event { router.on_command(event); }
                }
                event = draft_rx.recv() => {
                    if let Ok(event) = event { router.on_draft(event); }
                }
            }
        }
    })
}

/// Rescanner: the rescan-mode alternate AudioSource. Connects to the remote source node,
/// drives a `Rescanner` off its events, and wires the local bus so the
/// rest of the pipeline (Transcriber/DraftMaker in particular) rebuilds the draft as usual.
fn spawn_rescan_client(
    settings: &Settings,
    bus: EventBus,
    supervisor: Arc<TopErrorHandler>,
) -> Result<JoinHandle<()>, PalaverError> {
    let ws_url = settings
        .rescan
        .remote_ws_url
        .clone()
        .ok_or_else(|| PalaverError::Fatal("rescan.enabled requires remote_ws_url".into()))?;
    let revision_endpoint = settings
        .rescan
        .revision_endpoint
        .clone()
        .ok_or_else(|| PalaverError::Fatal("rescan.enabled requires revision_endpoint".into()))?;
    let config = RescannerConfig {
        pre_draft_seconds: settings.rescan.pre_draft_seconds,
        local_draft_wait: Duration::from_secs(settings.rescan.local_draft_wait_secs),
        ..RescannerConfig::default()
    };
    let settings = settings.clone();

    Ok(supervisor.clone().wrap_task(async move {
        let plugin = build_plugin(&settings.stt).await?;
        let transcriber = Transcriber::spawn(plugin, TranscriberConfig::default(), bus.clone());
        let names: Vec<&str> = settings.phrases.names.iter().map(String::as_str).collect();
        let draft_maker = Arc::new(parking_lot::Mutex::new(DraftMaker::new(
            default_draft_start_patterns(&names),
            default_draft_end_patterns(&names),
        )));

        // Local DraftMaker instance: consumes the TextEvents the local transcriber
        // produces and republishes DraftStart/DraftEnd onto the bus, which
        // is what `Rescanner::wait_for_local_draft_end` is listening for.
        let draft_task_maker = draft_maker.clone();
        let draft_bus = bus.clone();
        let draft_task = tokio::spawn(async move {
            let mut text_rx = draft_bus.subscribe_text();
            while let Ok(event) = text_rx.recv().await {
                let draft_events = draft_task_maker.lock().process(event);
                for draft_event in draft_events {
                    draft_bus.publish_draft(draft_event);
                }
            }
        });

        let force_end_maker = draft_maker.clone();
        let force_end: Arc<dyn Fn() -> Option<palaver_core::types::DraftEvent> + Send + Sync> =
            Arc::new(move || force_end_maker.lock().force_end());

        let revision_sink = Arc::new(HttpRevisionSink::new(revision_endpoint));
        let rescanner = Arc::new(Rescanner::new(config, bus.clone(), transcriber, revision_sink, force_end));

        let mut net = NetListener::connect(&ws_url).await?;
        loop {
            match net.recv().await {
                Ok(Some(event)) => {
                    if let Err(err) = rescanner.handle_remote_event(event).await {
                        warn!(error = %err, "rescanner: failed to handle remote event");
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "rescanner: net listener error");
                    break;
                }
            }
        }
        draft_task.abort();
        Ok(())
    }))
}
