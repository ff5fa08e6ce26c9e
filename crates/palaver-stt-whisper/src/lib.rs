//! whisper.cpp-backed STT plugin (via `whisper-rs`), the batch-per-job
//! implementation of the Transcriber's STT backend.

use std::mem;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{error, info};

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use palaver_foundation::error::{PalaverError, SttError};
use palaver_stt::plugin::{PluginCapabilities, PluginInfo, SttPlugin, SttPluginFactory};
use palaver_stt::types::{TranscriptionConfig, TranscriptionEvent};

const DEFAULT_MODEL_PATH: &str = "models/whisper/ggml-base.en.bin";

pub struct WhisperPlugin {
    ctx: Option<WhisperContext>,
    audio_buffer: Arc<Mutex<Vec<f32>>>,
    config: TranscriptionConfig,
    initial_prompt: Option<String>,
}

impl std::fmt::Debug for WhisperPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperPlugin")
            .field("audio_buffer_len", &self.audio_buffer.lock().len())
            .field("config", &self.config)
            .finish()
    }
}

impl WhisperPlugin {
    pub fn new() -> Self {
        Self {
            ctx: None,
            audio_buffer: Arc::new(Mutex::new(Vec::new())),
            config: TranscriptionConfig::default(),
            initial_prompt: None,
        }
    }
}

impl Default for WhisperPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SttPlugin for WhisperPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo {
            id: "whisper".to_string(),
            name: "Whisper (whisper.cpp)".to_string(),
            description: "Batch speech recognition via whisper-rs / whisper.cpp".to_string(),
            requires_network: false,
            is_local: true,
            is_available: PathBuf::from(DEFAULT_MODEL_PATH).exists(),
            supported_languages: vec!["en".to_string()],
            memory_usage_mb: Some(600),
        }
    }

    fn capabilities(&self) -> PluginCapabilities {
        PluginCapabilities {
            streaming: false,
            batch: true,
            word_timestamps: false,
            confidence_scores: false,
            speaker_diarization: false,
            auto_punctuation: true,
            custom_vocabulary: false,
        }
    }

    async fn is_available(&self) -> Result<bool, PalaverError> {
        Ok(PathBuf::from(&self.config.model_path).exists() || PathBuf::from(DEFAULT_MODEL_PATH).exists())
    }

    async fn initialize(&mut self, config: TranscriptionConfig) -> Result<(), PalaverError> {
        info!("initializing whisper plugin with whisper-rs");
        self.config = config;

        let model_path = self.config.model_path.clone();
        if !PathBuf::from(&model_path).exists() {
            let msg = format!("model file not found at: {model_path}");
            error!("{msg}");
            return Err(SttError::ModelNotFound { path: model_path.into() }.into());
        }

        let context = WhisperContext::new_with_params(&model_path, WhisperContextParameters::default())
            .map_err(|e| PalaverError::Stt(SttError::ModelLoadFailed(e.to_string())))?;

        self.ctx = Some(context);
        info!(model_path = %self.config.model_path, "whisper-rs context created");
        Ok(())
    }

    async fn process_audio(
        &mut self,
        samples: &[i16],
    ) -> Result<Option<TranscriptionEvent>, PalaverError> {
        if self.ctx.is_none() {
            return Err(SttError::InvalidConfig("plugin not initialized".to_string()).into());
        }

        let mut buffer = self.audio_buffer.lock();
        let mut float_samples = vec![0.0f32; samples.len()];
        whisper_rs::convert_integer_to_float_audio(samples, &mut float_samples)
            .map_err(|e| PalaverError::Stt(SttError::JobFailed(e.to_string())))?;
        buffer.extend_from_slice(&float_samples);

        Ok(None)
    }

    async fn finalize(&mut self) -> Result<Option<TranscriptionEvent>, PalaverError> {
        info!("finalizing transcription with whisper-rs");

        let audio_data = {
            let mut buffer = self.audio_buffer.lock();
            if buffer.is_empty() {
                return Ok(None);
            }
            mem::take(&mut *buffer)
        };

        let ctx = self
            .ctx
            .as_ref()
            .ok_or_else(|| PalaverError::Stt(SttError::InvalidConfig("context not available".to_string())))?;

        let mut state = ctx
            .create_state()
            .map_err(|e| PalaverError::Stt(SttError::JobFailed(e.to_string())))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(4);
        params.set_language(Some("en"));
        params.set_print_realtime(false);
        params.set_print_progress(false);
        if let Some(prompt) = self.initial_prompt.as_deref() {
            params.set_initial_prompt(prompt);
        }

        state
            .full(params, &audio_data)
            .map_err(|e| PalaverError::Stt(SttError::JobFailed(e.to_string())))?;

        let num_segments = state.full_n_segments();
        let mut full_text = String::new();
        for i in 0..num_segments {
            if let Ok(segment) = state.get_segment(i) {
                if let Ok(text) = segment.to_str() {
                    full_text.push_str(text);
                }
            }
        }

        Ok(Some(TranscriptionEvent::Final {
            utterance_id: palaver_stt::next_utterance_id(),
            text: full_text.trim().to_string(),
            words: None,
        }))
    }

    async fn reset(&mut self) -> Result<(), PalaverError> {
        info!("resetting whisper plugin state");
        self.audio_buffer.lock().clear();
        Ok(())
    }

    async fn set_initial_prompt(&mut self, prompt: Option<&str>) -> Result<(), PalaverError> {
        self.initial_prompt = prompt.map(str::to_string);
        Ok(())
    }
}

pub struct WhisperPluginFactory;

impl SttPluginFactory for WhisperPluginFactory {
    fn create(&self) -> Result<Box<dyn SttPlugin>, PalaverError> {
        Ok(Box::new(WhisperPlugin::new()))
    }

    fn plugin_info(&self) -> PluginInfo {
        WhisperPlugin::new().info()
    }

    fn check_requirements(&self) -> Result<(), PalaverError> {
        if !PathBuf::from(DEFAULT_MODEL_PATH).exists() {
            return Err(PalaverError::Stt(SttError::NotAvailable {
                plugin: "whisper".to_string(),
                reason: format!("model not found at {DEFAULT_MODEL_PATH}"),
            }));
        }
        Ok(())
    }
}
