//! Application state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use emotion_core::pipeline::model_context::ModelContext;
use emotion_core::pipeline::predict_emotion_use_case::PredictEmotionUseCase;

use crate::config::ServerConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<PredictEmotionUseCase>,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
    /// Bounds predictions running on the blocking pool, including ones whose
    /// request already timed out.
    pub prediction_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(models: ModelContext, config: &ServerConfig) -> Self {
        Self {
            predictor: Arc::new(PredictEmotionUseCase::new(models)),
            request_timeout: config.request_timeout(),
            max_body_bytes: config.max_body_bytes,
            prediction_slots: Arc::new(Semaphore::new(config.prediction_slots())),
        }
    }

    pub fn models(&self) -> &ModelContext {
        self.predictor.models()
    }
}
