//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use emotion_core::pipeline::model_context::ModelPaths;
use emotion_core::shared::constants::{CASCADE_MODEL_NAME, CASCADE_MODEL_URL, EMOTION_MODEL_NAME};

pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Facial emotion detection over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "emotion-server", version)]
pub struct ServerConfig {
    /// Address to bind.
    #[arg(long, env = "EMOTION_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "EMOTION_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Emotion classifier weights (ONNX).
    #[arg(long, env = "EMOTION_MODEL_PATH", default_value = EMOTION_MODEL_NAME)]
    pub model_path: PathBuf,

    /// Face detector cascade (OpenCV XML).
    #[arg(long, env = "EMOTION_CASCADE_PATH", default_value = CASCADE_MODEL_NAME)]
    pub cascade_path: PathBuf,

    /// Download the classifier from this URL when it is not found locally.
    #[arg(long, env = "EMOTION_MODEL_URL")]
    pub model_url: Option<String>,

    /// Download the cascade from this URL when it is not found locally.
    #[arg(long, env = "EMOTION_CASCADE_URL")]
    pub cascade_url: Option<String>,

    /// Fetch the stock frontal-face cascade when it is not found locally.
    #[arg(long, env = "EMOTION_DOWNLOAD_CASCADE")]
    pub download_cascade: bool,

    /// Upper bound on a single prediction, in seconds.
    #[arg(long, env = "EMOTION_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Largest accepted request body, in bytes.
    #[arg(long, env = "EMOTION_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Predictions allowed to run at once [default: number of CPUs].
    #[arg(long, env = "EMOTION_MAX_CONCURRENT_PREDICTIONS")]
    pub max_concurrent_predictions: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            model_path: PathBuf::from(EMOTION_MODEL_NAME),
            cascade_path: PathBuf::from(CASCADE_MODEL_NAME),
            model_url: None,
            cascade_url: None,
            download_cascade: false,
            request_timeout_secs: 30,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_concurrent_predictions: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// At least one slot, so predictions can always make progress.
    pub fn prediction_slots(&self) -> usize {
        self.max_concurrent_predictions
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }

    /// An explicit cascade URL wins over `--download-cascade`.
    pub fn model_paths(&self) -> ModelPaths {
        let cascade_url = self.cascade_url.clone().or_else(|| {
            self.download_cascade
                .then(|| CASCADE_MODEL_URL.to_string())
        });
        ModelPaths {
            classifier: self.model_path.clone(),
            classifier_url: self.model_url.clone(),
            cascade: self.cascade_path.clone(),
            cascade_url,
        }
    }
}
