/// Expression CNN executed with ONNX Runtime via `ort`.
///
/// Expects an export of the 48x48 grayscale network: NHWC input
/// `[N, 48, 48, 1]` and a 7-way output, with or without the final softmax.
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;

use crate::classification::domain::emotion_classifier::{ClassificationError, EmotionClassifier};
use crate::classification::domain::emotion_distribution::EmotionDistribution;
use crate::normalization::face_patch::FacePatch;
use crate::shared::constants::{NUM_EMOTIONS, PATCH_SIZE};

#[derive(Error, Debug)]
pub enum ClassifierLoadError {
    #[error("failed to create inference session for {path}: {message}")]
    Session { path: String, message: String },
    #[error("model has no {0}")]
    MissingTensor(&'static str),
    #[error("model input shape {0:?} is not [N, 48, 48, 1]")]
    InputShape(Vec<i64>),
    #[error("model output shape {0:?} does not end in 7 classes")]
    OutputShape(Vec<i64>),
}

pub struct OnnxEmotionClassifier {
    session: Mutex<ort::session::Session>,
}

impl OnnxEmotionClassifier {
    pub fn new(model_path: &Path) -> Result<Self, ClassifierLoadError> {
        let session_err = |e: &dyn std::fmt::Display| ClassifierLoadError::Session {
            path: model_path.display().to_string(),
            message: e.to_string(),
        };
        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let session = ort::session::Session::builder()
            .map_err(|e| session_err(&e))?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| session_err(&e))?
            .with_intra_threads(intra_threads)
            .map_err(|e| session_err(&e))?
            .with_execution_providers(preferred_execution_providers())
            .map_err(|e| session_err(&e))?
            .commit_from_file(model_path)
            .map_err(|e| session_err(&e))?;

        let input_shape = tensor_shape(session.inputs().first().map(|i| i.dtype()))
            .ok_or(ClassifierLoadError::MissingTensor("tensor input"))?;
        let output_shape = tensor_shape(session.outputs().first().map(|o| o.dtype()))
            .ok_or(ClassifierLoadError::MissingTensor("tensor output"))?;
        check_io_shapes(&input_shape, &output_shape)?;

        log::info!(
            "Loaded emotion classifier {} (input {input_shape:?}, output {output_shape:?})",
            model_path.display()
        );
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn classify(&self, patch: &FacePatch) -> Result<EmotionDistribution, ClassificationError> {
        let input_value =
            ort::value::Tensor::from_array(patch.tensor().clone()).map_err(inference_error)?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| ClassificationError::Inference(format!("Lock poisoned: {e}")))?;
        let outputs = session.run(ort::inputs![input_value]).map_err(inference_error)?;
        if outputs.len() == 0 {
            return Err(ClassificationError::Inference(
                "model produced no outputs".into(),
            ));
        }
        let scores = outputs[0].try_extract_array::<f32>().map_err(inference_error)?;
        let scores: Vec<f32> = scores.iter().copied().collect();

        EmotionDistribution::from_scores(&scores)
    }
}

fn inference_error(e: impl std::fmt::Display) -> ClassificationError {
    ClassificationError::Inference(e.to_string())
}

/// Platform execution providers; ONNX Runtime falls back to CPU when none
/// is available.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

fn tensor_shape(dtype: Option<&ort::value::ValueType>) -> Option<Vec<i64>> {
    match dtype? {
        ort::value::ValueType::Tensor { ref shape, .. } => Some(shape.iter().copied().collect()),
        _ => None,
    }
}

/// Dynamic dimensions (`-1`) are accepted anywhere the export left them
/// open; the batch dimension must otherwise be 1.
fn check_io_shapes(input: &[i64], output: &[i64]) -> Result<(), ClassifierLoadError> {
    let fits = |dim: i64, expected: usize| dim < 0 || dim == expected as i64;
    let input_ok = input.len() == 4
        && fits(input[0], 1)
        && fits(input[1], PATCH_SIZE)
        && fits(input[2], PATCH_SIZE)
        && fits(input[3], 1);
    if !input_ok {
        return Err(ClassifierLoadError::InputShape(input.to_vec()));
    }

    match output.last() {
        Some(&last) if fits(last, NUM_EMOTIONS) => Ok(()),
        _ => Err(ClassifierLoadError::OutputShape(output.to_vec())),
    }
}
