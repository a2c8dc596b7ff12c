//! ONNX Runtime backend for [`VisionEngine`].
//!
//! The bundle is an exported end-to-end generation graph: it takes the
//! normalised image, the tokenised prompt, and the decoding knobs, and
//! returns the generated token ids. Beam search, attention, and KV caching
//! all live inside the graph — this wrapper only moves tensors across the
//! session boundary and decodes the result.
//!
//! `Session::run` requires exclusive access, so the session sits behind a
//! mutex. That lock is also what serialises every inference call in the
//! process against the single engine instance.

use super::{Device, GenerationConfig, PixelTensor, PromptCodec, VisionEngine};
use crate::error::OcrError;
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Production engine: one [`ort::session::Session`] over the exported
/// generation graph, shared process-wide.
pub struct OrtVisionEngine {
    session: Mutex<Session>,
    codec: Arc<PromptCodec>,
    device: Device,
}

impl OrtVisionEngine {
    /// Build the session for `model_path`, preferring CUDA with CPU
    /// fallback. Returns the engine together with the device it landed on.
    pub fn load(model_path: &Path, codec: Arc<PromptCodec>) -> Result<(Self, Device), OcrError> {
        let load_err = |detail: String| OcrError::EngineLoad {
            path: model_path.display().to_string(),
            detail,
        };

        let cuda = CUDAExecutionProvider::default();
        let device = if cuda.is_available().unwrap_or(false) {
            Device::Cuda(0)
        } else {
            Device::Cpu
        };

        let session = match device {
            Device::Cuda(_) => {
                debug!("Creating engine session with CUDA execution provider");
                Session::builder()
                    .map_err(|e| load_err(e.to_string()))?
                    .with_optimization_level(GraphOptimizationLevel::Level3)
                    .map_err(|e| load_err(e.to_string()))?
                    .with_execution_providers([
                        cuda.build(),
                        CPUExecutionProvider::default().build(),
                    ])
                    .map_err(|e| load_err(e.to_string()))?
                    .commit_from_file(model_path)
                    .map_err(|e| load_err(e.to_string()))?
            }
            Device::Cpu => {
                debug!("Creating engine session with CPU execution provider");
                Session::builder()
                    .map_err(|e| load_err(e.to_string()))?
                    .with_optimization_level(GraphOptimizationLevel::Level3)
                    .map_err(|e| load_err(e.to_string()))?
                    .commit_from_file(model_path)
                    .map_err(|e| load_err(e.to_string()))?
            }
        };

        debug!(
            inputs = ?session.inputs.iter().map(|i| &i.name).collect::<Vec<_>>(),
            "Engine graph loaded"
        );

        Ok((
            Self {
                session: Mutex::new(session),
                codec,
                device,
            },
            device,
        ))
    }
}

impl VisionEngine for OrtVisionEngine {
    fn generate(
        &self,
        tensor: &PixelTensor,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, OcrError> {
        let infer_err = |detail: String| OcrError::Inference { detail };

        let input_ids = self.codec.encode(prompt);

        let pixel_shape: Vec<i64> = tensor.data.shape().iter().map(|&d| d as i64).collect();
        let pixel_data = tensor
            .data
            .as_slice()
            .ok_or_else(|| infer_err("pixel tensor is not contiguous".into()))?;
        let pixel_values =
            ort::value::Value::from_array((pixel_shape.as_slice(), pixel_data.to_vec()))
                .map_err(|e| infer_err(e.to_string()))?;

        let ids_shape = [1i64, input_ids.len() as i64];
        let ids_value = ort::value::Value::from_array((ids_shape.as_slice(), input_ids))
            .map_err(|e| infer_err(e.to_string()))?;

        let scalar = |v: i64| {
            ort::value::Value::from_array(([1i64].as_slice(), vec![v]))
                .map_err(|e| infer_err(e.to_string()))
        };
        let max_new_tokens = scalar(config.max_new_tokens as i64)?;
        let beams = if config.sample { 1 } else { config.num_beams as i64 };
        let num_beams = scalar(beams)?;
        let repetition_penalty = ort::value::Value::from_array(
            ([1i64].as_slice(), vec![config.repetition_penalty]),
        )
        .map_err(|e| infer_err(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| infer_err("engine session mutex poisoned".into()))?;

        let outputs = session
            .run(ort::inputs![
                "pixel_values" => pixel_values,
                "input_ids" => ids_value,
                "max_new_tokens" => max_new_tokens,
                "num_beams" => num_beams,
                "repetition_penalty" => repetition_penalty,
            ])
            .map_err(|e| infer_err(e.to_string()))?;

        // output_ids: [num_return_sequences, seq_len]; we take the top beam.
        let (shape, ids) = outputs[0]
            .try_extract_tensor::<i64>()
            .map_err(|e| infer_err(e.to_string()))?;

        let seq_len = shape.last().copied().unwrap_or(0) as usize;
        if seq_len == 0 {
            warn!(device = %self.device, "Engine returned an empty sequence");
            return Ok(String::new());
        }

        Ok(self.codec.decode(&ids[..seq_len]))
    }
}
