//! The inference gateway: a capability boundary around "given a tensor and a
//! prompt, produce text".
//!
//! Everything device- and runtime-specific hides behind [`VisionEngine`].
//! The rest of the pipeline is pure orchestration around this trait, so a
//! test can substitute a scripted stub and the production code can swap the
//! ONNX session for another backend without touching the policy.
//!
//! The engine is the single most expensive resource in the process: it is
//! loaded once at startup via [`load_engine`], wrapped in an
//! [`EngineHandle`], and passed by reference into request handlers. It is
//! never reloaded and never mutated per request.

pub mod codec;
pub mod onnx;

pub use codec::PromptCodec;

use crate::config::ServiceConfig;
use crate::error::OcrError;
use ndarray::Array4;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Where engine computation runs.
///
/// Decides the tensor precision tag and which execution providers the ONNX
/// session registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    /// CUDA accelerator (ordinal).
    Cuda(u32),
    /// Plain CPU execution.
    Cpu,
}

impl Device {
    /// Numeric precision appropriate for this device: reduced on
    /// accelerators, full otherwise.
    pub fn precision(&self) -> Precision {
        match self {
            Device::Cuda(_) => Precision::Reduced,
            Device::Cpu => Precision::Full,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cuda(n) => write!(f, "cuda:{n}"),
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

/// Numeric precision of tensors bound for the engine.
///
/// Host-side data stays `f32` either way; `Reduced` tags tensors headed for
/// an accelerator session whose graph casts internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Full,
    Reduced,
}

/// A normalised image ready for the engine: one batch of three channels at
/// the model's fixed spatial size, NCHW layout.
///
/// Owned exclusively by the call that produced it and discarded after
/// inference.
#[derive(Debug, Clone)]
pub struct PixelTensor {
    pub data: Array4<f32>,
    pub precision: Precision,
}

impl PixelTensor {
    /// `[batch, channels, height, width]`.
    pub fn shape(&self) -> [usize; 4] {
        let s = self.data.shape();
        [s[0], s[1], s[2], s[3]]
    }
}

/// Deterministic decoding policy for one generate call.
///
/// No random sampling, a small fixed beam, a repetition penalty large enough
/// to suppress looping output, and a bounded output length. Single-image and
/// per-PDF-page calls use distinct length bounds.
#[derive(Debug, Clone, Copy)]
pub struct GenerationConfig {
    pub max_new_tokens: usize,
    pub num_beams: usize,
    pub repetition_penalty: f32,
    pub sample: bool,
}

impl GenerationConfig {
    /// Budget for a single uploaded image.
    pub fn image(config: &ServiceConfig) -> Self {
        Self {
            max_new_tokens: config.image_max_new_tokens,
            num_beams: config.num_beams,
            repetition_penalty: config.repetition_penalty,
            sample: false,
        }
    }

    /// Budget for one PDF page. Reuses a higher token bound: document pages
    /// run much longer than casual photos.
    pub fn pdf_page(config: &ServiceConfig) -> Self {
        Self {
            max_new_tokens: config.pdf_max_new_tokens,
            num_beams: config.num_beams,
            repetition_penalty: config.repetition_penalty,
            sample: false,
        }
    }
}

/// The capability interface every engine backend implements.
///
/// `generate` is blocking — callers dispatch it through
/// [`EngineHandle::generate`], which moves the work onto the blocking thread
/// pool the same way the rasteriser does.
pub trait VisionEngine: Send + Sync {
    /// Produce text for one normalised image and prompt.
    ///
    /// The prompt must start with the image placeholder marker; see
    /// [`crate::prompts::with_image_placeholder`]. Failures carry the
    /// backend's diagnostic in [`OcrError::Inference`].
    fn generate(
        &self,
        tensor: &PixelTensor,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, OcrError>;
}

/// The loaded engine plus its prompt codec and device descriptor.
///
/// Cheap to clone; all fields are shared. Constructed once by
/// [`load_engine`] (or directly in tests with a stub engine) and injected
/// into request handlers.
#[derive(Clone)]
pub struct EngineHandle {
    engine: Arc<dyn VisionEngine>,
    codec: Arc<PromptCodec>,
    device: Device,
}

impl EngineHandle {
    /// Assemble a handle from parts. Tests use this with a stub engine.
    pub fn new(engine: Arc<dyn VisionEngine>, codec: Arc<PromptCodec>, device: Device) -> Self {
        Self {
            engine,
            codec,
            device,
        }
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn codec(&self) -> &Arc<PromptCodec> {
        &self.codec
    }

    /// Run one generate call on the blocking pool.
    ///
    /// Takes the tensor by value: it is owned by this call and dropped as
    /// soon as the engine returns.
    pub async fn generate(
        &self,
        tensor: PixelTensor,
        prompt: String,
        config: GenerationConfig,
    ) -> Result<String, OcrError> {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || engine.generate(&tensor, &prompt, &config))
            .await
            .map_err(|e| OcrError::Internal(format!("Inference task panicked: {e}")))?
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("engine", &"<dyn VisionEngine>")
            .field("device", &self.device)
            .finish()
    }
}

/// Load the engine bundle once at process start.
///
/// Expects `model.onnx` and `vocab.json` inside `config.model_dir`. Picks
/// CUDA when available, CPU otherwise, and reports the choice.
pub fn load_engine(config: &ServiceConfig) -> Result<EngineHandle, OcrError> {
    let codec = Arc::new(PromptCodec::from_file(
        &config.model_dir.join("vocab.json"),
    )?);
    let (engine, device) =
        onnx::OrtVisionEngine::load(&config.model_dir.join("model.onnx"), Arc::clone(&codec))?;
    info!(device = %device, "Vision engine loaded");
    Ok(EngineHandle::new(Arc::new(engine), codec, device))
}
