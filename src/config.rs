//! Service configuration.
//!
//! All tunables live in [`ServiceConfig`], built via its
//! [`ServiceConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share the config across request handlers, log it at startup,
//! and diff two deployments to understand why their outputs differ.

use crate::error::OcrError;
use serde::Serialize;
use std::path::PathBuf;

/// Per-channel normalisation statistics applied to every tensor fed to the
/// engine (ImageNet mean/std, RGB order). The model was trained against
/// inputs normalised with exactly these constants.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Configuration for the docuvision service.
///
/// Built via [`ServiceConfig::builder()`] or [`ServiceConfig::default()`].
///
/// # Example
/// ```rust
/// use docuvision::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .native_text_threshold(200)
///     .render_dpi(300)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ServiceConfig {
    /// Spatial size of the square tensor fed to the engine. Default: 448.
    ///
    /// The model's receptive geometry requires exact dimensions; every input
    /// is resized to `target_size × target_size` regardless of source shape.
    pub target_size: u32,

    /// Minimum trimmed length of a PDF's concatenated native text for the
    /// text layer to be accepted wholesale. Default: 100.
    ///
    /// A policy parameter, not a semantic one: above it the text layer is
    /// "enough content to be plausible real text" and inference is skipped
    /// for the whole document; at or below it every page goes through the
    /// engine. There is no content-quality check beyond this length.
    pub native_text_threshold: usize,

    /// Rasterisation resolution for PDF pages, in DPI. Default: 300.
    ///
    /// Matches the input fidelity the normaliser expects; scanned government
    /// documents need 300 DPI for small print to survive the 448px resize.
    pub render_dpi: u32,

    /// Number of engine calls in flight per document. Default: 1.
    ///
    /// There is a single engine instance bound to a single accelerator, so
    /// page tasks are independent but execute one at a time. Raising this
    /// only helps on multi-instance deployments.
    pub engine_concurrency: usize,

    /// Output token budget for single-image requests. Default: 512.
    pub image_max_new_tokens: usize,

    /// Output token budget for per-PDF-page requests. Default: 1024.
    ///
    /// PDF pages reuse a higher budget than single images: full document
    /// pages routinely run long.
    pub pdf_max_new_tokens: usize,

    /// Beam width for deterministic decoding. Default: 3.
    pub num_beams: usize,

    /// Repetition penalty, high enough to suppress looping output. Default: 3.5.
    pub repetition_penalty: f32,

    /// Directory holding the exported engine bundle (`model.onnx` + `vocab.json`).
    pub model_dir: PathBuf,

    /// Command invoked to render exports. Default: `docuvision-render`.
    ///
    /// Invoked as `<command> <tempInput> <format> <safeName>` with the
    /// export working directory as cwd; expected to write
    /// `<safeName>.<format>` there and exit 0.
    pub renderer_command: String,

    /// Upper bound on a render process run, in seconds. Default: 120.
    pub render_timeout_secs: u64,

    /// Bind address for the HTTP server. Default: `0.0.0.0`.
    pub host: String,

    /// Bind port for the HTTP server. Default: 8000.
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            target_size: 448,
            native_text_threshold: 100,
            render_dpi: 300,
            engine_concurrency: 1,
            image_max_new_tokens: 512,
            pdf_max_new_tokens: 1024,
            num_beams: 3,
            repetition_penalty: 3.5,
            model_dir: PathBuf::from("models"),
            renderer_command: "docuvision-render".to_string(),
            render_timeout_secs: 120,
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn target_size(mut self, px: u32) -> Self {
        self.config.target_size = px.max(32);
        self
    }

    pub fn native_text_threshold(mut self, chars: usize) -> Self {
        self.config.native_text_threshold = chars;
        self
    }

    pub fn render_dpi(mut self, dpi: u32) -> Self {
        self.config.render_dpi = dpi.clamp(72, 600);
        self
    }

    pub fn engine_concurrency(mut self, n: usize) -> Self {
        self.config.engine_concurrency = n.max(1);
        self
    }

    pub fn image_max_new_tokens(mut self, n: usize) -> Self {
        self.config.image_max_new_tokens = n;
        self
    }

    pub fn pdf_max_new_tokens(mut self, n: usize) -> Self {
        self.config.pdf_max_new_tokens = n;
        self
    }

    pub fn num_beams(mut self, n: usize) -> Self {
        self.config.num_beams = n.max(1);
        self
    }

    pub fn repetition_penalty(mut self, p: f32) -> Self {
        self.config.repetition_penalty = p.max(1.0);
        self
    }

    pub fn model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.model_dir = dir.into();
        self
    }

    pub fn renderer_command(mut self, cmd: impl Into<String>) -> Self {
        self.config.renderer_command = cmd.into();
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, OcrError> {
        let c = &self.config;
        if c.target_size < 32 {
            return Err(OcrError::InvalidConfig(format!(
                "target_size must be ≥ 32, got {}",
                c.target_size
            )));
        }
        if c.engine_concurrency == 0 {
            return Err(OcrError::InvalidConfig(
                "engine_concurrency must be ≥ 1".into(),
            ));
        }
        if c.image_max_new_tokens == 0 || c.pdf_max_new_tokens == 0 {
            return Err(OcrError::InvalidConfig(
                "token budgets must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_stable() {
        let c = ServiceConfig::default();
        assert_eq!(c.target_size, 448);
        assert_eq!(c.native_text_threshold, 100);
        assert_eq!(c.render_dpi, 300);
        assert_eq!(c.engine_concurrency, 1);
        assert_eq!(c.image_max_new_tokens, 512);
        assert_eq!(c.pdf_max_new_tokens, 1024);
        assert_eq!(c.num_beams, 3);
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let c = ServiceConfig::builder()
            .render_dpi(10_000)
            .engine_concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.render_dpi, 600);
        assert_eq!(c.engine_concurrency, 1);
    }
}
