//! # docuvision
//!
//! Document transcription service: accept an uploaded image or PDF, turn it
//! into model-ready tensors, run a vision-language engine, and return
//! structured text — plus the reverse direction, rendering accepted text
//! back into a downloadable DOCX/PDF through an external renderer.
//!
//! ## Why the adaptive pipeline?
//!
//! A born-digital PDF already carries a machine-readable text layer, and
//! that layer is both near-free to read and strictly more faithful than any
//! vision model's transcription. A scanned PDF carries nothing usable. The
//! pipeline therefore decides per document: if the concatenated native text
//! is substantial, it is accepted wholesale and the engine never runs; if
//! not, every page is rasterised and transcribed independently, with
//! failures isolated to the page that caused them.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ image ─▶ normalize (448×448, ImageNet stats) ─▶ engine ─▶ {text, status}
//!  │
//!  └─ PDF ──▶ split (pdfium: text layer + 300 DPI raster per page)
//!             ─▶ adaptive policy ─▶ {text, pages, pageCount, status}
//!
//! export: {content, format, fileName} ─▶ external renderer ─▶ attachment
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docuvision::{load_engine, serve, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder()
//!         .model_dir("models/vintern-448")
//!         .build()?;
//!     let engine = load_engine(&config)?; // once, at process start
//!     serve(config, engine).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docuvision` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use engine::{load_engine, Device, EngineHandle, GenerationConfig, PixelTensor, VisionEngine};
pub use error::{OcrError, PageError};
pub use export::{sanitize_file_name, DocumentRenderer, ExportFormat};
pub use output::{DocStatus, DocumentResult, ExportedFile, OcrResponse};
pub use server::{create_router, serve, AppState};
