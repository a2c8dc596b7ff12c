//! Error types for the docuvision service.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`OcrError`] — **Fatal for the request**: the upload cannot be processed
//!   at all (undecodable image, corrupt PDF, engine failure on the
//!   single-image path, export failure). Surfaced to the caller as an
//!   error-shaped payload, never as a transport-level failure.
//!
//! * [`PageError`] — **Non-fatal**: a single PDF page failed (render glitch,
//!   engine error) but all other pages are fine. Recorded inside the page's
//!   slot of the document result so callers see partial success rather than
//!   losing the whole document to one bad page.

use thiserror::Error;

/// All request-fatal errors produced by the docuvision library.
///
/// Page-level failures use [`PageError`] and are stored in the document
/// result rather than propagated here.
#[derive(Debug, Error)]
pub enum OcrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Uploaded image bytes could not be decoded.
    #[error("Failed to decode image: {detail}")]
    Decode { detail: String },

    /// The uploaded byte stream is not a valid PDF.
    #[error("Failed to open PDF document: {detail}")]
    DocumentOpen { detail: String },

    // ── Engine errors ─────────────────────────────────────────────────────
    /// The vision engine could not be loaded at startup.
    #[error("Failed to load vision engine from '{path}': {detail}")]
    EngineLoad { path: String, detail: String },

    /// The engine failed at generation time. Carries the underlying
    /// runtime's diagnostic (out-of-memory, malformed prompt, device error).
    #[error("Inference failed: {detail}")]
    Inference { detail: String },

    // ── Export errors ─────────────────────────────────────────────────────
    /// Requested export format is not `docx` or `pdf`.
    ///
    /// The display string is part of the wire contract; clients match on it.
    #[error("Invalid format: {format}. Valid formats are 'docx' or 'pdf'")]
    UnsupportedFormat { format: String },

    /// The renderer exited 0 but the expected output file does not exist.
    #[error("Renderer produced no output file '{expected}'")]
    RenderFailure { expected: String },

    /// The renderer process exited non-zero.
    #[error("Renderer exited with {code}: {stderr}")]
    RenderProcess { code: i32, stderr: String },

    /// The renderer process did not complete within the configured timeout.
    #[error("Renderer timed out after {secs}s")]
    RenderTimeout { secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (I/O, task join, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single PDF page.
///
/// Stored in the page's result slot when that page fails; the document as a
/// whole continues and reports partial status.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation failed; no image was available for inference.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The engine call for this page failed.
    #[error("Page {page}: inference failed: {detail}")]
    InferenceFailed { page: usize, detail: String },
}

impl PageError {
    /// 0-based index of the page this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. } | PageError::InferenceFailed { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_wire_message() {
        let e = OcrError::UnsupportedFormat {
            format: "csv".into(),
        };
        assert_eq!(
            e.to_string(),
            "Invalid format: csv. Valid formats are 'docx' or 'pdf'"
        );
    }

    #[test]
    fn render_process_display() {
        let e = OcrError::RenderProcess {
            code: 1,
            stderr: "missing font".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains('1'), "got: {msg}");
        assert!(msg.contains("missing font"));
    }

    #[test]
    fn page_error_index() {
        let e = PageError::RenderFailed {
            page: 4,
            detail: "bitmap".into(),
        };
        assert_eq!(e.page(), 4);
        assert!(e.to_string().contains("Page 4"));
    }
}
