//! Result and payload types.
//!
//! [`DocumentResult`] is the library-level aggregate for a processed PDF;
//! [`OcrResponse`] is the caller-facing JSON payload for `/ocr`. The two are
//! kept separate so the pipeline never has to care about wire-format
//! concerns (camelCase keys, optional fields, the error shape).

use serde::{Deserialize, Serialize};

/// Separator used when joining per-page texts into the aggregate document
/// text. Clients split the aggregate on this to recover pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Fixed human-facing text for a failed image request; part of the wire
/// contract.
pub const IMAGE_FAILURE_TEXT: &str = "Failed to process image";

/// Fixed human-facing text for a failed PDF request.
pub const PDF_FAILURE_TEXT: &str = "Failed to process PDF";

/// Overall outcome of a document request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    /// Every page produced usable text.
    Success,
    /// At least one page degraded to an error placeholder.
    Partial,
    /// The request as a whole failed.
    Error,
}

/// How a page's text slot was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageOutcome {
    /// The PDF's native text layer was used.
    NativeText,
    /// The page was rasterised and transcribed by the engine.
    Inference,
    /// Rasterisation or inference failed; the slot holds a placeholder.
    Failed,
}

/// The aggregate result of processing one PDF document.
///
/// Invariants (enforced by [`DocumentResult::from_pages`] and checked in
/// tests): `pages.len() == page_count`, page order matches physical page
/// order, and `text` is the join of `pages` with [`PAGE_SEPARATOR`] in that
/// same order. Constructed once per request and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct DocumentResult {
    /// All pages concatenated with [`PAGE_SEPARATOR`].
    pub text: String,
    /// Per-page text in physical page order; failed pages hold placeholders.
    pub pages: Vec<String>,
    /// Per-page outcome, parallel to `pages`.
    pub outcomes: Vec<PageOutcome>,
    /// Total number of pages in the document.
    pub page_count: usize,
    /// Success, partial, or error.
    pub status: DocStatus,
}

impl DocumentResult {
    /// Build a result from ordered page texts and their outcomes.
    ///
    /// Status is Partial when any page failed, Success otherwise — the
    /// zero-page document is a Success with empty text.
    pub fn from_pages(pages: Vec<String>, outcomes: Vec<PageOutcome>) -> Self {
        debug_assert_eq!(pages.len(), outcomes.len());
        let status = if outcomes.contains(&PageOutcome::Failed) {
            DocStatus::Partial
        } else {
            DocStatus::Success
        };
        let text = pages.join(PAGE_SEPARATOR);
        let page_count = pages.len();
        Self {
            text,
            pages,
            outcomes,
            page_count,
            status,
        }
    }

    /// Result for a document with no pages.
    pub fn empty() -> Self {
        Self::from_pages(Vec::new(), Vec::new())
    }
}

/// Caller-facing JSON payload for `/ocr`.
///
/// Image requests carry `{text, status}`; PDF requests additionally carry
/// `pages` and `pageCount`; failures carry `{error, text, details?, status}`.
/// All of them travel over HTTP 200 so a malformed upload is never mistaken
/// for a server outage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResponse {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<String>>,
    #[serde(rename = "pageCount", skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    pub status: DocStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// A rendered export artefact, fully read into memory.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
    /// `<safeName>.<format>`, used in the Content-Disposition header.
    pub file_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_pages_upholds_length_invariant() {
        let r = DocumentResult::from_pages(
            vec!["a".into(), "b".into()],
            vec![PageOutcome::NativeText, PageOutcome::NativeText],
        );
        assert_eq!(r.pages.len(), r.page_count);
        assert_eq!(r.text, "a\n\nb");
        assert_eq!(r.status, DocStatus::Success);
    }

    #[test]
    fn any_failed_page_makes_status_partial() {
        let r = DocumentResult::from_pages(
            vec!["a".into(), "[Page 2 could not be processed]".into()],
            vec![PageOutcome::Inference, PageOutcome::Failed],
        );
        assert_eq!(r.status, DocStatus::Partial);
        assert_eq!(r.page_count, 2);
    }

    #[test]
    fn empty_document_is_success() {
        let r = DocumentResult::empty();
        assert_eq!(r.page_count, 0);
        assert!(r.pages.is_empty());
        assert!(r.text.is_empty());
        assert_eq!(r.status, DocStatus::Success);
    }

    #[test]
    fn status_serialises_lowercase() {
        assert_eq!(
            serde_json::to_string(&DocStatus::Success).unwrap(),
            "\"success\""
        );
        assert_eq!(
            serde_json::to_string(&DocStatus::Partial).unwrap(),
            "\"partial\""
        );
    }

    #[test]
    fn page_count_serialises_camel_case() {
        let resp = OcrResponse {
            text: "t".into(),
            pages: Some(vec!["t".into()]),
            page_count: Some(1),
            status: DocStatus::Success,
            error: None,
            details: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("pageCount").is_some());
        assert!(json.get("error").is_none());
    }
}
