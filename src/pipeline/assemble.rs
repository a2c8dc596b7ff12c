//! Response assembly: fold pipeline results into the caller-facing payload.
//!
//! The boundary contract favours a 200-status-with-error-body over hard
//! failures so a malformed upload can never be mistaken for a server
//! outage; the fixed failure texts here are part of that contract.

use crate::error::OcrError;
use crate::output::{
    DocStatus, DocumentResult, OcrResponse, IMAGE_FAILURE_TEXT, PDF_FAILURE_TEXT,
};

/// Payload for a successful single-image transcription.
pub fn image_response(text: String) -> OcrResponse {
    OcrResponse {
        text,
        pages: None,
        page_count: None,
        status: DocStatus::Success,
        error: None,
        details: None,
    }
}

/// Payload for a processed PDF; exposes the page breakdown.
pub fn document_response(result: DocumentResult) -> OcrResponse {
    OcrResponse {
        text: result.text,
        page_count: Some(result.page_count),
        pages: Some(result.pages),
        status: result.status,
        error: None,
        details: None,
    }
}

/// Error payload for a failed image request.
pub fn image_error_response(err: &OcrError) -> OcrResponse {
    error_response(IMAGE_FAILURE_TEXT, err)
}

/// Error payload for a failed PDF request.
pub fn pdf_error_response(err: &OcrError) -> OcrResponse {
    error_response(PDF_FAILURE_TEXT, err)
}

fn error_response(text: &str, err: &OcrError) -> OcrResponse {
    OcrResponse {
        text: text.to_string(),
        pages: None,
        page_count: None,
        status: DocStatus::Error,
        error: Some(err.to_string()),
        details: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::PageOutcome;

    #[test]
    fn document_response_carries_page_breakdown() {
        let result = DocumentResult::from_pages(
            vec!["one".into(), "two".into()],
            vec![PageOutcome::NativeText, PageOutcome::NativeText],
        );
        let resp = document_response(result);
        assert_eq!(resp.page_count, Some(2));
        assert_eq!(resp.pages.as_deref(), Some(&["one".to_string(), "two".to_string()][..]));
        assert!(resp.error.is_none());
    }

    #[test]
    fn image_error_uses_fixed_failure_text() {
        let err = OcrError::Decode {
            detail: "truncated".into(),
        };
        let resp = image_error_response(&err);
        assert_eq!(resp.text, "Failed to process image");
        assert!(resp.error.unwrap().contains("truncated"));
        assert_eq!(resp.status, DocStatus::Error);
    }
}
