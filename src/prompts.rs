//! Prompt construction for the vision engine.
//!
//! Centralising every prompt here keeps the default behaviour in one place
//! and lets unit tests inspect prompts without touching the engine. Callers
//! can override the instruction per request; the constants here apply when
//! no override is provided.

/// Placeholder marker the engine requires at the start of every prompt.
/// It anchors the image embedding inside the token stream.
pub const IMAGE_PLACEHOLDER: &str = "<image>";

/// Default transcription instruction, used when the caller sends no
/// `question` field (or an empty one).
pub const DEFAULT_QUESTION: &str = "\
Transcribe the content of this document exactly as it appears.
Preserve the reading order and render the result as Markdown.
Do not add commentary, explanations, or content that is not on the page.";

/// Ensure the prompt starts with the image placeholder the engine expects.
///
/// Prompts supplied by callers rarely carry the marker; the gateway injects
/// it rather than rejecting the request.
pub fn with_image_placeholder(question: &str) -> String {
    let q = question.trim();
    let q = if q.is_empty() { DEFAULT_QUESTION } else { q };
    if q.starts_with(IMAGE_PLACEHOLDER) {
        q.to_string()
    } else {
        format!("{IMAGE_PLACEHOLDER}\n{q}")
    }
}

/// Build the prompt for one PDF page.
///
/// Stating the page's ordinal position and the total page count measurably
/// improves cross-page continuity in the engine's output (numbered lists,
/// running headers, section numbering).
pub fn page_prompt(question: &str, page_index: usize, page_count: usize) -> String {
    format!(
        "{}\nThis is page {} of {} of the same document.",
        with_image_placeholder(question),
        page_index + 1,
        page_count
    )
}
