//! Adaptive extraction policy: decide, per document, whether the PDF's
//! native text layer is trustworthy or every page must be re-derived
//! through the vision engine.
//!
//! ## The decision rule
//!
//! Native extraction is near-free and, when present and substantial,
//! strictly more faithful than a vision model's transcription. Engine
//! invocation is the single most expensive operation in the system. So the
//! policy is evaluated once per document, after the splitter has seen every
//! page: if the trimmed concatenation of all pages' native text exceeds the
//! configured threshold, the text layer is accepted wholesale and the
//! engine is never invoked; a short or empty aggregate is evidence the PDF
//! is scanned and the text layer cannot be trusted, so every rasterised
//! page goes through the engine.
//!
//! A document whose native text marginally exceeds the threshold but is
//! actually garbage (corrupted text layer) is accepted as-is: the policy
//! has no content-quality check beyond length. That is a deliberate
//! fidelity/cost trade-off, not an oversight.
//!
//! ## Failure containment
//!
//! On the fallback path, a page without an image (render failure) or whose
//! engine call fails contributes a fixed placeholder for its slot. Failure
//! is isolated per page, never global, and the result sequence always
//! matches the physical page order regardless of completion order.

use crate::config::ServiceConfig;
use crate::engine::{EngineHandle, GenerationConfig};
use crate::error::PageError;
use crate::output::{DocumentResult, PageOutcome};
use crate::pipeline::normalize::{self, NormalizeOptions};
use crate::pipeline::split::{PageRecord, SplitDocument};
use crate::prompts;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

/// Placeholder occupying the result slot of a failed page.
pub fn placeholder_text(index: usize) -> String {
    format!("[Page {} could not be processed]", index + 1)
}

/// Run the policy over a split document and aggregate the result.
///
/// `question` is the caller's instruction (already defaulted by the
/// handler); each fallback page gets it wrapped in a page-scoped prompt.
pub async fn extract_document(
    engine: &EngineHandle,
    config: &ServiceConfig,
    split: SplitDocument,
    question: &str,
) -> DocumentResult {
    if split.page_count == 0 {
        return DocumentResult::empty();
    }

    let native_len = split
        .pages
        .iter()
        .map(|p| p.native_text.as_str())
        .collect::<String>()
        .trim()
        .len();

    if native_len > config.native_text_threshold {
        info!(
            pages = split.page_count,
            native_len, "Native text layer accepted; skipping inference"
        );
        let (pages, outcomes) = split
            .pages
            .into_iter()
            .map(|p| (p.native_text, PageOutcome::NativeText))
            .unzip();
        return DocumentResult::from_pages(pages, outcomes);
    }

    info!(
        pages = split.page_count,
        native_len,
        threshold = config.native_text_threshold,
        "Native text below threshold; transcribing every page"
    );

    let total = split.page_count;
    let generation = GenerationConfig::pdf_page(config);
    let opts = NormalizeOptions::from_config(config, engine.device());

    // Pages are independent but contend for the single engine instance;
    // buffer_unordered bounds the in-flight calls and the index sort below
    // restores physical order whatever the completion order was.
    let mut slots: Vec<(usize, String, PageOutcome)> =
        stream::iter(split.pages.into_iter().map(|record| {
            let engine = engine.clone();
            let opts = opts.clone();
            let question = question.to_string();
            async move { transcribe_page(&engine, &opts, generation, record, &question, total).await }
        }))
        .buffer_unordered(config.engine_concurrency)
        .collect()
        .await;

    slots.sort_by_key(|(index, _, _)| *index);

    let (pages, outcomes) = slots
        .into_iter()
        .map(|(_, text, outcome)| (text, outcome))
        .unzip();
    DocumentResult::from_pages(pages, outcomes)
}

/// Transcribe one page, degrading every failure to a placeholder slot.
async fn transcribe_page(
    engine: &EngineHandle,
    opts: &NormalizeOptions,
    generation: GenerationConfig,
    record: PageRecord,
    question: &str,
    total: usize,
) -> (usize, String, PageOutcome) {
    let index = record.index;

    let Some(png) = record.image_png else {
        let err = PageError::RenderFailed {
            page: index,
            detail: "no rasterised image for this page".into(),
        };
        warn!("{err}");
        return (index, placeholder_text(index), PageOutcome::Failed);
    };

    let tensor = match normalize::normalize(&png, opts) {
        Ok(t) => t,
        Err(e) => {
            let err = PageError::RenderFailed {
                page: index,
                detail: e.to_string(),
            };
            warn!("{err}");
            return (index, placeholder_text(index), PageOutcome::Failed);
        }
    };

    let prompt = prompts::page_prompt(question, index, total);
    match engine.generate(tensor, prompt, generation).await {
        Ok(text) => (index, text, PageOutcome::Inference),
        Err(e) => {
            let err = PageError::InferenceFailed {
                page: index,
                detail: e.to_string(),
            };
            warn!("{err}");
            (index, placeholder_text(index), PageOutcome::Failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Device, PixelTensor, PromptCodec, VisionEngine};
    use crate::error::OcrError;
    use crate::output::DocStatus;
    use image::{Rgb, RgbImage};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Scripted engine: echoes the prompt and counts invocations.
    struct StubEngine {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubEngine {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }
    }

    impl VisionEngine for StubEngine {
        fn generate(
            &self,
            _tensor: &PixelTensor,
            prompt: &str,
            _config: &GenerationConfig,
        ) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(OcrError::Inference {
                    detail: "stub failure".into(),
                })
            } else {
                Ok(format!("transcribed: {prompt}"))
            }
        }
    }

    fn test_codec() -> PromptCodec {
        let mut table = HashMap::new();
        for (i, t) in ["<s>", "</s>", "<unk>", "<image>"].iter().enumerate() {
            table.insert((*t).to_string(), i as i64);
        }
        PromptCodec::from_table(table).unwrap()
    }

    fn handle(stub: Arc<StubEngine>) -> EngineHandle {
        EngineHandle::new(stub, Arc::new(test_codec()), Device::Cpu)
    }

    fn png() -> Vec<u8> {
        let img = RgbImage::from_pixel(24, 32, Rgb([240, 240, 240]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn page(index: usize, text: &str, with_image: bool) -> PageRecord {
        PageRecord {
            index,
            native_text: text.to_string(),
            image_png: with_image.then(png),
        }
    }

    fn small_config() -> ServiceConfig {
        // Tiny tensor keeps these tests fast; the policy is size-agnostic.
        ServiceConfig::builder().target_size(32).build().unwrap()
    }

    #[tokio::test]
    async fn substantial_native_text_skips_inference_entirely() {
        let stub = Arc::new(StubEngine::new());
        let engine = handle(Arc::clone(&stub));
        let config = small_config();

        let long = "a".repeat(80);
        let split = SplitDocument {
            page_count: 2,
            pages: vec![page(0, &long, true), page(1, &long, true)],
        };

        let result = extract_document(&engine, &config, split, "read").await;

        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.status, DocStatus::Success);
        assert_eq!(result.pages, vec![long.clone(), long.clone()]);
        assert_eq!(result.text, format!("{long}\n\n{long}"));
    }

    #[tokio::test]
    async fn text_at_threshold_still_triggers_inference() {
        let stub = Arc::new(StubEngine::new());
        let engine = handle(Arc::clone(&stub));
        let config = small_config();

        // Exactly 100 chars: "exceeds" is strict, so the fallback runs.
        let split = SplitDocument {
            page_count: 1,
            pages: vec![page(0, &"x".repeat(100), true)],
        };

        let result = extract_document(&engine, &config, split, "read").await;
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.status, DocStatus::Success);
    }

    #[tokio::test]
    async fn scanned_pdf_gets_one_engine_call_per_rasterised_page() {
        let stub = Arc::new(StubEngine::new());
        let engine = handle(Arc::clone(&stub));
        let config = small_config();

        let split = SplitDocument {
            page_count: 3,
            pages: vec![page(0, "", true), page(1, "", true), page(2, "", true)],
        };

        let result = extract_document(&engine, &config, split, "read").await;

        assert_eq!(stub.calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.page_count, 3);
        assert_eq!(result.pages.len(), 3);
        // Page-scoped prompts keep results addressable to physical order.
        for (i, text) in result.pages.iter().enumerate() {
            assert!(
                text.contains(&format!("page {} of 3", i + 1)),
                "page {i} got {text:?}"
            );
        }
    }

    #[tokio::test]
    async fn render_failed_page_becomes_placeholder_not_omission() {
        let stub = Arc::new(StubEngine::new());
        let engine = handle(Arc::clone(&stub));
        let config = small_config();

        let split = SplitDocument {
            page_count: 3,
            pages: vec![page(0, "", true), page(1, "", false), page(2, "", true)],
        };

        let result = extract_document(&engine, &config, split, "read").await;

        // Only the two rasterised pages reach the engine.
        assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.pages.len(), result.page_count);
        assert_eq!(result.pages[1], "[Page 2 could not be processed]");
        assert_eq!(result.status, DocStatus::Partial);
        assert_eq!(result.outcomes[1], PageOutcome::Failed);
    }

    #[tokio::test]
    async fn engine_failure_is_isolated_per_page() {
        let stub = Arc::new(StubEngine::failing());
        let engine = handle(Arc::clone(&stub));
        let config = small_config();

        let split = SplitDocument {
            page_count: 2,
            pages: vec![page(0, "", true), page(1, "", true)],
        };

        let result = extract_document(&engine, &config, split, "read").await;

        assert_eq!(result.pages.len(), 2);
        assert!(result.pages.iter().all(|p| p.contains("could not be processed")));
        assert_eq!(result.status, DocStatus::Partial);
    }

    #[tokio::test]
    async fn zero_page_document_is_empty_success() {
        let stub = Arc::new(StubEngine::new());
        let engine = handle(Arc::clone(&stub));
        let config = small_config();

        let split = SplitDocument {
            page_count: 0,
            pages: Vec::new(),
        };

        let result = extract_document(&engine, &config, split, "read").await;

        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.page_count, 0);
        assert!(result.pages.is_empty());
        assert!(result.text.is_empty());
        assert_eq!(result.status, DocStatus::Success);
    }
}
