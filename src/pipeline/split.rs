//! PDF page splitting: per-page native text and rasterised images.
//!
//! ## Why spawn_blocking?
//!
//! pdfium wraps a C++ library with thread-local state and is not safe to
//! call from async contexts. `tokio::task::spawn_blocking` moves the work
//! onto the blocking thread pool so rendering never stalls the async
//! workers. Because pdfium handles cannot cross that boundary, the lazy
//! page iterator is driven to completion inside the blocking task and the
//! collected records are what come back out.
//!
//! ## Failure containment
//!
//! Per page, text extraction and rasterisation are attempted independently
//! and both are non-fatal: a missing text layer yields an empty string, a
//! render glitch yields a page without an image. One page's failure never
//! aborts processing of subsequent pages — only an unopenable document is a
//! hard error.

use crate::error::OcrError;
use pdfium_render::prelude::*;
use std::io::Cursor;
use tracing::{debug, warn};

/// One page of a split document, in physical page order.
///
/// Owned solely by the current request's processing context; never shared
/// across requests.
#[derive(Debug, Clone)]
pub struct PageRecord {
    /// 0-based, stable; ordering matches the physical page order.
    pub index: usize,
    /// Native text layer, possibly empty. Extraction failure also yields
    /// an empty string.
    pub native_text: String,
    /// PNG bytes of the rasterised page, absent when rendering failed.
    pub image_png: Option<Vec<u8>>,
}

/// A fully split document.
#[derive(Debug, Clone)]
pub struct SplitDocument {
    pub page_count: usize,
    pub pages: Vec<PageRecord>,
}

/// Split a PDF byte stream into per-page records.
///
/// Fails with [`OcrError::DocumentOpen`] if the bytes are not a valid PDF.
/// A zero-page document is valid and yields an empty record list.
pub async fn split_document(bytes: Vec<u8>, dpi: u32) -> Result<SplitDocument, OcrError> {
    tokio::task::spawn_blocking(move || split_blocking(&bytes, dpi))
        .await
        .map_err(|e| OcrError::Internal(format!("Split task panicked: {e}")))?
}

/// Blocking implementation. Each call binds its own pdfium instance; the
/// document handle is single-threaded and never shared across calls.
fn split_blocking(bytes: &[u8], dpi: u32) -> Result<SplitDocument, OcrError> {
    let bindings = Pdfium::bind_to_system_library()
        .map_err(|e| OcrError::Internal(format!("pdfium unavailable: {e:?}")))?;
    let pdfium = Pdfium::new(bindings);

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| OcrError::DocumentOpen {
            detail: format!("{e:?}"),
        })?;

    let accessor = document.pages();
    let page_count = accessor.len() as usize;
    debug!("PDF opened: {} pages", page_count);

    // Exactly one record per physical page, whatever happens to any of them.
    let mut pages = Vec::with_capacity(page_count);
    for index in 0..page_count {
        match accessor.get(index as u16) {
            Ok(page) => pages.push(split_page(index, &page, dpi)),
            Err(e) => {
                warn!("Page {}: could not open page handle: {:?}", index + 1, e);
                pages.push(PageRecord {
                    index,
                    native_text: String::new(),
                    image_png: None,
                });
            }
        }
    }

    Ok(SplitDocument { page_count, pages })
}

/// Extract one page's text layer and rasterise it, both failure-isolated.
fn split_page(index: usize, page: &PdfPage<'_>, dpi: u32) -> PageRecord {
    let native_text = match page.text() {
        Ok(text) => text.all(),
        Err(e) => {
            warn!("Page {}: text extraction failed: {:?}", index + 1, e);
            String::new()
        }
    };

    let image_png = match rasterise_page(page, dpi) {
        Ok(png) => Some(png),
        Err(detail) => {
            warn!("Page {}: rasterisation failed: {}", index + 1, detail);
            None
        }
    };

    PageRecord {
        index,
        native_text,
        image_png,
    }
}

/// Render the page at `dpi` and PNG-encode the bitmap.
///
/// Target pixel size comes from the page's physical size in points
/// (72 points per inch), so an A4 page at 300 DPI lands near 2480×3508.
fn rasterise_page(page: &PdfPage<'_>, dpi: u32) -> Result<Vec<u8>, String> {
    let scale = dpi as f32 / 72.0;
    let width_px = (page.width().value * scale).round() as i32;
    let height_px = (page.height().value * scale).round() as i32;

    let render_config = PdfRenderConfig::new()
        .set_target_width(width_px)
        .set_maximum_height(height_px);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| format!("{e:?}"))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page → {}x{} px at {} DPI",
        image.width(),
        image.height(),
        dpi
    );

    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| format!("PNG encoding failed: {e}"))?;

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn garbage_bytes_never_split_successfully() {
        // DocumentOpen with pdfium present, Internal when the library is
        // missing from the test environment; never a success.
        let result = split_document(b"not a pdf at all".to_vec(), 300).await;
        assert!(result.is_err());
    }
}
