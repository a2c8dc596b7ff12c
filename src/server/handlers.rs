//! Request handlers.
//!
//! Processing failures travel as error-shaped payloads over HTTP 200 — a
//! malformed upload must never look like a server outage to the caller.
//! Only the transport layer itself (oversized body, broken multipart
//! stream) produces non-200 responses, and those come from axum, not from
//! here.

use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::AppState;
use crate::engine::GenerationConfig;
use crate::output::{DocStatus, OcrResponse};
use crate::pipeline::input::{DocumentKind, UploadedDocument};
use crate::pipeline::normalize::{self, NormalizeOptions};
use crate::pipeline::{assemble, extract, split};
use crate::prompts;
use crate::error::OcrError;
use crate::export;

/// `GET /health` — liveness probe, no side effects.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "online" }))
}

/// `POST /ocr` — multipart upload, transcription payload back.
pub async fn ocr(State(state): State<AppState>, mut multipart: Multipart) -> Json<OcrResponse> {
    let mut file: Option<UploadedDocument> = None;
    let mut question = String::new();
    let mut mode = String::new();
    let mut force_pdf = false;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart body: {e}");
                return Json(upload_error(&format!("Malformed upload: {e}")));
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let content_type = field.content_type().map(str::to_string);
                match field.bytes().await {
                    Ok(bytes) => {
                        file = Some(UploadedDocument {
                            bytes: bytes.to_vec(),
                            content_type,
                            force_pdf: false,
                        });
                    }
                    Err(e) => {
                        warn!("Failed to read file part: {e}");
                        return Json(upload_error(&format!("Malformed upload: {e}")));
                    }
                }
            }
            "question" => question = field.text().await.unwrap_or_default(),
            "mode" => mode = field.text().await.unwrap_or_default(),
            "isPdf" => {
                force_pdf = field
                    .text()
                    .await
                    .map(|v| v.eq_ignore_ascii_case("true"))
                    .unwrap_or(false);
            }
            other => debug!("Ignoring unknown form field {other:?}"),
        }
    }

    let Some(mut doc) = file else {
        return Json(upload_error("No file uploaded"));
    };
    doc.force_pdf = force_pdf;

    if !mode.is_empty() {
        // Advisory only; kept for request tracing parity with clients.
        debug!(%mode, "OCR mode requested");
    }

    match doc.kind() {
        DocumentKind::Pdf => Json(process_pdf(&state, doc, &question).await),
        DocumentKind::Image => Json(process_image(&state, doc, &question).await),
    }
}

/// PDF branch: split, run the adaptive policy, expose the page breakdown.
async fn process_pdf(state: &AppState, doc: UploadedDocument, question: &str) -> OcrResponse {
    info!(bytes = doc.bytes.len(), "Processing PDF upload");
    match split::split_document(doc.bytes, state.config.render_dpi).await {
        Ok(split) => {
            let result =
                extract::extract_document(&state.engine, &state.config, split, question).await;
            assemble::document_response(result)
        }
        Err(e) => {
            warn!("PDF processing failed: {e}");
            assemble::pdf_error_response(&e)
        }
    }
}

/// Image branch: one tensor, one engine call.
async fn process_image(state: &AppState, doc: UploadedDocument, question: &str) -> OcrResponse {
    info!(bytes = doc.bytes.len(), "Processing image upload");
    let opts = NormalizeOptions::from_config(&state.config, state.engine.device());

    let tensor = match normalize::normalize(&doc.bytes, &opts) {
        Ok(t) => t,
        Err(e) => {
            warn!("Image processing failed: {e}");
            return assemble::image_error_response(&e);
        }
    };

    let prompt = prompts::with_image_placeholder(question);
    let generation = GenerationConfig::image(&state.config);
    match state.engine.generate(tensor, prompt, generation).await {
        Ok(text) => assemble::image_response(text),
        Err(e) => {
            warn!("Image inference failed: {e}");
            assemble::image_error_response(&e)
        }
    }
}

/// `POST /export` — JSON body in, rendered attachment out.
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub content: String,
    pub format: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
}

pub async fn export(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> Response {
    info!(format = %request.format, "Export requested");

    match export_file(&state, &request).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Export failed: {e}");
            Json(json!({ "error": e.to_string() })).into_response()
        }
    }
}

async fn export_file(state: &AppState, request: &ExportRequest) -> Result<Response, OcrError> {
    let file = export::export(
        state.renderer.as_ref(),
        &request.content,
        &request.format,
        &request.file_name,
    )
    .await?;

    Ok((
        [
            (header::CONTENT_TYPE, file.media_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", file.file_name),
            ),
        ],
        file.bytes,
    )
        .into_response())
}

fn upload_error(message: &str) -> OcrResponse {
    OcrResponse {
        text: String::new(),
        pages: None,
        page_count: None,
        status: DocStatus::Error,
        error: Some(message.to_string()),
        details: None,
    }
}
