//! Pipeline stages for document transcription.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap an
//! implementation (rendering backend, engine backend) without touching the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ input ──┬─▶ normalize ──▶ engine ─────────────▶ assemble   (image)
//!                    └─▶ split ──▶ extract ────────────────▶ assemble   (PDF)
//!                        (pdfium)  (policy: text layer        (payload)
//!                                   vs per-page inference)
//! ```
//!
//! 1. [`input`]     — classify the upload (image vs PDF, `isPdf` override)
//! 2. [`normalize`] — decode and normalise bytes into the engine tensor
//! 3. [`split`]     — per-page native text + rasterised image; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 4. [`extract`]   — the adaptive policy: accept the native text layer
//!    wholesale or re-derive every page through the engine
//! 5. [`assemble`]  — fold results into the caller-facing payload

pub mod assemble;
pub mod extract;
pub mod input;
pub mod normalize;
pub mod split;
