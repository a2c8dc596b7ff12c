//! Export bridge: turn accepted text back into a downloadable document.
//!
//! The core logic never talks to a concrete rendering tool. It validates
//! the requested format, sanitises the file name, and hands off to a
//! [`DocumentRenderer`] capability — one implementation shells out to the
//! external renderer process ([`external::ExternalRenderer`]), tests use an
//! in-memory fake.

pub mod external;

use crate::error::OcrError;
use crate::output::ExportedFile;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// The only formats the bridge accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Docx,
    Pdf,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Docx => "docx",
            ExportFormat::Pdf => "pdf",
        }
    }

    /// Media type sent back with the rendered artefact.
    pub fn media_type(&self) -> &'static str {
        match self {
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "docx" => Ok(ExportFormat::Docx),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(OcrError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").unwrap());

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
///
/// The result is the only caller-controlled string that ever reaches a file
/// path or the renderer's argv, so traversal sequences and shell
/// metacharacters must not survive. An empty input falls back to
/// `"document"`.
pub fn sanitize_file_name(name: &str) -> String {
    let safe = UNSAFE_CHARS.replace_all(name, "_").into_owned();
    if safe.is_empty() {
        "document".to_string()
    } else {
        safe
    }
}

/// Capability interface for producing a rendered document.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Render `content` to `format` under `safe_name` (already sanitised).
    async fn render(
        &self,
        content: &str,
        format: ExportFormat,
        safe_name: &str,
    ) -> Result<ExportedFile, OcrError>;
}

/// Validate the request and run the renderer.
///
/// Format validation happens first: an unsupported format must never invoke
/// the renderer.
pub async fn export(
    renderer: &dyn DocumentRenderer,
    content: &str,
    format: &str,
    file_name: &str,
) -> Result<ExportedFile, OcrError> {
    let format = ExportFormat::from_str(format)?;
    let safe_name = sanitize_file_name(file_name);
    renderer.render(content, format, &safe_name).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitised_names_match_the_safe_alphabet() {
        let re = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
        for name in [
            "../../etc/passwd",
            "my report (final).v2",
            "hồ sơ 2024",
            "",
            "ok-name_42",
        ] {
            let safe = sanitize_file_name(name);
            assert!(re.is_match(&safe), "{name:?} → {safe:?}");
        }
    }

    #[test]
    fn traversal_sequences_are_neutralised() {
        let safe = sanitize_file_name("../outside");
        assert!(!safe.contains("../"));
        assert!(!safe.contains('/'));
        assert_eq!(safe, "___outside");
    }

    #[test]
    fn valid_names_pass_through_unchanged() {
        assert_eq!(sanitize_file_name("scan_2024-01"), "scan_2024-01");
    }

    #[test]
    fn only_docx_and_pdf_parse() {
        assert_eq!("docx".parse::<ExportFormat>().unwrap(), ExportFormat::Docx);
        assert_eq!("pdf".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        let err = "csv".parse::<ExportFormat>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid format: csv. Valid formats are 'docx' or 'pdf'"
        );
    }

    #[tokio::test]
    async fn invalid_format_never_reaches_the_renderer() {
        struct Exploding;

        #[async_trait]
        impl DocumentRenderer for Exploding {
            async fn render(
                &self,
                _content: &str,
                _format: ExportFormat,
                _safe_name: &str,
            ) -> Result<ExportedFile, OcrError> {
                panic!("renderer must not be invoked for invalid formats");
            }
        }

        let err = export(&Exploding, "text", "csv", "name").await.unwrap_err();
        assert!(matches!(err, OcrError::UnsupportedFormat { .. }));
    }
}
