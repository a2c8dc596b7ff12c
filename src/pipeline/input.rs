//! Upload classification: decide which pipeline branch a request takes.

/// One uploaded document, immutable once received. Lives for exactly one
/// request.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub bytes: Vec<u8>,
    /// Content type declared by the client for the file part, if any.
    pub content_type: Option<String>,
    /// Explicit `isPdf` override from the form; forces the PDF branch even
    /// when the declared content type disagrees.
    pub force_pdf: bool,
}

/// Which branch of the pipeline handles the upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl UploadedDocument {
    pub fn kind(&self) -> DocumentKind {
        let declared_pdf = self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf"));
        if self.force_pdf || declared_pdf {
            DocumentKind::Pdf
        } else {
            DocumentKind::Image
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content_type: Option<&str>, force_pdf: bool) -> UploadedDocument {
        UploadedDocument {
            bytes: Vec::new(),
            content_type: content_type.map(str::to_string),
            force_pdf,
        }
    }

    #[test]
    fn declared_content_type_selects_branch() {
        assert_eq!(doc(Some("image/png"), false).kind(), DocumentKind::Image);
        assert_eq!(doc(Some("application/pdf"), false).kind(), DocumentKind::Pdf);
    }

    #[test]
    fn is_pdf_flag_overrides_declared_type() {
        assert_eq!(doc(Some("image/png"), true).kind(), DocumentKind::Pdf);
        assert_eq!(doc(None, true).kind(), DocumentKind::Pdf);
    }

    #[test]
    fn unknown_type_defaults_to_image() {
        assert_eq!(doc(None, false).kind(), DocumentKind::Image);
    }
}
