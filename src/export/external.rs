//! External renderer process invocation.
//!
//! The renderer is a separate tool with a fixed contract: invoked as
//! `<command> <inputFile> <format> <safeName>`, it writes
//! `<safeName>.<format>` into its working directory and exits 0. This
//! module owns the plumbing around that contract — temp files, process
//! lifecycle, the timeout, and cleanup — and distinguishes the two failure
//! modes that matter for diagnosis: a non-zero exit (with captured stderr)
//! versus a clean exit that produced no output file.

use super::{DocumentRenderer, ExportFormat};
use crate::error::OcrError;
use crate::output::ExportedFile;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Shells out to the configured renderer command.
pub struct ExternalRenderer {
    command: String,
    timeout: Duration,
}

impl ExternalRenderer {
    pub fn new(command: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            command: command.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl DocumentRenderer for ExternalRenderer {
    async fn render(
        &self,
        content: &str,
        format: ExportFormat,
        safe_name: &str,
    ) -> Result<ExportedFile, OcrError> {
        // A fresh TempDir per call is the collision-resistance guarantee:
        // concurrent exports with the same file name each get their own
        // working directory.
        let workdir =
            tempfile::TempDir::new().map_err(|e| OcrError::Internal(format!("tempdir: {e}")))?;

        let input_path = workdir.path().join("content.txt");
        tokio::fs::write(&input_path, content)
            .await
            .map_err(|e| OcrError::Internal(format!("write temp input: {e}")))?;

        let output_name = format!("{safe_name}.{format}");
        debug!(command = %self.command, %output_name, "Invoking renderer");

        let child = Command::new(&self.command)
            .arg(&input_path)
            .arg(format.as_str())
            .arg(safe_name)
            .current_dir(workdir.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(OcrError::Internal(format!(
                    "failed to spawn renderer '{}': {e}",
                    self.command
                )))
            }
            Err(_) => {
                return Err(OcrError::RenderTimeout {
                    secs: self.timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            return Err(OcrError::RenderProcess {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // Exit 0 is not proof of output; the file's existence is.
        let output_path = workdir.path().join(&output_name);
        if !output_path.exists() {
            return Err(OcrError::RenderFailure {
                expected: output_name,
            });
        }

        let bytes = tokio::fs::read(&output_path)
            .await
            .map_err(|e| OcrError::Internal(format!("read rendered file: {e}")))?;

        // Cleanup is best-effort: a deletion failure must never mask a
        // successful export.
        if let Err(e) = workdir.close() {
            warn!("Failed to clean up export working directory: {e}");
        }

        Ok(ExportedFile {
            bytes,
            media_type: format.media_type(),
            file_name: output_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests script the renderer with /bin/sh, exercising the real
    // process plumbing without depending on an installed rendering tool.

    fn sh_renderer(script: &str, timeout_secs: u64) -> (ExternalRenderer, tempfile::TempDir) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("renderer.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        (
            ExternalRenderer::new(path.display().to_string(), timeout_secs),
            dir,
        )
    }

    #[tokio::test]
    async fn renders_and_reads_back_the_output_file() {
        // Copies the input to the expected output name in the cwd.
        let (renderer, _dir) = sh_renderer("cp \"$1\" \"$3.$2\"", 10);
        let file = renderer
            .render("hello export", ExportFormat::Pdf, "report")
            .await
            .unwrap();
        assert_eq!(file.file_name, "report.pdf");
        assert_eq!(file.media_type, "application/pdf");
        assert_eq!(file.bytes, b"hello export");
    }

    #[tokio::test]
    async fn nonzero_exit_surfaces_stderr() {
        let (renderer, _dir) = sh_renderer("echo 'boom' >&2; exit 3", 10);
        let err = renderer
            .render("x", ExportFormat::Docx, "report")
            .await
            .unwrap_err();
        match err {
            OcrError::RenderProcess { code, stderr } => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected RenderProcess, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn clean_exit_without_output_is_render_failure() {
        let (renderer, _dir) = sh_renderer("exit 0", 10);
        let err = renderer
            .render("x", ExportFormat::Docx, "report")
            .await
            .unwrap_err();
        match err {
            OcrError::RenderFailure { expected } => assert_eq!(expected, "report.docx"),
            other => panic!("expected RenderFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn hanging_renderer_times_out() {
        let (renderer, _dir) = sh_renderer("sleep 30", 1);
        let err = renderer
            .render("x", ExportFormat::Pdf, "report")
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::RenderTimeout { secs: 1 }));
    }
}
