//! Multipart intake for `POST /api/resume/analyze`.
//!
//! The `file` part is streamed straight to `UPLOAD_DIR` and size-checked as it
//! arrives. The stored file lives as long as its `UploadedDocument`: dropping it
//! (early return, error, panic) deletes the file, `discard` deletes it and logs
//! any failure.

use std::path::Path;

use anyhow::Context;
use axum::extract::multipart::{Field, Multipart};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::errors::AppError;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
/// Request body cap: the upload plus room for the text fields.
pub const MAX_REQUEST_BYTES: usize = MAX_UPLOAD_BYTES + 2 * 1024 * 1024;
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A PDF received from the client and stored on disk for this request only.
#[derive(Debug)]
pub struct UploadedDocument {
    file: NamedTempFile,
    content_type: String,
    size: usize,
}

impl UploadedDocument {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Removes the file from disk. Failures are logged, never returned.
    pub fn discard(self) {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => debug!("Removed upload {}", path.display()),
            Err(e) => warn!("Failed to remove upload {}: {e}", path.display()),
        }
    }
}

/// Form fields of an analyze request, as received. Validation happens in the handler.
#[derive(Debug, Default)]
pub struct AnalyzeForm {
    pub file: Option<UploadedDocument>,
    pub job_description: Option<String>,
    pub analysis_type: Option<String>,
}

pub async fn receive_form(
    multipart: &mut Multipart,
    upload_dir: &Path,
) -> Result<AnalyzeForm, AppError> {
    let mut form = AnalyzeForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            // A `file` part without a filename is a text field, not an upload.
            Some("file") if field.file_name().is_some() => {
                form.file = Some(store_pdf(field, upload_dir).await?)
            }
            Some("jobDescription") => form.job_description = Some(field.text().await?),
            Some("analysisType") => form.analysis_type = Some(field.text().await?),
            other => debug!("Ignoring unexpected form field {other:?}"),
        }
    }

    Ok(form)
}

async fn store_pdf(mut field: Field<'_>, upload_dir: &Path) -> Result<UploadedDocument, AppError> {
    let content_type = field
        .content_type()
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_lowercase())
        .unwrap_or_default();
    if content_type != PDF_MIME_TYPE {
        return Err(AppError::Validation("Only PDF files are allowed!".to_string()));
    }

    tokio::fs::create_dir_all(upload_dir)
        .await
        .with_context(|| format!("Failed to create upload directory {}", upload_dir.display()))?;

    let millis = chrono::Utc::now().timestamp_millis();
    let file = tempfile::Builder::new()
        .prefix(&format!("file-{millis}-"))
        .suffix(".pdf")
        .tempfile_in(upload_dir)
        .context("Failed to create upload file")?;
    let mut out = tokio::fs::File::from_std(
        file.as_file()
            .try_clone()
            .context("Failed to open upload file for writing")?,
    );

    let mut size = 0usize;
    while let Some(chunk) = field.chunk().await? {
        size += chunk.len();
        if size > MAX_UPLOAD_BYTES {
            return Err(AppError::Validation(
                "File too large. Maximum size is 10 MB".to_string(),
            ));
        }
        out.write_all(&chunk)
            .await
            .context("Failed to write upload file")?;
    }
    out.flush().await.context("Failed to flush upload file")?;

    debug!("Stored upload {} ({size} bytes)", file.path().display());
    Ok(UploadedDocument {
        file,
        content_type,
        size,
    })
}
