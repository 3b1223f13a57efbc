//! Image Renderer: rasterizes page one of a PDF into JPEG bytes via poppler's `pdftoppm`.
//!
//! Every conversion runs inside its own `TempDir` under the configured temp root,
//! so concurrent requests never scan each other's output. The directory is removed
//! before `render_first_page` returns, whatever the outcome.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::ImageFormat;
use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::Config;

/// Prefix `pdftoppm` gives its output files; it appends `-<page>.jpg`.
const OUTPUT_PREFIX: &str = "page";
const JPEG_QUALITY: u8 = 100;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Failed to convert PDF: could not prepare temp directory: {0}")]
    TempDir(#[source] std::io::Error),

    #[error("Failed to convert PDF: could not run {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to convert PDF: rasterizer exited with {status}: {stderr}")]
    Rasterizer { status: String, stderr: String },

    #[error("Failed to convert PDF: no image produced")]
    NoImage,

    #[error("Failed to convert PDF: could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Page one of a document, JPEG encoded.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub jpeg: Bytes,
}

impl RenderedPage {
    /// Base64 text form expected by the model's inline image part.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.jpeg)
    }
}

/// Converts the first page of a PDF into an image.
///
/// Carried in `AppState` as `Arc<dyn PageRenderer>`.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render_first_page(&self, pdf_path: &Path) -> Result<RenderedPage, ConversionError>;
}

/// `PageRenderer` backed by the poppler `pdftoppm` executable.
#[derive(Debug, Clone)]
pub struct PdfRasterizer {
    binary: PathBuf,
    temp_root: PathBuf,
    scale_px: u32,
}

impl PdfRasterizer {
    pub fn new(binary: PathBuf, temp_root: PathBuf, scale_px: u32) -> Self {
        Self {
            binary,
            temp_root,
            scale_px,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.pdftoppm_binary(),
            config.temp_dir.clone(),
            config.render_scale_px,
        )
    }

    async fn create_work_dir(&self) -> Result<TempDir, ConversionError> {
        tokio::fs::create_dir_all(&self.temp_root)
            .await
            .map_err(ConversionError::TempDir)?;
        let millis = chrono::Utc::now().timestamp_millis();
        tempfile::Builder::new()
            .prefix(&format!("render-{millis}-"))
            .tempdir_in(&self.temp_root)
            .map_err(ConversionError::TempDir)
    }

    async fn rasterize(&self, pdf_path: &Path, work_dir: &Path) -> Result<Bytes, ConversionError> {
        let output = Command::new(&self.binary)
            .arg("-jpeg")
            .arg("-jpegopt")
            .arg(format!("quality={JPEG_QUALITY}"))
            .arg("-f")
            .arg("1")
            .arg("-l")
            .arg("1")
            .arg("-scale-to")
            .arg(self.scale_px.to_string())
            .arg(pdf_path)
            .arg(work_dir.join(OUTPUT_PREFIX))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ConversionError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ConversionError::Rasterizer {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let image_path = find_rendered_image(work_dir).await?;
        debug!("Rasterized {} → {}", pdf_path.display(), image_path.display());

        let raw = tokio::fs::read(&image_path)
            .await
            .map_err(|source| ConversionError::Read {
                path: image_path.clone(),
                source,
            })?;

        Ok(normalize_jpeg(raw).await)
    }
}

#[async_trait]
impl PageRenderer for PdfRasterizer {
    async fn render_first_page(&self, pdf_path: &Path) -> Result<RenderedPage, ConversionError> {
        let work_dir = self.create_work_dir().await?;
        let result = self.rasterize(pdf_path, work_dir.path()).await;

        let dir_path = work_dir.path().to_path_buf();
        if let Err(e) = work_dir.close() {
            warn!("Failed to remove render directory {}: {e}", dir_path.display());
        }

        result.map(|jpeg| RenderedPage { jpeg })
    }
}

/// Returns the first file in `dir` that looks like a `pdftoppm` JPEG page.
async fn find_rendered_image(dir: &Path) -> Result<PathBuf, ConversionError> {
    let read_err = |source: std::io::Error| ConversionError::Read {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_err)?;
    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if name.contains(OUTPUT_PREFIX) && (name.ends_with(".jpg") || name.ends_with(".jpeg")) {
            candidates.push(entry.path());
        }
    }

    candidates.sort();
    candidates.into_iter().next().ok_or(ConversionError::NoImage)
}

/// Decodes and re-encodes the rasterizer output at full quality.
/// Falls back to the raw bytes when the image cannot be decoded.
async fn normalize_jpeg(raw: Vec<u8>) -> Bytes {
    let raw = Bytes::from(raw);
    let input = raw.clone();

    let reencoded = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, image::ImageError> {
        let img = image::load_from_memory_with_format(&input, ImageFormat::Jpeg)?;
        let mut buf = Vec::new();
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buf), JPEG_QUALITY);
        img.to_rgb8().write_with_encoder(encoder)?;
        Ok(buf)
    })
    .await;

    match reencoded {
        Ok(Ok(buf)) => Bytes::from(buf),
        Ok(Err(e)) => {
            warn!("Image decode failed, using raw rasterizer output: {e}");
            raw
        }
        Err(e) => {
            warn!("Image re-encode task panicked, using raw rasterizer output: {e}");
            raw
        }
    }
}
