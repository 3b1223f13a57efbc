use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::VisionModel;
use crate::render::PageRenderer;

/// Shared application state injected into all route handlers via Axum extractors.
/// Holds no per-request data; every request owns its own upload and render directory.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Page-one rasterizer. Default: `PdfRasterizer` (poppler `pdftoppm`).
    pub renderer: Arc<dyn PageRenderer>,
    /// Multimodal model. Default: `GeminiClient`.
    pub model: Arc<dyn VisionModel>,
}
