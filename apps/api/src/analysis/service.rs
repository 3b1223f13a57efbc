//! Analysis Orchestrator — render page one, pick the instruction, ask the model.
//!
//! Strictly sequential; the first failing step ends the run. The uploaded PDF
//! belongs to the caller and is left in place. Renderer temp files are cleaned
//! up by the renderer before it returns.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::analysis::prompts::select_prompt;
use crate::llm_client::{LlmError, VisionModel};
use crate::render::{ConversionError, PageRenderer};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Analysis failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Analysis failed: {0}")]
    Model(#[from] LlmError),
}

#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub pdf_path: &'a Path,
    pub job_description: &'a str,
    pub analysis_type: &'a str,
}

/// Runs the full pipeline for one request and returns the model's non-empty text.
pub async fn analyze_resume(
    renderer: &dyn PageRenderer,
    model: &dyn VisionModel,
    request: AnalysisRequest<'_>,
) -> Result<String, AnalysisError> {
    let page = renderer.render_first_page(request.pdf_path).await?;
    info!("Rendered page one ({} bytes JPEG)", page.jpeg.len());

    let instruction = select_prompt(request.analysis_type);

    let analysis = model
        .analyze(instruction, request.job_description, &page)
        .await?;
    if analysis.trim().is_empty() {
        return Err(LlmError::EmptyResponse.into());
    }

    info!("Analysis complete ({} chars)", analysis.len());
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::prompts::{GENERAL_PROMPT, PERCENTAGE_PROMPT};
    use crate::render::RenderedPage;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedRenderer {
        fail: bool,
    }

    #[async_trait]
    impl PageRenderer for FixedRenderer {
        async fn render_first_page(&self, _pdf_path: &Path) -> Result<RenderedPage, ConversionError> {
            if self.fail {
                return Err(ConversionError::NoImage);
            }
            Ok(RenderedPage {
                jpeg: Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xD9]),
            })
        }
    }

    struct RecordingModel {
        reply: &'static str,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<(String, String)>>,
    }

    impl RecordingModel {
        fn replying(reply: &'static str) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl VisionModel for RecordingModel {
        async fn analyze(
            &self,
            instruction: &str,
            job_description: &str,
            _page: &RenderedPage,
        ) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() =
                Some((instruction.to_string(), job_description.to_string()));
            Ok(self.reply.to_string())
        }
    }

    fn request<'a>(analysis_type: &'a str) -> AnalysisRequest<'a> {
        AnalysisRequest {
            pdf_path: Path::new("uploads/file-1.pdf"),
            job_description: "Senior backend engineer, 5 years Go",
            analysis_type,
        }
    }

    #[tokio::test]
    async fn test_pipeline_passes_selected_prompt_and_job_description() {
        let model = RecordingModel::replying("85%\nMissing: Kafka\nSolid candidate.");
        let text = analyze_resume(&FixedRenderer { fail: false }, &model, request("percentage"))
            .await
            .unwrap();

        assert!(text.starts_with("85%"));
        let (instruction, jd) = model.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(instruction, PERCENTAGE_PROMPT);
        assert_eq!(jd, "Senior backend engineer, 5 years Go");
    }

    #[tokio::test]
    async fn test_unknown_category_proceeds_with_general_prompt() {
        let model = RecordingModel::replying("Looks reasonable.");
        analyze_resume(&FixedRenderer { fail: false }, &model, request("haiku"))
            .await
            .unwrap();

        let (instruction, _) = model.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(instruction, GENERAL_PROMPT);
    }

    #[tokio::test]
    async fn test_conversion_failure_skips_model_call() {
        let model = RecordingModel::replying("unused");
        let err = analyze_resume(&FixedRenderer { fail: true }, &model, request("review"))
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Conversion(ConversionError::NoImage)));
        assert_eq!(
            err.to_string(),
            "Analysis failed: Failed to convert PDF: no image produced"
        );
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_model_text_is_not_a_success() {
        let model = RecordingModel::replying("  \n ");
        let err = analyze_resume(&FixedRenderer { fail: false }, &model, request("review"))
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Model(LlmError::EmptyResponse)));
    }
}
