//! Axum route handlers for the Resume Analysis API.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::analysis::models::AnalyzeResponse;
use crate::analysis::service::{analyze_resume, AnalysisRequest};
use crate::analysis::upload::{receive_form, AnalyzeForm};
use crate::errors::AppError;
use crate::state::AppState;

/// POST /api/resume/analyze
///
/// Multipart form: `file` (PDF), `jobDescription`, `analysisType`.
/// The stored upload is removed before the response is produced, on every path.
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    // Not a multipart body: nothing was uploaded.
    let mut multipart = multipart.map_err(|rejection| {
        debug!("Rejected non-multipart analyze request: {rejection}");
        AppError::Validation("Please upload a PDF file".to_string())
    })?;

    let request_id = Uuid::new_v4();
    let span = info_span!("analyze", %request_id);

    let AnalyzeForm {
        file,
        job_description,
        analysis_type,
    } = receive_form(&mut multipart, &state.config.upload_dir)
        .instrument(span.clone())
        .await?;

    let upload = file.ok_or_else(|| AppError::Validation("Please upload a PDF file".to_string()))?;

    let (job_description, analysis_type) =
        match (non_empty(job_description), non_empty(analysis_type)) {
            (Some(jd), Some(kind)) => (jd, kind),
            _ => {
                upload.discard();
                return Err(AppError::Validation(
                    "Job description and analysis type are required".to_string(),
                ));
            }
        };

    span.in_scope(|| {
        info!(
            "Analyzing {} ({} bytes, {}) as '{analysis_type}'",
            upload.path().display(),
            upload.size(),
            upload.content_type()
        )
    });

    let result = analyze_resume(
        state.renderer.as_ref(),
        state.model.as_ref(),
        AnalysisRequest {
            pdf_path: upload.path(),
            job_description: &job_description,
            analysis_type: &analysis_type,
        },
    )
    .instrument(span)
    .await;

    upload.discard();
    let analysis = result?;

    Ok(Json(AnalyzeResponse {
        success: true,
        message: "Analysis completed successfully".to_string(),
        analysis,
        analysis_type,
    }))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
