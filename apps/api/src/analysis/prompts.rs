// Instruction templates sent ahead of the job description.
// The model sees: "<template>\n\nJob Description: <text>" plus the rendered page.

use crate::analysis::models::AnalysisType;

/// Holistic qualitative review: strengths and weaknesses against the role.
pub const REVIEW_PROMPT: &str = "You are an experienced Technical Human Resource Manager, \
    your task is to review the provided resume against the job description. \
    Please share your professional evaluation on whether the candidate's profile aligns with the role. \
    Highlight the strengths and weaknesses of the applicant in relation to the specified job requirements.";

/// Simulated ATS judgment. Output order: percentage, missing keywords, final thoughts.
pub const PERCENTAGE_PROMPT: &str = "You are a skilled ATS (Applicant Tracking System) scanner \
    with a deep understanding of data science and ATS functionality, \
    your task is to evaluate the resume against the provided job description. \
    Give me the percentage of match if the resume matches the job description. \
    First the output should come as percentage and then keywords missing and last final thoughts.";

pub const GENERAL_PROMPT: &str = "Please analyze this resume against the job description.";

pub fn prompt_for(analysis_type: AnalysisType) -> &'static str {
    match analysis_type {
        AnalysisType::Review => REVIEW_PROMPT,
        AnalysisType::Percentage => PERCENTAGE_PROMPT,
        AnalysisType::General => GENERAL_PROMPT,
    }
}

/// Maps a raw category string to its template. Unknown categories get `GENERAL_PROMPT`.
pub fn select_prompt(category: &str) -> &'static str {
    prompt_for(AnalysisType::parse(category))
}
