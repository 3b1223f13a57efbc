use serde::Serialize;

/// Requested analysis category. Anything unrecognized maps to `General`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisType {
    Review,
    Percentage,
    General,
}

impl AnalysisType {
    /// Case-insensitive; never fails.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "review" => AnalysisType::Review,
            "percentage" => AnalysisType::Percentage,
            _ => AnalysisType::General,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub message: String,
    pub analysis: String,
    /// Echoes the value the client sent, not the parsed category.
    pub analysis_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_types() {
        assert_eq!(AnalysisType::parse("review"), AnalysisType::Review);
        assert_eq!(AnalysisType::parse("percentage"), AnalysisType::Percentage);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(AnalysisType::parse("REVIEW"), AnalysisType::Review);
        assert_eq!(AnalysisType::parse(" Percentage "), AnalysisType::Percentage);
    }

    #[test]
    fn test_parse_unknown_falls_back_to_general() {
        assert_eq!(AnalysisType::parse("summary"), AnalysisType::General);
        assert_eq!(AnalysisType::parse(""), AnalysisType::General);
    }

    #[test]
    fn test_response_uses_camel_case_keys() {
        let body = serde_json::to_value(AnalyzeResponse {
            success: true,
            message: "Analysis completed successfully".to_string(),
            analysis: "Strong fit.".to_string(),
            analysis_type: "Review".to_string(),
        })
        .unwrap();
        assert_eq!(body["analysisType"], "Review");
        assert_eq!(body["success"], true);
    }
}
