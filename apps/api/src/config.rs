use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: String,
    /// Directory holding the poppler binaries. `None` resolves `pdftoppm` on `PATH`.
    pub poppler_path: Option<PathBuf>,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub upload_dir: PathBuf,
    pub temp_dir: PathBuf,
    /// Longest edge of the rasterized page, in pixels.
    pub render_scale_px: u32,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            google_api_key: require_env("GOOGLE_API_KEY")?,
            poppler_path: optional_env("POPPLER_PATH").map(PathBuf::from),
            gemini_model: optional_env("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_base: optional_env("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            upload_dir: optional_env("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            temp_dir: optional_env("TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("temp")),
            render_scale_px: std::env::var("RENDER_SCALE_PX")
                .unwrap_or_else(|_| "1024".to_string())
                .parse::<u32>()
                .context("RENDER_SCALE_PX must be a positive integer")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Full path of the `pdftoppm` executable.
    pub fn pdftoppm_binary(&self) -> PathBuf {
        match &self.poppler_path {
            Some(dir) => dir.join("pdftoppm"),
            None => PathBuf::from("pdftoppm"),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_poppler(poppler_path: Option<PathBuf>) -> Config {
        Config {
            google_api_key: "key".to_string(),
            poppler_path,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            upload_dir: PathBuf::from("uploads"),
            temp_dir: PathBuf::from("temp"),
            render_scale_px: 1024,
            port: 5000,
            rust_log: "info".to_string(),
        }
    }

    #[test]
    fn test_pdftoppm_resolved_on_path_by_default() {
        let config = config_with_poppler(None);
        assert_eq!(config.pdftoppm_binary(), PathBuf::from("pdftoppm"));
    }

    #[test]
    fn test_pdftoppm_joined_onto_poppler_path() {
        let config = config_with_poppler(Some(PathBuf::from("/opt/poppler/bin")));
        assert_eq!(
            config.pdftoppm_binary(),
            PathBuf::from("/opt/poppler/bin/pdftoppm")
        );
    }
}
