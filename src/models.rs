// Video Subtitle API data models
//
// Request parameters and response bodies shared by the handlers.

use serde::Serialize;

/// Error response for API
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always false, kept so clients can branch on a single field
    pub success: bool,
    /// Error message
    pub error: String,
    /// Machine readable error classification
    pub kind: String,
}

/// Request parameters for a translation run
#[derive(Debug, Clone)]
pub struct TranslateParams {
    /// Language spoken in the video (e.g., "en", "en-US")
    pub source_language: String,
    /// Sanitized name of the uploaded file
    pub filename: String,
    /// Size of the uploaded file in bytes
    pub file_size: usize,
}

/// Body of `GET /`
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: Vec<&'static str>,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: "Upload a video (multipart field 'file', optional 'lang'); \
                          the speech is transcribed, translated and burned into the video as subtitles",
            endpoints: vec![
                "GET /",
                "POST /api/translate",
                "POST /upload",
                "GET /metrics",
            ],
        }
    }
}

/// Checks that a language code looks like `en`, `ckb` or `en-US`
pub fn is_valid_language_code(code: &str) -> bool {
    let mut parts = code.splitn(2, '-');
    let primary = parts.next().unwrap_or_default();
    if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    match parts.next() {
        None => true,
        Some(region) => {
            (2..=4).contains(&region.len()) && region.chars().all(|c| c.is_ascii_alphanumeric())
        }
    }
}

/// Primary subtag of a language code (`en-US` -> `en`)
pub fn primary_language(code: &str) -> &str {
    code.split('-').next().unwrap_or(code)
}
