// Translation client
//
// Talks to a LibreTranslate compatible `/translate` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TranslationConfig;
use crate::models::primary_language;

#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("Translation request failed: {0}")]
    Request(String),

    #[error("Translation service returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Invalid translation response: {0}")]
    InvalidResponse(String),

    #[error("Translation service returned an empty translation")]
    Empty,
}

/// Remote translation service
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError>;
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

pub struct HttpTranslator {
    client: Client,
    config: TranslationConfig,
}

impl HttpTranslator {
    pub fn new(config: TranslationConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        let request = TranslateRequest {
            q: text,
            source: primary_language(source),
            target,
            format: "text",
            api_key: self.config.api_key.as_deref(),
        };
        debug!(
            "Translating {} characters {} -> {} via {}",
            text.chars().count(),
            request.source,
            target,
            self.config.api_url
        );

        let response = self
            .client
            .post(&self.config.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| TranslationError::Request(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TranslationError::Request(e.to_string()))?;

        let translated = interpret_response(status, &body)?;
        info!("Translation to {} completed", target);
        Ok(translated)
    }
}

pub fn interpret_response(status: StatusCode, body: &str) -> Result<String, TranslationError> {
    if !status.is_success() {
        return Err(TranslationError::Status {
            status,
            body: body.trim().to_string(),
        });
    }

    let parsed: TranslateResponse = serde_json::from_str(body)
        .map_err(|e| TranslationError::InvalidResponse(e.to_string()))?;
    let translated = parsed.translated_text.trim();
    if translated.is_empty() {
        return Err(TranslationError::Empty);
    }
    Ok(translated.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = TranslateRequest {
            q: "hello world",
            source: "en",
            target: "ku",
            format: "text",
            api_key: None,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"q": "hello world", "source": "en", "target": "ku", "format": "text"})
        );
    }

    #[test]
    fn test_translated_text_is_extracted() {
        let text =
            interpret_response(StatusCode::OK, r#"{"translatedText": "سڵاو جیهان"}"#).unwrap();
        assert_eq!(text, "سڵاو جیهان");
    }

    #[test]
    fn test_failures() {
        assert!(matches!(
            interpret_response(StatusCode::BAD_REQUEST, "{\"error\":\"ku is not supported\"}"),
            Err(TranslationError::Status { .. })
        ));
        assert!(matches!(
            interpret_response(StatusCode::OK, "{}"),
            Err(TranslationError::InvalidResponse(_))
        ));
        assert!(matches!(
            interpret_response(StatusCode::OK, r#"{"translatedText": ""}"#),
            Err(TranslationError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_request_error() {
        let translator = HttpTranslator::new(TranslationConfig {
            api_url: "http://127.0.0.1:1/translate".to_string(),
            timeout_seconds: 5,
            ..TranslationConfig::default()
        })
        .unwrap();
        let err = translator
            .translate("hello", "en-US", "ku")
            .await
            .unwrap_err();
        assert!(matches!(err, TranslationError::Request(_)));
    }
}
