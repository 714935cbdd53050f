// Speech-to-text client
//
// Talks to an OpenAI compatible `/v1/audio/transcriptions` endpoint
// (whisper.cpp server, faster-whisper-server, OpenAI itself, ...).

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::config::SpeechConfig;
use crate::models::primary_language;

#[derive(Error, Debug)]
pub enum SpeechError {
    /// The backend answered but found no intelligible speech
    #[error("Speech could not be recognized")]
    Unrecognized,

    /// The backend could not be reached or answered with an error
    #[error("Speech recognition service unavailable: {0}")]
    Unreachable(String),

    /// The extracted audio could not be read
    #[error("Failed to read audio: {0}")]
    Audio(#[from] std::io::Error),
}

/// Remote speech recognition service
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Recognize the speech in `audio` (mono 16kHz WAV) spoken in `language`
    async fn recognize(&self, audio: &Path, language: &str) -> Result<String, SpeechError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

pub struct HttpSpeechRecognizer {
    client: Client,
    config: SpeechConfig,
}

impl HttpSpeechRecognizer {
    pub fn new(config: SpeechConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl SpeechRecognizer for HttpSpeechRecognizer {
    async fn recognize(&self, audio: &Path, language: &str) -> Result<String, SpeechError> {
        let bytes = tokio::fs::read(audio).await?;
        debug!(
            "Sending {} bytes of audio to {} (language {})",
            bytes.len(),
            self.config.api_url,
            language
        );

        let part = Part::bytes(bytes)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| SpeechError::Unreachable(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("language", primary_language(language).to_string())
            .text("response_format", "json");

        let mut request = self.client.post(&self.config.api_url).multipart(form);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SpeechError::Unreachable(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SpeechError::Unreachable(e.to_string()))?;

        let text = interpret_response(status, &body)?;
        info!("Recognized {} characters of speech", text.chars().count());
        Ok(text)
    }
}

/// Turn a transcription endpoint reply into text or a classified failure
pub fn interpret_response(status: StatusCode, body: &str) -> Result<String, SpeechError> {
    if status == StatusCode::UNPROCESSABLE_ENTITY {
        return Err(SpeechError::Unrecognized);
    }
    if !status.is_success() {
        return Err(SpeechError::Unreachable(format!(
            "HTTP {}: {}",
            status,
            body.trim()
        )));
    }

    let parsed: TranscriptionResponse = serde_json::from_str(body)
        .map_err(|e| SpeechError::Unreachable(format!("invalid response body: {}", e)))?;
    let text = parsed.text.trim();
    if text.is_empty() {
        return Err(SpeechError::Unrecognized);
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_trimmed() {
        let text = interpret_response(StatusCode::OK, r#"{"text": "  hello world "}"#).unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn test_empty_text_is_unrecognized() {
        let err = interpret_response(StatusCode::OK, r#"{"text": "   "}"#).unwrap_err();
        assert!(matches!(err, SpeechError::Unrecognized));
    }

    #[test]
    fn test_unprocessable_audio_is_unrecognized() {
        let err = interpret_response(StatusCode::UNPROCESSABLE_ENTITY, "no speech").unwrap_err();
        assert!(matches!(err, SpeechError::Unrecognized));
    }

    #[test]
    fn test_backend_errors_are_unreachable() {
        let err = interpret_response(StatusCode::BAD_GATEWAY, "upstream down").unwrap_err();
        assert!(matches!(err, SpeechError::Unreachable(ref m) if m.contains("upstream down")));

        let err = interpret_response(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, SpeechError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("audio.wav");
        std::fs::write(&audio, b"RIFF").unwrap();

        let recognizer = HttpSpeechRecognizer::new(SpeechConfig {
            api_url: "http://127.0.0.1:1/v1/audio/transcriptions".to_string(),
            timeout_seconds: 5,
            ..SpeechConfig::default()
        })
        .unwrap();
        let err = recognizer.recognize(&audio, "en").await.unwrap_err();
        assert!(matches!(err, SpeechError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_missing_audio_is_an_audio_error() {
        let recognizer = HttpSpeechRecognizer::new(SpeechConfig::default()).unwrap();
        let err = recognizer
            .recognize(Path::new("/nonexistent/audio.wav"), "en")
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::Audio(_)));
    }
}
