// Error handling for the Video Subtitle API
//
// PipelineError is what every pipeline stage returns; ApiError is what the
// handlers return. The ResponseError impl on ApiError is the only place where
// error classes are turned into HTTP status codes.

use std::fmt;
use std::io;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::config::defaults;
use crate::models::ErrorResponse;
use crate::pipeline::Stage;

/// Classification of every failure the service can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    AudioExtractionFailed,
    UnrecognizedSpeech,
    ServiceUnreachable,
    TranslationFailed,
    MuxFailed,
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid-input",
            ErrorKind::AudioExtractionFailed => "audio-extraction-failed",
            ErrorKind::UnrecognizedSpeech => "unrecognized-speech",
            ErrorKind::ServiceUnreachable => "service-unreachable",
            ErrorKind::TranslationFailed => "translation-failed",
            ErrorKind::MuxFailed => "mux-failed",
            ErrorKind::Unexpected => "unexpected",
        }
    }

    /// Whether the fault lies with the uploaded input rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(self, ErrorKind::InvalidInput | ErrorKind::UnrecognizedSpeech)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one pipeline stage
#[derive(Error, Debug)]
#[error("{message}")]
pub struct PipelineError {
    pub kind: ErrorKind,
    pub stage: Stage,
    pub message: String,
}

impl PipelineError {
    pub fn new<S: Into<String>>(kind: ErrorKind, stage: Stage, message: S) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
        }
    }
}

/// Errors returned by the HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// Error when processing multipart form data
    #[error("Form error: {0}")]
    FormError(String),

    /// Request has no `file` field
    #[error("No file part")]
    NoFile,

    /// `file` field present but without a filename
    #[error("No selected file")]
    EmptyFilename,

    /// Extension outside the allowed set
    #[error("Invalid file type '{0}'. Allowed types are: {allowed}", allowed = defaults::ALLOWED_EXTENSIONS.join(", "))]
    InvalidFileType(String),

    /// Malformed language code
    #[error("Invalid language code: {0}")]
    InvalidLanguage(String),

    /// Error when a file is too large
    #[error("File too large: {0} bytes exceeds limit of {1} bytes")]
    FileTooLarge(usize, usize),

    /// Error when saving or reading scratch files
    #[error("File error: {0}")]
    FileError(#[from] io::Error),

    /// A pipeline stage failed
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    /// Create a new FormError
    pub fn form_error<S: Into<String>>(msg: S) -> Self {
        Self::FormError(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::FormError(_)
            | ApiError::NoFile
            | ApiError::EmptyFilename
            | ApiError::InvalidFileType(_)
            | ApiError::InvalidLanguage(_)
            | ApiError::FileTooLarge(_, _) => ErrorKind::InvalidInput,
            ApiError::FileError(_) => ErrorKind::Unexpected,
            ApiError::Pipeline(e) => e.kind,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::FileTooLarge(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
            _ if self.kind().is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            success: false,
            error: self.to_string(),
            kind: self.kind().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_bad_requests() {
        assert_eq!(ApiError::NoFile.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::EmptyFilename.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidFileType("exe".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::FileTooLarge(10, 5).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_pipeline_errors_map_by_kind() {
        let cases = [
            (ErrorKind::AudioExtractionFailed, StatusCode::INTERNAL_SERVER_ERROR),
            (ErrorKind::UnrecognizedSpeech, StatusCode::BAD_REQUEST),
            (ErrorKind::ServiceUnreachable, StatusCode::INTERNAL_SERVER_ERROR),
            (ErrorKind::TranslationFailed, StatusCode::INTERNAL_SERVER_ERROR),
            (ErrorKind::MuxFailed, StatusCode::INTERNAL_SERVER_ERROR),
            (ErrorKind::Unexpected, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (kind, status) in cases {
            let err = ApiError::from(PipelineError::new(kind, Stage::Transcribe, "boom"));
            assert_eq!(err.status_code(), status, "{}", kind);
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn test_invalid_file_type_message_lists_allowed_types() {
        let message = ApiError::InvalidFileType("exe".into()).to_string();
        assert!(message.contains("'exe'"));
        assert!(message.contains("mp4, avi, mov, mkv, webm"));
    }
}
