// Video Subtitle API Library
//
// This crate provides an HTTP API that burns translated subtitles into uploaded videos.
// Each request runs a synchronous pipeline: ffmpeg audio extraction, remote speech
// recognition, remote translation, SRT generation and ffmpeg subtitle burn-in.

pub mod config;
pub mod config_loader;
pub mod config_validator;
pub mod error;
pub mod file_utils;
pub mod handlers;
pub mod media;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod speech;
pub mod subtitle;
#[cfg(test)]
mod testing;
pub mod translate;

// Re-export common types for easier access
pub use config::{AppConfig, HandlerConfig, MetricsConfig};
pub use error::{ApiError, ErrorKind, PipelineError};
pub use handlers::configure;
pub use media::{FfmpegTool, MediaTool};
pub use metrics::{create_metrics_exporter, Metrics};
pub use models::{ErrorResponse, ServiceInfo};
pub use pipeline::{Pipeline, RequestLifecycle, RequestState, Stage};
pub use speech::{HttpSpeechRecognizer, SpeechRecognizer};
pub use subtitle::{SubtitleCue, SubtitleTimestamp, SubtitleTrack};
pub use translate::{HttpTranslator, Translator};
