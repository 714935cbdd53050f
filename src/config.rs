// Video Subtitle API configuration
//
// This module contains configuration structures and constants for the service.
// Values are filled in by the configuration validator from environment variables
// (optionally seeded from the TOML configuration file); the defaults live here.

use std::net::{IpAddr, Ipv4Addr};

/// Default values for configuration
pub mod defaults {
    // Server
    pub const HOST: &str = "127.0.0.1";
    pub const PORT: u16 = 8282;
    pub const TIMEOUT_SECONDS: u64 = 600;
    pub const KEEPALIVE_SECONDS: u64 = 75;
    pub const WORKERS: usize = 0;

    // Scratch root, one TempDir per request is created underneath
    pub const TEMP_DIR: &str = "/tmp/video_subtitle_api";

    // Upload limit (100MB)
    pub const MAX_FILE_SIZE: usize = 100 * 1024 * 1024;

    // Language spoken in the uploaded video when the request does not say
    pub const LANGUAGE: &str = "en";

    // Subtitles are rendered in Kurdish unless configured otherwise
    pub const TARGET_LANGUAGE: &str = "ku";

    // Accepted upload extensions
    pub const ALLOWED_EXTENSIONS: [&str; 5] = ["mp4", "avi", "mov", "mkv", "webm"];

    // Media tooling
    pub const FFMPEG_PATH: &str = "ffmpeg";
    pub const FFPROBE_PATH: &str = "ffprobe";
    pub const MEDIA_TIMEOUT_SECONDS: u64 = 600;
    pub const FONT_NAME: &str = "Noto Sans Arabic";
    pub const FONT_SIZE: u32 = 24;
    pub const PRIMARY_COLOUR: &str = "&H00FFFFFF";
    pub const OUTLINE_COLOUR: &str = "&H00000000";
    pub const VIDEO_CODEC: &str = "libx264";
    pub const VIDEO_CRF: u8 = 23;
    pub const VIDEO_PRESET: &str = "medium";

    // Cue end time used when the container duration cannot be probed
    pub const SUBTITLE_FALLBACK_SECONDS: u64 = 300;

    // Speech-to-text backend (OpenAI compatible transcription endpoint)
    pub const SPEECH_API_URL: &str = "http://127.0.0.1:8000/v1/audio/transcriptions";
    pub const SPEECH_MODEL: &str = "whisper-1";
    pub const SPEECH_TIMEOUT_SECONDS: u64 = 120;

    // Translation backend (LibreTranslate compatible endpoint)
    pub const TRANSLATION_API_URL: &str = "http://127.0.0.1:5000/translate";
    pub const TRANSLATION_TIMEOUT_SECONDS: u64 = 60;

    // Metrics
    pub const METRICS_ENABLED: bool = true;
    pub const METRICS_BACKEND: &str = "none";

    // Filename of the attachment returned to the caller
    pub const OUTPUT_FILENAME: &str = "translated_video.mp4";
}

/// HTTP server settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Client disconnect timeout in seconds
    pub timeout: u64,
    /// Keep-alive in seconds
    pub keepalive: u64,
    /// Number of HTTP workers (0 = number of CPU cores)
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: defaults::PORT,
            timeout: defaults::TIMEOUT_SECONDS,
            keepalive: defaults::KEEPALIVE_SECONDS,
            workers: defaults::WORKERS,
        }
    }
}

impl ServerConfig {
    /// Resolve the worker count, 0 meaning one worker per CPU core
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}

/// Configuration for the upload handlers
#[derive(Clone, Debug)]
pub struct HandlerConfig {
    /// Directory under which per-request scratch directories are created
    pub temp_dir: String,
    /// Maximum accepted upload size in bytes
    pub max_file_size: usize,
    /// Source language used when the request has no `lang`/`source_lang` field
    pub default_language: String,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            temp_dir: String::from(defaults::TEMP_DIR),
            max_file_size: defaults::MAX_FILE_SIZE,
            default_language: String::from(defaults::LANGUAGE),
        }
    }
}

impl HandlerConfig {
    /// Checks an extension (without the dot) against the allowed upload types
    pub fn is_allowed_extension(extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        defaults::ALLOWED_EXTENSIONS.contains(&extension.as_str())
    }

    /// Ensures the scratch root exists
    pub fn ensure_temp_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.temp_dir)
    }
}

/// Look of the burned-in subtitles, fixed per deployment
#[derive(Clone, Debug)]
pub struct SubtitleStyle {
    pub font_name: String,
    pub font_size: u32,
    pub primary_colour: String,
    pub outline_colour: String,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_name: String::from(defaults::FONT_NAME),
            font_size: defaults::FONT_SIZE,
            primary_colour: String::from(defaults::PRIMARY_COLOUR),
            outline_colour: String::from(defaults::OUTLINE_COLOUR),
        }
    }
}

impl SubtitleStyle {
    /// Renders the style as an ASS `force_style` value
    pub fn force_style(&self) -> String {
        format!(
            "FontName={},FontSize={},PrimaryColour={},OutlineColour={}",
            self.font_name, self.font_size, self.primary_colour, self.outline_colour
        )
    }
}

/// Video encoder settings used when burning subtitles
#[derive(Clone, Debug)]
pub struct EncoderSettings {
    pub codec: String,
    pub crf: u8,
    pub preset: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            codec: String::from(defaults::VIDEO_CODEC),
            crf: defaults::VIDEO_CRF,
            preset: String::from(defaults::VIDEO_PRESET),
        }
    }
}

/// Configuration for the ffmpeg/ffprobe media tool
#[derive(Clone, Debug)]
pub struct MediaConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// Upper bound for a single ffmpeg/ffprobe invocation
    pub timeout_seconds: u64,
    pub style: SubtitleStyle,
    pub encoder: EncoderSettings,
    /// Cue end time when the video duration cannot be probed
    pub fallback_duration_seconds: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: String::from(defaults::FFMPEG_PATH),
            ffprobe_path: String::from(defaults::FFPROBE_PATH),
            timeout_seconds: defaults::MEDIA_TIMEOUT_SECONDS,
            style: SubtitleStyle::default(),
            encoder: EncoderSettings::default(),
            fallback_duration_seconds: defaults::SUBTITLE_FALLBACK_SECONDS,
        }
    }
}

/// Configuration for the remote speech-to-text service
#[derive(Clone, Debug)]
pub struct SpeechConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_url: String::from(defaults::SPEECH_API_URL),
            api_key: None,
            model: String::from(defaults::SPEECH_MODEL),
            timeout_seconds: defaults::SPEECH_TIMEOUT_SECONDS,
        }
    }
}

/// Configuration for the remote translation service
#[derive(Clone, Debug)]
pub struct TranslationConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub target_language: String,
    pub timeout_seconds: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            api_url: String::from(defaults::TRANSLATION_API_URL),
            api_key: None,
            target_language: String::from(defaults::TARGET_LANGUAGE),
            timeout_seconds: defaults::TRANSLATION_TIMEOUT_SECONDS,
        }
    }
}

/// Configuration for metrics collection and export
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Type of metrics exporter ("prometheus", "none")
    pub backend: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::METRICS_ENABLED,
            backend: String::from(defaults::METRICS_BACKEND),
        }
    }
}

impl MetricsConfig {
    /// Exporter type actually in effect once the enable flag is applied
    pub fn exporter_type(&self) -> &str {
        if self.enabled {
            &self.backend
        } else {
            "disabled"
        }
    }
}

/// Complete, validated application configuration
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub handler: HandlerConfig,
    pub media: MediaConfig,
    pub speech: SpeechConfig,
    pub translation: TranslationConfig,
    pub metrics: MetricsConfig,
}
