// Configuration validation module for the Video Subtitle API
//
// Every configuration parameter is declared once in CONFIG_PARAMS with its type,
// default, range and severity. The validator walks that registry, reports all
// problems in one pass and produces a typed AppConfig.

use std::env;
use std::net::IpAddr;
use std::str::FromStr;

use log::{error, info, warn};

use crate::config::{defaults, AppConfig};
use crate::models::is_valid_language_code;

/// Configuration parameter types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigType {
    String,
    /// Optional string whose value must never be echoed back (API keys)
    Secret,
    UnsignedInteger,
    Boolean,
    IpAddress,
    Port,
    Url,
    LanguageCode,
    Enum(&'static [&'static str]),
}

/// Validation severity levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidationLevel {
    Critical, // Must be valid for application to start
    Standard, // Important, invalid values still abort start-up
    Warning,  // Optional, generates warnings only
}

/// Configuration parameter definition
#[derive(Debug, Clone)]
pub struct ConfigParam {
    pub name: &'static str,
    pub description: &'static str,
    pub param_type: ConfigType,
    pub default_value: Option<&'static str>,
    pub validation_level: ValidationLevel,
    pub min_value: Option<u64>,
    pub max_value: Option<u64>,
}

impl ConfigParam {
    const fn new(
        name: &'static str,
        description: &'static str,
        param_type: ConfigType,
        default_value: Option<&'static str>,
        validation_level: ValidationLevel,
    ) -> Self {
        Self {
            name,
            description,
            param_type,
            default_value,
            validation_level,
            min_value: None,
            max_value: None,
        }
    }

    const fn range(mut self, min: u64, max: u64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }
}

/// Centralized configuration parameter registry
pub const CONFIG_PARAMS: &[ConfigParam] = &[
    // Server Configuration
    ConfigParam::new(
        "API_HOST",
        "Host IP address for the API server",
        ConfigType::IpAddress,
        Some(defaults::HOST),
        ValidationLevel::Critical,
    ),
    ConfigParam::new(
        "API_PORT",
        "Port for the API server",
        ConfigType::Port,
        Some("8282"),
        ValidationLevel::Critical,
    ),
    ConfigParam::new(
        "API_TIMEOUT",
        "Client disconnect timeout in seconds",
        ConfigType::UnsignedInteger,
        Some("600"),
        ValidationLevel::Standard,
    )
    .range(1, 3600),
    ConfigParam::new(
        "API_KEEPALIVE",
        "Keep-alive timeout in seconds",
        ConfigType::UnsignedInteger,
        Some("75"),
        ValidationLevel::Standard,
    )
    .range(1, 3600),
    ConfigParam::new(
        "HTTP_WORKER_NUMBER",
        "Number of HTTP workers (0 = use CPU cores)",
        ConfigType::UnsignedInteger,
        Some("0"),
        ValidationLevel::Standard,
    )
    .range(0, 64),
    // Upload Configuration
    ConfigParam::new(
        "TMP_DIR",
        "Directory under which per-request scratch directories are created",
        ConfigType::String,
        Some(defaults::TEMP_DIR),
        ValidationLevel::Critical,
    ),
    ConfigParam::new(
        "MAX_FILE_SIZE",
        "Maximum upload size in bytes",
        ConfigType::UnsignedInteger,
        Some("104857600"),
        ValidationLevel::Standard,
    )
    .range(1024, 10 * 1024 * 1024 * 1024),
    ConfigParam::new(
        "DEFAULT_LANGUAGE",
        "Source language used when the request does not provide one",
        ConfigType::LanguageCode,
        Some(defaults::LANGUAGE),
        ValidationLevel::Standard,
    ),
    // Media Configuration
    ConfigParam::new(
        "FFMPEG_PATH",
        "ffmpeg executable (name on PATH or absolute path)",
        ConfigType::String,
        Some(defaults::FFMPEG_PATH),
        ValidationLevel::Critical,
    ),
    ConfigParam::new(
        "FFPROBE_PATH",
        "ffprobe executable (name on PATH or absolute path)",
        ConfigType::String,
        Some(defaults::FFPROBE_PATH),
        ValidationLevel::Standard,
    ),
    ConfigParam::new(
        "MEDIA_TIMEOUT_SECONDS",
        "Timeout for a single ffmpeg/ffprobe invocation",
        ConfigType::UnsignedInteger,
        Some("600"),
        ValidationLevel::Standard,
    )
    .range(1, 7200),
    ConfigParam::new(
        "SUBTITLE_FONT_NAME",
        "Font family of the burned-in subtitles",
        ConfigType::String,
        Some(defaults::FONT_NAME),
        ValidationLevel::Warning,
    ),
    ConfigParam::new(
        "SUBTITLE_FONT_SIZE",
        "Font size of the burned-in subtitles",
        ConfigType::UnsignedInteger,
        Some("24"),
        ValidationLevel::Warning,
    )
    .range(6, 200),
    ConfigParam::new(
        "SUBTITLE_PRIMARY_COLOUR",
        "ASS primary colour (&HAABBGGRR)",
        ConfigType::String,
        Some(defaults::PRIMARY_COLOUR),
        ValidationLevel::Warning,
    ),
    ConfigParam::new(
        "SUBTITLE_OUTLINE_COLOUR",
        "ASS outline colour (&HAABBGGRR)",
        ConfigType::String,
        Some(defaults::OUTLINE_COLOUR),
        ValidationLevel::Warning,
    ),
    ConfigParam::new(
        "VIDEO_CODEC",
        "Video encoder used when burning subtitles",
        ConfigType::String,
        Some(defaults::VIDEO_CODEC),
        ValidationLevel::Standard,
    ),
    ConfigParam::new(
        "VIDEO_CRF",
        "Constant rate factor for the video encoder",
        ConfigType::UnsignedInteger,
        Some("23"),
        ValidationLevel::Standard,
    )
    .range(0, 51),
    ConfigParam::new(
        "VIDEO_PRESET",
        "Encoder speed preset",
        ConfigType::Enum(&[
            "ultrafast",
            "superfast",
            "veryfast",
            "faster",
            "fast",
            "medium",
            "slow",
            "slower",
            "veryslow",
        ]),
        Some(defaults::VIDEO_PRESET),
        ValidationLevel::Standard,
    ),
    ConfigParam::new(
        "SUBTITLE_FALLBACK_SECONDS",
        "Cue end time used when the video duration cannot be probed",
        ConfigType::UnsignedInteger,
        Some("300"),
        ValidationLevel::Standard,
    )
    .range(1, 86400),
    // Speech Configuration
    ConfigParam::new(
        "SPEECH_API_URL",
        "Speech-to-text endpoint (OpenAI compatible transcriptions API)",
        ConfigType::Url,
        Some(defaults::SPEECH_API_URL),
        ValidationLevel::Critical,
    ),
    ConfigParam::new(
        "SPEECH_API_KEY",
        "Bearer token for the speech-to-text endpoint",
        ConfigType::Secret,
        None,
        ValidationLevel::Warning,
    ),
    ConfigParam::new(
        "SPEECH_MODEL",
        "Model name sent to the speech-to-text endpoint",
        ConfigType::String,
        Some(defaults::SPEECH_MODEL),
        ValidationLevel::Warning,
    ),
    ConfigParam::new(
        "SPEECH_TIMEOUT_SECONDS",
        "Timeout for a speech-to-text request",
        ConfigType::UnsignedInteger,
        Some("120"),
        ValidationLevel::Standard,
    )
    .range(1, 3600),
    // Translation Configuration
    ConfigParam::new(
        "TARGET_LANGUAGE",
        "Language the subtitles are translated into",
        ConfigType::LanguageCode,
        Some(defaults::TARGET_LANGUAGE),
        ValidationLevel::Standard,
    ),
    ConfigParam::new(
        "TRANSLATION_API_URL",
        "Translation endpoint (LibreTranslate compatible API)",
        ConfigType::Url,
        Some(defaults::TRANSLATION_API_URL),
        ValidationLevel::Critical,
    ),
    ConfigParam::new(
        "TRANSLATION_API_KEY",
        "API key for the translation endpoint",
        ConfigType::Secret,
        None,
        ValidationLevel::Warning,
    ),
    ConfigParam::new(
        "TRANSLATION_TIMEOUT_SECONDS",
        "Timeout for a translation request",
        ConfigType::UnsignedInteger,
        Some("60"),
        ValidationLevel::Standard,
    )
    .range(1, 3600),
    // Metrics Configuration
    ConfigParam::new(
        "METRICS_ENABLED",
        "Enable metrics collection",
        ConfigType::Boolean,
        Some("true"),
        ValidationLevel::Standard,
    ),
    ConfigParam::new(
        "METRICS_BACKEND",
        "Metrics backend type",
        ConfigType::Enum(&["prometheus", "none", "disabled"]),
        Some(defaults::METRICS_BACKEND),
        ValidationLevel::Standard,
    ),
];

/// Configuration validation errors with detailed context
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub value: String,
    pub error_type: ConfigErrorType,
    pub message: String,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigErrorType {
    InvalidValue,
    InvalidFormat,
    InvalidRange,
}

impl ConfigValidationError {
    fn new(
        field: &str,
        value: &str,
        error_type: ConfigErrorType,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
            error_type,
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Configuration error in '{}' ({:?}): {} (value: '{}')",
            self.field, self.error_type, self.message, self.value
        )?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " - Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result type for configuration validation
pub type ValidationResult<T> = Result<T, ConfigValidationError>;

/// Configuration validation results
#[derive(Debug, Default)]
pub struct ValidationResults {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ConfigValidationError) {
        self.warnings.push(warning);
    }

    fn add(&mut self, level: ValidationLevel, error: ConfigValidationError) {
        match level {
            ValidationLevel::Critical | ValidationLevel::Standard => self.add_error(error),
            ValidationLevel::Warning => self.add_warning(error),
        }
    }

    pub fn print_summary(&self) {
        if !self.errors.is_empty() {
            error!(
                "Configuration validation found {} error(s):",
                self.errors.len()
            );
            for (i, err) in self.errors.iter().enumerate() {
                error!("  {}. {}", i + 1, err);
            }
        }

        if !self.warnings.is_empty() {
            warn!(
                "Configuration validation found {} warning(s):",
                self.warnings.len()
            );
            for (i, warning) in self.warnings.iter().enumerate() {
                warn!("  {}. {}", i + 1, warning);
            }
        }

        if self.is_valid() && self.warnings.is_empty() {
            info!("Configuration validation passed successfully");
        } else if self.is_valid() {
            info!(
                "Configuration validation passed with {} warning(s)",
                self.warnings.len()
            );
        }
    }
}

/// Helper functions for common validation patterns
pub mod validators {
    use super::*;

    /// Validate boolean values from string
    pub fn validate_boolean(field: &str, value: &str) -> ValidationResult<bool> {
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidValue,
                "Invalid boolean value",
                "Use 'true' or 'false'",
            )),
        }
    }

    /// Validate unsigned integer values with optional range
    pub fn validate_unsigned(
        field: &str,
        value: &str,
        min: Option<u64>,
        max: Option<u64>,
    ) -> ValidationResult<u64> {
        let parsed = value.parse::<u64>().map_err(|_| {
            ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid unsigned integer format",
                "Use a valid positive integer number",
            )
        })?;

        if let Some(min) = min {
            if parsed < min {
                return Err(ConfigValidationError::new(
                    field,
                    value,
                    ConfigErrorType::InvalidRange,
                    format!("Value {} is below minimum {}", parsed, min),
                    format!("Use a value >= {}", min),
                ));
            }
        }

        if let Some(max) = max {
            if parsed > max {
                return Err(ConfigValidationError::new(
                    field,
                    value,
                    ConfigErrorType::InvalidRange,
                    format!("Value {} is above maximum {}", parsed, max),
                    format!("Use a value <= {}", max),
                ));
            }
        }

        Ok(parsed)
    }

    /// Validate enumerated values (case-insensitive)
    pub fn validate_enum(
        field: &str,
        value: &str,
        valid_values: &[&str],
    ) -> ValidationResult<String> {
        let lowered = value.to_lowercase();
        if valid_values.iter().any(|v| v.to_lowercase() == lowered) {
            Ok(lowered)
        } else {
            Err(ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidValue,
                format!("Invalid value, must be one of: {}", valid_values.join(", ")),
                format!("Use one of: {}", valid_values.join(", ")),
            ))
        }
    }

    /// Validate IP address
    pub fn validate_ip_address(field: &str, value: &str) -> ValidationResult<IpAddr> {
        IpAddr::from_str(value).map_err(|_| {
            ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid IP address format",
                "Use a valid IPv4 or IPv6 address (e.g., 127.0.0.1 or ::1)",
            )
        })
    }

    /// Validate port number
    pub fn validate_port(field: &str, value: &str) -> ValidationResult<u16> {
        let port = value.parse::<u16>().map_err(|_| {
            ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid port number format",
                "Use a number between 1 and 65535",
            )
        })?;

        if port == 0 {
            return Err(ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidRange,
                "Port number cannot be 0",
                "Use a port between 1 and 65535",
            ));
        }

        Ok(port)
    }

    /// Validate an http(s) URL
    pub fn validate_url(field: &str, value: &str) -> ValidationResult<String> {
        let parsed = reqwest::Url::parse(value).map_err(|e| {
            ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                format!("Invalid URL: {}", e),
                "Use an absolute URL such as http://127.0.0.1:5000/translate",
            )
        })?;

        match parsed.scheme() {
            "http" | "https" => Ok(value.to_string()),
            scheme => Err(ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidValue,
                format!("Unsupported URL scheme '{}'", scheme),
                "Use an http:// or https:// URL",
            )),
        }
    }

    /// Validate a language code such as `en`, `ckb` or `en-US`
    pub fn validate_language_code(field: &str, value: &str) -> ValidationResult<String> {
        if is_valid_language_code(value) {
            Ok(value.to_string())
        } else {
            Err(ConfigValidationError::new(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid language code",
                "Use an ISO 639 code, optionally with a region (e.g., en, ku, en-US)",
            ))
        }
    }
}

/// Helper function to get optional environment variable
pub fn get_env_optional(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Configuration validator for the Video Subtitle API
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate all parameters from the environment and return the typed configuration
    pub fn validate_and_load() -> Result<AppConfig, ValidationResults> {
        info!("Starting configuration validation...");
        let (config, results) = Self::validate_with(get_env_optional);
        results.print_summary();

        if results.is_valid() {
            Ok(config)
        } else {
            Err(results)
        }
    }

    /// Validate all parameters using an arbitrary lookup for raw values
    pub fn validate_with<F>(lookup: F) -> (AppConfig, ValidationResults)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut results = ValidationResults::new();
        let mut config = AppConfig::default();

        for param in CONFIG_PARAMS {
            let value = lookup(param.name)
                .map(|v| v.trim().to_string())
                .or_else(|| param.default_value.map(String::from))
                .unwrap_or_default();

            // Only optional secrets have no default
            if value.is_empty() {
                continue;
            }

            if let Err(error) = Self::validate_and_store_parameter(param, &value, &mut config) {
                results.add(param.validation_level, error);
            }
        }

        Self::validate_cross_dependencies(&mut results, &config);

        (config, results)
    }

    /// Validate a single parameter and store its value in the config struct
    fn validate_and_store_parameter(
        param: &ConfigParam,
        value: &str,
        config: &mut AppConfig,
    ) -> ValidationResult<()> {
        match param.param_type {
            ConfigType::String => {
                let value = value.to_string();
                match param.name {
                    "TMP_DIR" => config.handler.temp_dir = value,
                    "FFMPEG_PATH" => config.media.ffmpeg_path = value,
                    "FFPROBE_PATH" => config.media.ffprobe_path = value,
                    "SUBTITLE_FONT_NAME" => config.media.style.font_name = value,
                    "SUBTITLE_PRIMARY_COLOUR" => config.media.style.primary_colour = value,
                    "SUBTITLE_OUTLINE_COLOUR" => config.media.style.outline_colour = value,
                    "VIDEO_CODEC" => config.media.encoder.codec = value,
                    "SPEECH_MODEL" => config.speech.model = value,
                    _ => {}
                }
            }
            ConfigType::Secret => match param.name {
                "SPEECH_API_KEY" => config.speech.api_key = Some(value.to_string()),
                "TRANSLATION_API_KEY" => config.translation.api_key = Some(value.to_string()),
                _ => {}
            },
            ConfigType::UnsignedInteger => {
                let parsed = validators::validate_unsigned(
                    param.name,
                    value,
                    param.min_value,
                    param.max_value,
                )?;
                match param.name {
                    "API_TIMEOUT" => config.server.timeout = parsed,
                    "API_KEEPALIVE" => config.server.keepalive = parsed,
                    "HTTP_WORKER_NUMBER" => config.server.workers = parsed as usize,
                    "MAX_FILE_SIZE" => config.handler.max_file_size = parsed as usize,
                    "MEDIA_TIMEOUT_SECONDS" => config.media.timeout_seconds = parsed,
                    "SUBTITLE_FONT_SIZE" => config.media.style.font_size = parsed as u32,
                    "VIDEO_CRF" => config.media.encoder.crf = parsed as u8,
                    "SUBTITLE_FALLBACK_SECONDS" => {
                        config.media.fallback_duration_seconds = parsed
                    }
                    "SPEECH_TIMEOUT_SECONDS" => config.speech.timeout_seconds = parsed,
                    "TRANSLATION_TIMEOUT_SECONDS" => config.translation.timeout_seconds = parsed,
                    _ => {}
                }
            }
            ConfigType::Boolean => {
                let parsed = validators::validate_boolean(param.name, value)?;
                if param.name == "METRICS_ENABLED" {
                    config.metrics.enabled = parsed;
                }
            }
            ConfigType::IpAddress => {
                let parsed = validators::validate_ip_address(param.name, value)?;
                if param.name == "API_HOST" {
                    config.server.host = parsed;
                }
            }
            ConfigType::Port => {
                let parsed = validators::validate_port(param.name, value)?;
                if param.name == "API_PORT" {
                    config.server.port = parsed;
                }
            }
            ConfigType::Url => {
                let parsed = validators::validate_url(param.name, value)?;
                match param.name {
                    "SPEECH_API_URL" => config.speech.api_url = parsed,
                    "TRANSLATION_API_URL" => config.translation.api_url = parsed,
                    _ => {}
                }
            }
            ConfigType::LanguageCode => {
                let parsed = validators::validate_language_code(param.name, value)?;
                match param.name {
                    "DEFAULT_LANGUAGE" => config.handler.default_language = parsed,
                    "TARGET_LANGUAGE" => config.translation.target_language = parsed,
                    _ => {}
                }
            }
            ConfigType::Enum(valid_values) => {
                let parsed = validators::validate_enum(param.name, value, valid_values)?;
                match param.name {
                    "VIDEO_PRESET" => config.media.encoder.preset = parsed,
                    "METRICS_BACKEND" => config.metrics.backend = parsed,
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Validate cross-parameter dependencies
    fn validate_cross_dependencies(results: &mut ValidationResults, config: &AppConfig) {
        let source = config.handler.default_language.split('-').next();
        let target = config.translation.target_language.split('-').next();
        if source.is_some() && source == target {
            results.add_warning(ConfigValidationError::new(
                "TARGET_LANGUAGE",
                &config.translation.target_language,
                ConfigErrorType::InvalidValue,
                "Target language equals the default source language",
                "Requests without an explicit language will be translated into themselves",
            ));
        }

        if !config.metrics.enabled && config.metrics.backend == "prometheus" {
            results.add_warning(ConfigValidationError::new(
                "METRICS_BACKEND",
                &config.metrics.backend,
                ConfigErrorType::InvalidValue,
                "METRICS_BACKEND is set but METRICS_ENABLED is false",
                "Either enable metrics or set METRICS_BACKEND to none",
            ));
        }
    }
}

/// Documentation and configuration generation utilities
impl ConfigValidator {
    /// Generate a sample configuration file with all parameters and descriptions
    pub fn generate_sample_config() -> String {
        let mut output = String::new();
        output.push_str("# Video Subtitle API Configuration File\n");
        output.push_str("# Environment variables take precedence over values in this file\n\n");

        let mut current_category = "";
        for param in CONFIG_PARAMS {
            let category = category_of(param.name);
            if category != current_category {
                output.push_str(&format!("\n# ======== {} ========\n", category));
                current_category = category;
            }

            output.push_str(&format!("# {}\n", param.description));
            match param.default_value {
                Some(default) => output.push_str(&format!(
                    "{} = {}\n\n",
                    param.name,
                    toml_literal(param.param_type, default)
                )),
                None => output.push_str(&format!("# {} = \"\"\n\n", param.name)),
            }
        }
        output
    }

    /// Generate markdown documentation for all configuration parameters
    pub fn generate_config_documentation() -> String {
        let mut output = String::new();
        output.push_str("# Video Subtitle API Configuration Reference\n\n");
        output.push_str("| Parameter | Type | Default | Description |\n");
        output.push_str("|-----------|------|---------|-------------|\n");

        for param in CONFIG_PARAMS {
            output.push_str(&format!(
                "| `{}` | {:?} | `{}` | {} |\n",
                param.name,
                param.param_type,
                param.default_value.unwrap_or("none"),
                param.description
            ));
        }

        output
    }
}

fn category_of(name: &str) -> &'static str {
    if name.starts_with("API_") || name.starts_with("HTTP_") {
        "Server Configuration"
    } else if name.starts_with("SPEECH_") {
        "Speech Configuration"
    } else if name.starts_with("TRANSLATION_") || name == "TARGET_LANGUAGE" {
        "Translation Configuration"
    } else if name.starts_with("METRICS_") {
        "Metrics Configuration"
    } else if name.starts_with("FF") || name.starts_with("SUBTITLE_") || name.starts_with("VIDEO_")
        || name.starts_with("MEDIA_")
    {
        "Media Configuration"
    } else {
        "Upload Configuration"
    }
}

fn toml_literal(param_type: ConfigType, value: &str) -> String {
    match param_type {
        ConfigType::UnsignedInteger | ConfigType::Port | ConfigType::Boolean => value.to_string(),
        _ => format!("\"{}\"", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let (config, results) = ConfigValidator::validate_with(|_| None);
        assert!(results.is_valid(), "errors: {:?}", results.errors);
        assert_eq!(config.server.port, 8282);
        assert_eq!(config.handler.max_file_size, 100 * 1024 * 1024);
        assert_eq!(config.translation.target_language, "ku");
        assert_eq!(config.media.fallback_duration_seconds, 300);
        assert!(config.speech.api_key.is_none());
    }

    #[test]
    fn test_values_are_stored_in_typed_config() {
        let (config, results) = ConfigValidator::validate_with(lookup_from(&[
            ("API_PORT", "9090"),
            ("HTTP_WORKER_NUMBER", "4"),
            ("TARGET_LANGUAGE", "ckb"),
            ("VIDEO_PRESET", "FAST"),
            ("SPEECH_API_KEY", "secret"),
            ("SUBTITLE_FALLBACK_SECONDS", "60"),
            ("METRICS_BACKEND", "prometheus"),
        ]));
        assert!(results.is_valid(), "errors: {:?}", results.errors);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.workers, 4);
        assert_eq!(config.translation.target_language, "ckb");
        assert_eq!(config.media.encoder.preset, "fast");
        assert_eq!(config.speech.api_key.as_deref(), Some("secret"));
        assert_eq!(config.media.fallback_duration_seconds, 60);
        assert_eq!(config.metrics.exporter_type(), "prometheus");
    }

    #[test]
    fn test_invalid_values_are_collected() {
        let (_, results) = ConfigValidator::validate_with(lookup_from(&[
            ("API_PORT", "0"),
            ("VIDEO_CRF", "99"),
            ("SPEECH_API_URL", "ftp://example.com"),
            ("TARGET_LANGUAGE", "kurdish!"),
        ]));
        assert!(!results.is_valid());
        let fields: Vec<&str> = results.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"API_PORT"));
        assert!(fields.contains(&"VIDEO_CRF"));
        assert!(fields.contains(&"SPEECH_API_URL"));
        assert!(fields.contains(&"TARGET_LANGUAGE"));
    }

    #[test]
    fn test_warning_level_errors_do_not_fail_validation() {
        let (config, results) =
            ConfigValidator::validate_with(lookup_from(&[("SUBTITLE_FONT_SIZE", "1000")]));
        assert!(results.is_valid());
        assert_eq!(results.warnings.len(), 1);
        assert_eq!(config.media.style.font_size, 24);
    }

    #[test]
    fn test_same_source_and_target_language_warns() {
        let (_, results) = ConfigValidator::validate_with(lookup_from(&[
            ("DEFAULT_LANGUAGE", "ku"),
            ("TARGET_LANGUAGE", "ku"),
        ]));
        assert!(results.is_valid());
        assert!(results
            .warnings
            .iter()
            .any(|w| w.field == "TARGET_LANGUAGE"));
    }

    #[test]
    fn test_validators() {
        assert!(validators::validate_boolean("X", "on").unwrap());
        assert!(validators::validate_boolean("X", "maybe").is_err());
        assert_eq!(validators::validate_port("X", "8080").unwrap(), 8080);
        assert!(validators::validate_port("X", "70000").is_err());
        assert!(validators::validate_unsigned("X", "-1", None, None).is_err());
        assert!(validators::validate_url("X", "https://example.com/translate").is_ok());
        assert!(validators::validate_url("X", "not a url").is_err());
    }

    #[test]
    fn test_sample_config_parses_as_toml() {
        let sample = ConfigValidator::generate_sample_config();
        let map = crate::config_loader::parse_flat_toml(&sample).expect("sample is valid toml");
        assert_eq!(map.get("API_PORT").map(String::as_str), Some("8282"));
        assert_eq!(map.get("TARGET_LANGUAGE").map(String::as_str), Some("ku"));
        assert!(!map.contains_key("SPEECH_API_KEY"));
    }

    #[test]
    fn test_sample_config_has_one_header_per_category() {
        let sample = ConfigValidator::generate_sample_config();
        for category in [
            "Server Configuration",
            "Upload Configuration",
            "Media Configuration",
            "Speech Configuration",
            "Translation Configuration",
            "Metrics Configuration",
        ] {
            let header = format!("# ======== {} ========", category);
            assert_eq!(sample.matches(&header).count(), 1, "{}", category);
        }
    }

    #[test]
    fn test_missing_secrets_are_not_errors() {
        let (config, results) = ConfigValidator::validate_with(|key| match key {
            "SPEECH_API_KEY" | "TRANSLATION_API_KEY" => Some("   ".to_string()),
            _ => None,
        });
        assert!(results.is_valid());
        assert!(results.errors.is_empty());
        assert_eq!(config.speech.api_key, None);
        assert_eq!(config.translation.api_key, None);
    }

    #[test]
    fn test_documentation_lists_every_parameter() {
        let docs = ConfigValidator::generate_config_documentation();
        for param in CONFIG_PARAMS {
            assert!(docs.contains(param.name), "{} missing", param.name);
        }
    }
}
