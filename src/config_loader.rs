// Configuration file loader for the Video Subtitle API
//
// Reads the flat TOML configuration file and exports its keys as environment
// variables, so the validator only ever has to look at the environment.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use toml::Value;

const CONFIG_FILE_PATH: &str = "video_subtitle_api.conf";
const ENV_CONFIG_FILE: &str = "VIDEO_SUBTITLE_API_CONFIG";

/// Path of the configuration file, overridable through `VIDEO_SUBTITLE_API_CONFIG`
pub fn config_file_path() -> PathBuf {
    env::var(ENV_CONFIG_FILE)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE_PATH))
}

/// Loads configuration from the TOML file into the environment
///
/// Configuration precedence (highest to lowest):
/// 1. Environment variables
/// 2. Configuration file values
/// 3. Defaults from `config::defaults`
///
/// Returns true if the config file was successfully loaded, false otherwise
pub fn load_config() -> bool {
    load_config_from(&config_file_path())
}

/// Same as [`load_config`] for an explicit path
pub fn load_config_from(config_path: &Path) -> bool {
    if !config_path.exists() {
        debug!("Configuration file not found at: {}", config_path.display());
        return false;
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read configuration file: {}", e);
            return false;
        }
    };

    let config_map = match parse_flat_toml(&config_content) {
        Ok(map) => map,
        Err(e) => {
            warn!("Failed to parse configuration file: {}", e);
            return false;
        }
    };

    for (key, value) in config_map {
        if env::var(&key).is_err() {
            debug!("Setting env var from config file: {}", key);
            env::set_var(key, value);
        } else {
            debug!("Env var already exists, skipping: {}", key);
        }
    }

    info!("Configuration loaded from {}", config_path.display());
    true
}

/// Flattens a TOML document into key/value strings
///
/// Only top-level scalar values are kept; arrays and tables are skipped with a warning.
pub fn parse_flat_toml(content: &str) -> Result<HashMap<String, String>, toml::de::Error> {
    let values: Value = content.parse()?;
    let mut config_map = HashMap::new();

    if let Value::Table(table) = values {
        for (key, value) in table {
            match value {
                Value::String(s) => {
                    config_map.insert(key, s);
                }
                Value::Integer(i) => {
                    config_map.insert(key, i.to_string());
                }
                Value::Float(f) => {
                    config_map.insert(key, f.to_string());
                }
                Value::Boolean(b) => {
                    config_map.insert(key, b.to_string());
                }
                _ => {
                    warn!("Skipping unsupported TOML value type for key: {}", key);
                }
            }
        }
    }

    Ok(config_map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_toml_keeps_scalars() {
        let content = r#"
API_PORT = 9000
TARGET_LANGUAGE = "ckb"
METRICS_ENABLED = false
VIDEO_PRESET = "fast"
IGNORED = [1, 2]
"#;
        let map = parse_flat_toml(content).expect("valid toml");
        assert_eq!(map.get("API_PORT").map(String::as_str), Some("9000"));
        assert_eq!(map.get("TARGET_LANGUAGE").map(String::as_str), Some("ckb"));
        assert_eq!(map.get("METRICS_ENABLED").map(String::as_str), Some("false"));
        assert_eq!(map.get("VIDEO_PRESET").map(String::as_str), Some("fast"));
        assert!(!map.contains_key("IGNORED"));
    }

    #[test]
    fn test_parse_flat_toml_rejects_garbage() {
        assert!(parse_flat_toml("this is = = not toml").is_err());
    }

    #[test]
    fn test_missing_file_is_not_loaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(!load_config_from(&dir.path().join("absent.conf")));
    }

    #[test]
    fn test_file_values_do_not_override_environment() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("test.conf");
        fs::write(
            &path,
            "VSA_LOADER_TEST_SET = \"from-file\"\nVSA_LOADER_TEST_NEW = \"from-file\"\n",
        )
        .expect("write config");

        env::set_var("VSA_LOADER_TEST_SET", "from-env");
        assert!(load_config_from(&path));
        assert_eq!(env::var("VSA_LOADER_TEST_SET").as_deref(), Ok("from-env"));
        assert_eq!(env::var("VSA_LOADER_TEST_NEW").as_deref(), Ok("from-file"));
    }
}
