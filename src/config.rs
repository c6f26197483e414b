use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::time::Duration;

use crate::clients::RetryConfig;
use crate::errors::{AppError, AppResult};
use crate::saver::manifest::DEFAULT_MANIFEST_PATH;
use crate::security::InputValidator;

const APP_DIR_NAME: &str = "vk-photo-saver";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vk_token: String,
    pub yadisk_token: String,
    pub vk_user_id: Option<String>,
    pub album_id: String,
    pub max_qty: usize,
    pub folder: String, // empty = dated folder name
    pub manifest_path: String,
    pub rate_limit_delay_ms: u64,
    pub max_retry_attempts: u32,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vk_token: String::new(),
            yadisk_token: String::new(),
            vk_user_id: None,
            album_id: "profile".to_string(),
            max_qty: 10,
            folder: String::new(),
            manifest_path: DEFAULT_MANIFEST_PATH.to_string(),
            rate_limit_delay_ms: 300,
            max_retry_attempts: 3,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::with_max_retries(self.max_retry_attempts)
    }

    /// Configured folder, or today's dated folder when none is set.
    pub fn folder_or_default(&self) -> String {
        if self.folder.trim().is_empty() {
            default_folder_name()
        } else {
            self.folder.trim().to_string()
        }
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

pub fn default_folder_name() -> String {
    format!("vk_photos_{}", chrono::Local::now().format("%Y-%m-%d"))
}

fn get_config_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join(APP_DIR_NAME);

    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("config.json"))
}

pub fn load_config() -> AppResult<Config> {
    load_config_from(&get_config_path()?)
}

pub fn load_config_from(config_path: &Path) -> AppResult<Config> {
    if config_path.exists() {
        let config_str = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_str).unwrap_or_else(|e| {
            log::warn!("Failed to parse config file: {}. Using defaults.", e);
            Config::default()
        });

        // Validate config before returning
        validate_config(&config)?;

        Ok(config)
    } else {
        // Create default config
        let default_config = Config::default();
        save_config_to(config_path, &default_config)?;
        Ok(default_config)
    }
}

pub fn save_config(config: &Config) -> AppResult<()> {
    validate_config(config)?;
    save_config_to(&get_config_path()?, config)
}

fn save_config_to(config_path: &Path, config: &Config) -> AppResult<()> {
    // Create backup of existing config
    if config_path.exists() {
        let backup_path = config_path.with_extension("json.bak");
        if let Err(e) = fs::copy(config_path, &backup_path) {
            log::warn!("Failed to create config backup: {}", e);
        }
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(config_path, config_str)?;

    log::info!("Configuration saved to {}", config_path.display());
    Ok(())
}

pub fn validate_config(config: &Config) -> AppResult<()> {
    if config.max_qty == 0 {
        return Err(AppError::validation("max_qty", "Must be greater than 0"));
    }

    if config.rate_limit_delay_ms < 100 {
        return Err(AppError::validation("rate_limit_delay_ms", "Must be at least 100ms"));
    }

    if config.max_retry_attempts > 10 {
        return Err(AppError::validation("max_retry_attempts", "Must be 10 or fewer"));
    }

    InputValidator::validate_album_id(&config.album_id)?;

    if let Some(user_id) = &config.vk_user_id {
        InputValidator::validate_user_id(user_id)?;
    }

    if !config.folder.trim().is_empty() {
        InputValidator::validate_folder_name(&config.folder)?;
    }

    // Validate log level
    let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
    if !valid_log_levels.contains(&config.log_level.as_str()) {
        return Err(AppError::validation("log_level", "Must be a valid log level"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.album_id, "profile");
        assert_eq!(config.max_qty, 10);
        assert_eq!(config.manifest_path, "images_log.json");
        assert_eq!(config.request_interval(), Duration::from_millis(300));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.max_qty = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.rate_limit_delay_ms = 50;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.album_id = "everything".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"max_qty": 25, "album_id": "wall"}"#).unwrap();
        assert_eq!(config.max_qty, 25);
        assert_eq!(config.album_id, "wall");
        assert_eq!(config.rate_limit_delay_ms, 300);
    }

    #[test]
    fn test_load_creates_default_file_and_backs_up_on_save() {
        let dir = std::env::temp_dir().join("vk_photo_saver_config_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, Config::default());
        assert!(path.exists());

        let mut changed = loaded.clone();
        changed.max_qty = 42;
        save_config_to(&path, &changed).unwrap();
        assert!(path.with_extension("json.bak").exists());
        assert_eq!(load_config_from(&path).unwrap().max_qty, 42);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_folder_defaults_to_date() {
        let config = Config::default();
        assert!(config.folder_or_default().starts_with("vk_photos_"));

        let mut config = Config::default();
        config.folder = " backup ".to_string();
        assert_eq!(config.folder_or_default(), "backup");
    }
}
