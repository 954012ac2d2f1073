//! Configuration loader/writer plus strongly typed settings structures.
//!
//! Deserializes the TOML config we ship, resolves the data directory, and
//! extracts embedded defaults (config + starter prompt library) on first
//! run so the app always starts with a usable library.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// Embed default configuration files at compile time
const DEFAULT_CONFIG: &str = include_str!("../defaults/config.toml");
const DEFAULT_LIBRARY: &str = include_str!("../defaults/library.json");

/// Top-level configuration object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub language: LanguageConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Preferred display/translation language code ("zh", "en", "ja")
    pub preferred: String,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            preferred: "zh".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Inactivity window before a library search fires
    pub debounce_ms: u64,
    /// How many most-used prompts an empty query shows
    pub top_n: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            top_n: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Show only the translation on prompt chips when one exists
    #[serde(default)]
    pub only_show_translation: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::data_dir()?)
    }

    /// Load from an explicit data directory, extracting defaults for any
    /// missing file first (idempotent - never overwrites user edits).
    pub fn load_from(dir: &Path) -> Result<Self> {
        Self::extract_defaults(dir)?;

        let path = dir.join("config.toml");
        let contents = fs::read_to_string(&path)
            .context(format!("Failed to read config file: {:?}", path))?;
        let config: Config = toml::from_str(&contents)
            .context(format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    pub fn save_to(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(dir.join("config.toml"), contents).context("Failed to write config file")?;
        Ok(())
    }

    fn extract_defaults(dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .context(format!("Failed to create data directory: {:?}", dir))?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)?;
            tracing::info!("Extracted default config to {:?}", config_path);
        }

        let library_path = dir.join("library.json");
        if !library_path.exists() {
            fs::write(&library_path, DEFAULT_LIBRARY)?;
            tracing::info!("Extracted starter library to {:?}", library_path);
        }
        Ok(())
    }

    /// Get the base easel directory (~/.easel/)
    /// Can be overridden with the EASEL_DIR environment variable
    pub fn data_dir() -> Result<PathBuf> {
        if let Ok(custom_dir) = std::env::var("EASEL_DIR") {
            return Ok(PathBuf::from(custom_dir));
        }
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".easel"))
    }

    pub fn library_path(dir: &Path) -> PathBuf {
        dir.join("library.json")
    }

    pub fn history_path(dir: &Path) -> PathBuf {
        dir.join("history.json")
    }

    pub fn log_path(dir: &Path) -> PathBuf {
        dir.join("easel.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_default_config_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.search.debounce_ms, 500);
        assert_eq!(config.search.top_n, 10);
        assert_eq!(config.language.preferred, "zh");
        assert!(!config.display.only_show_translation);
    }

    #[test]
    fn test_embedded_default_library_parses() {
        let dir = tempfile::tempdir().unwrap();
        Config::extract_defaults(dir.path()).unwrap();
        let library =
            crate::store::PromptLibrary::load(&Config::library_path(dir.path())).unwrap();
        assert!(!library.prompts().is_empty());
    }

    #[test]
    fn test_load_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::load_from(dir.path()).unwrap();
        config.search.debounce_ms = 250;
        config.display.only_show_translation = true;
        config.save_to(dir.path()).unwrap();

        let reloaded = Config::load_from(dir.path()).unwrap();
        assert_eq!(reloaded.search.debounce_ms, 250);
        assert!(reloaded.display.only_show_translation);
    }

    #[test]
    fn test_extract_does_not_overwrite_user_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[search]\ndebounce_ms = 123\ntop_n = 3\n").unwrap();

        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.search.debounce_ms, 123);
        assert_eq!(config.search.top_n, 3);
    }

    #[test]
    fn test_missing_sections_take_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.search.debounce_ms, 500);
        assert_eq!(config.language.preferred, "zh");
    }
}
