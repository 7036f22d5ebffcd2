use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use reprise_core::scan::AUDIO_EXTENSIONS;

/// Configuration for reprise.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (REPRISE_* prefix)
/// 3. Config file (~/.config/reprise/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Last.fm API key used for track lookups and tag enrichment.
    ///
    /// The default is Last.fm's public demo key; registering a personal key
    /// at <https://www.last.fm/api/account/create> is recommended.
    #[serde(default = "default_api_key")]
    pub lastfm_api_key: String,

    /// Root of the local music library to index.
    #[serde(default = "default_music_dir")]
    pub music_dir: PathBuf,

    /// Path to the SQLite library index.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: REPRISE_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/reprise/library.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// File extensions indexed during a scan (lowercase, no dot).
    #[serde(default = "default_extensions")]
    pub audio_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lastfm_api_key: default_api_key(),
            music_dir: default_music_dir(),
            database_path: default_db_path(),
            audio_extensions: default_extensions(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/reprise/config.toml
    /// Reads environment variables with REPRISE_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("reprise");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration with a custom database path (the --db CLI flag).
    pub fn load_with_db_path(db_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.database_path = db_path;
        Ok(config)
    }
}

fn default_api_key() -> String {
    // Public demo key
    "8fc89f699e4ff45a21b968623a93ed52".to_string()
}

fn default_music_dir() -> PathBuf {
    dirs::audio_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Music")
    })
}

/// Get the default database path.
///
/// Returns: ~/.local/share/reprise/library.db (or platform equivalent)
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reprise")
        .join("library.db")
}

fn default_extensions() -> Vec<String> {
    AUDIO_EXTENSIONS.iter().map(|s| (*s).to_string()).collect()
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/reprise/config.toml
/// - macOS: ~/Library/Application Support/reprise/config.toml
/// - Windows: %APPDATA%\reprise\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reprise")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Reprise Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (REPRISE_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Last.fm API key for track lookups and tag enrichment.
# The built-in default is Last.fm's public demo key; register a personal
# key at: https://www.last.fm/api/account/create
#lastfm_api_key = "your-lastfm-api-key-here"

# Root of the local music library to index.
#music_dir = "/home/you/Music"

# Path to the SQLite library index.
#
# Can also be set via:
# - CLI: reprise --db /custom/path.db scan
# - Environment: REPRISE_DATABASE_PATH=/custom/path.db
#database_path = "/path/to/custom/library.db"

# File extensions indexed during a scan (lowercase, no dot).
#audio_extensions = ["mp3", "flac", "m4a", "ogg", "opus", "wav", "wma"]
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.database_path.as_os_str().is_empty());
        assert!(!config.lastfm_api_key.is_empty());
        assert!(config.audio_extensions.iter().any(|e| e == "mp3"));
        assert!(config.audio_extensions.iter().any(|e| e == "flac"));
    }

    #[test]
    fn test_config_with_custom_db_path() {
        let custom_path = PathBuf::from("/tmp/test.db");
        let config = Config::load_with_db_path(custom_path.clone());
        assert!(config.is_ok());
        assert_eq!(config.unwrap().database_path, custom_path);
    }
}
