//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\playlist-planner\config.toml
//! - macOS: ~/Library/Application Support/playlist-planner/config.toml
//! - Linux: ~/.config/playlist-planner/config.toml
//!
//! The config file is human-readable and editable. Every section falls
//! back to defaults, so a partial file is always valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API credentials (keep separate for potential future encryption)
    pub credentials: Credentials,

    /// Which playlists count as library or class playlists
    pub playlists: PlaylistConfig,

    /// Tempo lookup settings
    pub enrichment: EnrichmentConfig,

    /// Storage settings
    pub database: DatabaseConfig,
}

/// API credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// GetSongBPM API key for tempo lookups
    pub lookup_api_key: Option<String>,

    /// Spotify bearer token (obtained outside this tool)
    pub playlist_source_token: Option<String>,
}

/// Playlist role detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistConfig {
    /// Exact playlist name (or description fragment) marking a library playlist
    pub library_marker: String,

    /// Regex matched against name/description to mark a dated class playlist
    pub class_date_pattern: String,

    /// Playlist names never considered
    pub ignore: Vec<String>,

    /// Skip playlists the provider reports as private
    pub public_only: bool,

    /// Items requested per page from the provider
    pub page_size: u32,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            library_marker: "Aggregated Cycle".to_string(),
            class_date_pattern: r"\b(\d{4}-\d{1,2}-\d{1,2}|\d{1,2}/\d{1,2}/\d{2,4})\b".to_string(),
            ignore: vec![
                "Mellow cycle".to_string(),
                "FTP Test".to_string(),
                "Holiday cycle".to_string(),
            ],
            public_only: true,
            page_size: 50,
        }
    }
}

/// Tempo lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Lookup service base URL
    pub base_url: String,

    /// Pause between consecutive lookups
    pub request_delay_ms: u64,

    /// Pause after an HTTP 429 before retrying the same track
    pub rate_limit_backoff_secs: u64,

    /// 429 retries per track before giving up on it for this pass
    pub max_rate_limit_retries: u32,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.getsong.co".to_string(),
            request_delay_ms: 200,
            rate_limit_backoff_secs: 5,
            max_rate_limit_retries: 5,
        }
    }
}

impl EnrichmentConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn rate_limit_backoff(&self) -> Duration {
        Duration::from_secs(self.rate_limit_backoff_secs)
    }
}

/// Storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file (default: `playlist_planner.db` in the data directory)
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Configured path, else the per-user data directory, else the working directory.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        dirs::data_dir()
            .map(|d| d.join("playlist-planner").join(crate::db::DEFAULT_DB_NAME))
            .unwrap_or_else(|| PathBuf::from(crate::db::DEFAULT_DB_NAME))
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("playlist-planner"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to disk
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> Result<PathBuf, ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    let path = dir.join("config.toml");

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::CreateDir(dir.clone(), e))?;

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, &path)
        .map_err(|e| ConfigError::Rename(temp_path, path.clone(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(path)
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[credentials]"));
        assert!(toml.contains("[playlists]"));
        assert!(toml.contains("[enrichment]"));
        assert!(toml.contains("[database]"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.credentials.lookup_api_key = Some("test-key-123".to_string());
        config.enrichment.request_delay_ms = 350;
        config.playlists.ignore.push("Warmups".to_string());

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(parsed.credentials.lookup_api_key, Some("test-key-123".to_string()));
        assert_eq!(parsed.enrichment.request_delay(), Duration::from_millis(350));
        assert!(parsed.playlists.ignore.contains(&"Warmups".to_string()));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[credentials]
lookup_api_key = "my-key"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.credentials.lookup_api_key, Some("my-key".to_string()));
        assert_eq!(config.playlists.library_marker, "Aggregated Cycle");
        assert_eq!(config.enrichment.rate_limit_backoff(), Duration::from_secs(5));
        assert_eq!(config.playlists.page_size, 50);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_explicit_database_path_wins() {
        let config = DatabaseConfig {
            path: Some(PathBuf::from("/tmp/x.db")),
        };
        assert_eq!(config.resolved_path(), PathBuf::from("/tmp/x.db"));
    }
}
