// FinderDrive Configuration Module
// Persistent engine settings stored as JSON in the user config dir

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::providers::google_drive::UPLOAD_CHUNK_GRANULE;
use crate::providers::http_retry::HttpRetryConfig;

const MAX_PATH_DEPTH_LIMIT: usize = 64;
const MAX_PAGE_SIZE: u32 = 1000;

/// Navigation engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds a cached folder listing stays fresh
    pub cache_ttl_secs: u64,
    /// Bound on the ancestor walk when revealing a file
    pub max_path_depth: usize,
    /// Id of the folder shown in the first column
    pub root_folder_id: String,
    pub root_folder_name: String,
    /// Maximum number of search results
    pub search_page_size: u32,
    pub list_page_size: u32,
    /// Resumable upload chunk size in bytes (multiple of 256 KiB)
    pub upload_chunk_size: usize,
    /// Override for the SQLite cache location
    pub cache_db_path: Option<PathBuf>,
    /// OAuth client id used to build the login URL
    pub oauth_client_id: Option<String>,
    pub oauth_redirect_uri: String,
    pub retry: HttpRetryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            max_path_depth: 15,
            root_folder_id: "root".to_string(),
            root_folder_name: "My Drive".to_string(),
            search_page_size: 20,
            list_page_size: 1000,
            upload_chunk_size: UPLOAD_CHUNK_GRANULE * 4,
            cache_db_path: None,
            oauth_client_id: None,
            oauth_redirect_uri: "http://localhost:5173".to_string(),
            retry: HttpRetryConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// SQLite cache file, falling back to the user cache dir
    pub fn resolved_cache_path(&self) -> PathBuf {
        self.cache_db_path.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("finderdrive")
                .join("folders.db")
        })
    }
}

/// Get the path to the config file
pub fn config_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")));
    config_dir.join("finderdrive").join("config.json")
}

/// Load configuration from the default location
pub fn load_config() -> EngineConfig {
    load_config_from(&config_path())
}

/// Load configuration from `path`, falling back to defaults on any failure
pub fn load_config_from(path: &Path) -> EngineConfig {
    if !path.exists() {
        return EngineConfig::default();
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(config) => return validate_config(config),
            Err(e) => tracing::warn!("Failed to parse config {:?}: {}", path, e),
        },
        Err(e) => tracing::warn!("Failed to read config {:?}: {}", path, e),
    }

    EngineConfig::default()
}

/// Save configuration to the default location
pub fn save_config(config: &EngineConfig) -> Result<(), String> {
    save_config_to(config, &config_path())
}

pub fn save_config_to(config: &EngineConfig, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))?;

    tracing::info!("Config saved to {:?}", path);
    Ok(())
}

/// Clamp out-of-range values into their supported ranges
pub fn validate_config(mut config: EngineConfig) -> EngineConfig {
    config.max_path_depth = config.max_path_depth.clamp(1, MAX_PATH_DEPTH_LIMIT);
    config.search_page_size = config.search_page_size.clamp(1, MAX_PAGE_SIZE);
    config.list_page_size = config.list_page_size.clamp(1, MAX_PAGE_SIZE);

    let chunks = config.upload_chunk_size.div_ceil(UPLOAD_CHUNK_GRANULE).max(1);
    config.upload_chunk_size = chunks * UPLOAD_CHUNK_GRANULE;

    if config.root_folder_id.trim().is_empty() {
        config.root_folder_id = EngineConfig::default().root_folder_id;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.max_path_depth, 15);
        assert_eq!(config.root_folder_id, "root");
        assert_eq!(config.upload_chunk_size % UPLOAD_CHUNK_GRANULE, 0);
    }

    #[test]
    fn test_validate_config_clamps() {
        let config = validate_config(EngineConfig {
            max_path_depth: 0,
            search_page_size: 5000,
            list_page_size: 0,
            upload_chunk_size: 300 * 1024,
            root_folder_id: "  ".to_string(),
            ..EngineConfig::default()
        });
        assert_eq!(config.max_path_depth, 1);
        assert_eq!(config.search_page_size, 1000);
        assert_eq!(config.list_page_size, 1);
        assert_eq!(config.upload_chunk_size, 2 * UPLOAD_CHUNK_GRANULE);
        assert_eq!(config.root_folder_id, "root");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"max_path_depth": 30}"#).unwrap();
        assert_eq!(config.max_path_depth, 30);
        assert_eq!(config.cache_ttl_secs, 300);
        assert_eq!(config.retry, HttpRetryConfig::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = EngineConfig {
            cache_ttl_secs: 60,
            root_folder_name: "Shared".to_string(),
            ..EngineConfig::default()
        };
        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_from(&path), config);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(load_config_from(&path), EngineConfig::default());
    }
}
