//! Search controller configuration
//!
//! Values come from (lowest to highest precedence) built-in defaults, an
//! optional JSON file, the `STOREFRONT_SEARCH_URL` environment variable
//! and finally command-line flags applied by the binary.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const BASE_URL_ENV: &str = "STOREFRONT_SEARCH_URL";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchConfig {
    /// API root, e.g. `https://shop.example/api/`
    pub base_url: String,
    /// Products per main-channel page
    pub page_size: u32,
    pub main_debounce_ms: u64,
    pub suggest_debounce_ms: u64,
    pub instant_debounce_ms: u64,
    /// Minimum trimmed term length before suggestions are fetched
    pub suggest_min_chars: usize,
    /// Minimum trimmed term length before instant previews are fetched
    pub instant_min_chars: usize,
    pub instant_limit: u32,
    pub cache_max: usize,
    pub preview_cache_max: usize,
    pub recent_max: usize,
    /// Where persisted client state lives. `None` keeps state in memory.
    pub state_file: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api/".to_string(),
            page_size: 12,
            main_debounce_ms: 250,
            suggest_debounce_ms: 160,
            instant_debounce_ms: 140,
            suggest_min_chars: 2,
            instant_min_chars: 1,
            instant_limit: 8,
            cache_max: crate::cache::CACHE_MAX,
            preview_cache_max: crate::cache::CACHE_MAX,
            recent_max: crate::ledger::RECENT_MAX,
            state_file: default_state_file(),
        }
    }
}

impl SearchConfig {
    /// Load configuration from `path` (when given) and apply the
    /// environment override.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                serde_json::from_str::<SearchConfig>(&content)?
            }
            None => SearchConfig::default(),
        };

        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                log::debug!("Using base url from {}", BASE_URL_ENV);
                config.base_url = url.trim().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidUrl {
            url: self.base_url.clone(),
            source,
        })?;
        let capacities = [
            ("pageSize", self.page_size as usize),
            ("instantLimit", self.instant_limit as usize),
            ("cacheMax", self.cache_max),
            ("previewCacheMax", self.preview_cache_max),
            ("recentMax", self.recent_max),
        ];
        for (field, value) in capacities {
            if value == 0 {
                return Err(ConfigError::ZeroCapacity { field });
            }
        }
        Ok(())
    }

    pub fn main_debounce(&self) -> Duration {
        Duration::from_millis(self.main_debounce_ms)
    }

    pub fn suggest_debounce(&self) -> Duration {
        Duration::from_millis(self.suggest_debounce_ms)
    }

    pub fn instant_debounce(&self) -> Duration {
        Duration::from_millis(self.instant_debounce_ms)
    }
}

fn default_state_file() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("storefront-search").join("state.json"))
}
