//! Persistent CLI settings.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "idcache=info,idcache_core=info";

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join("idcache")
}

/// Settings stored in `<config dir>/idcache/settings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Unified cache file.
    pub cache_path: PathBuf,
    /// Legacy cache file.
    pub legacy_path: PathBuf,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = app_dir(dirs::data_dir());
        Self {
            cache_path: data_dir.join("token_cache.json"),
            legacy_path: data_dir.join("legacy_cache.json"),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Settings {
    /// Location of the settings file.
    pub fn path() -> PathBuf {
        app_dir(dirs::config_dir()).join("settings.json")
    }

    /// Loads settings, falling back to defaults when the file is missing.
    pub async fn load() -> Result<Self> {
        Self::load_from(&Self::path()).await
    }

    /// Loads settings from `path`.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    /// Saves settings to the default location.
    pub async fn save(&self) -> Result<()> {
        self.save_to(&Self::path()).await
    }

    /// Saves settings to `path`, creating its directory.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;
        tracing::info!("Settings saved to {:?}", path);
        Ok(())
    }

    /// Updates one setting by name.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "cache_path" => self.cache_path = PathBuf::from(value),
            "legacy_path" => self.legacy_path = PathBuf::from(value),
            "log_filter" => self.log_filter = value.to_string(),
            other => bail!("Unknown setting: {other}. Valid keys: cache_path, legacy_path, log_filter"),
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json")).await.unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.log_filter, DEFAULT_LOG_FILTER);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.set("cache_path", "/tmp/cache.json").unwrap();
        settings.set("log_filter", "debug").unwrap();
        settings.save_to(&path).await.unwrap();

        let loaded = Settings::load_from(&path).await.unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.cache_path, PathBuf::from("/tmp/cache.json"));
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, r#"{"log_filter": "warn"}"#).await.unwrap();

        let loaded = Settings::load_from(&path).await.unwrap();
        assert_eq!(loaded.log_filter, "warn");
        assert_eq!(loaded.cache_path, Settings::default().cache_path);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Settings::default().set("theme", "dark").is_err());
    }
}
