use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

/// Default address of the local ask proxy (`citadel serve`).
pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:8787";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub proxy_url: Option<String>,
    pub character_api: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            proxy_url: None,
            character_api: None,
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn proxy_url(&self) -> &str {
        self.proxy_url.as_deref().unwrap_or(DEFAULT_PROXY_URL)
    }

    pub fn character_api(&self) -> &str {
        self.character_api
            .as_deref()
            .unwrap_or(crate::characters::CHARACTER_API)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("citadel").join("config.json"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert!(config.proxy_url.is_none());
        assert_eq!(config.proxy_url(), DEFAULT_PROXY_URL);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("citadel").join("config.json");

        let mut config = Config::new();
        config.proxy_url = Some("http://localhost:9999".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.proxy_url(), "http://localhost:9999");
        assert_eq!(loaded.character_api(), crate::characters::CHARACTER_API);
    }
}
