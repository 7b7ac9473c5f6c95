use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    /// Provider selected at startup when no `-p` flag is given.
    pub default_provider: Option<String>,
    /// Per-provider default model overrides.
    #[serde(default)]
    pub default_models: HashMap<String, String>,
    /// Per-provider API keys; these win over the provider's environment
    /// variable.
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
    /// Start sessions in incognito mode (no history persistence).
    pub incognito: Option<bool>,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        Self::load_from_path(&Self::config_path())
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to_path(&Self::config_path())
    }

    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "parley")
            .expect("failed to determine config directory");
        proj_dirs.config_dir().join("config.toml")
    }

    pub fn default_model_for(&self, provider: &str) -> Option<&str> {
        self.default_models.get(provider).map(String::as_str)
    }

    pub fn api_key_for(&self, provider: &str) -> Option<&str> {
        self.api_keys.get(provider).map(String::as_str)
    }

    pub fn set_api_key(&mut self, provider: String, key: String) {
        self.api_keys.insert(provider, key);
    }

    pub fn incognito_default(&self) -> bool {
        self.incognito.unwrap_or(false)
    }
}
