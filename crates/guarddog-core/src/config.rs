//! Application configuration management.
//!
//! The configuration holds the backend location, the project's public
//! (anon) key, the last email used to sign in, and behaviour switches.
//! It is stored at `~/.config/guarddog/config.json`; the `GUARDDOG_URL`,
//! `GUARDDOG_ANON_KEY` and `GUARDDOG_EMAIL` environment variables override
//! the stored values.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::SessionStoreOptions;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "guarddog";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_URL: &str = "GUARDDOG_URL";
pub const ENV_ANON_KEY: &str = "GUARDDOG_ANON_KEY";
pub const ENV_EMAIL: &str = "GUARDDOG_EMAIL";

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub anon_key: Option<String>,
    #[serde(default)]
    pub last_email: Option<String>,
    /// Recreate a profile that failed to insert at sign-up from the
    /// identity's metadata on the next sign-in.
    #[serde(default = "default_true")]
    pub repair_missing_profiles: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: None,
            anon_key: None,
            last_email: None,
            repair_missing_profiles: true,
        }
    }
}

impl Config {
    /// Load the stored configuration with environment overrides applied.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Overwrite fields from the environment. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = get(ENV_URL) {
            self.backend_url = Some(url);
        }
        if let Some(key) = get(ENV_ANON_KEY) {
            self.anon_key = Some(key);
        }
        if let Some(email) = get(ENV_EMAIL) {
            self.last_email = Some(email);
        }
    }

    /// Record the last sign-in email in the stored file. Environment
    /// overrides are not written back.
    pub fn remember_email(email: &str) -> Result<()> {
        let path = Self::config_path()?;
        let mut stored = Self::load_from(&path)?;
        if stored.last_email.as_deref() == Some(email) {
            return Ok(());
        }
        stored.last_email = Some(email.to_string());
        stored.save_to(&path)
    }

    pub fn backend_url(&self) -> Result<&str> {
        self.backend_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Backend URL not configured; set {}", ENV_URL))
    }

    pub fn anon_key(&self) -> Result<&str> {
        self.anon_key
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Anon key not configured; set {}", ENV_ANON_KEY))
    }

    pub fn session_store_options(&self) -> SessionStoreOptions {
        SessionStoreOptions {
            repair_missing_profiles: self.repair_missing_profiles,
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
