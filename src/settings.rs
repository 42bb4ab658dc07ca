//! Persisted credentials.
//!
//! Stores the inference API key (and the provider it belongs to) so it does
//! not have to be passed on every run.

use crate::error::{DigestError, Result};
use crate::llm::InferenceProvider;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Default settings file path: `~/.arxiv_digest.json`
fn default_settings_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".arxiv_digest.json"))
        .ok_or_else(|| DigestError::Config("Cannot determine home directory".to_string()))
}

/// Stored settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub provider: Option<InferenceProvider>,
}

/// Loads and saves [`StoredSettings`]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Create a store at the default path
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: default_settings_path()?,
        })
    }

    /// Create a store with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the settings file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load settings from file
    ///
    /// Returns defaults if the file doesn't exist or is invalid
    pub fn load(&self) -> StoredSettings {
        if !self.path.exists() {
            debug!("Settings file not found: {:?}", self.path);
            return StoredSettings::default();
        }

        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<StoredSettings>(&content) {
                Ok(settings) => {
                    debug!("Loaded settings from {:?}", self.path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings: {}", e);
                    StoredSettings::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}", e);
                StoredSettings::default()
            }
        }
    }

    /// Save settings to file
    pub fn save(&self, settings: &StoredSettings) -> Result<()> {
        let content = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, content)?;
        info!("Saved settings to {:?}", self.path);
        Ok(())
    }

    /// Store a key, keeping any other saved fields
    pub fn save_api_key(&self, api_key: &str, provider: Option<InferenceProvider>) -> Result<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(DigestError::Validation("API key must not be empty".to_string()));
        }

        let mut settings = self.load();
        settings.api_key = Some(api_key.to_string());
        if provider.is_some() {
            settings.provider = provider;
        }
        self.save(&settings)
    }

    /// Remove stored settings
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            info!("Cleared settings at {:?}", self.path);
        }
        Ok(())
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            path: PathBuf::from(".arxiv_digest.json"),
        })
    }
}

/// Hide all but the last four characters of a key
pub fn mask_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}
