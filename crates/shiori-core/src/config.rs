use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use shiori_api::{newmanga, remanga, Backend, ClientOptions};

use crate::error::ShioriError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub remanga: ReMangaConfig,
    pub newmanga: NewMangaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub backend: Backend,
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReMangaConfig {
    pub api_url: String,
    pub site_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMangaConfig {
    pub api_url: String,
    pub catalogue_url: String,
    pub card_image_url: String,
    pub avatar_image_url: String,
}

impl AppConfig {
    /// Load config: the user file if it exists, otherwise built-in defaults.
    pub fn load() -> Result<Self, ShioriError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ShioriError> {
        let content = if path.exists() {
            std::fs::read_to_string(path)?
        } else {
            DEFAULT_CONFIG.to_string()
        };
        toml::from_str(&content).map_err(|e| ShioriError::Config(e.to_string()))
    }

    /// Write this config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ShioriError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ShioriError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        tracing::debug!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Write the built-in defaults to `path`. An existing file is kept unless
    /// `overwrite` is set; returns whether the file was written.
    pub fn write_default(path: &Path, overwrite: bool) -> Result<bool, ShioriError> {
        if path.exists() && !overwrite {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }

    /// Options for building backend clients.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.general.timeout_secs.max(1)),
            user_agent: self.general.user_agent.clone(),
            remanga: remanga::Endpoints {
                api_url: self.remanga.api_url.clone(),
                site_url: self.remanga.site_url.clone(),
            },
            newmanga: newmanga::Endpoints {
                api_url: self.newmanga.api_url.clone(),
                catalogue_url: self.newmanga.catalogue_url.clone(),
                card_image_url: self.newmanga.card_image_url.clone(),
                avatar_image_url: self.newmanga.avatar_image_url.clone(),
            },
        }
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Path to the token database.
    pub fn db_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().join("shiori.db"))
            .unwrap_or_else(|| PathBuf::from("shiori.db"))
    }

    /// Ensure the data directory exists and return the DB path.
    pub fn ensure_db_path() -> Result<PathBuf, ShioriError> {
        let path = Self::db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "shiori")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}
