//! Account configuration and on-disk locations.

pub mod cli;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::credentials::{ClientCredentials, Credential};
use crate::error::{Error, Result};

/// Folder name under the platform config and cache directories.
pub const APP_DIR_NAME: &str = "streamserver";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const CREDENTIAL_CACHE_FILE_NAME: &str = "credentials.json";

pub const ENV_CLIENT_ID: &str = "STREAMSERVER_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "STREAMSERVER_CLIENT_SECRET";
pub const ENV_USER_NAME: &str = "STREAMSERVER_USER_NAME";

/// Identity of the registered application and the account to follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_name: String,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Read the configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| Error::config(format!("{} is not set", key)))
        };

        Ok(Self {
            client_id: get(ENV_CLIENT_ID)?,
            client_secret: get(ENV_CLIENT_SECRET)?,
            user_name: get(ENV_USER_NAME)?,
        })
    }

    /// Load `path`, falling back to the environment and writing the result back.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded configuration");
                Ok(config)
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Could not read configuration, using environment"
                );
                let config = Self::from_env()?;
                if let Err(e) = config.save(path) {
                    warn!(path = %path.display(), error = %e, "Failed to save configuration");
                } else {
                    info!(path = %path.display(), "Saved configuration");
                }
                Ok(config)
            }
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("user_name", &self.user_name),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config(format!("{} is empty", name)));
            }
        }
        Ok(())
    }

    pub fn credential(&self) -> Credential {
        Credential::new(
            ClientCredentials::new(&self.client_id, &self.client_secret),
            &self.user_name,
        )
    }
}

/// Directories used by the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    /// Resolve directories, preferring explicit overrides over platform defaults.
    pub fn resolve(
        config_dir: Option<PathBuf>,
        cache_dir: Option<PathBuf>,
        log_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let config_dir = match config_dir {
            Some(dir) => dir,
            None => dirs::config_dir()
                .ok_or_else(|| Error::config("no platform config directory"))?
                .join(APP_DIR_NAME),
        };
        let cache_dir = match cache_dir {
            Some(dir) => dir,
            None => dirs::cache_dir()
                .ok_or_else(|| Error::config("no platform cache directory"))?
                .join(APP_DIR_NAME),
        };
        let log_dir = log_dir.unwrap_or_else(|| cache_dir.join("logs"));

        Ok(Self {
            config_dir,
            cache_dir,
            log_dir,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    pub fn credential_cache_file(&self) -> PathBuf {
        self.cache_dir.join(CREDENTIAL_CACHE_FILE_NAME)
    }
}
