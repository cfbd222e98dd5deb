//! On-disk credential cache.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Credential, Token};
use crate::error::Result;

/// Persisted subset of a [`Credential`]. The client secret is never written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedCredential {
    pub user_name: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub app_token: Option<Token>,
    #[serde(default)]
    pub user_token: Option<Token>,
}

impl CachedCredential {
    pub fn from_credential(credential: &Credential) -> Self {
        Self {
            user_name: credential.user_name.clone(),
            user_id: credential.user_id.clone(),
            app_token: credential.app_token.clone(),
            user_token: credential.user_token.clone(),
        }
    }

    /// Copy cached tokens into `credential` if the cache belongs to the same account.
    ///
    /// Returns whether anything was applied.
    pub fn apply_to(self, credential: &mut Credential) -> bool {
        if !self.user_name.eq_ignore_ascii_case(&credential.user_name) {
            warn!(
                cached = %self.user_name,
                configured = %credential.user_name,
                "Ignoring credential cache for a different account"
            );
            return false;
        }

        credential.user_id = self.user_id;
        credential.app_token = self.app_token;
        credential.user_token = self.user_token;
        true
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let cached = serde_json::from_str(&content)?;
        debug!(path = %path.display(), "Loaded credential cache");
        Ok(cached)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        debug!(path = %path.display(), "Saved credential cache");
        Ok(())
    }
}
