//! Context persistence.
//!
//! Stored as TOML at `$XDG_CONFIG_HOME/plw/config.toml`:
//!
//! ```toml
//! last_context = "default"
//!
//! [contexts.default]
//! url = "http://localhost:3000/graphql"
//! runs_limit = 20
//! ```
//!
//! A missing or unreadable file yields the built-in default context; the file is
//! only written after the user changes something.

use crate::context::{Context, ContextStore, DEFAULT_RUNS_LIMIT};
use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextEntry {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_context: Option<String>,
    #[serde(default)]
    pub contexts: BTreeMap<String, ContextEntry>,
}

/// `~/.config/plw/config.toml` on Linux, the platform equivalent elsewhere.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plw")
        .join("config.toml")
}

impl ConfigFile {
    /// Never fails: a corrupt file is logged and replaced by defaults in memory.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("ignoring config {}: {e}", path.display());
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| eyre!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| eyre!("Failed to parse config file: {e}"))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| eyre!("Failed to create config directory {dir:?}: {e}"))?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| eyre!("Failed to serialize config: {e}"))?;
        fs::write(path, content).map_err(|e| eyre!("Failed to write config file {path:?}: {e}"))?;
        tracing::debug!("saved config to {}", path.display());
        Ok(())
    }

    pub fn into_store(self) -> ContextStore {
        let contexts = self
            .contexts
            .into_iter()
            .map(|(name, entry)| {
                let limit = entry
                    .runs_limit
                    .filter(|&n| n > 0)
                    .unwrap_or(DEFAULT_RUNS_LIMIT);
                Context::new(name, entry.url, limit)
            })
            .collect();
        ContextStore::new(contexts, self.last_context.as_deref())
    }

    /// Snapshot of the saved contexts. The ad-hoc URL override is never written.
    pub fn from_store(store: &ContextStore) -> Self {
        let contexts = store
            .list()
            .into_iter()
            .map(|c| {
                (
                    c.name.clone(),
                    ContextEntry {
                        url: c.url.clone(),
                        runs_limit: Some(c.runs_limit),
                    },
                )
            })
            .collect();
        Self {
            last_context: Some(store.active_name().to_string()),
            contexts,
        }
    }
}
