use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const CONFIG_FILE: &str = "config.json";
const STORE_FILE: &str = "store.json";

/// Which persistence backend holds the video configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// JSON key-value file on this machine
    #[default]
    Local,
    /// Hosted database with password sign-in
    Remote,
}

/// Connection settings for the hosted store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: Option<String>,
    /// Public anon key sent as `apikey`
    pub anon_key: Option<String>,
    /// Table holding the video records
    pub table: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            table: "pixeltv_final".to_string(),
            timeout_secs: 15,
        }
    }
}

/// External media player used as the rendering surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Executable to launch
    pub command: String,
    /// Extra arguments passed before the URL
    pub args: Vec<String>,
    /// How long the player must stay up before it counts as ready
    pub ready_grace_ms: u64,
    /// Whether fullscreen may be requested at all
    pub fullscreen: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: "mpv".to_string(),
            args: Vec::new(),
            ready_grace_ms: 1500,
            fullscreen: true,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignageConfig {
    pub backend: Backend,
    /// Page origin handed to YouTube embeds
    pub origin: String,
    /// Name shown in the header
    pub brand: String,
    pub remote: RemoteConfig,
    /// Key-value file for the local backend (platform data dir if unset)
    pub local_store: Option<PathBuf>,
    pub player: PlayerConfig,
    /// How long status banners stay up
    pub status_ttl_secs: u64,
}

impl Default for SignageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Local,
            origin: "http://localhost".to_string(),
            brand: "Signage".to_string(),
            remote: RemoteConfig::default(),
            local_store: None,
            player: PlayerConfig::default(),
            status_ttl_secs: 4,
        }
    }
}

impl SignageConfig {
    pub fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "signage")
    }

    /// Platform default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load from `path`, or from the default location. A missing file
    /// yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)?;
        let config = serde_json::from_str(&text)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup. Empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("SUPABASE_URL") {
            self.remote.url = Some(url);
        }
        if let Some(key) = get("SUPABASE_ANON_KEY") {
            self.remote.anon_key = Some(key);
        }
        if let Some(table) = get("SIGNAGE_TABLE") {
            self.remote.table = table;
        }
        if let Some(origin) = get("SIGNAGE_ORIGIN") {
            self.origin = origin;
        }
    }

    /// Whether the remote backend has what it needs to connect
    pub fn is_remote_configured(&self) -> bool {
        self.remote.url.is_some() && self.remote.anon_key.is_some()
    }

    /// Check the selected backend can start
    pub fn validate(&self) -> Result<()> {
        if self.backend == Backend::Remote && !self.is_remote_configured() {
            return Err(Error::Config(
                "set SUPABASE_URL and SUPABASE_ANON_KEY for the remote backend".to_string(),
            ));
        }
        if self.player.command.trim().is_empty() {
            return Err(Error::Config("player command is empty".to_string()));
        }
        Ok(())
    }

    /// Resolve the local store file path
    pub fn local_store_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.local_store {
            return Ok(path.clone());
        }
        Self::project_dirs()
            .map(|dirs| dirs.data_dir().join(STORE_FILE))
            .ok_or_else(|| Error::Config("no home directory for the local store".to_string()))
    }

    pub fn status_ttl(&self) -> Duration {
        Duration::from_secs(self.status_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs.max(1))
    }
}
