//! CLI configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const PROMPTGATE_DIR: &str = ".promptgate";

/// CLI-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Host the server binds to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the server binds to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Session timeout in seconds (0 disables expiry)
    #[serde(default = "default_timeout")]
    pub session_timeout_secs: u64,

    /// Maximum number of concurrently open sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8188
}

fn default_timeout() -> u64 {
    3600
}

fn default_max_sessions() -> usize {
    64
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            session_timeout_secs: default_timeout(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl CliConfig {
    /// Load configuration from default locations
    pub fn load() -> Self {
        // Try to load from:
        // 1. ~/.config/promptgate/config.toml
        // 2. ~/.promptgate/config.toml
        // 3. Use defaults

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("promptgate").join("config.toml");
            if let Some(config) = Self::load_from(&path) {
                return config;
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(PROMPTGATE_DIR).join("config.toml");
            if let Some(config) = Self::load_from(&path) {
                return config;
            }
        }

        Self::default()
    }

    fn load_from(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        toml::from_str(&content).ok()
    }

    /// Save configuration to disk, returning the path written.
    pub fn save(&self) -> std::io::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "No config dir"))?
            .join("promptgate");

        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }
}
