use anyhow::{bail, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use shared::Language;
use std::path::{Path, PathBuf};

pub const DEFAULT_ORIGIN: &str = "http://localhost:8000";

/// Keys accepted by `set`/`get`, in display order
pub const KEYS: [&str; 6] = [
    "server",
    "language",
    "reconnect.strategy",
    "reconnect.delay_secs",
    "reconnect.max_delay_secs",
    "reconnect.connect_timeout_secs",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub editor: EditorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Page origin the endpoints are derived from
    pub origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Fixed,
    Backoff,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconnectConfig {
    #[serde(default)]
    pub strategy: StrategyKind,
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    /// Give up on a connect/handshake after this long
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_delay_secs() -> u64 {
    5
}

fn default_max_delay_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Fixed,
            delay_secs: default_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EditorConfig {
    #[serde(default)]
    pub language: Language,
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "codecraft", "codecraft")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    /// Directory for the console-mode log file
    pub fn log_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "codecraft", "codecraft")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

        let log_dir = proj_dirs.data_local_dir().join("logs");
        std::fs::create_dir_all(&log_dir)?;
        Ok(log_dir)
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "server" => self.server.origin = value.trim_end_matches('/').to_string(),
            "language" => self.editor.language = value.parse()?,
            "reconnect.strategy" => {
                self.reconnect.strategy = match value {
                    "fixed" => StrategyKind::Fixed,
                    "backoff" => StrategyKind::Backoff,
                    _ => bail!("Unknown reconnect strategy: {}. Valid: fixed, backoff", value),
                }
            }
            "reconnect.delay_secs" => self.reconnect.delay_secs = value.parse()?,
            "reconnect.max_delay_secs" => self.reconnect.max_delay_secs = value.parse()?,
            "reconnect.connect_timeout_secs" => {
                self.reconnect.connect_timeout_secs = value.parse()?
            }
            _ => bail!(
                "Unknown config key: {}. Valid keys: {}",
                key,
                KEYS.join(", ")
            ),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "server" => self.server.origin.clone(),
            "language" => self.editor.language.to_string(),
            "reconnect.strategy" => match self.reconnect.strategy {
                StrategyKind::Fixed => "fixed".to_string(),
                StrategyKind::Backoff => "backoff".to_string(),
            },
            "reconnect.delay_secs" => self.reconnect.delay_secs.to_string(),
            "reconnect.max_delay_secs" => self.reconnect.max_delay_secs.to_string(),
            "reconnect.connect_timeout_secs" => self.reconnect.connect_timeout_secs.to_string(),
            _ => bail!("Unknown config key: {}", key),
        };
        Ok(value)
    }
}
