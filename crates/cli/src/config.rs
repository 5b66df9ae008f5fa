use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use freightlead_recommend::RecommendConfig;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "freightlead.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub logging: LoggingConfig,
    pub crm: CrmSettings,
    pub notify: NotifySettings,
    pub scoring: RecommendConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Carrier performance CSV
    pub dataset_path: PathBuf,
    /// JSON snapshot of quotes, taxes and vendors
    pub quotes_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("CarriersT.csv"),
            quotes_path: PathBuf::from("quotes.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "freightlead=info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrmSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for CrmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.zohoapis.ca/crm/v2".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    pub base_url: String,
    /// Channel for quote notifications; notifications are off when empty
    pub channel: String,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            base_url: "https://slack.com/api".to_string(),
            channel: String::new(),
        }
    }
}

/// Secrets loaded exclusively from environment variables.
pub struct Secrets {
    pub crm_access_token: Option<String>,
    pub slack_bot_token: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            crm_access_token: std::env::var("CRM_ACCESS_TOKEN").ok(),
            slack_bot_token: std::env::var("SLACK_BOT_TOKEN").ok(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, with secrets from the environment.
    ///
    /// A missing file at the default path falls back to defaults; an explicitly
    /// requested file must exist.
    pub fn load(path: Option<&Path>) -> Result<(Self, Secrets)> {
        dotenvy::dotenv().ok();

        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        Ok((config, Secrets::from_env()))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}
