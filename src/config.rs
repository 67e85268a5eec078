use anyhow::{anyhow, bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::{DEFAULT_CLIENT_ID, GRAPH_BASE_URL, LOGIN_BASE_URL};

/// Relocates both the config and cache directories
pub const HOME_ENV: &str = "M365_CLI_HOME";
pub const GRAPH_URL_ENV: &str = "M365_GRAPH_URL";
pub const LOGIN_URL_ENV: &str = "M365_LOGIN_URL";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthConfig {
    /// Azure AD tenant (default: "common")
    #[serde(default = "default_tenant")]
    pub tenant: String,
    /// Application (client) ID used for the device code flow
    #[serde(default = "default_client_id")]
    pub client_id: String,
}

fn default_tenant() -> String {
    "common".to_string()
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tenant: default_tenant(),
            client_id: default_client_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Microsoft Graph base URL
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
    /// Azure AD authority
    #[serde(default = "default_login_url")]
    pub login_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_graph_url() -> String {
    GRAPH_BASE_URL.to_string()
}

fn default_login_url() -> String {
    LOGIN_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

impl ApiConfig {
    /// HTTP timeout; a zero value in a hand-edited file means the default
    pub fn request_timeout(&self) -> Duration {
        match self.timeout {
            0 => Duration::from_secs(default_timeout()),
            secs => Duration::from_secs(secs),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            graph_url: default_graph_url(),
            login_url: default_login_url(),
            timeout: default_timeout(),
        }
    }
}

/// User settings providing defaults for omitted global options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Output format used when --output is omitted (json or text)
    #[serde(default = "default_output")]
    pub output: String,
    /// Prompt for missing required options instead of failing
    #[serde(default)]
    pub prompt: bool,
    /// Do not send usage telemetry
    #[serde(default)]
    pub disable_telemetry: bool,
    /// Open the device code login page in the default browser
    #[serde(default)]
    pub auto_open_links_in_browser: bool,
    /// Copy the device code to the clipboard during login
    #[serde(default)]
    pub copy_device_code_to_clipboard: bool,
}

fn default_output() -> String {
    "json".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output: default_output(),
            prompt: false,
            disable_telemetry: false,
            auto_open_links_in_browser: false,
            copy_device_code_to_clipboard: false,
        }
    }
}

impl Config {
    /// Get the project directories
    pub fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "m365-cli", "m365-cli")
    }

    fn home_override() -> Option<PathBuf> {
        std::env::var_os(HOME_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(home) = Self::home_override() {
            return Ok(home.join("config.toml"));
        }
        let dirs = Self::project_dirs().context("Could not determine config directory")?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the cache directory
    pub fn cache_dir() -> Result<PathBuf> {
        if let Some(home) = Self::home_override() {
            return Ok(home.join("cache"));
        }
        let dirs = Self::project_dirs().context("Could not determine cache directory")?;
        Ok(dirs.cache_dir().to_path_buf())
    }

    /// Load configuration from file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;

        if let Ok(url) = std::env::var(GRAPH_URL_ENV) {
            config.api.graph_url = url;
        }
        if let Ok(url) = std::env::var(LOGIN_URL_ENV) {
            config.api.login_url = url;
        }

        Ok(config)
    }

    /// Load configuration from file only
    pub fn load_file() -> Result<Self> {
        let config_path = Self::config_path()?;

        let config: Self = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?
        } else {
            Self::default()
        };

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Ensure directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// All settings as dotted keys (`settings.output`) and their values
    pub fn entries(&self) -> Result<Vec<(String, toml::Value)>> {
        let root = toml::Value::try_from(self).context("Failed to serialize config")?;
        let mut entries = Vec::new();
        if let toml::Value::Table(sections) = root {
            for (section, values) in sections {
                if let toml::Value::Table(values) = values {
                    for (key, value) in values {
                        entries.push((format!("{}.{}", section, key), value));
                    }
                }
            }
        }
        Ok(entries)
    }

    /// Look up a dotted key
    pub fn get(&self, key: &str) -> Result<toml::Value> {
        self.entries()?
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .ok_or_else(|| anyhow!("Unknown setting: {}", key))
    }

    /// Set a dotted key, parsing `raw` according to the existing value's type
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        let (section, name) = key
            .split_once('.')
            .ok_or_else(|| anyhow!("Setting keys have the form <section>.<name>, got {}", key))?;

        let mut root = toml::Value::try_from(&*self).context("Failed to serialize config")?;
        let slot = root
            .get_mut(section)
            .and_then(|s| s.get_mut(name))
            .ok_or_else(|| anyhow!("Unknown setting: {}", key))?;

        *slot = match &*slot {
            toml::Value::Boolean(_) => match raw.to_ascii_lowercase().as_str() {
                "true" => toml::Value::Boolean(true),
                "false" => toml::Value::Boolean(false),
                _ => bail!("{} expects true or false, got {}", key, raw),
            },
            toml::Value::Integer(_) => toml::Value::Integer(
                raw.parse()
                    .with_context(|| format!("{} expects a number, got {}", key, raw))?,
            ),
            _ => toml::Value::String(raw.to_string()),
        };

        let updated: Config = root
            .try_into()
            .with_context(|| format!("Invalid value for {}", key))?;
        updated.check()?;
        *self = updated;
        Ok(())
    }

    fn check(&self) -> Result<()> {
        if !matches!(self.settings.output.as_str(), "json" | "text") {
            bail!(
                "settings.output must be json or text, got {}",
                self.settings.output
            );
        }
        if self.api.timeout == 0 {
            bail!("api.timeout must be at least 1 second");
        }
        Ok(())
    }
}
