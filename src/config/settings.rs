use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::dns::Credentials;

pub const DEFAULT_RESOLVER_URL: &str = "http://icanhazip.com";
pub const DEFAULT_API_URL: &str = "https://www.cloudflare.com/api_json.html";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    pub zone: ZoneConfig,
    pub ip: IpSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_change_log")]
    pub change_log: PathBuf,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_change_log() -> PathBuf {
    #[cfg(unix)]
    {
        PathBuf::from("/var/lib/cfddns/last_ip")
    }
    #[cfg(windows)]
    {
        PathBuf::from(r"C:\ProgramData\cfddns\last_ip")
    }
}

fn default_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub name: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub hostnames: Vec<String>,
}

fn default_provider() -> String {
    "cloudflare".to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_resolver_url() -> String {
    DEFAULT_RESOLVER_URL.to_string()
}

/// Where the current address comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum IpSource {
    Remote {
        #[serde(default = "default_resolver_url")]
        resolver_url: String,
    },
    Interface {
        interface: String,
    },
}

impl fmt::Display for IpSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpSource::Remote { resolver_url } => write!(f, "remote ({})", resolver_url),
            IpSource::Interface { interface } => write!(f, "interface ({})", interface),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        settings
            .validate()
            .with_context(|| format!("Invalid config file: {}", config_path.display()))?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.zone.name.trim().is_empty() {
            bail!("zone.name must not be empty");
        }

        check_http_url("zone.api_url", &self.zone.api_url)?;

        let mut seen = HashSet::new();
        for hostname in &self.zone.hostnames {
            if hostname.trim().is_empty() {
                bail!("zone.hostnames must not contain empty entries");
            }
            if !seen.insert(hostname.as_str()) {
                bail!("zone.hostnames lists {} more than once", hostname);
            }
        }

        match &self.ip {
            IpSource::Remote { resolver_url } => check_http_url("ip.resolver_url", resolver_url)?,
            IpSource::Interface { interface } => {
                if interface.trim().is_empty() {
                    bail!("ip.interface must not be empty");
                }
            }
        }

        if self.agent.timeout_seconds == 0 {
            bail!("agent.timeout_seconds must be greater than zero");
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.agent.timeout_seconds)
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn config_dir() -> PathBuf {
        #[cfg(unix)]
        {
            PathBuf::from("/etc/cfddns")
        }
        #[cfg(windows)]
        {
            PathBuf::from(r"C:\ProgramData\cfddns")
        }
    }
}

fn check_http_url(field: &str, url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("{} must be an http(s) URL, got {:?}", field, url);
    }
    Ok(())
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: None,
            change_log: default_change_log(),
            timeout_seconds: default_timeout(),
        }
    }
}
