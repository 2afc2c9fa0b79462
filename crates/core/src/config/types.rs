use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub draw: DrawConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("demolot.db")
}

/// How winners are picked among eligible members.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Weighted towards members with fewer wins in the demo.
    #[default]
    Fair,
    /// Every eligible member has the same chance.
    Uniform,
}

impl SelectionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionPolicy::Fair => "fair",
            SelectionPolicy::Uniform => "uniform",
        }
    }
}

/// Draw engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DrawConfig {
    #[serde(default)]
    pub policy: SelectionPolicy,
    /// Whether a task owner is barred from winning their own task.
    #[serde(default = "default_exclude_owner")]
    pub exclude_owner: bool,
    /// Fixed RNG seed for reproducible draws. Random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::default(),
            exclude_owner: default_exclude_owner(),
            seed: None,
        }
    }
}

fn default_exclude_owner() -> bool {
    true
}

/// Sanitized config for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub draw: SanitizedDrawConfig,
}

/// Draw config without the seed value
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDrawConfig {
    pub policy: String,
    pub exclude_owner: bool,
    pub seeded: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            draw: SanitizedDrawConfig {
                policy: config.draw.policy.as_str().to_string(),
                exclude_owner: config.draw.exclude_owner,
                seeded: config.draw.seed.is_some(),
            },
        }
    }
}
