use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub redmine: RedmineConfig,
    pub mailgun: Option<MailgunConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub url: String,
    /// How long a cached issue snapshot stays correlatable with its
    /// finished event. Builds running longer than this fall back to a
    /// fresh issue query.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedmineConfig {
    pub host: String,
    pub api_key: String,
    /// Workflow status id marking issues as eligible for a build.
    pub ready_status: u32,
    /// Workflow status id issues move to once the build succeeds.
    pub done_status: u32,
    /// Custom field id stamped with the build number.
    pub build_field_id: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailgunConfig {
    pub domain: String,
    pub api_key: String,
    pub sender: String,
    pub recipient: String,
}

fn default_cache_ttl() -> u64 { 4 * 60 * 60 }
