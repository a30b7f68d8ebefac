use serde::Deserialize;

use crate::utils;

pub const DEFAULT_MAX_PASSES: usize = 5;

/// Name servers used by the default http client.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsUpstream {
    #[default]
    Cloudflare,
    Google,
    Quad9,
    /// Whatever the platform resolver answers.
    System,
}

/// Tunables for the resolvers, the dispatcher and the default http client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound of locate/unpack iterations per mirror page.
    pub max_passes: usize,
    /// How many mirrors are resolved at the same time.
    pub concurrency: usize,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub user_agent: String,
    pub dns: DnsUpstream,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            concurrency: 4,
            connect_timeout_secs: 5,
            read_timeout_secs: 30,
            user_agent: utils::get_user_agent().into(),
            dns: DnsUpstream::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> anyhow::Result<EngineConfig> {
        let config: EngineConfig = serde_json::from_str(json)?;
        if config.max_passes == 0 || config.concurrency == 0 {
            anyhow::bail!("max_passes and concurrency must be positive");
        }
        Ok(config)
    }
}
