use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime configuration for the analysis engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub fetch: FetchConfig,
    pub dns: DnsConfig,
    pub model_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub enabled: bool,
    pub timeout_seconds: u64,
    pub max_redirects: usize,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsConfig {
    pub enabled: bool,
    pub timeout_seconds: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            dns: DnsConfig::default(),
            model_version: "1.0".to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_seconds: 5,
            max_redirects: 10,
            user_agent: format!("PhishGuard/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_seconds: 5,
        }
    }
}

impl AnalyzerConfig {
    /// Build a config that never touches the network. Page-dependent features
    /// degrade to their documented fallbacks.
    pub fn offline() -> Self {
        let mut config = Self::default();
        config.fetch.enabled = false;
        config.dns.enabled = false;
        config
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }
}
