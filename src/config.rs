//! Runtime configuration.
//!
//! Values come from three layers, later ones winning:
//!
//! 1. built-in defaults (the two Chinese tech sites, 12 items, 15 s timeout)
//! 2. an optional YAML file (`--config` / `DIGEST_CONFIG`)
//! 3. CLI flags and their environment variables
//!
//! # Example
//!
//! ```yaml
//! max_items: 10
//! timeout_secs: 20
//! sources:
//!   - name: IT之家
//!     url: https://www.ithome.com/
//!     rule:
//!       min_title_chars: 4
//!       max_title_chars: 100
//!       required_domains: ["ithome.com"]
//! ```

use crate::cli::Cli;
use crate::error::{DigestError, Result};
use crate::rules::{SourceConfig, builtin_sources};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub const DEFAULT_MAX_ITEMS: usize = 12;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; DailyTechBroadcast/1.0)";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub max_items: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Encodings tried, in order, when a page does not decode as declared.
    pub encodings: Vec<String>,
    /// Sources in priority order.
    pub sources: Vec<SourceConfig>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            encodings: vec!["utf-8".to_string(), "gbk".to_string(), "gb18030".to_string()],
            sources: builtin_sources(),
        }
    }
}

impl DigestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parse a YAML document. Missing keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: DigestConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI overrides on top of the file values.
    pub fn with_overrides(mut self, args: &Cli) -> Result<Self> {
        if let Some(max_items) = args.max_items {
            self.max_items = max_items;
        }
        if let Some(timeout_secs) = args.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(DigestError::config("timeout_secs must be greater than zero"));
        }
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(DigestError::config(format!("source {} has an empty name", source.url)));
            }
            let url = Url::parse(&source.url)?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(DigestError::config(format!(
                    "source {} must use http or https, got {}",
                    source.name,
                    url.scheme()
                )));
            }
            if source.rule.min_title_chars > source.rule.max_title_chars {
                return Err(DigestError::config(format!(
                    "source {}: min_title_chars ({}) exceeds max_title_chars ({})",
                    source.name, source.rule.min_title_chars, source.rule.max_title_chars
                )));
            }
        }
        Ok(())
    }
}

/// Load the configuration file if one is given, then apply CLI overrides.
#[instrument(level = "info", skip(args))]
pub async fn load_config(path: Option<&Path>, args: &Cli) -> Result<DigestConfig> {
    let config = match path {
        Some(path) => {
            let yaml = tokio::fs::read_to_string(path).await?;
            let config = DigestConfig::from_yaml(&yaml)?;
            info!(path = %path.display(), sources = config.sources.len(), "Loaded configuration file");
            config
        }
        None => DigestConfig::default(),
    };
    config.with_overrides(args)
}
