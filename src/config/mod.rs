// src/config/mod.rs
//! Service configuration: env var → file (TOML or JSON) → defaults, then env overrides.

pub mod feed;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use self::feed::FeedConfig;

pub const ENV_CONFIG_PATH: &str = "ANALYZER_CONFIG_PATH";
pub const ENV_FEED_URL: &str = "FEED_URL";
pub const ENV_MAX_WINDOW_SECS: &str = "ANALYSIS_MAX_WINDOW_SECS";

const DEFAULT_TOML_PATH: &str = "config/analyzer.toml";
const DEFAULT_JSON_PATH: &str = "config/analyzer.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Upper bound for `duration`; `None` means unlimited.
    #[serde(default)]
    pub max_window_secs: Option<u64>,
}

impl AnalysisConfig {
    pub fn max_window(&self) -> Option<Duration> {
        self.max_window_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Load from an explicit path. Format follows the extension (TOML unless `.json`).
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, &ext)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.feed.sanitize();
        Ok(cfg)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $ANALYZER_CONFIG_PATH
    /// 2) config/analyzer.toml
    /// 3) config/analyzer.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
                }
                Self::load_from(&pb)?
            }
            Err(_) => {
                let toml_p = PathBuf::from(DEFAULT_TOML_PATH);
                let json_p = PathBuf::from(DEFAULT_JSON_PATH);
                if toml_p.exists() {
                    Self::load_from(&toml_p)?
                } else if json_p.exists() {
                    Self::load_from(&json_p)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(ENV_FEED_URL) {
            self.feed.url = url;
            self.feed.sanitize();
        }
        if let Ok(raw) = std::env::var(ENV_MAX_WINDOW_SECS) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{ENV_MAX_WINDOW_SECS} must be whole seconds"))?;
            self.analysis.max_window_secs = Some(secs);
        }
        Ok(())
    }
}

fn parse_config(s: &str, ext: &str) -> Result<AppConfig> {
    if ext == "json" {
        return Ok(serde_json::from_str(s)?);
    }
    Ok(toml::from_str(s)?)
}
