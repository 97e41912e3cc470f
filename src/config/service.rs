// src/config/service.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::warn;

use crate::rolling::DEFAULT_WINDOW_SECS;

pub const ENV_CONFIG_PATH: &str = "SCORE_SERVICE_CONFIG";
const DEFAULT_TOML: &str = "config/service.toml";
const DEFAULT_JSON: &str = "config/service.json";

fn default_window_secs() -> u64 {
    DEFAULT_WINDOW_SECS
}
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
fn default_model_path() -> PathBuf {
    PathBuf::from("model.json")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Rolling window retention per user, in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Size of the scoring worker pool.
    #[serde(default = "default_workers")]
    pub scorer_workers: usize,
    /// Model file handed to the scorer at startup.
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    /// Expose `/metrics` (Prometheus).
    #[serde(default)]
    pub metrics_enabled: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            scorer_workers: default_workers(),
            model_path: default_model_path(),
            metrics_enabled: false,
        }
    }
}

impl ServiceConfig {
    /// Load from an explicit path. TOML or JSON, picked by extension with a
    /// fallback to the other format.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading service config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, &ext)
            .with_context(|| format!("parsing service config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Resolve config using env var + fallbacks, then apply env overrides:
    /// 1) $SCORE_SERVICE_CONFIG
    /// 2) config/service.toml
    /// 3) config/service.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                ));
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_TOML).exists() {
            Self::load_from_file(DEFAULT_TOML)?
        } else if Path::new(DEFAULT_JSON).exists() {
            Self::load_from_file(DEFAULT_JSON)?
        } else {
            Self::default()
        };
        Ok(base.with_env_overrides().sanitized())
    }

    /// `WINDOW_SECONDS`, `SCORER_WORKERS`, `MODEL_PATH`, `METRICS_ENABLED`.
    /// Values that fail to parse are ignored with a warning.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parsed::<u64>("WINDOW_SECONDS") {
            self.window_secs = v;
        }
        if let Some(v) = env_parsed::<usize>("SCORER_WORKERS") {
            self.scorer_workers = v;
        }
        if let Ok(v) = env::var("MODEL_PATH") {
            if !v.trim().is_empty() {
                self.model_path = PathBuf::from(v.trim());
            }
        }
        if let Ok(v) = env::var("METRICS_ENABLED") {
            self.metrics_enabled = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true");
        }
        self
    }

    fn sanitized(mut self) -> Self {
        if self.scorer_workers == 0 {
            self.scorer_workers = 1;
        }
        self
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable env override");
            None
        }
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<ServiceConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s)
            .or_else(|_| toml::from_str(s))
            .map_err(|e| anyhow!("unsupported service config format: {e}"));
    }
    toml::from_str(s)
        .or_else(|_| serde_json::from_str(s))
        .map_err(|e| anyhow!("unsupported service config format: {e}"))
}
