// src/config/insights.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_INSIGHTS_CONFIG_PATH: &str = "config/insights.toml";
pub const ENV_INSIGHTS_CONFIG_PATH: &str = "INSIGHTS_CONFIG_PATH";
pub const ENV_CACHE_TTL_MS: &str = "INSIGHTS_CACHE_TTL_MS";
pub const ENV_CACHE_MAX_ENTRIES: &str = "INSIGHTS_CACHE_MAX_ENTRIES";
pub const ENV_BIND: &str = "INSIGHTS_BIND";
pub const ENV_DATASET_PATH: &str = "INSIGHTS_DATASET_PATH";

fn default_max_entries() -> usize {
    500
}
fn default_ttl_ms() -> u64 {
    300_000
}
fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/returns.json")
}
fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// 0 expires entries immediately, so every lookup recomputes.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_ms: default_ttl_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,
    /// Precomputed unfiltered response loaded into the cache at startup.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            snapshot_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightsConfig {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub server: ServerSection,
}

fn parse_env<T: std::str::FromStr>(raw: Option<String>) -> Option<T> {
    raw.and_then(|s| s.trim().parse::<T>().ok())
}

impl InsightsConfig {
    /// Load from `$INSIGHTS_CONFIG_PATH` or `config/insights.toml`, then apply env overrides.
    /// A missing file yields defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_INSIGHTS_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_INSIGHTS_CONFIG_PATH));

        let mut cfg = if path.exists() {
            Self::from_path(&path)?
        } else {
            tracing::debug!(path = %path.display(), "config file not found; using defaults");
            Self::default()
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        let var = |name: &str| std::env::var(name).ok();

        if let Some(ttl) = parse_env::<u64>(var(ENV_CACHE_TTL_MS)) {
            self.cache.ttl_ms = ttl;
        }
        if let Some(max) = parse_env::<usize>(var(ENV_CACHE_MAX_ENTRIES)) {
            self.cache.max_entries = max;
        }
        if let Some(bind) = var(ENV_BIND).filter(|b| !b.trim().is_empty()) {
            self.server.bind = bind.trim().to_string();
        }
        if let Some(p) = var(ENV_DATASET_PATH).filter(|p| !p.trim().is_empty()) {
            self.data.dataset_path = PathBuf::from(p.trim());
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache.ttl_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn clear_env() {
        for k in [
            ENV_INSIGHTS_CONFIG_PATH,
            ENV_CACHE_TTL_MS,
            ENV_CACHE_MAX_ENTRIES,
            ENV_BIND,
            ENV_DATASET_PATH,
        ] {
            env::remove_var(k);
        }
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = InsightsConfig::from_toml_str(
            r#"
            [cache]
            ttl_ms = 1000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.cache.ttl_ms, 1000);
        assert_eq!(cfg.cache.max_entries, 500);
        assert_eq!(cfg.server.bind, "127.0.0.1:8000");
        assert_eq!(cfg.data.dataset_path, PathBuf::from("data/returns.json"));
        assert_eq!(cfg.data.snapshot_path, None);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(InsightsConfig::from_toml_str("[cache\nttl_ms = ").is_err());
        assert!(InsightsConfig::from_toml_str("[cache]\nttl_ms = \"soon\"").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn missing_file_gives_defaults() {
        clear_env();
        let tmp = tempfile::tempdir().unwrap();
        env::set_var(
            ENV_INSIGHTS_CONFIG_PATH,
            tmp.path().join("nope.toml").display().to_string(),
        );
        let cfg = InsightsConfig::load().unwrap();
        assert_eq!(cfg, InsightsConfig::default());
        clear_env();
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_file_and_bad_values_are_ignored() {
        clear_env();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("insights.toml");
        fs::write(
            &path,
            "[cache]\nmax_entries = 10\nttl_ms = 50\n[server]\nbind = \"0.0.0.0:9000\"\n",
        )
        .unwrap();

        env::set_var(ENV_INSIGHTS_CONFIG_PATH, path.display().to_string());
        env::set_var(ENV_CACHE_TTL_MS, "2500");
        env::set_var(ENV_CACHE_MAX_ENTRIES, "lots");
        env::set_var(ENV_DATASET_PATH, " /tmp/returns.json ");

        let cfg = InsightsConfig::load().unwrap();
        assert_eq!(cfg.cache.ttl_ms, 2500);
        assert_eq!(cfg.cache.max_entries, 10, "bad env value is ignored");
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
        assert_eq!(cfg.data.dataset_path, PathBuf::from("/tmp/returns.json"));
        assert_eq!(cfg.cache_ttl(), Duration::from_millis(2500));
        clear_env();
    }

    #[serial_test::serial]
    #[test]
    fn malformed_file_error_names_the_path() {
        clear_env();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.toml");
        fs::write(&path, "[cache\n").unwrap();
        env::set_var(ENV_INSIGHTS_CONFIG_PATH, path.display().to_string());

        let err = InsightsConfig::load().unwrap_err();
        assert!(format!("{err:#}").contains("broken.toml"));
        clear_env();
    }
}
