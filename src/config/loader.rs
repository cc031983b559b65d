//! Configuration loader with tier-based merging.
//!
//! Three tiers, lowest to highest precedence: embedded defaults, an
//! optional YAML config file, and `CONFSERVE_*` environment variables.
//! Tiers are merged field-by-field through JSON values, so a file that
//! sets only `server.port` keeps every other default.

use super::types::Config;
use crate::merge::deep_merge;
use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the working directory.
const LOCAL_CONFIG_FILE: &str = "confserve.yaml";

/// Config file under the user directory (`~/.confserve/`).
const USER_CONFIG_FILE: &str = "config.yaml";

/// Loads and merges service configuration.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: Config,
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration, optionally from an explicit file path.
    ///
    /// With no explicit path, `confserve.yaml` in the working directory
    /// is preferred, then `~/.confserve/config.yaml`; a missing file is
    /// not an error, the defaults simply apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut merged = serde_json::to_value(Config::default())?;
        let mut config_path = None;

        if let Some(path) = Self::discover(explicit) {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("could not read config file {}", path.display()))?;
            let file_value: Value = serde_yaml::from_str(&text)
                .with_context(|| format!("could not parse config file {}", path.display()))?;
            merged = deep_merge(merged, file_value);
            config_path = Some(path);
        }

        merged = deep_merge(merged, Self::env_overrides());

        let config: Config =
            serde_json::from_value(merged).context("invalid configuration after merging")?;

        if let Some(ref path) = config_path {
            debug!(path = %path.display(), "loaded configuration file");
        }

        Ok(Self {
            config,
            config_path,
        })
    }

    /// The merged configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable access, for CLI overrides applied after loading.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Path of the config file that was used, if any.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    fn discover(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }

        let user = dirs::home_dir()?.join(".confserve").join(USER_CONFIG_FILE);
        if user.exists() {
            return Some(user);
        }

        None
    }

    /// Environment-variable tier. Unparseable values are ignored rather
    /// than fatal; the service should still start with a bad `PORT`.
    fn env_overrides() -> Value {
        let mut overlay = json!({});

        if let Ok(bind) = std::env::var("CONFSERVE_BIND") {
            overlay["server"]["bind"] = json!(bind);
        }
        if let Some(port) = std::env::var("CONFSERVE_PORT")
            .ok()
            .and_then(|raw| raw.parse::<u16>().ok())
        {
            overlay["server"]["port"] = json!(port);
        }
        if let Ok(path) = std::env::var("CONFSERVE_DB") {
            overlay["storage"]["path"] = json!(path);
        }
        if let Some(timeout) = std::env::var("CONFSERVE_TIMEOUT_MS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
        {
            overlay["resolution"]["timeout_ms"] = json!(timeout);
        }

        overlay
    }
}
