//! Configuration for repair-lab
//!
//! Two layers:
//! - user settings (endpoint, key, critic model) in ~/.config/repair-lab/config.json
//! - an optional per-run TOML file describing how to execute oracles and linters

use crate::error::RepairError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CRITIC_MODEL: &str = "gpt-4o-mini";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub api_key: Option<String>,
    /// OpenAI-compatible API root, e.g. `https://openrouter.ai/api/v1`
    pub base_url: Option<String>,
    /// Model used for the `human_feedback` critique
    pub critic_model: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub max_tokens: Option<u32>,
}

impl Config {
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("repair-lab"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk, or return default
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                preserve_corrupt_config(path, &content);
                warn!(
                    path = %path.display(),
                    "config file was corrupted ({}); a backup was saved and defaults were loaded",
                    err
                );
                Self::default()
            }
        }
    }

    /// API key: environment first, then the config file.
    pub fn api_key(&self) -> Option<String> {
        ["REPAIR_LAB_API_KEY", "OPENAI_API_KEY"]
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
            .or_else(|| self.api_key.clone())
    }

    pub fn base_url(&self) -> String {
        std::env::var("REPAIR_LAB_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn critic_model(&self) -> &str {
        self.critic_model.as_deref().unwrap_or(DEFAULT_CRITIC_MODEL)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/repair-lab/config.json".to_string())
    }
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

fn default_verifier_timeout_secs() -> u64 {
    30
}

fn default_linter() -> Vec<String> {
    ["pylint", "--disable=C,R", "--score=n", "{solution}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_oracles() -> HashMap<String, Vec<String>> {
    HashMap::from([(
        "HumanEval".to_string(),
        [
            "python",
            "-m",
            "pytest",
            "-q",
            "-p",
            "no:cacheprovider",
            "{test}",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    )])
}

/// How oracles and the linter are executed.
///
/// Command templates accept the placeholders `{workdir}`, `{solution}`,
/// `{test}` and `{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_verifier_timeout_secs")]
    pub verifier_timeout_secs: u64,
    #[serde(default = "default_linter")]
    pub linter: Vec<String>,
    /// Oracle command per dataset family name.
    #[serde(default = "default_oracles")]
    pub oracles: HashMap<String, Vec<String>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            verifier_timeout_secs: default_verifier_timeout_secs(),
            linter: default_linter(),
            oracles: default_oracles(),
        }
    }
}

impl RunConfig {
    /// Load the TOML run config, falling back to defaults when no path is given.
    /// Oracle entries from the file are merged over the built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read run config '{}'", path.display()))?;
        let mut config: RunConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse run config TOML '{}'", path.display()))?;
        for (family, command) in default_oracles() {
            config.oracles.entry(family).or_insert(command);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RepairError> {
        if self.verifier_timeout_secs == 0 {
            return Err(RepairError::InvalidConfig(
                "verifier_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.linter.is_empty() || self.linter[0].trim().is_empty() {
            return Err(RepairError::InvalidConfig(
                "linter command must not be empty".to_string(),
            ));
        }
        for (family, command) in &self.oracles {
            if command.is_empty() || command[0].trim().is_empty() {
                return Err(RepairError::InvalidConfig(format!(
                    "oracle command for '{}' must not be empty",
                    family
                )));
            }
        }
        Ok(())
    }

    /// Oracle command for a family; required before any verification runs.
    pub fn oracle_for(&self, family: &str) -> Result<&[String], RepairError> {
        self.oracles
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(family))
            .map(|(_, command)| command.as_slice())
            .ok_or_else(|| {
                RepairError::InvalidConfig(format!(
                    "no oracle command configured for dataset '{}' (add [oracles] {} = [...] to the run config)",
                    family, family
                ))
            })
    }

    pub fn verifier_timeout(&self) -> Duration {
        Duration::from_secs(self.verifier_timeout_secs)
    }
}
