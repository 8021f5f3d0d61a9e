//! Configuration file support (`.strata.toml`).
//!
//! Mirrors the on-disk shape from §6: a `state` table controlling the
//! Git-backed revision store, a `project` table naming the source
//! repository, a `deploy_filename`, a list of `plugins`, and a free-form
//! `vars` map exposed to deploy-file evaluation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_deploy_filename() -> String {
    "DEPLOY".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StateConfig {
    pub repo_path: PathBuf,
    #[serde(default)]
    pub base_path: Option<PathBuf>,
    #[serde(default)]
    pub push: bool,
    #[serde(default)]
    pub remote_location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectConfig {
    pub repo_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub state: StateConfig,
    pub project: ProjectConfig,
    #[serde(default = "default_deploy_filename")]
    pub deploy_filename: String,
    #[serde(default)]
    pub plugins: Vec<String>,
    #[serde(default)]
    pub vars: BTreeMap<String, Value>,
}

/// CLI flags that shadow config values when present. `None` means "flag
/// not passed, use the config value" — mirrors the teacher's own
/// `CliOverrides` convention of Option-typed fields over the parsed file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub cwd: Option<PathBuf>,
    pub revision: Option<String>,
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.state.repo_path.as_os_str().is_empty() {
            bail!("state.repo_path is required");
        }
        if self.project.repo_path.as_os_str().is_empty() {
            bail!("project.repo_path is required");
        }
        if self.state.push && self.state.remote_location.is_none() {
            bail!("state.remote_location is required when state.push is true");
        }
        Ok(())
    }

    /// Absolute path to the state repo's revisions directory, honoring
    /// `state.base_path` if set.
    pub fn state_dir(&self) -> PathBuf {
        match &self.state.base_path {
            Some(base) => self.state.repo_path.join(base),
            None => self.state.repo_path.clone(),
        }
    }
}
