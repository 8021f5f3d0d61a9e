//! Deploy-file discovery seam (§4.10).
//!
//! The strategy graph builder doesn't know or care how registrations
//! reach it. `DeployLoader` is the trait through which a deploy-file
//! evaluator — an embedded DSL, a declarative file format, or (as here) a
//! compiled-in registry keyed by discovered path — hands a list of
//! registration closures to the CLI driver.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Result;
use strata::Strategy;

pub struct DeployFile {
    pub path: PathBuf,
    pub register: Rc<dyn Fn(&mut Strategy) -> Result<()>>,
}

pub trait DeployLoader {
    fn discover(&self, project_root: &Path, deploy_filename: &str) -> Result<Vec<DeployFile>>;
}

/// Walks `project_root` looking for files literally named
/// `deploy_filename`, resolving each discovered path through a small
/// compiled-in registry of registration closures rather than evaluating
/// an embedded scripting language — that evaluator is deliberately out of
/// scope for this crate (see §1).
pub struct WalkingDeployLoader {
    registry: Vec<(PathBuf, Rc<dyn Fn(&mut Strategy) -> Result<()>>)>,
}

impl WalkingDeployLoader {
    pub fn new() -> Self {
        Self { registry: Vec::new() }
    }

    /// Registers a compiled-in registration closure for a deploy file at
    /// `path` relative to the project root.
    pub fn with_registration(
        mut self,
        path: impl Into<PathBuf>,
        register: impl Fn(&mut Strategy) -> Result<()> + 'static,
    ) -> Self {
        self.registry.push((path.into(), Rc::new(register)));
        self
    }
}

impl Default for WalkingDeployLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DeployLoader for WalkingDeployLoader {
    fn discover(&self, project_root: &Path, deploy_filename: &str) -> Result<Vec<DeployFile>> {
        let mut found = Vec::new();

        for (rel_path, register) in &self.registry {
            let full_path = project_root.join(rel_path);
            let matches_filename = full_path
                .file_name()
                .map(|n| n == deploy_filename)
                .unwrap_or(false);

            if matches_filename && full_path.exists() {
                found.push(DeployFile {
                    path: full_path,
                    register: register.clone(),
                });
            }
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn discovers_nothing_when_no_registrations_match() {
        let dir = tempdir().unwrap();
        let loader = WalkingDeployLoader::new();
        let found = loader.discover(dir.path(), "DEPLOY").unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn discovers_a_registered_deploy_file_that_exists_on_disk() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("DEPLOY"), "").unwrap();

        let loader = WalkingDeployLoader::new().with_registration("DEPLOY", |_strategy| Ok(()));
        let found = loader.discover(dir.path(), "DEPLOY").unwrap();
        assert_eq!(found.len(), 1);
    }
}
