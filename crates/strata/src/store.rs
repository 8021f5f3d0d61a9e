//! Revision store: a content-addressed-on-disk mapping from revision id
//! to serialized plan, backed by a Git repository per §4.6.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::git;
use crate::observe::Reporter;
use crate::plan::{Plan, Revision};

pub trait RevisionStore {
    fn init_state(&self) -> Result<()>;
    fn init_revision(&self, revision: &str) -> Result<()>;
    fn save_revision(&self, revision: &str, plan: &Plan) -> Result<()>;
    fn load_revision(&self, revision: &str) -> Result<Option<Revision>>;
}

/// Filesystem + Git-backed implementation. `state_dir` is the directory
/// named by `state.repo_path` (optionally joined with `state.base_path`);
/// it must itself be (or live inside) a Git working tree.
pub struct GitRevisionStore<'a> {
    state_dir: PathBuf,
    repo_path: PathBuf,
    push: bool,
    remote: Option<String>,
    reporter: &'a dyn Reporter,
}

impl<'a> GitRevisionStore<'a> {
    pub fn new(
        state_dir: PathBuf,
        repo_path: PathBuf,
        push: bool,
        remote: Option<String>,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            state_dir,
            repo_path,
            push,
            remote,
            reporter,
        }
    }

    fn revisions_dir(&self) -> PathBuf {
        self.state_dir.join("revisions")
    }

    fn revision_dir(&self, revision: &str) -> PathBuf {
        self.revisions_dir().join(revision)
    }

    fn state_path(&self, revision: &str) -> PathBuf {
        self.revision_dir(revision).join("state.json")
    }
}

impl<'a> RevisionStore for GitRevisionStore<'a> {
    fn init_state(&self) -> Result<()> {
        fs::create_dir_all(self.revisions_dir())
            .with_context(|| format!("failed to create {}", self.revisions_dir().display()))?;
        Ok(())
    }

    fn init_revision(&self, revision: &str) -> Result<()> {
        let dir = self.revision_dir(revision);
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(())
    }

    fn save_revision(&self, revision: &str, plan: &Plan) -> Result<()> {
        self.init_revision(revision)?;

        let record = Revision { plan: plan.clone() };
        let path = self.state_path(revision);
        atomic_write_canonical_json(&path, &record)?;

        git::commit_all(&self.repo_path, &format!("update state for revision {revision}"))?;
        self.reporter
            .info(&format!("persisted revision {revision} ({} actions)", plan.actions.len()));

        if self.push {
            let remote = self
                .remote
                .as_deref()
                .context("state.push is set but no remote_location configured")?;
            git::push(&self.repo_path, remote)?;
            self.reporter.info(&format!("pushed state to {remote}"));
        }

        Ok(())
    }

    fn load_revision(&self, revision: &str) -> Result<Option<Revision>> {
        let path = self.state_path(revision);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let revision: Revision =
            serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Some(revision))
    }
}

/// Serializes `value` with sorted keys and 4-space indentation, then
/// writes it atomically: a sibling `.tmp` file, `fsync`, rename into
/// place, best-effort parent-directory `fsync`. A crash mid-write never
/// leaves `state.json` truncated.
fn atomic_write_canonical_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    // Round-tripping through `serde_json::Value` (a `BTreeMap`-backed
    // object without the `preserve_order` feature) sorts keys regardless
    // of the struct's field declaration order.
    let canonical = serde_json::to_value(value).context("failed to serialize value")?;
    let mut data = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut data, serde_json::ser::PrettyFormatter::with_indent(b"    "));
    serde::Serialize::serialize(&canonical, &mut serializer).context("failed to format JSON")?;

    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp).with_context(|| format!("failed to create {}", tmp.display()))?;
        file.write_all(&data).with_context(|| format!("failed to write {}", tmp.display()))?;
        file.sync_all().ok();
    }
    fs::rename(&tmp, path).with_context(|| format!("failed to rename {} to {}", tmp.display(), path.display()))?;
    fsync_parent_dir(path);
    Ok(())
}

fn fsync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}
