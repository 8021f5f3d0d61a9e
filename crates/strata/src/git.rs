//! Git integration for the revision store: commit (and optionally push)
//! every persisted state change, and read the current HEAD commit as the
//! default revision identifier.
//!
//! Shells out to the `git` binary rather than linking a native git
//! library, overridable via `STRATA_GIT_BIN` so tests can inject a fake
//! script instead of touching a real toolchain.

use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};

fn git_program() -> String {
    std::env::var("STRATA_GIT_BIN").unwrap_or_else(|_| "git".to_string())
}

fn run(args: &[&str], cwd: &Path) -> Result<std::process::Output> {
    Command::new(git_program())
        .args(args)
        .current_dir(cwd)
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))
}

/// Current HEAD commit hash, the default revision identifier per §6.
pub fn current_revision(repo_path: &Path) -> Result<String> {
    let output = run(&["rev-parse", "HEAD"], repo_path)?;
    if !output.status.success() {
        return Err(anyhow!(
            "git rev-parse HEAD failed: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Stages every change under `repo_path` and commits with `message`.
/// A no-op (not an error) when there is nothing to commit.
pub fn commit_all(repo_path: &Path, message: &str) -> Result<()> {
    let add = run(&["add", "-A"], repo_path)?;
    if !add.status.success() {
        return Err(anyhow!("git add failed: {}", String::from_utf8_lossy(&add.stderr)));
    }

    let status = run(&["status", "--porcelain"], repo_path)?;
    if status.stdout.is_empty() {
        return Ok(());
    }

    let commit = run(&["commit", "-m", message], repo_path)?;
    if !commit.status.success() {
        return Err(anyhow!(
            "git commit failed: {}",
            String::from_utf8_lossy(&commit.stderr)
        ));
    }
    Ok(())
}

/// Pushes the current branch to `remote`.
pub fn push(repo_path: &Path, remote: &str) -> Result<()> {
    let output = run(&["push", remote], repo_path)?;
    if !output.status.success() {
        return Err(anyhow!("git push failed: {}", String::from_utf8_lossy(&output.stderr)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::process::Command as StdCommand;
    use tempfile::tempdir;

    fn init_repo(dir: &Path) {
        StdCommand::new("git").args(["init"]).current_dir(dir).output().expect("git init");
        StdCommand::new("git")
            .args(["config", "user.email", "test@example.com"])
            .current_dir(dir)
            .output()
            .expect("git config email");
        StdCommand::new("git")
            .args(["config", "user.name", "Test User"])
            .current_dir(dir)
            .output()
            .expect("git config name");
    }

    #[test]
    #[serial]
    fn commit_all_records_a_new_file() {
        let dir = tempdir().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("state.json"), "{}").unwrap();

        commit_all(dir.path(), "update state for revision abc123").unwrap();

        let rev = current_revision(dir.path()).unwrap();
        assert_eq!(rev.len(), 40);
    }

    #[test]
    #[serial]
    fn commit_all_is_a_no_op_when_clean() {
        let dir = tempdir().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("state.json"), "{}").unwrap();
        commit_all(dir.path(), "first commit").unwrap();
        let before = current_revision(dir.path()).unwrap();

        commit_all(dir.path(), "second commit, nothing changed").unwrap();
        let after = current_revision(dir.path()).unwrap();

        assert_eq!(before, after);
    }

    #[test]
    #[serial]
    fn git_bin_override_is_honored() {
        let dir = tempdir().unwrap();
        let fake_bin = dir.path().join("fake-git.sh");
        std::fs::write(&fake_bin, "#!/bin/sh\nexit 7\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&fake_bin).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&fake_bin, perms).unwrap();
        }

        temp_env::with_var("STRATA_GIT_BIN", Some(fake_bin.to_str().unwrap()), || {
            let err = current_revision(dir.path()).unwrap_err();
            assert!(err.to_string().contains("git rev-parse HEAD failed"));
        });
    }
}
