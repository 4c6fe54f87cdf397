//! Workspace manager: one shared shallow clone plus a per-run git worktree
//! on a named branch, so concurrent runs don't multiply storage.

use crate::error::{HarnessError, HarnessResult};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct WorktreeInfo {
    pub path: PathBuf,
    pub branch: String,
}

pub struct WorkspaceManager {
    experiment_dir: PathBuf,
    repo_url: String,
    unnamed_counter: AtomicU64,
}

impl WorkspaceManager {
    pub fn new(experiment_dir: impl Into<PathBuf>, repo_url: impl Into<String>) -> Self {
        Self {
            experiment_dir: experiment_dir.into(),
            repo_url: repo_url.into(),
            unnamed_counter: AtomicU64::new(0),
        }
    }

    pub fn repo_dir(&self) -> PathBuf {
        self.experiment_dir.join("repo")
    }

    fn run_git(&self, dir: &Path, args: &[&str]) -> HarnessResult<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| HarnessError::git("execute", e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HarnessError::git(args.join(" "), stderr.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Idempotent: a no-op if the shared clone already exists. Optionally
    /// checks out a specific commit after a shallow `fetch --depth=1`.
    /// Checkout failure is fatal; the preceding fetch's failure is only
    /// logged at debug since the commit may already be present in the
    /// shallow history.
    pub fn setup_base_repo(&self, commit: Option<&str>) -> HarnessResult<()> {
        let repo_dir = self.repo_dir();
        if repo_dir.join(".git").exists() {
            tracing::debug!(path = %repo_dir.display(), "base repo already present, skipping clone");
        } else {
            std::fs::create_dir_all(
                repo_dir
                    .parent()
                    .ok_or_else(|| HarnessError::workspace("repo dir has no parent"))?,
            )?;
            let output = Command::new("git")
                .args(["clone", "--depth=1", &self.repo_url, repo_dir.to_str().unwrap_or_default()])
                .output()
                .map_err(|e| HarnessError::git("clone", e.to_string()))?;
            if !output.status.success() {
                return Err(HarnessError::git("clone", String::from_utf8_lossy(&output.stderr).to_string()));
            }
        }

        if let Some(commit) = commit {
            if let Err(e) = self.run_git(&repo_dir, &["fetch", "--depth=1", "origin", commit]) {
                tracing::debug!(error = %e, "shallow fetch of target commit failed, commit may already be present");
            }
            self.checkout_commit(&repo_dir, commit)?;
        }

        Ok(())
    }

    fn checkout_commit(&self, repo_dir: &Path, commit: &str) -> HarnessResult<()> {
        self.run_git(repo_dir, &["checkout", commit]).map(|_| ())
    }

    /// Create a per-run worktree at `runs/{tier}/{subtest}/run_{num}` on a
    /// named branch `{tier}_{subtest}_{run}`, or `worktree-{counter}` if
    /// either key is empty (unnamed fallback). The run number is part of the
    /// branch name because runs within a subtest execute concurrently, each
    /// needing its own checked-out branch.
    pub fn create_worktree(&self, tier: &str, subtest: &str, run: u32) -> HarnessResult<WorktreeInfo> {
        let path = self
            .experiment_dir
            .join("runs")
            .join(tier)
            .join(subtest)
            .join(format!("run_{}", run));

        let branch = if tier.is_empty() || subtest.is_empty() {
            let n = self.unnamed_counter.fetch_add(1, Ordering::Relaxed);
            format!("worktree-{}", n)
        } else {
            format!("{}_{}_{}", tier, subtest, run)
        };

        if path.exists() {
            return Err(HarnessError::workspace(format!("worktree path already exists: {}", path.display())));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        self.run_git(
            &self.repo_dir(),
            &["worktree", "add", "-b", &branch, path.to_str().unwrap_or_default()],
        )?;

        Ok(WorktreeInfo { path, branch })
    }

    /// Remove a worktree and delete its branch. Cleanup errors are logged as
    /// warnings, not fatal — a leftover worktree doesn't invalidate the run.
    pub fn cleanup_worktree(&self, info: &WorktreeInfo) {
        if let Err(e) = self.run_git(&self.repo_dir(), &["worktree", "remove", "--force", info.path.to_str().unwrap_or_default()]) {
            tracing::warn!(path = %info.path.display(), error = %e, "failed to remove worktree");
        }
        if let Err(e) = self.run_git(&self.repo_dir(), &["branch", "-D", &info.branch]) {
            tracing::warn!(branch = %info.branch, error = %e, "failed to delete worktree branch");
        }
    }

    /// Run `git worktree prune` on teardown to reclaim metadata for
    /// manually-removed worktree directories.
    pub fn prune_all(&self) -> HarnessResult<()> {
        self.run_git(&self.repo_dir(), &["worktree", "prune"]).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;
    use tempfile::tempdir;

    fn init_bare_source_repo() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        StdCommand::new("git").args(["init"]).current_dir(dir.path()).output().unwrap();
        StdCommand::new("git").args(["config", "user.email", "t@t.com"]).current_dir(dir.path()).output().unwrap();
        StdCommand::new("git").args(["config", "user.name", "T"]).current_dir(dir.path()).output().unwrap();
        std::fs::write(dir.path().join("README.md"), "hi").unwrap();
        StdCommand::new("git").args(["add", "."]).current_dir(dir.path()).output().unwrap();
        StdCommand::new("git").args(["commit", "-m", "init"]).current_dir(dir.path()).output().unwrap();
        dir
    }

    #[test]
    fn setup_base_repo_is_idempotent() {
        let source = init_bare_source_repo();
        let exp_dir = tempdir().unwrap();
        let mgr = WorkspaceManager::new(exp_dir.path(), source.path().to_str().unwrap());

        mgr.setup_base_repo(None).unwrap();
        assert!(mgr.repo_dir().join(".git").exists());
        mgr.setup_base_repo(None).unwrap();
    }

    #[test]
    fn create_and_cleanup_worktree() {
        let source = init_bare_source_repo();
        let exp_dir = tempdir().unwrap();
        let mgr = WorkspaceManager::new(exp_dir.path(), source.path().to_str().unwrap());
        mgr.setup_base_repo(None).unwrap();

        let info = mgr.create_worktree("T0", "00", 1).unwrap();
        assert_eq!(info.branch, "T0_00_1");
        assert!(info.path.exists());

        mgr.cleanup_worktree(&info);
        assert!(!info.path.exists());
    }

    #[test]
    fn unnamed_worktree_falls_back_to_counter_branch() {
        let source = init_bare_source_repo();
        let exp_dir = tempdir().unwrap();
        let mgr = WorkspaceManager::new(exp_dir.path(), source.path().to_str().unwrap());
        mgr.setup_base_repo(None).unwrap();

        let info = mgr.create_worktree("", "", 1).unwrap();
        assert!(info.branch.starts_with("worktree-"));
    }
}
