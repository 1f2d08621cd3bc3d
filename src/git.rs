//! Git command boundary
//!
//! Runs the `git` binary for status, diffs, staging and commits. Every
//! failure comes back as an error; deciding what to do with it is left to
//! the caller.

use anyhow::{Context, Result};
use git2::Repository;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::tree::File;

/// Which diff to fetch for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffTarget {
    /// Working tree vs index - `git diff`
    Unstaged,
    /// Index vs HEAD - `git diff --staged`
    Staged,
    /// Whole file as new - `git diff --no-index /dev/null <path>`
    Untracked,
    /// Our side of a conflict vs the worktree - `git diff -2`
    Unmerged,
}

impl DiffTarget {
    /// Pick the most useful diff for a file's current status
    pub fn for_file(file: &File) -> Self {
        if file.is_untracked() {
            DiffTarget::Untracked
        } else if file.is_unmerged() {
            DiffTarget::Unmerged
        } else if file.is_staged() {
            DiffTarget::Staged
        } else {
            DiffTarget::Unstaged
        }
    }
}

/// Operations the application needs from version control
pub trait GitClient {
    /// Raw `--porcelain=v2 --branch` status text
    fn status(&self) -> Result<String>;
    /// Raw unified diff for one path; `rename_from` pairs a staged rename
    /// with its source
    fn diff(&self, path: &str, rename_from: Option<&str>, target: DiffTarget) -> Result<String>;
    fn stage(&self, paths: &[String]) -> Result<()>;
    fn unstage(&self, paths: &[String]) -> Result<()>;
    fn commit(&self, message: &str) -> Result<()>;
}

/// `GitClient` backed by the git command line
#[derive(Debug, Clone)]
pub struct GitCommandLine {
    repo_path: PathBuf,
    context_lines: u32,
}

impl GitCommandLine {
    pub fn new(repo_path: PathBuf, context_lines: u32) -> Self {
        Self {
            repo_path,
            context_lines,
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Run git in the repository root; `ok_codes` lists accepted exit codes
    fn run(&self, args: &[String], ok_codes: &[i32]) -> Result<String> {
        log::debug!("git {}", args.join(" "));

        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_path)
            .args(args)
            .output()
            .with_context(|| format!("Failed to run git {}", args.first().map_or("", String::as_str)))?;

        let code = output.status.code();
        if !code.is_some_and(|c| ok_codes.contains(&c)) {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "git {} failed: {}",
                args.first().map_or("", String::as_str),
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl GitClient for GitCommandLine {
    fn status(&self) -> Result<String> {
        self.run(&to_args(&["status", "-u", "--porcelain=v2", "--branch"]), &[0])
    }

    fn diff(&self, path: &str, rename_from: Option<&str>, target: DiffTarget) -> Result<String> {
        let ok_codes: &[i32] = match target {
            // --no-index exits with 1 when the files differ
            DiffTarget::Untracked => &[0, 1],
            _ => &[0],
        };
        self.run(&diff_args(path, rename_from, target, self.context_lines), ok_codes)
    }

    fn stage(&self, paths: &[String]) -> Result<()> {
        let mut args = to_args(&["add", "--"]);
        args.extend_from_slice(paths);
        self.run(&args, &[0]).map(|_| ())
    }

    fn unstage(&self, paths: &[String]) -> Result<()> {
        let mut args = to_args(&["reset", "-q", "HEAD", "--"]);
        args.extend_from_slice(paths);
        self.run(&args, &[0]).map(|_| ())
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.run(&to_args(&["commit", "-q", "-m", message]), &[0])
            .map(|_| ())
    }
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// Arguments for `git diff` on one path
pub fn diff_args(
    path: &str,
    rename_from: Option<&str>,
    target: DiffTarget,
    context_lines: u32,
) -> Vec<String> {
    let mut args = to_args(&["diff", "--no-color", "--no-ext-diff"]);
    args.push(format!("-U{}", context_lines));

    match target {
        DiffTarget::Unstaged => {}
        DiffTarget::Staged => args.push("--staged".to_string()),
        DiffTarget::Untracked => args.push("--no-index".to_string()),
        DiffTarget::Unmerged => args.push("-2".to_string()),
    }

    // the rename only exists in the index, so only the staged diff pairs it
    let rename_from = rename_from.filter(|_| target == DiffTarget::Staged);
    if rename_from.is_some() {
        args.push("-M".to_string());
    }

    args.push("--".to_string());
    match (target, rename_from) {
        (DiffTarget::Untracked, _) => args.push("/dev/null".to_string()),
        (_, Some(from)) => args.push(from.to_string()),
        _ => {}
    }
    args.push(path.to_string());
    args
}

/// Find the git repository root from a path
pub fn find_repo_root(start: &Path) -> Result<PathBuf> {
    let repo = Repository::discover(start).context("Not in a git repository")?;

    repo.workdir()
        .map(PathBuf::from)
        .context("Repository has no working directory")
}
