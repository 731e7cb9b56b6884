// src/vcs/mod.rs

//! Version-control collaborators used by checkout jobs.
//!
//! Only git is implemented ([`git::GitClient`], backed by `git2`). Other kinds
//! are still representable so that a plan naming them loads, and the checkout
//! job can report them as unsupported.

pub mod git;

use std::fmt;
use std::path::Path;

use anyhow::Result;

pub use git::GitClient;

/// Kind of repository declared in the plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VcsKind {
    Git,
    Other(String),
}

impl From<&str> for VcsKind {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "git" => VcsKind::Git,
            other => VcsKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsKind::Git => f.write_str("git"),
            VcsKind::Other(kind) => f.write_str(kind),
        }
    }
}

/// Client able to materialise a repository revision into a working directory.
pub trait VcsClient: Send + Sync {
    /// Prepare `working_dir` as a repository. Idempotent.
    fn init(&self, working_dir: &Path) -> Result<()>;

    /// Bring `working_dir` to `revision` of `url`.
    ///
    /// With `force`, local modifications and untracked files are discarded.
    fn update(&self, working_dir: &Path, url: &str, revision: &str, force: bool) -> Result<()>;
}
