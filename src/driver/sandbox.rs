// src/driver/sandbox.rs

//! Filesystem layout shared by every job: the sandbox, per-spec build
//! spaces, and the store handle.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Root working area of a graph execution.
///
/// ```text
/// <root>/
///   vcs/            checkouts, one directory per repository
///   tmp/cache/      packaged sources, one directory per source name
///   <build_space>/  one per spec (see [`BuildSpace`])
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn vcs_dir(&self) -> PathBuf {
        self.root.join("vcs")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    /// Where create-source jobs leave packaged sources for install-source jobs.
    pub fn tmp_cache_dir(&self) -> PathBuf {
        self.tmp_dir().join("cache")
    }

    /// Create the sandbox skeleton. Idempotent.
    pub fn create(&self) -> Result<()> {
        for dir in [self.root.clone(), self.vcs_dir(), self.tmp_cache_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("creating sandbox dir {:?}", dir))?;
        }
        debug!(root = %self.root.display(), "sandbox ready");
        Ok(())
    }
}

/// Handle on the component store that drivers may consult.
///
/// The core only carries it from the factory to the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Store {
    root: Option<PathBuf>,
}

impl Store {
    pub fn none() -> Self {
        Self { root: None }
    }

    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

/// Per-spec working area inside the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpace {
    root: PathBuf,
}

impl BuildSpace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join("build")
    }

    pub fn install_dir(&self) -> PathBuf {
        self.root.join("install")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join("log")
    }

    /// Create every subdirectory of the build space. Idempotent.
    ///
    /// `quiet` only lowers the log level of the report.
    pub fn create(&self, quiet: bool) -> Result<()> {
        let dirs = [
            self.src_dir(),
            self.build_dir(),
            self.install_dir(),
            self.tmp_dir(),
            self.log_dir(),
        ];
        for dir in dirs.iter() {
            fs::create_dir_all(dir).with_context(|| format!("creating build space dir {:?}", dir))?;
        }

        if quiet {
            debug!(root = %self.root.display(), "build space created");
        } else {
            info!(root = %self.root.display(), "build space created");
        }
        Ok(())
    }
}
