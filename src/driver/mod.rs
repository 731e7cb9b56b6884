// src/driver/mod.rs

//! Collaborators that do the actual work behind build, test and source jobs.
//!
//! - [`Spec`] is a build context: it names a build space, may expose `build`
//!   and `test` [`Primitive`]s, and lists its [`SourceBuilder`]s.
//! - [`Driver`] binds a spec to the current sandbox and hands back the
//!   [`BuildSpace`] the job should work in.
//! - [`sandbox`] holds the filesystem layout types.
//! - [`shell`] provides the plan-file backed implementations used in
//!   production.

pub mod sandbox;
pub mod shell;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

pub use sandbox::{BuildSpace, Sandbox, Store};
pub use shell::{ShellPrimitive, ShellSpec, TreeSourceBuilder};

/// Shared, read-only handle on a spec.
pub type SpecRef = Arc<dyn Spec>;

/// Which primitive of a spec a job wants to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Build,
    Test,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveKind::Build => f.write_str("build"),
            PrimitiveKind::Test => f.write_str("test"),
        }
    }
}

/// A build/test entry point of a spec.
pub trait Primitive: Send + Sync {
    fn call(&self, space: &BuildSpace) -> Result<()>;
}

/// Location of a checked-out repository handed to a source builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocation {
    pub working_dir: PathBuf,
}

/// Packages sources out of one or more checkouts.
pub trait SourceBuilder: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Repository names this builder reads from, relative to the sandbox
    /// vcs directory. The first entry is the primary checkout.
    fn checkout(&self) -> &[String];

    fn prepare_src(&self, repos: &BTreeMap<String, RepoLocation>, dest_dir: &Path) -> Result<()>;
}

/// A build context.
pub trait Spec: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn build_space_name(&self) -> &str {
        self.name()
    }

    fn source_builders(&self) -> &[Arc<dyn SourceBuilder>];

    /// `None` when the spec does not implement this primitive.
    fn primitive(&self, kind: PrimitiveKind) -> Option<&dyn Primitive>;
}

/// Binds a spec to a sandbox before any of its primitives run.
pub trait Driver: Send + Sync {
    /// Must be idempotent: several jobs activate the same spec.
    fn activate(&self, spec: &dyn Spec, sandbox: &Sandbox, store: &Store) -> Result<BuildSpace>;
}

/// Default driver: each spec gets `<sandbox>/<build_space_name>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SandboxDriver;

impl Driver for SandboxDriver {
    fn activate(&self, spec: &dyn Spec, sandbox: &Sandbox, store: &Store) -> Result<BuildSpace> {
        let space = BuildSpace::new(sandbox.root().join(spec.build_space_name()));
        debug!(
            spec = spec.name(),
            build_space = %space.root().display(),
            store = ?store.root(),
            "spec activated in sandbox"
        );
        Ok(space)
    }
}
