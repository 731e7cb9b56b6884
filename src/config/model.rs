// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::plan::ActionKind;

/// Top-level plan as read from a TOML file.
///
/// ```toml
/// [config]
/// sandbox = "sandbox"
/// jobs = 2
///
/// [repository.hello]
/// url = "https://example.com/hello.git"
/// revision = "main"
///
/// [spec.hello]
/// build = "make"
/// [[spec.hello.source_builder]]
/// name = "hello-src"
/// checkout = ["hello"]
///
/// [action.checkout-hello]
/// kind = "checkout"
/// repository = "hello"
///
/// [action.build-hello]
/// kind = "build"
/// spec = "hello"
/// after = ["checkout-hello"]
/// ```
///
/// This type has not been validated yet; see [`PlanFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlanFile {
    /// Execution settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// `[repository.<name>]` sections.
    #[serde(default)]
    pub repository: BTreeMap<String, RepositoryConfig>,

    /// `[spec.<name>]` sections.
    #[serde(default)]
    pub spec: BTreeMap<String, SpecConfig>,

    /// `[action.<id>]` sections. Keys are the node ids of the graph.
    #[serde(default)]
    pub action: BTreeMap<String, ActionConfig>,
}

/// A plan that passed validation.
///
/// Only obtainable through `PlanFile::try_from(RawPlanFile)`, so holders can
/// rely on references being resolvable and the graph being acyclic.
#[derive(Debug, Clone)]
pub struct PlanFile {
    pub config: ConfigSection,
    pub repository: BTreeMap<String, RepositoryConfig>,
    pub spec: BTreeMap<String, SpecConfig>,
    pub action: BTreeMap<String, ActionConfig>,
}

impl PlanFile {
    pub(crate) fn new_unchecked(raw: RawPlanFile) -> Self {
        Self {
            config: raw.config,
            repository: raw.repository,
            spec: raw.spec,
            action: raw.action,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Sandbox root. Relative paths are resolved against the plan file's
    /// directory.
    #[serde(default = "default_sandbox")]
    pub sandbox: PathBuf,

    /// Optional store directory handed to the driver.
    #[serde(default)]
    pub store: Option<PathBuf>,

    /// How many jobs of the same queue may run at once.
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Keep scheduling unrelated nodes after a job raised a fatal error.
    #[serde(default)]
    pub keep_going: bool,

    /// Per-queue overrides of `jobs`.
    #[serde(default)]
    pub queues: BTreeMap<String, usize>,
}

fn default_sandbox() -> PathBuf {
    PathBuf::from("sandbox")
}

fn default_jobs() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            sandbox: default_sandbox(),
            store: None,
            jobs: default_jobs(),
            keep_going: false,
            queues: BTreeMap::new(),
        }
    }
}

/// `[repository.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    pub url: String,

    #[serde(default = "default_revision")]
    pub revision: String,

    /// Repository kind. Only `"git"` can be checked out; anything else loads
    /// but fails at checkout time.
    #[serde(default = "default_vcs")]
    pub vcs: String,
}

fn default_revision() -> String {
    "master".to_string()
}

fn default_vcs() -> String {
    "git".to_string()
}

/// `[spec.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpecConfig {
    /// Directory name of the build space; defaults to the spec name.
    #[serde(default)]
    pub build_space: Option<String>,

    /// Shell command implementing the build primitive.
    #[serde(default)]
    pub build: Option<String>,

    /// Shell command implementing the test primitive.
    #[serde(default)]
    pub test: Option<String>,

    /// `[[spec.<name>.source_builder]]` entries.
    #[serde(default)]
    pub source_builder: Vec<SourceBuilderConfig>,
}

/// `[[spec.<name>.source_builder]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceBuilderConfig {
    pub name: String,

    /// Repository names, the first one being where the source is taken from.
    #[serde(default)]
    pub checkout: Vec<String>,

    /// Paths left out of the packaged source.
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// `[action.<id>]` section.
///
/// Which of the optional fields are required depends on `kind`; this is
/// enforced by validation.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    pub kind: ActionKind,

    /// Node ids this action waits for.
    #[serde(default)]
    pub after: Vec<String>,

    /// Repository to check out (`checkout`).
    #[serde(default)]
    pub repository: Option<String>,

    /// Spec the action works on (`create-source`, `install-source`, `build`,
    /// `test`).
    #[serde(default)]
    pub spec: Option<String>,

    /// Source name (`create-source`, `install-source`).
    #[serde(default)]
    pub source: Option<String>,

    /// Paths left out when installing the source (`install-source`).
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Scheduling queue; defaults to `"default"`.
    #[serde(default)]
    pub queue: Option<String>,

    /// Record the node as force-skipped instead of running it.
    #[serde(default)]
    pub skip: bool,
}

impl ActionConfig {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            after: Vec::new(),
            repository: None,
            spec: None,
            source: None,
            ignore: Vec::new(),
            queue: None,
            skip: false,
        }
    }
}
