// src/plan/action.rs

//! Action descriptors: what a node of the graph does.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::driver::SpecRef;
use crate::vcs::VcsKind;

/// Node identifier, unique within a graph.
pub type NodeId = String;

/// Queue used by nodes that do not name one.
pub const DEFAULT_QUEUE: &str = "default";

/// Dispatch tag of an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Checkout,
    CreateSource,
    GetSource,
    InstallSource,
    Build,
    Test,
    Root,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::Checkout => "checkout",
            ActionKind::CreateSource => "create-source",
            ActionKind::GetSource => "get-source",
            ActionKind::InstallSource => "install-source",
            ActionKind::Build => "build",
            ActionKind::Test => "test",
            ActionKind::Root => "root",
        };
        f.write_str(s)
    }
}

/// Fetch `revision` of the repository at `url` into `<vcs_dir>/<repo_name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub repo_name: String,
    pub url: String,
    pub revision: String,
    pub vcs: VcsKind,
}

/// Package `source_name` into the sandbox cache with one of the spec's
/// source builders.
#[derive(Debug, Clone)]
pub struct CreateSource {
    pub source_name: String,
    pub spec: SpecRef,
}

/// A packaged source and the paths to leave out when installing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub name: String,
    pub ignore: Vec<String>,
}

/// Copy a packaged source from the cache into the spec's build space.
#[derive(Debug, Clone)]
pub struct InstallSource {
    pub spec: SpecRef,
    pub source: SourceDescriptor,
}

/// Immutable description of one node's work.
#[derive(Debug, Clone)]
pub enum Action {
    Checkout(Checkout),
    CreateSource(CreateSource),
    /// Barrier between source creation and installation; does no work.
    GetSource,
    InstallSource(InstallSource),
    Build { spec: SpecRef },
    Test { spec: SpecRef },
    /// Terminal aggregator; its status is the verdict of the whole graph.
    Root,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Checkout(_) => ActionKind::Checkout,
            Action::CreateSource(_) => ActionKind::CreateSource,
            Action::GetSource => ActionKind::GetSource,
            Action::InstallSource(_) => ActionKind::InstallSource,
            Action::Build { .. } => ActionKind::Build,
            Action::Test { .. } => ActionKind::Test,
            Action::Root => ActionKind::Root,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Action::Root)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Checkout(c) => write!(f, "checkout {}@{} ({})", c.repo_name, c.revision, c.vcs),
            Action::CreateSource(c) => write!(f, "create-source {} ({})", c.source_name, c.spec.name()),
            Action::GetSource => f.write_str("get-source"),
            Action::InstallSource(i) => {
                write!(f, "install-source {} into {}", i.source.name, i.spec.name())
            }
            Action::Build { spec } => write!(f, "build {}", spec.name()),
            Action::Test { spec } => write!(f, "test {}", spec.name()),
            Action::Root => f.write_str("root"),
        }
    }
}

/// A graph node: an action plus its scheduling attributes.
#[derive(Debug, Clone)]
pub struct ActionNode {
    pub id: NodeId,
    pub action: Arc<Action>,
    pub queue: String,
    /// Record `ForceSkip` for this node instead of running it.
    pub skip: bool,
}

impl ActionNode {
    pub fn new(id: impl Into<NodeId>, action: Action) -> Self {
        Self {
            id: id.into(),
            action: Arc::new(action),
            queue: DEFAULT_QUEUE.to_string(),
            skip: false,
        }
    }

    pub fn in_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    pub fn skipped(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }
}
