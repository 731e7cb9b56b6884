#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use jobgraph::config::{
    ActionConfig, ConfigSection, PlanFile, RawPlanFile, RepositoryConfig, SourceBuilderConfig,
    SpecConfig,
};
use jobgraph::driver::{Sandbox, SandboxDriver, SpecRef, Store};
use jobgraph::errors::Result;
use jobgraph::job::JobContext;
use jobgraph::plan::{
    Action, ActionGraph, ActionKind, ActionNode, Checkout, CreateSource, InstallSource,
    SourceDescriptor,
};
use jobgraph::vcs::{VcsClient, VcsKind};

/// Builder for `PlanFile` to simplify test setup.
pub struct PlanBuilder {
    plan: RawPlanFile,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self {
            plan: RawPlanFile {
                config: ConfigSection::default(),
                repository: BTreeMap::new(),
                spec: BTreeMap::new(),
                action: BTreeMap::new(),
            },
        }
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.plan.config.jobs = jobs;
        self
    }

    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.plan.config.keep_going = keep_going;
        self
    }

    pub fn queue(mut self, name: &str, capacity: usize) -> Self {
        self.plan.config.queues.insert(name.to_string(), capacity);
        self
    }

    pub fn repository(mut self, name: &str, url: &str, vcs: &str) -> Self {
        self.plan.repository.insert(
            name.to_string(),
            RepositoryConfig {
                url: url.to_string(),
                revision: "main".to_string(),
                vcs: vcs.to_string(),
            },
        );
        self
    }

    pub fn spec(mut self, name: &str, spec: SpecConfig) -> Self {
        self.plan.spec.insert(name.to_string(), spec);
        self
    }

    pub fn action(mut self, id: &str, action: ActionConfig) -> Self {
        self.plan.action.insert(id.to_string(), action);
        self
    }

    pub fn raw(self) -> RawPlanFile {
        self.plan
    }

    pub fn try_build(self) -> Result<PlanFile> {
        PlanFile::try_from(self.plan)
    }

    pub fn build(self) -> PlanFile {
        self.try_build()
            .expect("Failed to build valid plan from builder")
    }
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ActionConfig`.
pub struct ActionBuilder {
    action: ActionConfig,
}

impl ActionBuilder {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            action: ActionConfig::new(kind),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.action.after.push(dep.to_string());
        self
    }

    pub fn repository(mut self, repo: &str) -> Self {
        self.action.repository = Some(repo.to_string());
        self
    }

    pub fn spec(mut self, spec: &str) -> Self {
        self.action.spec = Some(spec.to_string());
        self
    }

    pub fn source(mut self, source: &str) -> Self {
        self.action.source = Some(source.to_string());
        self
    }

    pub fn ignore(mut self, pattern: &str) -> Self {
        self.action.ignore.push(pattern.to_string());
        self
    }

    pub fn queue(mut self, queue: &str) -> Self {
        self.action.queue = Some(queue.to_string());
        self
    }

    pub fn skip(mut self) -> Self {
        self.action.skip = true;
        self
    }

    pub fn build(self) -> ActionConfig {
        self.action
    }
}

/// `[spec.<name>]` with optional shell primitives.
pub fn shell_spec_config(build: Option<&str>, test: Option<&str>) -> SpecConfig {
    SpecConfig {
        build: build.map(str::to_string),
        test: test.map(str::to_string),
        ..SpecConfig::default()
    }
}

pub fn source_builder_config(name: &str, checkout: &str) -> SourceBuilderConfig {
    SourceBuilderConfig {
        name: name.to_string(),
        checkout: vec![checkout.to_string()],
        ignore: Vec::new(),
    }
}

/// Hand-built graph: nodes first, then edges, then the root.
pub struct GraphBuilder {
    graph: ActionGraph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: ActionGraph::new(),
        }
    }

    pub fn node(mut self, node: ActionNode) -> Self {
        self.graph.add_node(node).expect("duplicate node in test graph");
        self
    }

    pub fn edge(mut self, pred: &str, succ: &str) -> Self {
        self.graph.add_edge(pred, succ).expect("invalid edge in test graph");
        self
    }

    /// Add the root after every sink and return the graph.
    pub fn build(mut self) -> ActionGraph {
        self.graph.ensure_root().expect("test graph has no valid root");
        self.graph
    }

    /// Return the graph as is, without adding a root.
    pub fn build_without_root(self) -> ActionGraph {
        self.graph
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn checkout_node(id: &str, repo: &str, url: &str, vcs: &str) -> ActionNode {
    ActionNode::new(
        id,
        Action::Checkout(Checkout {
            repo_name: repo.to_string(),
            url: url.to_string(),
            revision: "main".to_string(),
            vcs: VcsKind::from(vcs),
        }),
    )
}

pub fn create_source_node(id: &str, source: &str, spec: SpecRef) -> ActionNode {
    ActionNode::new(
        id,
        Action::CreateSource(CreateSource {
            source_name: source.to_string(),
            spec,
        }),
    )
}

pub fn install_source_node(id: &str, source: &str, ignore: &[&str], spec: SpecRef) -> ActionNode {
    ActionNode::new(
        id,
        Action::InstallSource(InstallSource {
            spec,
            source: SourceDescriptor {
                name: source.to_string(),
                ignore: ignore.iter().map(|s| s.to_string()).collect(),
            },
        }),
    )
}

pub fn get_source_node(id: &str) -> ActionNode {
    ActionNode::new(id, Action::GetSource)
}

pub fn build_node(id: &str, spec: SpecRef) -> ActionNode {
    ActionNode::new(id, Action::Build { spec })
}

pub fn test_node(id: &str, spec: SpecRef) -> ActionNode {
    ActionNode::new(id, Action::Test { spec })
}

pub fn root_node(id: &str) -> ActionNode {
    ActionNode::new(id, Action::Root)
}

/// Job context rooted at `sandbox_dir` with the default driver.
pub fn context_in(sandbox_dir: &Path, vcs: Arc<dyn VcsClient>) -> Arc<JobContext> {
    Arc::new(JobContext::new(
        Sandbox::new(sandbox_dir),
        Store::none(),
        Arc::new(SandboxDriver),
        vcs,
    ))
}
