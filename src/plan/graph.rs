// src/plan/graph.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::config::model::{PlanFile, SpecConfig};
use crate::driver::{ShellSpec, SpecRef, TreeSourceBuilder};
use crate::errors::{JobgraphError, Result};
use crate::plan::action::{
    Action, ActionKind, ActionNode, Checkout, CreateSource, InstallSource, NodeId,
    SourceDescriptor,
};
use crate::vcs::VcsKind;

/// Id given to the root node when the plan does not declare one.
pub const ROOT_ID: &str = "root";

/// Internal entry: the node plus immediate predecessors and dependents.
#[derive(Debug, Clone)]
struct GraphEntry {
    node: ActionNode,
    /// Direct predecessors: nodes that must be collected before this one runs.
    deps: Vec<NodeId>,
    /// Direct dependents: nodes that list this one as a predecessor.
    dependents: Vec<NodeId>,
}

/// In-memory action graph keyed by node id.
///
/// Adjacency is stored both ways so the scheduler can release dependents
/// and the factory can look up predecessors without walking edges.
#[derive(Debug, Clone, Default)]
pub struct ActionGraph {
    nodes: HashMap<NodeId, GraphEntry>,
    /// Node ids in insertion order.
    order: Vec<NodeId>,
}

impl ActionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: ActionNode) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(JobgraphError::ConfigError(format!(
                "duplicate node id '{}'",
                node.id
            )));
        }
        self.order.push(node.id.clone());
        self.nodes.insert(
            node.id.clone(),
            GraphEntry {
                node,
                deps: Vec::new(),
                dependents: Vec::new(),
            },
        );
        Ok(())
    }

    /// Add an edge `pred -> succ`: `succ` waits for `pred`.
    ///
    /// Duplicate edges are ignored.
    pub fn add_edge(&mut self, pred: &str, succ: &str) -> Result<()> {
        if pred == succ {
            return Err(JobgraphError::ConfigError(format!(
                "node '{}' cannot depend on itself",
                pred
            )));
        }
        for id in [pred, succ] {
            if !self.nodes.contains_key(id) {
                return Err(JobgraphError::UnknownNode(id.to_string()));
            }
        }

        if let Some(entry) = self.nodes.get_mut(succ) {
            if entry.deps.iter().any(|d| d == pred) {
                return Ok(());
            }
            entry.deps.push(pred.to_string());
        }
        if let Some(entry) = self.nodes.get_mut(pred) {
            entry.dependents.push(succ.to_string());
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&ActionNode> {
        self.nodes.get(id).map(|entry| &entry.node)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &ActionNode> {
        self.order.iter().filter_map(|id| self.node(id))
    }

    pub fn dependencies_of(&self, id: &str) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|entry| entry.deps.as_slice())
            .unwrap_or(&[])
    }

    pub fn dependents_of(&self, id: &str) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|entry| entry.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Id of the root node, if the graph has one.
    pub fn root_id(&self) -> Option<&str> {
        self.nodes()
            .find(|node| node.action.is_root())
            .map(|node| node.id.as_str())
    }

    /// Make sure the graph has exactly one root and that the root waits for
    /// the rest of the graph.
    ///
    /// A `root` node is added when none exists. Every sink that is not
    /// already upstream of the root is then wired before it, so the root
    /// always runs last and sees every branch.
    pub fn ensure_root(&mut self) -> Result<NodeId> {
        let roots: Vec<NodeId> = self
            .nodes()
            .filter(|node| node.action.is_root())
            .map(|node| node.id.clone())
            .collect();

        let root = match roots.as_slice() {
            [] => {
                self.add_node(ActionNode::new(ROOT_ID, Action::Root))?;
                ROOT_ID.to_string()
            }
            [single] => single.clone(),
            _ => {
                return Err(JobgraphError::ConfigError(format!(
                    "graph has more than one root node: {:?}",
                    roots
                )));
            }
        };

        // A node with no dependents cannot reach the root.
        let sinks: Vec<NodeId> = self
            .order
            .iter()
            .filter(|id| **id != root && self.dependents_of(id).is_empty())
            .cloned()
            .collect();
        for sink in sinks.iter() {
            self.add_edge(sink, &root)?;
        }
        if !sinks.is_empty() {
            debug!(root = %root, ?sinks, "root wired after graph sinks");
        }

        Ok(root)
    }

    /// Node ids such that every node comes after all of its predecessors.
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for id in self.order.iter() {
            graph.add_node(id.as_str());
        }
        for id in self.order.iter() {
            for dep in self.dependencies_of(id) {
                graph.add_edge(dep.as_str(), id.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
            Err(cycle) => Err(JobgraphError::DagCycle(format!(
                "cycle detected in action graph involving '{}'",
                cycle.node_id()
            ))),
        }
    }

    /// Build the graph described by a validated [`PlanFile`].
    pub fn from_plan(plan: &PlanFile) -> Result<Self> {
        let specs: BTreeMap<&str, SpecRef> = plan
            .spec
            .iter()
            .map(|(name, cfg)| (name.as_str(), build_spec(name, cfg)))
            .collect();

        let lookup_spec = |id: &str, name: Option<&str>| -> Result<SpecRef> {
            let name = name.unwrap_or_default();
            specs.get(name).cloned().ok_or_else(|| {
                JobgraphError::ConfigError(format!(
                    "action '{}' references unknown spec '{}'",
                    id, name
                ))
            })
        };

        let mut graph = ActionGraph::new();

        for (id, cfg) in plan.action.iter() {
            let action = match cfg.kind {
                ActionKind::Checkout => {
                    let repo_name = cfg.repository.clone().unwrap_or_default();
                    let repo = plan.repository.get(&repo_name).ok_or_else(|| {
                        JobgraphError::ConfigError(format!(
                            "action '{}' references unknown repository '{}'",
                            id, repo_name
                        ))
                    })?;
                    Action::Checkout(Checkout {
                        url: repo.url.clone(),
                        revision: repo.revision.clone(),
                        vcs: VcsKind::from(repo.vcs.as_str()),
                        repo_name,
                    })
                }
                ActionKind::CreateSource => Action::CreateSource(CreateSource {
                    source_name: cfg.source.clone().unwrap_or_default(),
                    spec: lookup_spec(id, cfg.spec.as_deref())?,
                }),
                ActionKind::GetSource => Action::GetSource,
                ActionKind::InstallSource => Action::InstallSource(InstallSource {
                    spec: lookup_spec(id, cfg.spec.as_deref())?,
                    source: SourceDescriptor {
                        name: cfg.source.clone().unwrap_or_default(),
                        ignore: cfg.ignore.clone(),
                    },
                }),
                ActionKind::Build => Action::Build {
                    spec: lookup_spec(id, cfg.spec.as_deref())?,
                },
                ActionKind::Test => Action::Test {
                    spec: lookup_spec(id, cfg.spec.as_deref())?,
                },
                ActionKind::Root => Action::Root,
            };

            let mut node = ActionNode::new(id.clone(), action).skipped(cfg.skip);
            if let Some(queue) = cfg.queue.as_deref() {
                node = node.in_queue(queue);
            }
            graph.add_node(node)?;
        }

        for (id, cfg) in plan.action.iter() {
            for dep in cfg.after.iter() {
                graph.add_edge(dep, id)?;
            }
        }

        graph.ensure_root()?;
        graph.topological_order()?;
        Ok(graph)
    }
}

fn build_spec(name: &str, cfg: &SpecConfig) -> SpecRef {
    let mut spec = ShellSpec::new(name);
    if let Some(build_space) = cfg.build_space.as_deref() {
        spec = spec.with_build_space(build_space);
    }
    if let Some(cmd) = cfg.build.as_deref() {
        spec = spec.with_build(cmd);
    }
    if let Some(cmd) = cfg.test.as_deref() {
        spec = spec.with_test(cmd);
    }
    for builder in cfg.source_builder.iter() {
        spec = spec.with_source_builder(Arc::new(TreeSourceBuilder::new(
            builder.name.clone(),
            builder.checkout.clone(),
            builder.ignore.clone(),
        )));
    }
    Arc::new(spec)
}
