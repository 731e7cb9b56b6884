// src/engine/state.rs

//! Pure readiness bookkeeping.
//!
//! No tokio, no jobs: only node ids, counters and FIFOs, so the dispatch
//! order can be tested directly.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::{debug, warn};

use crate::engine::SchedulerOptions;
use crate::errors::Result;
use crate::plan::{ActionGraph, NodeId};

/// Tracks which nodes may start.
///
/// - A node becomes ready once all of its predecessors completed.
/// - Each queue keeps its ready nodes in a FIFO, in topological order.
/// - A queue never runs more nodes at once than its capacity.
#[derive(Debug)]
pub struct ReadyTracker {
    /// Predecessors not yet completed, per node.
    remaining: HashMap<NodeId, usize>,
    dependents: HashMap<NodeId, Vec<NodeId>>,
    /// Position in the topological order.
    rank: HashMap<NodeId, usize>,
    queue_of: HashMap<NodeId, String>,
    ready: BTreeMap<String, VecDeque<NodeId>>,
    running: BTreeMap<String, usize>,
    options: SchedulerOptions,
    total: usize,
    completed: usize,
    halted: bool,
}

impl ReadyTracker {
    pub fn new(graph: &ActionGraph, options: &SchedulerOptions) -> Result<Self> {
        let order = graph.topological_order()?;

        let mut tracker = Self {
            remaining: HashMap::new(),
            dependents: HashMap::new(),
            rank: HashMap::new(),
            queue_of: HashMap::new(),
            ready: BTreeMap::new(),
            running: BTreeMap::new(),
            options: options.clone(),
            total: order.len(),
            completed: 0,
            halted: false,
        };

        for (rank, id) in order.iter().enumerate() {
            let queue = graph
                .node(id)
                .map(|node| node.queue.clone())
                .unwrap_or_default();
            tracker.rank.insert(id.clone(), rank);
            tracker.queue_of.insert(id.clone(), queue);
            tracker
                .remaining
                .insert(id.clone(), graph.dependencies_of(id).len());
            tracker
                .dependents
                .insert(id.clone(), graph.dependents_of(id).to_vec());
        }

        for id in order.iter() {
            if tracker.remaining.get(id).copied() == Some(0) {
                tracker.push_ready(id.clone());
            }
        }

        Ok(tracker)
    }

    fn push_ready(&mut self, id: NodeId) {
        let queue = self.queue_of.get(&id).cloned().unwrap_or_default();
        self.ready.entry(queue).or_default().push_back(id);
    }

    /// Nodes to start now. They count as running until [`complete`] is called.
    ///
    /// Returns nothing once halted.
    ///
    /// [`complete`]: ReadyTracker::complete
    pub fn next_dispatch(&mut self) -> Vec<NodeId> {
        if self.halted {
            return Vec::new();
        }

        let mut dispatch = Vec::new();
        for (queue, fifo) in self.ready.iter_mut() {
            let capacity = self.options.capacity_of(queue);
            let running = self.running.entry(queue.clone()).or_insert(0);
            while *running < capacity {
                let Some(id) = fifo.pop_front() else {
                    break;
                };
                *running += 1;
                dispatch.push(id);
            }
        }

        if !dispatch.is_empty() {
            debug!(?dispatch, "nodes ready to run");
        }
        dispatch
    }

    /// Mark `id` as finished and release the dependents it was holding back.
    pub fn complete(&mut self, id: &str) {
        let Some(queue) = self.queue_of.get(id).cloned() else {
            warn!(node = %id, "completion for a node outside the graph");
            return;
        };

        if let Some(running) = self.running.get_mut(&queue) {
            *running = running.saturating_sub(1);
        }
        self.completed += 1;

        let mut released: Vec<NodeId> = Vec::new();
        for dependent in self.dependents.get(id).cloned().unwrap_or_default() {
            if let Some(count) = self.remaining.get_mut(&dependent) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    released.push(dependent);
                }
            }
        }
        released.sort_by_key(|dep| self.rank.get(dep).copied().unwrap_or(usize::MAX));
        for dependent in released {
            self.push_ready(dependent);
        }
    }

    /// Stop handing out new nodes. Running ones still have to complete.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Number of dispatched nodes not yet completed.
    pub fn running(&self) -> usize {
        self.running.values().sum()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Nothing is running and nothing more will be dispatched.
    pub fn is_done(&self) -> bool {
        self.running() == 0 && (self.halted || self.completed >= self.total)
    }
}
