// src/engine/mod.rs

//! Execution engine.
//!
//! Runs every node of an [`ActionGraph`](crate::plan::ActionGraph) once,
//! never before all of its predecessors were collected.
//!
//! The pure readiness bookkeeping lives in [`state`]; the async shell that
//! spawns jobs and reacts to their completion is in [`runtime`].

use std::collections::BTreeMap;

use crate::config::PlanFile;
use crate::errors::Result;
use crate::job::Job;
use crate::plan::{ActionNode, NodeId};

pub mod runtime;
pub mod state;

pub use runtime::Scheduler;
pub use state::ReadyTracker;

/// Where the scheduler gets jobs from and reports them back to.
///
/// `get_job` is only called once every predecessor of `node` has been
/// passed to `collect`.
pub trait JobSource {
    fn get_job(&self, node: &ActionNode, predecessors: &[NodeId]) -> Job;

    fn collect(&self, job: &Job) -> Result<()>;
}

/// Scheduling settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Parallelism of queues without an entry in `queues`.
    pub jobs: usize,
    /// Keep running unrelated nodes after a job raised a fatal error.
    pub keep_going: bool,
    /// Per-queue parallelism.
    pub queues: BTreeMap<String, usize>,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            keep_going: false,
            queues: BTreeMap::new(),
        }
    }
}

impl SchedulerOptions {
    pub fn from_plan(plan: &PlanFile) -> Self {
        Self {
            jobs: plan.config.jobs,
            keep_going: plan.config.keep_going,
            queues: plan.config.queues.clone(),
        }
    }

    /// How many jobs of `queue` may run at once. Never zero.
    pub fn capacity_of(&self, queue: &str) -> usize {
        self.queues.get(queue).copied().unwrap_or(self.jobs).max(1)
    }
}

/// Events sent back to the scheduler by running jobs.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// The job returned; `result` is `Err` for a fatal error.
    JobFinished {
        job: Job,
        result: anyhow::Result<()>,
    },
    /// The job panicked and was lost.
    JobPanicked { node: NodeId, message: String },
}
