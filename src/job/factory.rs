// src/job/factory.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::engine::{JobSource, Scheduler, SchedulerOptions};
use crate::errors::{JobgraphError, Result};
use crate::job::{Job, JobContext};
use crate::plan::{ActionGraph, ActionNode, NodeId};
use crate::status::Status;

/// Builds jobs with their initial status and records how each one ended.
///
/// The status history only grows: each node id is written once, by
/// [`JobFactory::collect`].
#[derive(Debug)]
pub struct JobFactory {
    statuses: Mutex<HashMap<NodeId, Status>>,
    context: Arc<JobContext>,
    dry_run: bool,
}

/// Outcome of a whole run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Node ids in the order they were collected.
    pub order: Vec<NodeId>,
    pub statuses: BTreeMap<NodeId, Status>,
    pub root: Option<NodeId>,
}

impl RunReport {
    pub fn root_status(&self) -> Option<Status> {
        self.root
            .as_ref()
            .and_then(|root| self.statuses.get(root).copied())
    }

    /// Whether the root node was recorded as `Success`.
    pub fn passed(&self) -> bool {
        self.root_status() == Some(Status::Success)
    }
}

impl JobFactory {
    pub fn new(context: Arc<JobContext>, dry_run: bool) -> Self {
        Self {
            statuses: Mutex::new(HashMap::new()),
            context,
            dry_run,
        }
    }

    pub fn context(&self) -> &Arc<JobContext> {
        &self.context
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<NodeId, Status>> {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build the job for `node`.
    ///
    /// - Any predecessor recorded as neither `Success` nor `ForceSkip`
    ///   forces `Failure`. A predecessor with no record counts as failed.
    /// - Otherwise a node marked `skip` is forced to `ForceSkip`. The root
    ///   ignores `skip` so its handler always gives the verdict.
    /// - Otherwise the job starts `Unknown`.
    pub fn get_job(&self, node: &ActionNode, predecessors: &[NodeId]) -> Job {
        let poisoned = {
            let statuses = self.lock();
            predecessors.iter().any(|pred| match statuses.get(pred) {
                Some(status) => !status.lets_dependents_run(),
                None => {
                    warn!(
                        node = %node.id,
                        predecessor = %pred,
                        "predecessor has no recorded status; treating as failed"
                    );
                    true
                }
            })
        };

        let status = if poisoned {
            debug!(node = %node.id, "upstream failure; job forced to failure");
            Status::Failure
        } else if node.skip && !node.action.is_root() {
            Status::ForceSkip
        } else {
            Status::Unknown
        };

        Job::new(node, Arc::clone(&self.context), status, self.dry_run)
    }

    /// Record the final status of `job`.
    ///
    /// A node can only be collected once; later attempts are rejected and the
    /// first status is kept.
    pub fn collect(&self, job: &Job) -> Result<()> {
        {
            let mut statuses = self.lock();
            if statuses.contains_key(job.node_id()) {
                return Err(JobgraphError::AlreadyCollected(job.node_id().to_string()));
            }
            statuses.insert(job.node_id().to_string(), job.status());
        }

        info!(
            node = %job.node_id(),
            action = %job.action(),
            queue = %job.queue_name(),
            status = job.status().code(),
            "job collected"
        );

        // A forced root never reaches its handler, so the verdict is
        // reported here.
        if job.action().is_root() && !job.is_dry_run() && job.status() != Status::Success {
            info!("result: FAIL");
        }

        Ok(())
    }

    pub fn status_of(&self, id: &str) -> Option<Status> {
        self.lock().get(id).copied()
    }

    /// Snapshot of every recorded status.
    pub fn history(&self) -> BTreeMap<NodeId, Status> {
        self.lock()
            .iter()
            .map(|(id, status)| (id.clone(), *status))
            .collect()
    }

    /// Run every node of `graph` through the scheduler and report the result.
    pub async fn run(&self, graph: &ActionGraph, options: SchedulerOptions) -> Result<RunReport> {
        let scheduler = Scheduler::new(options);
        let order = scheduler.run(graph, self).await?;

        Ok(RunReport {
            order,
            statuses: self.history(),
            root: graph.root_id().map(str::to_string),
        })
    }
}

impl JobSource for JobFactory {
    fn get_job(&self, node: &ActionNode, predecessors: &[NodeId]) -> Job {
        JobFactory::get_job(self, node, predecessors)
    }

    fn collect(&self, job: &Job) -> Result<()> {
        JobFactory::collect(self, job)
    }
}
