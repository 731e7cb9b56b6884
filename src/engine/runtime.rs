// src/engine/runtime.rs

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::engine::state::ReadyTracker;
use crate::engine::{JobSource, RuntimeEvent, SchedulerOptions};
use crate::errors::{JobgraphError, Result};
use crate::job::Job;
use crate::plan::{ActionGraph, NodeId};

/// Drives a graph to completion.
///
/// Readiness decisions are made by [`ReadyTracker`]; this shell only spawns
/// jobs and feeds their completion back. Jobs run on tokio's blocking pool
/// because their handlers call into git, the filesystem and child processes.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    options: SchedulerOptions,
}

impl Scheduler {
    pub fn new(options: SchedulerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Run every node of `graph` once and return the ids in collection order.
    ///
    /// A fatal job error stops dispatching and ends with
    /// [`JobgraphError::JobAborted`] after in-flight jobs drained, unless
    /// `keep_going` is set, in which case the job is collected with the
    /// status it had and the run continues. A panicking job always aborts.
    /// A failing [`JobSource::collect`] also halts the run; its error is
    /// returned once in-flight jobs drained.
    pub async fn run<S: JobSource + ?Sized>(
        &self,
        graph: &ActionGraph,
        source: &S,
    ) -> Result<Vec<NodeId>> {
        let mut tracker = ReadyTracker::new(graph, &self.options)?;
        let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(64);

        let mut order: Vec<NodeId> = Vec::with_capacity(graph.len());
        let mut failure: Option<JobgraphError> = None;

        info!(
            nodes = graph.len(),
            jobs = self.options.jobs,
            keep_going = self.options.keep_going,
            "scheduler started"
        );

        loop {
            for id in tracker.next_dispatch() {
                let Some(node) = graph.node(&id) else {
                    failure.get_or_insert(JobgraphError::UnknownNode(id.clone()));
                    tracker.halt();
                    tracker.complete(&id);
                    continue;
                };
                let job = source.get_job(node, graph.dependencies_of(&id));

                if job.is_dry_run() && job.is_forced() {
                    info!(
                        node = %id,
                        action = %job.action(),
                        queue = %job.queue_name(),
                        status = %job.status(),
                        "dry-run: would not run, status forced"
                    );
                } else if job.is_dry_run() {
                    info!(
                        node = %id,
                        action = %job.action(),
                        queue = %job.queue_name(),
                        "dry-run: would run"
                    );
                } else {
                    debug!(node = %id, status = %job.status(), "dispatching job");
                }

                spawn_job(job, tx.clone());
            }

            if tracker.is_done() {
                break;
            }

            if tracker.running() == 0 {
                return Err(JobgraphError::Other(anyhow!(
                    "scheduler stalled with {} of {} nodes collected",
                    tracker.completed(),
                    graph.len()
                )));
            }

            let Some(event) = rx.recv().await else {
                return Err(JobgraphError::Other(anyhow!(
                    "job channel closed while jobs were running"
                )));
            };

            match event {
                RuntimeEvent::JobFinished { job, result } => {
                    let id = job.node_id().to_string();
                    let collect = match result {
                        Ok(()) => true,
                        Err(err) => {
                            let message = format!("{err:#}");
                            error!(node = %id, error = %message, "job raised a fatal error");
                            if !self.options.keep_going {
                                failure.get_or_insert(JobgraphError::JobAborted {
                                    node: id.clone(),
                                    message,
                                });
                                tracker.halt();
                            }
                            self.options.keep_going
                        }
                    };
                    if collect {
                        match source.collect(&job) {
                            Ok(()) => order.push(id.clone()),
                            Err(err) => {
                                error!(node = %id, error = %err, "collecting job failed");
                                failure.get_or_insert(err);
                                tracker.halt();
                            }
                        }
                    }
                    tracker.complete(&id);
                }
                RuntimeEvent::JobPanicked { node, message } => {
                    error!(node = %node, error = %message, "job panicked");
                    failure.get_or_insert(JobgraphError::JobAborted {
                        node: node.clone(),
                        message,
                    });
                    tracker.halt();
                    tracker.complete(&node);
                }
            }
        }

        if let Some(err) = failure {
            info!(collected = order.len(), "scheduler stopped after a fatal error");
            return Err(err);
        }

        info!(collected = order.len(), "scheduler finished");
        Ok(order)
    }
}

fn spawn_job(mut job: Job, tx: mpsc::Sender<RuntimeEvent>) {
    let node = job.node_id().to_string();
    tokio::spawn(async move {
        let handle = tokio::task::spawn_blocking(move || {
            let result = job.run();
            (job, result)
        });

        let event = match handle.await {
            Ok((job, result)) => RuntimeEvent::JobFinished { job, result },
            Err(err) => RuntimeEvent::JobPanicked {
                node,
                message: err.to_string(),
            },
        };

        if tx.send(event).await.is_err() {
            debug!("scheduler dropped before job completion was delivered");
        }
    });
}
