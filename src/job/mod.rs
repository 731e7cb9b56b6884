// src/job/mod.rs

//! Jobs: one action bound to the run-time context, plus the factory that
//! decides how each job starts and records how it ended.
//!
//! - [`Job::run`] picks the handler for the action (see [`handlers`]).
//! - [`factory::JobFactory`] applies failure propagation and owns the status
//!   history.

pub mod factory;
pub mod handlers;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::driver::{Driver, Sandbox, Store};
use crate::plan::{Action, ActionNode, NodeId};
use crate::status::Status;
use crate::vcs::VcsClient;

pub use factory::{JobFactory, RunReport};

/// Everything a job needs besides its action, shared by all jobs of a run.
pub struct JobContext {
    pub sandbox: Sandbox,
    pub store: Store,
    pub driver: Arc<dyn Driver>,
    pub vcs: Arc<dyn VcsClient>,
}

impl JobContext {
    pub fn new(
        sandbox: Sandbox,
        store: Store,
        driver: Arc<dyn Driver>,
        vcs: Arc<dyn VcsClient>,
    ) -> Self {
        Self {
            sandbox,
            store,
            driver,
            vcs,
        }
    }
}

impl fmt::Debug for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobContext")
            .field("sandbox", &self.sandbox)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Executable binding of one action.
///
/// The status starts as whatever the factory forced (or `Unknown`) and is
/// changed at most once, by [`Job::run`].
#[derive(Debug)]
pub struct Job {
    node_id: NodeId,
    action: Arc<Action>,
    status: Status,
    queue_name: String,
    context: Arc<JobContext>,
    dry_run: bool,
}

impl Job {
    pub fn new(
        node: &ActionNode,
        context: Arc<JobContext>,
        force_status: Status,
        dry_run: bool,
    ) -> Self {
        Self {
            node_id: node.id.clone(),
            action: Arc::clone(&node.action),
            status: force_status,
            queue_name: node.queue.clone(),
            context,
            dry_run,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn action(&self) -> &Arc<Action> {
        &self.action
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// The factory fixed the status before the run; no handler will execute.
    pub fn is_forced(&self) -> bool {
        !self.status.is_unknown()
    }

    pub fn context(&self) -> &JobContext {
        &self.context
    }

    /// Run the handler of this job's action.
    ///
    /// Nothing runs in dry-run mode or when the status was already forced.
    /// An `Err` is a fatal error raised by a collaborator; the status is then
    /// left as it was.
    pub fn run(&mut self) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }

        if self.is_forced() {
            debug!(
                node = %self.node_id,
                status = %self.status,
                "status forced before run; handler skipped"
            );
            return Ok(());
        }

        let action = Arc::clone(&self.action);
        match action.as_ref() {
            Action::Checkout(checkout) => self.do_checkout(checkout),
            Action::CreateSource(create) => self.do_create_source(create),
            Action::GetSource => self.do_get_source(),
            Action::InstallSource(install) => self.do_install_source(install),
            Action::Build { spec } => self.do_build(spec.as_ref()),
            Action::Test { spec } => self.do_test(spec.as_ref()),
            Action::Root => self.do_root(),
        }
    }
}
