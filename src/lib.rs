// src/lib.rs

pub mod cli;
pub mod config;
pub mod driver;
pub mod engine;
pub mod errors;
pub mod job;
pub mod logging;
pub mod plan;
pub mod status;
pub mod sync;
pub mod vcs;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::resolve_plan_path;
use crate::config::{PlanFile, load_and_validate};
use crate::driver::{Sandbox, SandboxDriver, Store};
use crate::engine::SchedulerOptions;
use crate::job::{JobContext, JobFactory};
use crate::plan::ActionGraph;
use crate::vcs::GitClient;

/// High-level entry point used by `main.rs`.
///
/// Loads the plan, builds the action graph and runs it. Returns whether the
/// root node succeeded; a dry run always reports success.
pub async fn run(args: CliArgs) -> Result<bool> {
    let plan = load_and_validate(&args.plan)
        .with_context(|| format!("loading plan {}", args.plan.display()))?;

    if args.list {
        print_plan(&plan);
        return Ok(true);
    }

    let graph = ActionGraph::from_plan(&plan)?;
    let options = scheduler_options(&plan, &args);

    let sandbox_dir = args
        .sandbox
        .clone()
        .unwrap_or_else(|| resolve_plan_path(&args.plan, &plan.config.sandbox));
    let sandbox = Sandbox::new(sandbox_dir);
    if !args.dry_run {
        sandbox.create()?;
    }

    let store = match plan.config.store.as_deref() {
        Some(dir) => Store::local(resolve_plan_path(&args.plan, dir)),
        None => Store::none(),
    };

    info!(
        plan = %args.plan.display(),
        sandbox = %sandbox.root().display(),
        nodes = graph.len(),
        dry_run = args.dry_run,
        "starting run"
    );

    let context = Arc::new(JobContext::new(
        sandbox,
        store,
        Arc::new(SandboxDriver),
        Arc::new(GitClient::new()),
    ));
    let factory = JobFactory::new(context, args.dry_run);
    let report = factory.run(&graph, options).await?;

    debug!(order = ?report.order, "collection order");

    if args.dry_run {
        return Ok(true);
    }
    Ok(report.passed())
}

/// Plan settings with CLI overrides applied.
fn scheduler_options(plan: &PlanFile, args: &CliArgs) -> SchedulerOptions {
    let mut options = SchedulerOptions::from_plan(plan);
    if let Some(jobs) = args.jobs {
        options.jobs = jobs.max(1);
    }
    if args.keep_going {
        options.keep_going = true;
    }
    options
}

/// `--list` output: settings, then every action with its dependencies.
fn print_plan(plan: &PlanFile) {
    println!("jobgraph plan");
    println!("  config.sandbox = {}", plan.config.sandbox.display());
    if let Some(store) = plan.config.store.as_deref() {
        println!("  config.store = {}", store.display());
    }
    println!("  config.jobs = {}", plan.config.jobs);
    println!("  config.keep_going = {}", plan.config.keep_going);
    for (queue, capacity) in plan.config.queues.iter() {
        println!("  config.queues.{queue} = {capacity}");
    }
    println!();

    println!("actions ({}):", plan.action.len());
    for (id, action) in plan.action.iter() {
        println!("  - {id} [{}]", action.kind);
        if let Some(ref repo) = action.repository {
            println!("      repository: {repo}");
        }
        if let Some(ref spec) = action.spec {
            println!("      spec: {spec}");
        }
        if let Some(ref source) = action.source {
            println!("      source: {source}");
        }
        if !action.after.is_empty() {
            println!("      after: {:?}", action.after);
        }
        if let Some(ref queue) = action.queue {
            println!("      queue: {queue}");
        }
        if action.skip {
            println!("      skip: true");
        }
    }
}
