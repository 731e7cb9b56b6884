// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ActionConfig, PlanFile, RawPlanFile};
use crate::errors::{JobgraphError, Result};
use crate::plan::ActionKind;
use crate::plan::graph::ROOT_ID;

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = crate::errors::JobgraphError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_plan(&raw)?;
        Ok(PlanFile::new_unchecked(raw))
    }
}

fn validate_raw_plan(plan: &RawPlanFile) -> Result<()> {
    ensure_has_actions(plan)?;
    validate_global_config(plan)?;
    validate_specs(plan)?;
    validate_action_fields(plan)?;
    validate_action_dependencies(plan)?;
    validate_root(plan)?;
    validate_dag(plan)?;
    Ok(())
}

fn config_error(msg: String) -> JobgraphError {
    JobgraphError::ConfigError(msg)
}

fn ensure_has_actions(plan: &RawPlanFile) -> Result<()> {
    if plan.action.is_empty() {
        return Err(config_error(
            "plan must contain at least one [action.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(plan: &RawPlanFile) -> Result<()> {
    if plan.config.jobs == 0 {
        return Err(config_error("[config].jobs must be >= 1 (got 0)".to_string()));
    }

    if plan.config.sandbox.as_os_str().is_empty() {
        return Err(config_error("[config].sandbox must not be empty".to_string()));
    }

    for (queue, capacity) in plan.config.queues.iter() {
        if *capacity == 0 {
            return Err(config_error(format!(
                "[config.queues].{queue} must be >= 1 (got 0)"
            )));
        }
    }

    Ok(())
}

fn validate_specs(plan: &RawPlanFile) -> Result<()> {
    for (name, spec) in plan.spec.iter() {
        for builder in spec.source_builder.iter() {
            if builder.checkout.is_empty() {
                return Err(config_error(format!(
                    "source builder '{}' of spec '{}' must list at least one repository in `checkout`",
                    builder.name, name
                )));
            }
        }
    }
    Ok(())
}

fn require<'a>(id: &str, action: &ActionConfig, field: &'a Option<String>, what: &str) -> Result<&'a str> {
    field.as_deref().ok_or_else(|| {
        config_error(format!(
            "action '{}' of kind '{}' requires `{}`",
            id, action.kind, what
        ))
    })
}

fn require_spec(plan: &RawPlanFile, id: &str, action: &ActionConfig) -> Result<()> {
    let spec = require(id, action, &action.spec, "spec")?;
    if !plan.spec.contains_key(spec) {
        return Err(config_error(format!(
            "action '{}' references unknown spec '{}'",
            id, spec
        )));
    }
    Ok(())
}

fn validate_action_fields(plan: &RawPlanFile) -> Result<()> {
    for (id, action) in plan.action.iter() {
        match action.kind {
            ActionKind::Checkout => {
                let repo = require(id, action, &action.repository, "repository")?;
                if !plan.repository.contains_key(repo) {
                    return Err(config_error(format!(
                        "action '{}' references unknown repository '{}'",
                        id, repo
                    )));
                }
            }
            ActionKind::CreateSource | ActionKind::InstallSource => {
                require_spec(plan, id, action)?;
                require(id, action, &action.source, "source")?;
            }
            ActionKind::Build | ActionKind::Test => {
                require_spec(plan, id, action)?;
            }
            ActionKind::GetSource | ActionKind::Root => {}
        }

        if let Some(queue) = action.queue.as_deref() {
            if queue.trim().is_empty() {
                return Err(config_error(format!(
                    "action '{}' has an empty `queue`",
                    id
                )));
            }
        }
    }
    Ok(())
}

fn validate_action_dependencies(plan: &RawPlanFile) -> Result<()> {
    for (id, action) in plan.action.iter() {
        for dep in action.after.iter() {
            if !plan.action.contains_key(dep) {
                return Err(config_error(format!(
                    "action '{}' has unknown dependency '{}' in `after`",
                    id, dep
                )));
            }
            if dep == id {
                return Err(config_error(format!(
                    "action '{}' cannot depend on itself in `after`",
                    id
                )));
            }
        }
    }
    Ok(())
}

fn validate_root(plan: &RawPlanFile) -> Result<()> {
    let roots: Vec<&String> = plan
        .action
        .iter()
        .filter(|(_, action)| action.kind == ActionKind::Root)
        .map(|(id, _)| id)
        .collect();

    if roots.len() > 1 {
        return Err(config_error(format!(
            "plan declares more than one root action: {:?}",
            roots
        )));
    }

    if let Some(root) = roots.first() {
        if plan.action[*root].skip {
            return Err(config_error(format!(
                "root action '{}' cannot be skipped",
                root
            )));
        }

        let has_dependents = plan
            .action
            .values()
            .any(|action| action.after.iter().any(|dep| dep == *root));
        if has_dependents {
            return Err(config_error(format!(
                "root action '{}' cannot be a dependency of another action",
                root
            )));
        }
    } else if plan.action.contains_key(ROOT_ID) {
        // The implicit root would take this id.
        return Err(config_error(format!(
            "action id '{}' is reserved for the root action",
            ROOT_ID
        )));
    }

    Ok(())
}

fn validate_dag(plan: &RawPlanFile) -> Result<()> {
    // Edge direction: dep -> action
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in plan.action.keys() {
        graph.add_node(id.as_str());
    }

    for (id, action) in plan.action.iter() {
        for dep in action.after.iter() {
            graph.add_edge(dep.as_str(), id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(JobgraphError::DagCycle(format!(
            "cycle detected in action graph involving '{}'",
            cycle.node_id()
        ))),
    }
}
