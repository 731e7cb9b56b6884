// tests/config_errors.rs

use std::fs;

use tempfile::tempdir;

use jobgraph::config::{load_and_validate, parse_plan};
use jobgraph::errors::JobgraphError;
use jobgraph::plan::{ActionGraph, ActionKind};
use jobgraph_test_utils::builders::{ActionBuilder, PlanBuilder, shell_spec_config};

fn config_message(err: JobgraphError) -> String {
    match err {
        JobgraphError::ConfigError(msg) => msg,
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn full_plan_parses_with_defaults() {
    let plan = parse_plan(
        r#"
        [config]
        jobs = 2
        [config.queues]
        build = 1

        [repository.hello]
        url = "https://example.com/hello.git"

        [spec.hello]
        build = "make"
        [[spec.hello.source_builder]]
        name = "hello-src"
        checkout = ["hello"]

        [action.checkout]
        kind = "checkout"
        repository = "hello"

        [action.build]
        kind = "build"
        spec = "hello"
        after = ["checkout"]
        queue = "build"
        "#,
    )
    .unwrap();

    assert_eq!(plan.config.jobs, 2);
    assert_eq!(plan.config.sandbox.to_str(), Some("sandbox"));
    assert_eq!(plan.repository["hello"].revision, "master");
    assert_eq!(plan.repository["hello"].vcs, "git");
    assert_eq!(plan.action["build"].kind, ActionKind::Build);

    let graph = ActionGraph::from_plan(&plan).unwrap();
    assert_eq!(graph.len(), 3);
    assert_eq!(graph.root_id(), Some("root"));
    assert_eq!(graph.dependencies_of("root"), ["build".to_string()]);
    assert_eq!(graph.node("build").unwrap().queue, "build");
    assert_eq!(graph.node("checkout").unwrap().queue, "default");
}

#[test]
fn empty_plan_is_rejected() {
    let err = PlanBuilder::new().try_build().unwrap_err();
    assert!(config_message(err).contains("at least one"));
}

#[test]
fn zero_jobs_is_rejected() {
    let err = PlanBuilder::new()
        .jobs(0)
        .action("a", ActionBuilder::new(ActionKind::GetSource).build())
        .try_build()
        .unwrap_err();
    assert!(config_message(err).contains("jobs"));
}

#[test]
fn zero_queue_capacity_is_rejected() {
    let err = PlanBuilder::new()
        .queue("build", 0)
        .action("a", ActionBuilder::new(ActionKind::GetSource).build())
        .try_build()
        .unwrap_err();
    assert!(config_message(err).contains("build"));
}

#[test]
fn checkout_needs_a_known_repository() {
    let err = PlanBuilder::new()
        .action("co", ActionBuilder::new(ActionKind::Checkout).build())
        .try_build()
        .unwrap_err();
    assert!(config_message(err).contains("repository"));

    let err = PlanBuilder::new()
        .action(
            "co",
            ActionBuilder::new(ActionKind::Checkout).repository("nope").build(),
        )
        .try_build()
        .unwrap_err();
    assert!(config_message(err).contains("unknown repository 'nope'"));
}

#[test]
fn source_actions_need_spec_and_source() {
    let err = PlanBuilder::new()
        .spec("hello", shell_spec_config(None, None))
        .action(
            "cs",
            ActionBuilder::new(ActionKind::CreateSource).spec("hello").build(),
        )
        .try_build()
        .unwrap_err();
    assert!(config_message(err).contains("source"));

    let err = PlanBuilder::new()
        .action(
            "is",
            ActionBuilder::new(ActionKind::InstallSource)
                .spec("ghost")
                .source("src")
                .build(),
        )
        .try_build()
        .unwrap_err();
    assert!(config_message(err).contains("unknown spec 'ghost'"));
}

#[test]
fn unknown_and_self_dependencies_are_rejected() {
    let err = PlanBuilder::new()
        .action("a", ActionBuilder::new(ActionKind::GetSource).after("ghost").build())
        .try_build()
        .unwrap_err();
    assert!(config_message(err).contains("unknown dependency 'ghost'"));

    let err = PlanBuilder::new()
        .action("a", ActionBuilder::new(ActionKind::GetSource).after("a").build())
        .try_build()
        .unwrap_err();
    assert!(config_message(err).contains("itself"));
}

#[test]
fn more_than_one_root_is_rejected() {
    let err = PlanBuilder::new()
        .action("r1", ActionBuilder::new(ActionKind::Root).build())
        .action("r2", ActionBuilder::new(ActionKind::Root).build())
        .try_build()
        .unwrap_err();
    assert!(config_message(err).contains("more than one root"));
}

#[test]
fn root_cannot_be_a_dependency() {
    let err = PlanBuilder::new()
        .action("r", ActionBuilder::new(ActionKind::Root).build())
        .action("a", ActionBuilder::new(ActionKind::GetSource).after("r").build())
        .try_build()
        .unwrap_err();
    assert!(config_message(err).contains("cannot be a dependency"));
}

#[test]
fn skipped_root_is_rejected() {
    let err = PlanBuilder::new()
        .action("ok", ActionBuilder::new(ActionKind::GetSource).build())
        .action("verdict", ActionBuilder::new(ActionKind::Root).skip().build())
        .try_build()
        .unwrap_err();
    assert!(config_message(err).contains("cannot be skipped"));
}

#[test]
fn declared_root_is_wired_after_every_sink() {
    let plan = PlanBuilder::new()
        .action("ok", ActionBuilder::new(ActionKind::GetSource).build())
        .action("other", ActionBuilder::new(ActionKind::GetSource).build())
        .action("verdict", ActionBuilder::new(ActionKind::Root).after("ok").build())
        .build();

    let graph = ActionGraph::from_plan(&plan).unwrap();
    let mut deps = graph.dependencies_of("verdict").to_vec();
    deps.sort();
    assert_eq!(deps, vec!["ok", "other"]);
}

#[test]
fn root_id_is_reserved_without_a_declared_root() {
    let err = PlanBuilder::new()
        .action("root", ActionBuilder::new(ActionKind::GetSource).build())
        .try_build()
        .unwrap_err();
    assert!(config_message(err).contains("reserved"));
}

#[test]
fn cycles_are_rejected() {
    let err = PlanBuilder::new()
        .action("a", ActionBuilder::new(ActionKind::GetSource).after("b").build())
        .action("b", ActionBuilder::new(ActionKind::GetSource).after("a").build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, JobgraphError::DagCycle(_)));
}

#[test]
fn source_builder_needs_a_checkout() {
    let mut spec = shell_spec_config(Some("make"), None);
    spec.source_builder.push(jobgraph::config::SourceBuilderConfig {
        name: "hello-src".to_string(),
        checkout: Vec::new(),
        ignore: Vec::new(),
    });
    let err = PlanBuilder::new()
        .spec("hello", spec)
        .action("b", ActionBuilder::new(ActionKind::Build).spec("hello").build())
        .try_build()
        .unwrap_err();
    assert!(config_message(err).contains("checkout"));
}

#[test]
fn bad_toml_and_unknown_kind_are_toml_errors() {
    assert!(matches!(
        parse_plan("[action.a]\nkind = \"deploy\"\n").unwrap_err(),
        JobgraphError::TomlError(_)
    ));
    assert!(matches!(
        parse_plan("this is not toml").unwrap_err(),
        JobgraphError::TomlError(_)
    ));
}

#[test]
fn missing_plan_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = load_and_validate(dir.path().join("Plan.toml")).unwrap_err();
    assert!(matches!(err, JobgraphError::IoError(_)));
}

#[test]
fn plan_file_on_disk_loads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Plan.toml");
    fs::write(&path, "[action.only]\nkind = \"get-source\"\nskip = true\n").unwrap();

    let plan = load_and_validate(&path).unwrap();
    assert!(plan.action["only"].skip);
}
