// tests/job_handlers.rs

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;

use jobgraph::driver::{ShellSpec, SpecRef};
use jobgraph::job::{Job, JobContext};
use jobgraph::plan::ActionNode;
use jobgraph::status::Status;
use jobgraph_test_utils::builders::{
    build_node, checkout_node, context_in, create_source_node, get_source_node,
    install_source_node, root_node, test_node,
};
use jobgraph_test_utils::fakes::{Behaviour, FakeSpec, FakeVcs, RecordingSourceBuilder, VcsCall};
use jobgraph_test_utils::init_tracing;

fn job_for(node: &ActionNode, context: &Arc<JobContext>) -> Job {
    Job::new(node, Arc::clone(context), Status::Unknown, false)
}

#[test]
fn checkout_of_unsupported_vcs_fails_without_touching_the_sandbox() {
    init_tracing();
    let dir = tempdir().unwrap();
    let vcs = Arc::new(FakeVcs::new());
    let context = context_in(dir.path(), vcs.clone());

    let node = checkout_node("co", "hello", "svn://example.com/hello", "svn");
    let mut job = job_for(&node, &context);
    job.run().unwrap();

    assert_eq!(job.status(), Status::Failure);
    assert!(vcs.calls().is_empty());
    assert!(!context.sandbox.vcs_dir().exists());
}

#[test]
fn git_checkout_inits_then_force_updates_the_working_dir() {
    let dir = tempdir().unwrap();
    let vcs = Arc::new(FakeVcs::new());
    let context = context_in(dir.path(), vcs.clone());

    let node = checkout_node("co", "hello", "https://example.com/hello.git", "git");
    let mut job = job_for(&node, &context);
    job.run().unwrap();

    let repo_dir = dir.path().join("vcs").join("hello");
    assert_eq!(job.status(), Status::Success);
    assert_eq!(
        vcs.calls(),
        vec![
            VcsCall::Init(repo_dir.clone()),
            VcsCall::Update {
                dir: repo_dir,
                url: "https://example.com/hello.git".to_string(),
                revision: "main".to_string(),
                force: true,
            },
        ]
    );
}

#[test]
fn vcs_error_is_fatal_and_leaves_status_unknown() {
    let dir = tempdir().unwrap();
    let context = context_in(dir.path(), Arc::new(FakeVcs::failing("remote hung up")));

    let node = checkout_node("co", "hello", "https://example.com/hello.git", "git");
    let mut job = job_for(&node, &context);
    let err = job.run().unwrap_err();

    assert!(format!("{err:#}").contains("remote hung up"));
    assert_eq!(job.status(), Status::Unknown);
}

#[test]
fn create_source_runs_the_matching_builder_into_the_cache() {
    let dir = tempdir().unwrap();
    let context = context_in(dir.path(), Arc::new(FakeVcs::new()));

    let other = Arc::new(RecordingSourceBuilder::new("other-src", &["other"]));
    let builder = Arc::new(RecordingSourceBuilder::new("hello-src", &["hello", "extra"]));
    let spec: SpecRef = Arc::new(
        FakeSpec::new("hello")
            .with_source_builder(other.clone())
            .with_source_builder(builder.clone()),
    );

    let node = create_source_node("cs", "hello-src", spec);
    let mut job = job_for(&node, &context);
    job.run().unwrap();

    assert_eq!(job.status(), Status::Success);
    assert!(other.calls().is_empty());

    let calls = builder.calls();
    assert_eq!(calls.len(), 1);
    let (repos, dest) = &calls[0];
    assert_eq!(dest, &dir.path().join("tmp").join("cache").join("hello-src"));
    assert_eq!(
        repos["hello-src"].working_dir,
        dir.path().join("vcs").join("hello")
    );
    assert!(dest.join(RecordingSourceBuilder::MARKER).is_file());
}

#[test]
fn create_source_without_matching_builder_keeps_unknown() {
    let dir = tempdir().unwrap();
    let context = context_in(dir.path(), Arc::new(FakeVcs::new()));

    let spec: SpecRef = Arc::new(
        FakeSpec::new("hello")
            .with_source_builder(Arc::new(RecordingSourceBuilder::new("other-src", &["x"]))),
    );
    let node = create_source_node("cs", "hello-src", spec);
    let mut job = job_for(&node, &context);
    job.run().unwrap();

    assert_eq!(job.status(), Status::Unknown);
    assert!(!dir.path().join("tmp").join("cache").join("hello-src").exists());
}

#[test]
fn get_source_always_succeeds() {
    let dir = tempdir().unwrap();
    let context = context_in(dir.path(), Arc::new(FakeVcs::new()));

    let mut job = job_for(&get_source_node("gs"), &context);
    job.run().unwrap();
    assert_eq!(job.status(), Status::Success);
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn install_source_syncs_cache_into_build_space_src() {
    let dir = tempdir().unwrap();
    let context = context_in(dir.path(), Arc::new(FakeVcs::new()));

    let cache = dir.path().join("tmp").join("cache").join("hello-src");
    write(&cache.join("main.c"), "int main() {}");
    write(&cache.join("lib/util.c"), "void util() {}");
    write(&cache.join("lib/util.o"), "object");

    let spec: SpecRef = Arc::new(FakeSpec::new("hello"));
    let node = install_source_node("is", "hello-src", &["*.o"], spec);
    let mut job = job_for(&node, &context);
    job.run().unwrap();

    let src = dir.path().join("hello").join("src");
    assert_eq!(job.status(), Status::Success);
    assert_eq!(fs::read_to_string(src.join("main.c")).unwrap(), "int main() {}");
    assert!(src.join("lib/util.c").is_file());
    assert!(!src.join("lib/util.o").exists());
}

#[test]
fn install_source_without_cached_source_is_fatal() {
    let dir = tempdir().unwrap();
    let context = context_in(dir.path(), Arc::new(FakeVcs::new()));

    let spec: SpecRef = Arc::new(FakeSpec::new("hello"));
    let node = install_source_node("is", "missing", &[], spec);
    let mut job = job_for(&node, &context);

    assert!(job.run().is_err());
    assert_eq!(job.status(), Status::Unknown);
}

#[test]
fn build_without_primitive_is_a_failure() {
    let dir = tempdir().unwrap();
    let context = context_in(dir.path(), Arc::new(FakeVcs::new()));

    let spec = Arc::new(FakeSpec::new("hello").with_test(Behaviour::Succeed));
    let mut job = job_for(&build_node("b", spec.clone()), &context);
    job.run().unwrap();

    assert_eq!(job.status(), Status::Failure);
    assert_eq!(spec.test_calls(), 0);
}

#[test]
fn build_calls_the_primitive_once_in_a_created_build_space() {
    let dir = tempdir().unwrap();
    let context = context_in(dir.path(), Arc::new(FakeVcs::new()));

    let spec = Arc::new(FakeSpec::new("hello").with_build(Behaviour::Succeed));
    let mut job = job_for(&build_node("b", spec.clone()), &context);
    job.run().unwrap();

    assert_eq!(job.status(), Status::Success);
    assert_eq!(spec.build_calls(), 1);
    for sub in ["src", "build", "install", "tmp", "log"] {
        assert!(dir.path().join("hello").join(sub).is_dir(), "missing {sub}");
    }
}

#[test]
fn failing_primitive_is_fatal() {
    let dir = tempdir().unwrap();
    let context = context_in(dir.path(), Arc::new(FakeVcs::new()));

    let spec = Arc::new(FakeSpec::new("hello").with_test(Behaviour::Fail("3 tests failed".into())));
    let mut job = job_for(&test_node("t", spec.clone()), &context);
    let err = job.run().unwrap_err();

    assert!(format!("{err:#}").contains("3 tests failed"));
    assert_eq!(spec.test_calls(), 1);
    assert_eq!(job.status(), Status::Unknown);
}

#[test]
fn test_without_primitive_is_a_failure() {
    let dir = tempdir().unwrap();
    let context = context_in(dir.path(), Arc::new(FakeVcs::new()));

    let spec = Arc::new(FakeSpec::new("hello").with_build(Behaviour::Succeed));
    let mut job = job_for(&test_node("t", spec.clone()), &context);
    job.run().unwrap();

    assert_eq!(job.status(), Status::Failure);
    assert_eq!(spec.build_calls(), 0);
}

#[test]
fn root_turns_unknown_into_success() {
    let dir = tempdir().unwrap();
    let context = context_in(dir.path(), Arc::new(FakeVcs::new()));

    let mut job = job_for(&root_node("root"), &context);
    job.run().unwrap();
    assert_eq!(job.status(), Status::Success);
}

#[test]
fn dry_run_never_calls_a_handler() {
    let dir = tempdir().unwrap();
    let vcs = Arc::new(FakeVcs::new());
    let context = context_in(dir.path(), vcs.clone());

    let spec = Arc::new(FakeSpec::new("hello").with_build(Behaviour::Succeed));
    for node in [
        checkout_node("co", "hello", "https://example.com/hello.git", "git"),
        build_node("b", spec.clone()),
        root_node("root"),
    ] {
        let mut job = Job::new(&node, Arc::clone(&context), Status::Unknown, true);
        job.run().unwrap();
        assert_eq!(job.status(), Status::Unknown);
    }

    assert!(vcs.calls().is_empty());
    assert_eq!(spec.build_calls(), 0);
    assert!(!dir.path().join("hello").exists());
}

#[cfg(unix)]
#[test]
fn shell_primitive_sees_build_space_env() {
    let dir = tempdir().unwrap();
    let context = context_in(dir.path(), Arc::new(FakeVcs::new()));

    let spec: SpecRef = Arc::new(
        ShellSpec::new("hello")
            .with_build_space("space")
            .with_build("echo built > \"$INSTALL_DIR/out.txt\" && test -d \"$SRC_DIR\""),
    );
    let mut job = job_for(&build_node("b", spec), &context);
    job.run().unwrap();

    assert_eq!(job.status(), Status::Success);
    let out = dir.path().join("space").join("install").join("out.txt");
    assert_eq!(fs::read_to_string(out).unwrap().trim(), "built");
}

#[cfg(unix)]
#[test]
fn shell_primitive_non_zero_exit_is_fatal() {
    let dir = tempdir().unwrap();
    let context = context_in(dir.path(), Arc::new(FakeVcs::new()));

    let spec: SpecRef = Arc::new(ShellSpec::new("hello").with_test("exit 3"));
    let mut job = job_for(&test_node("t", spec), &context);
    let err = job.run().unwrap_err();

    assert!(format!("{err:#}").contains("exited with status 3"));
    assert_eq!(job.status(), Status::Unknown);
}

#[cfg(unix)]
#[test]
fn shell_primitive_drains_large_output_on_both_streams() {
    let dir = tempdir().unwrap();
    let context = context_in(dir.path(), Arc::new(FakeVcs::new()));

    // Well past a pipe buffer on each stream.
    let cmd = "i=0; while [ $i -lt 5000 ]; do \
               echo \"line $i of stdout padding padding padding\"; \
               echo \"line $i of stderr padding padding padding\" >&2; \
               i=$((i+1)); done";
    let spec: SpecRef = Arc::new(ShellSpec::new("hello").with_build(cmd));
    let mut job = job_for(&build_node("b", spec), &context);
    with_deadline(move || {
        job.run().unwrap();
        assert_eq!(job.status(), Status::Success);
    });
}

fn with_deadline(f: impl FnOnce() + Send + 'static) {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        f();
        tx.send(()).unwrap();
    });
    rx.recv_timeout(std::time::Duration::from_secs(20))
        .expect("command output was not drained in time");
}
