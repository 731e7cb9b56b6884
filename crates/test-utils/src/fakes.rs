#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use jobgraph::driver::{
    BuildSpace, Primitive, PrimitiveKind, RepoLocation, SourceBuilder, Spec,
};
use jobgraph::vcs::VcsClient;

/// One call made to [`FakeVcs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    Init(PathBuf),
    Update {
        dir: PathBuf,
        url: String,
        revision: String,
        force: bool,
    },
}

/// A fake VCS client that:
/// - records every call
/// - creates the working directory on `init`
/// - optionally fails `update`.
#[derive(Debug, Clone, Default)]
pub struct FakeVcs {
    calls: Arc<Mutex<Vec<VcsCall>>>,
    fail_update: Option<String>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            calls: Arc::default(),
            fail_update: Some(message.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<VcsCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl VcsClient for FakeVcs {
    fn init(&self, working_dir: &Path) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(VcsCall::Init(working_dir.to_path_buf()));
        fs::create_dir_all(working_dir)?;
        Ok(())
    }

    fn update(&self, working_dir: &Path, url: &str, revision: &str, force: bool) -> Result<()> {
        self.calls.lock().unwrap().push(VcsCall::Update {
            dir: working_dir.to_path_buf(),
            url: url.to_string(),
            revision: revision.to_string(),
            force,
        });
        match &self.fail_update {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

/// What a [`CountingPrimitive`] does when called.
#[derive(Debug, Clone)]
pub enum Behaviour {
    Succeed,
    Fail(String),
    Panic,
}

/// Primitive that counts its invocations.
#[derive(Debug, Clone)]
pub struct CountingPrimitive {
    calls: Arc<AtomicUsize>,
    behaviour: Behaviour,
}

impl CountingPrimitive {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            behaviour,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Primitive for CountingPrimitive {
    fn call(&self, _space: &BuildSpace) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Succeed => Ok(()),
            Behaviour::Fail(message) => Err(anyhow!("{message}")),
            Behaviour::Panic => panic!("primitive panicked on purpose"),
        }
    }
}

/// Spec whose primitives are [`CountingPrimitive`]s.
#[derive(Debug, Clone)]
pub struct FakeSpec {
    name: String,
    build: Option<CountingPrimitive>,
    test: Option<CountingPrimitive>,
    builders: Vec<Arc<dyn SourceBuilder>>,
}

impl FakeSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            build: None,
            test: None,
            builders: Vec::new(),
        }
    }

    pub fn with_build(mut self, behaviour: Behaviour) -> Self {
        self.build = Some(CountingPrimitive::new(behaviour));
        self
    }

    pub fn with_test(mut self, behaviour: Behaviour) -> Self {
        self.test = Some(CountingPrimitive::new(behaviour));
        self
    }

    pub fn with_source_builder(mut self, builder: Arc<dyn SourceBuilder>) -> Self {
        self.builders.push(builder);
        self
    }

    pub fn build_calls(&self) -> usize {
        self.build.as_ref().map(|p| p.calls()).unwrap_or(0)
    }

    pub fn test_calls(&self) -> usize {
        self.test.as_ref().map(|p| p.calls()).unwrap_or(0)
    }
}

impl Spec for FakeSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_builders(&self) -> &[Arc<dyn SourceBuilder>] {
        &self.builders
    }

    fn primitive(&self, kind: PrimitiveKind) -> Option<&dyn Primitive> {
        match kind {
            PrimitiveKind::Build => self.build.as_ref().map(|p| p as &dyn Primitive),
            PrimitiveKind::Test => self.test.as_ref().map(|p| p as &dyn Primitive),
        }
    }
}

/// Source builder that records its calls and writes a marker file into the
/// destination.
#[derive(Debug, Clone)]
pub struct RecordingSourceBuilder {
    name: String,
    checkout: Vec<String>,
    calls: Arc<Mutex<Vec<(BTreeMap<String, RepoLocation>, PathBuf)>>>,
}

impl RecordingSourceBuilder {
    pub const MARKER: &'static str = "PREPARED";

    pub fn new(name: &str, checkout: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            checkout: checkout.iter().map(|s| s.to_string()).collect(),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<(BTreeMap<String, RepoLocation>, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

impl SourceBuilder for RecordingSourceBuilder {
    fn name(&self) -> &str {
        &self.name
    }

    fn checkout(&self) -> &[String] {
        &self.checkout
    }

    fn prepare_src(&self, repos: &BTreeMap<String, RepoLocation>, dest_dir: &Path) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((repos.clone(), dest_dir.to_path_buf()));
        fs::create_dir_all(dest_dir)?;
        fs::write(dest_dir.join(Self::MARKER), &self.name)?;
        Ok(())
    }
}
