// src/driver/shell.rs

//! Plan-file backed collaborators: specs whose primitives are shell commands
//! and source builders that copy a checkout tree.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, warn};

use crate::driver::{BuildSpace, Primitive, PrimitiveKind, RepoLocation, SourceBuilder, Spec};
use crate::sync::sync_tree;

/// A primitive that runs `sh -c <cmd>` inside the build directory.
///
/// The command sees `SRC_DIR`, `BUILD_DIR` and `INSTALL_DIR` in its
/// environment. A non-zero exit status is an error.
#[derive(Debug, Clone)]
pub struct ShellPrimitive {
    cmd: String,
}

impl ShellPrimitive {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self { cmd: cmd.into() }
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }
}

impl Primitive for ShellPrimitive {
    fn call(&self, space: &BuildSpace) -> Result<()> {
        let build_dir = space.build_dir();
        info!(cmd = %self.cmd, cwd = %build_dir.display(), "running shell primitive");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };

        let mut child = cmd
            .current_dir(&build_dir)
            .env("SRC_DIR", space.src_dir())
            .env("BUILD_DIR", &build_dir)
            .env("INSTALL_DIR", space.install_dir())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning '{}'", self.cmd))?;

        // stderr drains on its own thread so a full pipe cannot block the child.
        let stderr = child.stderr.take().map(|pipe| {
            let cmd = self.cmd.clone();
            thread::spawn(move || log_lines(&cmd, "stderr", pipe))
        });
        if let Some(pipe) = child.stdout.take() {
            log_lines(&self.cmd, "stdout", pipe);
        }
        if let Some(handle) = stderr {
            if handle.join().is_err() {
                warn!(cmd = %self.cmd, "stderr reader panicked");
            }
        }

        let status = child
            .wait()
            .with_context(|| format!("waiting for '{}'", self.cmd))?;
        if !status.success() {
            let code = status.code().unwrap_or(-1);
            return Err(anyhow!("'{}' exited with status {}", self.cmd, code));
        }
        Ok(())
    }
}

fn log_lines(cmd: &str, stream: &str, pipe: impl Read) {
    for line in BufReader::new(pipe).split(b'\n') {
        match line {
            Ok(line) => debug!(cmd = %cmd, stream, "{}", String::from_utf8_lossy(&line).trim_end()),
            Err(err) => {
                warn!(cmd = %cmd, stream, error = %err, "failed to read command output");
                break;
            }
        }
    }
}

/// Source builder that syncs its primary checkout into the cache.
///
/// `.git` at the checkout root is never copied.
#[derive(Debug, Clone)]
pub struct TreeSourceBuilder {
    name: String,
    checkout: Vec<String>,
    ignore: Vec<String>,
}

impl TreeSourceBuilder {
    pub fn new(name: impl Into<String>, checkout: Vec<String>, ignore: Vec<String>) -> Self {
        Self {
            name: name.into(),
            checkout,
            ignore,
        }
    }
}

impl SourceBuilder for TreeSourceBuilder {
    fn name(&self) -> &str {
        &self.name
    }

    fn checkout(&self) -> &[String] {
        &self.checkout
    }

    fn prepare_src(&self, repos: &BTreeMap<String, RepoLocation>, dest_dir: &Path) -> Result<()> {
        let location = repos
            .get(&self.name)
            .ok_or_else(|| anyhow!("no repository location given for source '{}'", self.name))?;

        let mut ignore = self.ignore.clone();
        ignore.push("/.git".to_string());

        let summary = sync_tree(&location.working_dir, dest_dir, &ignore)
            .with_context(|| format!("packaging source '{}'", self.name))?;
        debug!(
            source = %self.name,
            copied = summary.copied,
            removed = summary.removed,
            "source tree packaged"
        );
        Ok(())
    }
}

/// Spec declared in the plan file.
#[derive(Debug, Clone)]
pub struct ShellSpec {
    name: String,
    build_space: String,
    build: Option<ShellPrimitive>,
    test: Option<ShellPrimitive>,
    source_builders: Vec<Arc<dyn SourceBuilder>>,
}

impl ShellSpec {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            build_space: name.clone(),
            name,
            build: None,
            test: None,
            source_builders: Vec::new(),
        }
    }

    pub fn with_build_space(mut self, build_space: impl Into<String>) -> Self {
        self.build_space = build_space.into();
        self
    }

    pub fn with_build(mut self, cmd: impl Into<String>) -> Self {
        self.build = Some(ShellPrimitive::new(cmd));
        self
    }

    pub fn with_test(mut self, cmd: impl Into<String>) -> Self {
        self.test = Some(ShellPrimitive::new(cmd));
        self
    }

    pub fn with_source_builder(mut self, builder: Arc<dyn SourceBuilder>) -> Self {
        if self
            .source_builders
            .iter()
            .any(|existing| existing.name() == builder.name())
        {
            warn!(
                spec = %self.name,
                source = builder.name(),
                "duplicate source builder; the first one wins"
            );
        }
        self.source_builders.push(builder);
        self
    }
}

impl Spec for ShellSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn build_space_name(&self) -> &str {
        &self.build_space
    }

    fn source_builders(&self) -> &[Arc<dyn SourceBuilder>] {
        &self.source_builders
    }

    fn primitive(&self, kind: PrimitiveKind) -> Option<&dyn Primitive> {
        let primitive = match kind {
            PrimitiveKind::Build => self.build.as_ref(),
            PrimitiveKind::Test => self.test.as_ref(),
        };
        primitive.map(|p| p as &dyn Primitive)
    }
}
