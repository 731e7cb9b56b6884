// src/job/handlers.rs

//! One handler per action kind.
//!
//! Handlers are normally reached through [`Job::run`]. They return `Err` only
//! for fatal collaborator errors; unsupported operations are recorded as
//! `Status::Failure` and return `Ok`.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, error, info, warn};

use crate::driver::{PrimitiveKind, RepoLocation, Spec};
use crate::job::Job;
use crate::plan::{Checkout, CreateSource, InstallSource};
use crate::status::Status;
use crate::sync::sync_tree;
use crate::vcs::VcsKind;

impl Job {
    /// Fetch the repository into `<vcs_dir>/<repo_name>`. Git only.
    pub fn do_checkout(&mut self, checkout: &Checkout) -> Result<()> {
        if checkout.vcs != VcsKind::Git {
            error!(
                node = %self.node_id,
                repository = %checkout.repo_name,
                "{} vcs type not supported",
                checkout.vcs
            );
            self.status = Status::Failure;
            return Ok(());
        }

        let context = Arc::clone(&self.context);
        let repo_dir = context.sandbox.vcs_dir().join(&checkout.repo_name);

        context
            .vcs
            .init(&repo_dir)
            .with_context(|| format!("initialising checkout of '{}'", checkout.repo_name))?;
        context
            .vcs
            .update(&repo_dir, &checkout.url, &checkout.revision, true)
            .with_context(|| {
                format!(
                    "updating '{}' to {} from {}",
                    checkout.repo_name, checkout.revision, checkout.url
                )
            })?;

        self.status = Status::Success;
        Ok(())
    }

    /// Package a source from the checkouts into `<tmp>/cache/<source_name>`.
    ///
    /// When the spec has no source builder with that name the status is left
    /// `Unknown`, which downstream nodes treat as a failure.
    pub fn do_create_source(&mut self, create: &CreateSource) -> Result<()> {
        let builder = create
            .spec
            .source_builders()
            .iter()
            .find(|builder| builder.name() == create.source_name);

        let Some(builder) = builder else {
            warn!(
                node = %self.node_id,
                source = %create.source_name,
                spec = create.spec.name(),
                "no source builder with this name; status left unknown"
            );
            return Ok(());
        };

        let Some(primary) = builder.checkout().first() else {
            bail!(
                "source builder '{}' does not name any checkout",
                builder.name()
            );
        };

        let sandbox = &self.context.sandbox;
        let src_dir = sandbox.vcs_dir().join(primary);
        let dest_dir = sandbox.tmp_cache_dir().join(&create.source_name);

        let mut repos = BTreeMap::new();
        repos.insert(
            create.source_name.clone(),
            RepoLocation {
                working_dir: src_dir,
            },
        );

        builder
            .prepare_src(&repos, &dest_dir)
            .with_context(|| format!("preparing source '{}'", create.source_name))?;

        self.status = Status::Success;
        debug!(
            node = %self.node_id,
            dest = %dest_dir.display(),
            "{} created in cache",
            create.source_name
        );
        Ok(())
    }

    /// Barrier node: always succeeds.
    pub fn do_get_source(&mut self) -> Result<()> {
        self.status = Status::Success;
        Ok(())
    }

    /// Sync a packaged source from the cache into the spec's `src` dir.
    pub fn do_install_source(&mut self, install: &InstallSource) -> Result<()> {
        let context = Arc::clone(&self.context);
        let space = context
            .driver
            .activate(install.spec.as_ref(), &context.sandbox, &context.store)
            .with_context(|| format!("activating spec '{}'", install.spec.name()))?;

        let src_dir = context.sandbox.tmp_cache_dir().join(&install.source.name);
        let dest_dir = space.src_dir();

        let summary = sync_tree(&src_dir, &dest_dir, &install.source.ignore).with_context(|| {
            format!(
                "installing source '{}' into {:?}",
                install.source.name, dest_dir
            )
        })?;

        debug!(
            node = %self.node_id,
            source = %install.source.name,
            copied = summary.copied,
            removed = summary.removed,
            "source installed"
        );
        self.status = Status::Success;
        Ok(())
    }

    pub fn do_build(&mut self, spec: &dyn Spec) -> Result<()> {
        self.run_primitive(spec, PrimitiveKind::Build)
    }

    pub fn do_test(&mut self, spec: &dyn Spec) -> Result<()> {
        self.run_primitive(spec, PrimitiveKind::Test)
    }

    /// Verdict of the whole graph.
    ///
    /// A root still `Unknown` means nothing upstream failed.
    pub fn do_root(&mut self) -> Result<()> {
        if self.status.is_unknown() {
            self.status = Status::Success;
            info!("result: OK");
            return Ok(());
        }
        info!("result: FAIL");
        Ok(())
    }

    fn run_primitive(&mut self, spec: &dyn Spec, kind: PrimitiveKind) -> Result<()> {
        let context = Arc::clone(&self.context);
        let space = context
            .driver
            .activate(spec, &context.sandbox, &context.store)
            .with_context(|| format!("activating spec '{}'", spec.name()))?;
        space
            .create(true)
            .with_context(|| format!("creating build space of '{}'", spec.name()))?;

        let Some(primitive) = spec.primitive(kind) else {
            error!(
                node = %self.node_id,
                spec = spec.name(),
                "primitive {} not implemented in the spec",
                kind
            );
            self.status = Status::Failure;
            return Ok(());
        };

        primitive
            .call(&space)
            .with_context(|| format!("{} of spec '{}'", kind, spec.name()))?;

        self.status = Status::Success;
        Ok(())
    }
}
