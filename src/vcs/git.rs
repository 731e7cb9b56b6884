// src/vcs/git.rs

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use git2::build::CheckoutBuilder;
use git2::{FetchOptions, Oid, RemoteCallbacks, Repository};
use tracing::{debug, info, trace};

use crate::vcs::VcsClient;

const REMOTE: &str = "origin";

/// `git2`-backed client.
///
/// Checkouts always end on a detached HEAD at the requested commit.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitClient;

impl GitClient {
    pub fn new() -> Self {
        Self
    }
}

impl VcsClient for GitClient {
    fn init(&self, working_dir: &Path) -> Result<()> {
        if Repository::open(working_dir).is_ok() {
            debug!(dir = %working_dir.display(), "git repository already initialised");
            return Ok(());
        }

        fs::create_dir_all(working_dir)
            .with_context(|| format!("creating checkout dir {:?}", working_dir))?;
        Repository::init(working_dir)
            .with_context(|| format!("initialising git repository in {:?}", working_dir))?;
        debug!(dir = %working_dir.display(), "git repository initialised");
        Ok(())
    }

    fn update(&self, working_dir: &Path, url: &str, revision: &str, force: bool) -> Result<()> {
        let repo = Repository::open(working_dir)
            .with_context(|| format!("opening git repository {:?}", working_dir))?;

        set_origin(&repo, url)?;
        let oid = fetch_revision(&repo, url, revision)?;
        let commit = repo
            .find_commit(oid)
            .with_context(|| format!("looking up commit {oid}"))?;

        let mut checkout = CheckoutBuilder::new();
        if force {
            checkout.force().remove_untracked(true);
        } else {
            checkout.safe();
        }

        repo.checkout_tree(commit.as_object(), Some(&mut checkout))
            .with_context(|| format!("checking out {revision} in {:?}", working_dir))?;
        repo.set_head_detached(oid)
            .with_context(|| format!("moving HEAD to {oid}"))?;

        info!(
            dir = %working_dir.display(),
            url,
            revision,
            commit = %oid,
            "repository updated"
        );
        Ok(())
    }
}

fn set_origin(repo: &Repository, url: &str) -> Result<()> {
    match repo.find_remote(REMOTE) {
        Ok(remote) if remote.url() == Some(url) => {}
        Ok(_) => {
            repo.remote_set_url(REMOTE, url)
                .with_context(|| format!("pointing {REMOTE} at {url}"))?;
        }
        Err(_) => {
            repo.remote(REMOTE, url)
                .with_context(|| format!("adding remote {REMOTE} = {url}"))?;
        }
    }
    Ok(())
}

fn fetch_options<'a>() -> FetchOptions<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.sideband_progress(|data| {
        for line in String::from_utf8_lossy(data).lines() {
            trace!("remote: {}", line);
        }
        true
    });
    callbacks.transfer_progress(|stats| {
        if stats.received_objects() == stats.total_objects() {
            trace!(
                objects = stats.total_objects(),
                bytes = stats.received_bytes(),
                "fetch transfer complete"
            );
        }
        true
    });

    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    options
}

/// Fetch `revision` and return the commit it designates.
///
/// The revision is first fetched directly (branch, tag or commit id the
/// server allows). If that fails, every branch and tag is fetched and the
/// revision is resolved locally.
fn fetch_revision(repo: &Repository, url: &str, revision: &str) -> Result<Oid> {
    let mut remote = repo.find_remote(REMOTE)?;

    match remote.fetch(&[revision], Some(&mut fetch_options()), None) {
        Ok(()) => {
            let fetch_head = repo
                .find_reference("FETCH_HEAD")
                .context("reading FETCH_HEAD")?;
            let commit = repo.reference_to_annotated_commit(&fetch_head)?;
            return Ok(commit.id());
        }
        Err(err) => {
            debug!(url, revision, error = %err, "direct fetch failed; fetching all refs");
        }
    }

    remote
        .fetch(
            &[
                "+refs/heads/*:refs/remotes/origin/*",
                "+refs/tags/*:refs/tags/*",
            ],
            Some(&mut fetch_options()),
            None,
        )
        .with_context(|| format!("fetching {url}"))?;

    let candidates = [
        format!("refs/remotes/{REMOTE}/{revision}"),
        format!("refs/tags/{revision}"),
        revision.to_string(),
    ];
    for candidate in candidates.iter() {
        if let Ok(object) = repo.revparse_single(candidate) {
            let commit = object.peel_to_commit()?;
            return Ok(commit.id());
        }
    }

    bail!("revision '{revision}' not found in {url}")
}
