// src/sync.rs

//! Recursive directory synchronisation used to move packaged sources around.
//!
//! Ignore patterns follow a small grammar:
//! - `/name` is anchored at the root of the tree being synced,
//! - anything else (e.g. `*.o`, `.svn`) matches at any depth,
//! - a pattern that matches a directory covers everything below it.
//!
//! Ignored paths are neither copied from the source nor deleted from the
//! destination.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// What a [`sync_tree`] call changed in the destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub copied: usize,
    pub unchanged: usize,
    pub removed: usize,
}

/// Compiled ignore patterns, matched against paths relative to a tree root.
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    set: GlobSet,
}

impl IgnoreSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();

        for raw in patterns {
            let trimmed = raw.trim().trim_end_matches('/');
            if trimmed.is_empty() {
                continue;
            }

            let base = match trimmed.strip_prefix('/') {
                Some(anchored) => anchored.to_string(),
                None => format!("**/{trimmed}"),
            };

            for glob in [base.clone(), format!("{base}/**")] {
                let compiled = GlobBuilder::new(&glob)
                    .literal_separator(true)
                    .build()
                    .with_context(|| format!("invalid ignore pattern '{raw}'"))?;
                builder.add(compiled);
            }
        }

        let set = builder.build().context("compiling ignore patterns")?;
        Ok(Self { set })
    }

    pub fn is_ignored(&self, relative: &Path) -> bool {
        self.set.is_match(relative)
    }
}

/// Make `dest` mirror `src`, skipping anything matched by `ignore`.
///
/// Files are copied when missing or when their size or modification time
/// differ; the source mtime is preserved on the copy. Entries present only in
/// the destination are removed.
pub fn sync_tree(src: &Path, dest: &Path, ignore: &[String]) -> Result<SyncSummary> {
    if !src.is_dir() {
        bail!("sync source {:?} is not a directory", src);
    }

    let ignore = IgnoreSet::new(ignore)?;
    let mut summary = SyncSummary::default();

    fs::create_dir_all(dest).with_context(|| format!("creating sync destination {:?}", dest))?;

    copy_pass(src, dest, &ignore, &mut summary)?;
    delete_pass(src, dest, &ignore, &mut summary)?;

    debug!(
        src = %src.display(),
        dest = %dest.display(),
        copied = summary.copied,
        unchanged = summary.unchanged,
        removed = summary.removed,
        "tree synchronised"
    );
    Ok(summary)
}

fn relative_to<'a>(root: &Path, path: &'a Path) -> Result<&'a Path> {
    path.strip_prefix(root)
        .with_context(|| format!("{:?} is not under {:?}", path, root))
}

fn copy_pass(src: &Path, dest: &Path, ignore: &IgnoreSet, summary: &mut SyncSummary) -> Result<()> {
    let walker = WalkDir::new(src)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| match entry.path().strip_prefix(src) {
            Ok(rel) => !ignore.is_ignored(rel),
            Err(_) => true,
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("walking {:?}", src))?;
        let rel = relative_to(src, entry.path())?;
        let target = dest.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if target.exists() && !target.is_dir() {
                fs::remove_file(&target).with_context(|| format!("replacing {:?}", target))?;
            }
            fs::create_dir_all(&target).with_context(|| format!("creating {:?}", target))?;
        } else if file_type.is_symlink() {
            if copy_symlink(entry.path(), &target)? {
                summary.copied += 1;
            } else {
                summary.unchanged += 1;
            }
        } else if needs_copy(entry.path(), &target)? {
            if target.is_dir() {
                fs::remove_dir_all(&target).with_context(|| format!("replacing {:?}", target))?;
            }
            copy_file(entry.path(), &target)?;
            trace!(path = %rel.display(), "copied");
            summary.copied += 1;
        } else {
            summary.unchanged += 1;
        }
    }

    Ok(())
}

fn delete_pass(src: &Path, dest: &Path, ignore: &IgnoreSet, summary: &mut SyncSummary) -> Result<()> {
    let walker = WalkDir::new(dest)
        .min_depth(1)
        .follow_links(false)
        .contents_first(true)
        .into_iter()
        .filter_entry(|entry| match entry.path().strip_prefix(dest) {
            Ok(rel) => !ignore.is_ignored(rel),
            Err(_) => true,
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("walking {:?}", dest))?;
        let rel = relative_to(dest, entry.path())?;
        if fs::symlink_metadata(src.join(rel)).is_ok() {
            continue;
        }

        let path = entry.path();
        if entry.file_type().is_dir() {
            // Ignored children may keep the directory alive.
            match fs::remove_dir(path) {
                Ok(()) => summary.removed += 1,
                Err(err) => debug!(path = %path.display(), error = %err, "directory kept"),
            }
        } else {
            match fs::remove_file(path) {
                Ok(()) => summary.removed += 1,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(err).with_context(|| format!("removing {:?}", path));
                }
            }
        }
    }

    Ok(())
}

fn needs_copy(src: &Path, target: &Path) -> Result<bool> {
    let target_meta = match fs::symlink_metadata(target) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(true),
        Err(err) => return Err(err).with_context(|| format!("stat {:?}", target)),
    };
    if !target_meta.is_file() {
        return Ok(true);
    }

    let src_meta = fs::metadata(src).with_context(|| format!("stat {:?}", src))?;
    if src_meta.len() != target_meta.len() {
        return Ok(true);
    }

    match (src_meta.modified(), target_meta.modified()) {
        (Ok(a), Ok(b)) => Ok(a != b),
        _ => Ok(true),
    }
}

fn copy_file(src: &Path, target: &Path) -> Result<()> {
    if let Ok(meta) = fs::symlink_metadata(target) {
        if meta.file_type().is_symlink() {
            fs::remove_file(target).with_context(|| format!("replacing {:?}", target))?;
        }
    }

    fs::copy(src, target).with_context(|| format!("copying {:?} to {:?}", src, target))?;

    let modified = fs::metadata(src)
        .and_then(|meta| meta.modified())
        .with_context(|| format!("reading mtime of {:?}", src))?;
    fs::File::open(target)
        .and_then(|file| file.set_modified(modified))
        .with_context(|| format!("setting mtime of {:?}", target))?;
    Ok(())
}

/// Returns `false` when the target already is the same link.
#[cfg(unix)]
fn copy_symlink(src: &Path, target: &Path) -> Result<bool> {
    let link: PathBuf = fs::read_link(src).with_context(|| format!("reading link {:?}", src))?;
    if let Ok(current) = fs::read_link(target) {
        if current == link {
            return Ok(false);
        }
    }
    if let Ok(meta) = fs::symlink_metadata(target) {
        if meta.is_dir() {
            fs::remove_dir_all(target)
        } else {
            fs::remove_file(target)
        }
        .with_context(|| format!("replacing {:?}", target))?;
    }
    std::os::unix::fs::symlink(&link, target)
        .with_context(|| format!("linking {:?} -> {:?}", target, link))?;
    Ok(true)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, target: &Path) -> Result<bool> {
    copy_file(src, target)?;
    Ok(true)
}
