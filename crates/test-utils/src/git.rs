use std::fs;
use std::path::Path;

use anyhow::Result;
use git2::{Oid, Repository, Signature};

/// Create a repository at `dir` with one commit holding `files`, on branch
/// `main`.
pub fn init_repo_with_commit(dir: &Path, files: &[(&str, &str)]) -> Result<Oid> {
    let repo = Repository::init(dir)?;
    commit_files(&repo, dir, files, "initial commit")
}

/// Add another commit on `main` to the repository at `dir`.
pub fn commit_more(dir: &Path, files: &[(&str, &str)], message: &str) -> Result<Oid> {
    let repo = Repository::open(dir)?;
    commit_files(&repo, dir, files, message)
}

fn commit_files(repo: &Repository, dir: &Path, files: &[(&str, &str)], message: &str) -> Result<Oid> {
    let mut index = repo.index()?;
    for (path, contents) in files {
        let full = dir.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, contents)?;
        index.add_path(Path::new(path))?;
    }
    index.write()?;

    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;
    let signature = Signature::now("jobgraph tests", "tests@jobgraph.invalid")?;

    let parent = repo
        .find_reference("refs/heads/main")
        .ok()
        .and_then(|r| r.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    let oid = repo.commit(
        Some("refs/heads/main"),
        &signature,
        &signature,
        message,
        &tree,
        &parents,
    )?;
    repo.set_head("refs/heads/main")?;
    Ok(oid)
}
