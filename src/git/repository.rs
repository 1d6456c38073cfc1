use crate::error::{GitverError, Result};
use crate::git::{Branch, Commit, Tag};
use chrono::{DateTime, Utc};
use git2::{BranchType, ErrorCode, Oid, Repository as Git2Repo, Sort, StatusOptions};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Wrapper around git2::Repository with our trait interface
///
/// libgit2 handles are not `Sync`, so access is serialised through a mutex.
pub struct Git2Repository {
    repo: Mutex<Git2Repo>,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository {
            repo: Mutex::new(repo),
        })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository {
            repo: Mutex::new(repo),
        }
    }

    /// Working directory of a non-bare repository
    pub fn workdir(&self) -> Result<Option<std::path::PathBuf>> {
        Ok(self.lock()?.workdir().map(Path::to_path_buf))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Git2Repo>> {
        self.repo
            .lock()
            .map_err(|_| GitverError::structural("Repository handle was poisoned by a panic"))
    }
}

fn to_commit(commit: &git2::Commit<'_>) -> Commit {
    Commit {
        id: commit.id(),
        parents: commit.parent_ids().collect(),
        when: DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0).unwrap_or_default(),
        message: commit.message().unwrap_or_default().to_string(),
    }
}

impl super::Repository for Git2Repository {
    fn head(&self) -> Result<Branch> {
        let repo = self.lock()?;
        let head = repo.head()?;
        let tip = head
            .target()
            .ok_or_else(|| GitverError::structural("HEAD does not point at a commit"))?;

        if repo.head_detached()? {
            return Ok(Branch::detached(tip));
        }

        let name = head.shorthand().unwrap_or("HEAD").to_string();
        let is_tracking = repo
            .find_branch(&name, BranchType::Local)
            .map(|b| b.upstream().is_ok())
            .unwrap_or(false);

        Ok(Branch {
            name,
            tip: Some(tip),
            is_remote: false,
            is_tracking,
        })
    }

    fn branches(&self) -> Result<Vec<Branch>> {
        let repo = self.lock()?;
        let mut branches = Vec::new();

        for entry in repo.branches(None)? {
            let (branch, branch_type) = entry?;
            let name = match branch.name()? {
                Some(name) if !name.ends_with("/HEAD") => name.to_string(),
                _ => continue,
            };
            let Some(tip) = branch.get().target() else {
                continue;
            };
            let is_remote = branch_type == BranchType::Remote;
            let is_tracking = !is_remote && branch.upstream().is_ok();

            branches.push(Branch {
                name,
                tip: Some(tip),
                is_remote,
                is_tracking,
            });
        }

        Ok(branches)
    }

    fn tags(&self) -> Result<Vec<Tag>> {
        let repo = self.lock()?;
        let mut tags = Vec::new();

        for name in repo.tag_names(None)?.iter().flatten() {
            let reference = match repo.find_reference(&format!("refs/tags/{}", name)) {
                Ok(reference) => reference,
                Err(e) if e.code() == ErrorCode::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            // tags pointing at trees or blobs carry no version information
            let Ok(commit) = reference.peel_to_commit() else {
                continue;
            };
            let is_annotated = reference.peel_to_tag().is_ok();

            tags.push(Tag {
                name: name.to_string(),
                target: commit.id(),
                is_annotated,
            });
        }

        Ok(tags)
    }

    fn find_commit(&self, id: Oid) -> Result<Commit> {
        let repo = self.lock()?;
        let commit = repo.find_commit(id)?;
        Ok(to_commit(&commit))
    }

    fn commits(
        &self,
        include: Oid,
        exclude: Option<Oid>,
        first_parent_only: bool,
    ) -> Result<Vec<Commit>> {
        let repo = self.lock()?;
        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(include)?;
        if let Some(exclude) = exclude {
            revwalk.hide(exclude)?;
        }
        if first_parent_only {
            revwalk.simplify_first_parent()?;
        }

        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = repo.find_commit(oid?)?;
            commits.push(to_commit(&commit));
        }
        Ok(commits)
    }

    fn merge_base(&self, a: Oid, b: Oid) -> Result<Option<Oid>> {
        let repo = self.lock()?;
        match repo.merge_base(a, b) {
            Ok(oid) => Ok(Some(oid)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool> {
        if ancestor == descendant {
            return Ok(true);
        }
        let repo = self.lock()?;
        Ok(repo.graph_descendant_of(descendant, ancestor)?)
    }

    fn uncommitted_changes(&self) -> Result<usize> {
        let repo = self.lock()?;
        if repo.is_bare() {
            return Ok(0);
        }
        let mut options = StatusOptions::new();
        options.include_untracked(true).include_ignored(false);
        let count = repo.statuses(Some(&mut options))?.len();
        Ok(count)
    }
}
