//! Read-only git access
//!
//! The version engine never talks to libgit2 directly. Everything it needs
//! from a repository goes through the [Repository] trait so the graph
//! algorithms can run against a real repository or an in-memory one.
//!
//! - [repository::Git2Repository]: real implementation using the `git2` crate
//! - [mock::MockRepository]: in-memory commit graph for tests
//!
//! ```rust
//! # use gitver::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> gitver::Result<()> {
//! let head = repo.head()?;
//! if let Some(tip) = head.tip {
//!     let history = repo.commits(tip, None, true)?;
//!     println!("{} has {} first-parent commits", head.name, history.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::Result;
use chrono::{DateTime, Utc};
use git2::Oid;

/// Name reported for HEAD when it does not point at a branch
pub const DETACHED_BRANCH_NAME: &str = "(no branch)";

/// A commit as seen by the version engine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Commit {
    pub id: Oid,
    pub parents: Vec<Oid>,
    pub when: DateTime<Utc>,
    pub message: String,
}

impl Commit {
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn sha(&self) -> String {
        self.id.to_string()
    }

    pub fn short_sha(&self) -> String {
        let mut sha = self.id.to_string();
        sha.truncate(7);
        sha
    }

    /// First line of the message
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// A local or remote-tracking branch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Branch {
    /// Short name, e.g. `develop` or `origin/develop`
    pub name: String,
    /// `None` for an unborn branch
    pub tip: Option<Oid>,
    pub is_remote: bool,
    /// Local branch with a configured upstream
    pub is_tracking: bool,
}

impl Branch {
    pub fn local(name: impl Into<String>, tip: Oid) -> Self {
        Branch {
            name: name.into(),
            tip: Some(tip),
            is_remote: false,
            is_tracking: false,
        }
    }

    pub fn remote(name: impl Into<String>, tip: Oid) -> Self {
        Branch {
            name: name.into(),
            tip: Some(tip),
            is_remote: true,
            is_tracking: false,
        }
    }

    pub fn detached(tip: Oid) -> Self {
        Branch::local(DETACHED_BRANCH_NAME, tip)
    }

    pub fn is_detached_head(&self) -> bool {
        self.name == DETACHED_BRANCH_NAME
    }

    /// Name without the remote prefix (`origin/feature/x` -> `feature/x`)
    pub fn friendly_name(&self) -> &str {
        let name = self
            .name
            .strip_prefix("refs/heads/")
            .or_else(|| self.name.strip_prefix("refs/remotes/"))
            .unwrap_or(&self.name);
        if self.is_remote || self.name.starts_with("refs/remotes/") {
            name.split_once('/').map_or(name, |(_, rest)| rest)
        } else {
            name
        }
    }
}

/// A tag peeled to the commit it points at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub name: String,
    pub target: Oid,
    pub is_annotated: bool,
}

/// Read-only view of a git repository
///
/// All implementors must be `Send + Sync`; the engine only ever reads through
/// this trait and never mutates the repository during a calculation.
pub trait Repository: Send + Sync {
    /// The checked-out branch, or a [DETACHED_BRANCH_NAME] branch for a detached HEAD
    fn head(&self) -> Result<Branch>;

    /// All local and remote-tracking branches
    fn branches(&self) -> Result<Vec<Branch>>;

    /// All tags that resolve to a commit
    fn tags(&self) -> Result<Vec<Tag>>;

    fn find_commit(&self, id: Oid) -> Result<Commit>;

    /// Commits reachable from `include` but not from `exclude`, newest first
    ///
    /// With `first_parent_only` the walk follows only the first parent of
    /// merge commits.
    fn commits(&self, include: Oid, exclude: Option<Oid>, first_parent_only: bool)
        -> Result<Vec<Commit>>;

    /// Best common ancestor of two commits
    fn merge_base(&self, a: Oid, b: Oid) -> Result<Option<Oid>>;

    /// Whether `ancestor` is reachable from `descendant` (a commit is its own ancestor)
    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool>;

    /// Number of modified, staged or untracked files in the working tree
    fn uncommitted_changes(&self) -> Result<usize>;

    /// Whether `commit` lies on the first-parent chain of `tip`
    fn is_on_first_parent_history(&self, commit: Oid, tip: Oid) -> Result<bool> {
        Ok(self
            .commits(tip, None, true)?
            .iter()
            .any(|candidate| candidate.id == commit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(byte: u8) -> Oid {
        Oid::from_bytes(&[byte; 20]).unwrap()
    }

    #[test]
    fn test_friendly_name_strips_remote() {
        assert_eq!(Branch::remote("origin/feature/login", oid(1)).friendly_name(), "feature/login");
        assert_eq!(Branch::local("feature/login", oid(1)).friendly_name(), "feature/login");
        assert_eq!(Branch::local("refs/heads/main", oid(1)).friendly_name(), "main");
        assert_eq!(
            Branch::local("refs/remotes/upstream/main", oid(1)).friendly_name(),
            "main"
        );
    }

    #[test]
    fn test_detached_branch() {
        let branch = Branch::detached(oid(3));
        assert!(branch.is_detached_head());
        assert_eq!(branch.tip, Some(oid(3)));
    }

    #[test]
    fn test_commit_helpers() {
        let commit = Commit {
            id: oid(0xab),
            parents: vec![oid(1), oid(2)],
            when: DateTime::<Utc>::default(),
            message: "Merge branch 'develop'\n\nbody".to_string(),
        };
        assert!(commit.is_merge());
        assert_eq!(commit.short_sha(), "abababa");
        assert_eq!(commit.summary(), "Merge branch 'develop'");
    }
}
