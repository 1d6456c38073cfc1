use crate::error::{GitverError, Result};
use crate::git::{Branch, Commit, Repository, Tag, DETACHED_BRANCH_NAME};
use chrono::{DateTime, Utc};
use git2::Oid;
use std::collections::{HashMap, HashSet};

/// 2024-01-01T00:00:00Z; every mock commit is one minute after the previous one
const EPOCH_SECONDS: i64 = 1_704_067_200;

/// In-memory commit graph for tests without an actual git repository
///
/// Commits get strictly increasing timestamps, so "newest first" ordering is
/// also a valid topological order.
pub struct MockRepository {
    commits: HashMap<Oid, Commit>,
    branches: Vec<Branch>,
    tags: Vec<Tag>,
    head: String,
    detached: Option<Oid>,
    uncommitted_changes: usize,
    counter: u32,
}

impl MockRepository {
    /// Create an empty repository whose HEAD points at an unborn `main`
    pub fn new() -> Self {
        Self::with_initial_branch("main")
    }

    pub fn with_initial_branch(name: impl Into<String>) -> Self {
        MockRepository {
            commits: HashMap::new(),
            branches: Vec::new(),
            tags: Vec::new(),
            head: name.into(),
            detached: None,
            uncommitted_changes: 0,
            counter: 0,
        }
    }

    fn next_oid(&mut self) -> Oid {
        self.counter += 1;
        let mut bytes = [0xa5u8; 20];
        bytes[16..].copy_from_slice(&self.counter.to_be_bytes());
        Oid::from_bytes(&bytes).unwrap_or_else(|_| Oid::zero())
    }

    fn insert_commit(&mut self, parents: Vec<Oid>, message: &str) -> Oid {
        let id = self.next_oid();
        let when = DateTime::<Utc>::from_timestamp(EPOCH_SECONDS + i64::from(self.counter) * 60, 0)
            .unwrap_or_default();
        self.commits.insert(
            id,
            Commit {
                id,
                parents,
                when,
                message: message.to_string(),
            },
        );
        id
    }

    fn set_tip(&mut self, name: &str, tip: Oid) {
        match self.branches.iter_mut().find(|b| b.name == name) {
            Some(branch) => branch.tip = Some(tip),
            None => self.branches.push(Branch::local(name, tip)),
        }
    }

    /// Tip of a branch by exact name
    pub fn branch_tip(&self, name: &str) -> Option<Oid> {
        self.branches
            .iter()
            .find(|b| b.name == name)
            .and_then(|b| b.tip)
    }

    /// Commit on the checked-out branch (or on the detached HEAD)
    pub fn make_commit(&mut self, message: &str) -> Oid {
        match self.detached {
            Some(parent) => {
                let id = self.insert_commit(vec![parent], message);
                self.detached = Some(id);
                id
            }
            None => {
                let head = self.head.clone();
                self.commit_on(&head, message)
            }
        }
    }

    /// Commit on the named branch without moving HEAD; creates the branch if unborn
    pub fn commit_on(&mut self, branch: &str, message: &str) -> Oid {
        let parents = self.branch_tip(branch).into_iter().collect();
        let id = self.insert_commit(parents, message);
        self.set_tip(branch, id);
        id
    }

    /// Create `name` at the tip of `start_point`
    pub fn create_branch(&mut self, name: &str, start_point: &str) {
        if let Some(tip) = self.branch_tip(start_point) {
            self.set_tip(name, tip);
        }
    }

    /// Create or move `name` to an explicit commit
    pub fn create_branch_at(&mut self, name: &str, commit: Oid) {
        self.set_tip(name, commit);
    }

    pub fn add_remote_branch(&mut self, name: &str, commit: Oid) {
        self.branches.retain(|b| b.name != name);
        self.branches.push(Branch::remote(name, commit));
    }

    pub fn checkout(&mut self, name: &str) {
        self.head = name.to_string();
        self.detached = None;
    }

    pub fn checkout_commit(&mut self, commit: Oid) {
        self.detached = Some(commit);
    }

    /// Merge `source` into `target` with git's default merge message
    pub fn merge(&mut self, source: &str, target: &str) -> Oid {
        let message = if target == "main" || target == "master" {
            format!("Merge branch '{}'", source)
        } else {
            format!("Merge branch '{}' into {}", source, target)
        };
        self.merge_with_message(source, target, &message)
    }

    /// Merge commit on `target` whose second parent is the tip of `source`
    pub fn merge_with_message(&mut self, source: &str, target: &str, message: &str) -> Oid {
        let parents = self
            .branch_tip(target)
            .into_iter()
            .chain(self.branch_tip(source))
            .collect();
        let id = self.insert_commit(parents, message);
        self.set_tip(target, id);
        id
    }

    pub fn apply_tag(&mut self, name: &str, commit: Oid) {
        self.tags.push(Tag {
            name: name.to_string(),
            target: commit,
            is_annotated: false,
        });
    }

    pub fn apply_annotated_tag(&mut self, name: &str, commit: Oid) {
        self.tags.push(Tag {
            name: name.to_string(),
            target: commit,
            is_annotated: true,
        });
    }

    pub fn set_uncommitted_changes(&mut self, count: usize) {
        self.uncommitted_changes = count;
    }

    fn commit(&self, id: Oid) -> Result<&Commit> {
        self.commits
            .get(&id)
            .ok_or_else(|| GitverError::structural(format!("Commit {} not found", id)))
    }

    fn reachable(&self, start: Oid, first_parent_only: bool) -> Result<HashSet<Oid>> {
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let commit = self.commit(id)?;
            if first_parent_only {
                stack.extend(commit.parents.first().copied());
            } else {
                stack.extend(commit.parents.iter().copied());
            }
        }
        Ok(seen)
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn head(&self) -> Result<Branch> {
        if let Some(commit) = self.detached {
            return Ok(Branch::detached(commit));
        }
        match self.branch_tip(&self.head) {
            Some(tip) => Ok(Branch::local(self.head.clone(), tip)),
            None if self.head == DETACHED_BRANCH_NAME => {
                Err(GitverError::structural("HEAD does not point at a commit"))
            }
            None => Err(GitverError::structural(format!(
                "Branch '{}' has no commits yet",
                self.head
            ))),
        }
    }

    fn branches(&self) -> Result<Vec<Branch>> {
        Ok(self.branches.clone())
    }

    fn tags(&self) -> Result<Vec<Tag>> {
        Ok(self.tags.clone())
    }

    fn find_commit(&self, id: Oid) -> Result<Commit> {
        self.commit(id).cloned()
    }

    fn commits(
        &self,
        include: Oid,
        exclude: Option<Oid>,
        first_parent_only: bool,
    ) -> Result<Vec<Commit>> {
        let hidden = match exclude {
            Some(exclude) => self.reachable(exclude, false)?,
            None => HashSet::new(),
        };

        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![include];
        while let Some(id) = stack.pop() {
            if hidden.contains(&id) || !seen.insert(id) {
                continue;
            }
            let commit = self.commit(id)?;
            if first_parent_only {
                stack.extend(commit.parents.first().copied());
            } else {
                stack.extend(commit.parents.iter().copied());
            }
            result.push(commit.clone());
        }

        result.sort_by(|a, b| b.when.cmp(&a.when).then_with(|| b.id.cmp(&a.id)));
        Ok(result)
    }

    fn merge_base(&self, a: Oid, b: Oid) -> Result<Option<Oid>> {
        let ancestors_of_a = self.reachable(a, false)?;
        let common = self
            .reachable(b, false)?
            .into_iter()
            .filter(|id| ancestors_of_a.contains(id));

        let mut best: Option<&Commit> = None;
        for id in common {
            let commit = self.commit(id)?;
            if best.map_or(true, |current| commit.when > current.when) {
                best = Some(commit);
            }
        }
        Ok(best.map(|c| c.id))
    }

    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool> {
        Ok(self.reachable(descendant, false)?.contains(&ancestor))
    }

    fn uncommitted_changes(&self) -> Result<usize> {
        Ok(self.uncommitted_changes)
    }
}
