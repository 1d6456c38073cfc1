use crate::cache::Memo;
use crate::config::{BranchMatcher, GitVersionConfiguration, MatchedBranch};
use crate::error::Result;
use crate::git::{Branch, Commit, Repository};
use crate::graph::MergeBaseFinder;
use git2::Oid;
use std::collections::HashSet;
use std::sync::Arc;

/// Memoized view of one repository for one calculation
pub struct RepositoryStore<'r> {
    repository: &'r dyn Repository,
    configuration: &'r GitVersionConfiguration,
    matcher: BranchMatcher,
    merge_bases: MergeBaseFinder<'r>,
    branches: Memo<(), Vec<Branch>>,
    histories: Memo<(Oid, bool), Vec<Commit>>,
}

impl<'r> RepositoryStore<'r> {
    pub fn new(
        repository: &'r dyn Repository,
        configuration: &'r GitVersionConfiguration,
    ) -> Result<Self> {
        Ok(RepositoryStore {
            repository,
            configuration,
            matcher: BranchMatcher::new(configuration)?,
            merge_bases: MergeBaseFinder::new(repository),
            branches: Memo::new("branches"),
            histories: Memo::new("history"),
        })
    }

    pub fn repository(&self) -> &'r dyn Repository {
        self.repository
    }

    pub fn configuration(&self) -> &'r GitVersionConfiguration {
        self.configuration
    }

    pub fn matcher(&self) -> &BranchMatcher {
        &self.matcher
    }

    /// Configuration entry for a branch, matched on its friendly name
    pub fn matched(&self, branch: &Branch) -> MatchedBranch {
        self.matcher
            .resolve(self.configuration, branch.friendly_name())
    }

    /// All branches; a remote branch is hidden when a local one has the same name
    pub fn branches(&self) -> Result<Arc<Vec<Branch>>> {
        self.branches.get_or_try_insert_with(&(), || {
            let all = self.repository.branches()?;
            let local: HashSet<String> = all
                .iter()
                .filter(|b| !b.is_remote)
                .map(|b| b.friendly_name().to_string())
                .collect();
            Ok(all
                .into_iter()
                .filter(|b| !b.is_remote || !local.contains(b.friendly_name()))
                .collect())
        })
    }

    /// Find a branch by short name, falling back to remote branches
    pub fn find_branch(&self, name: &str) -> Result<Option<Branch>> {
        let branches = self.repository.branches()?;
        let found = branches
            .iter()
            .find(|b| !b.is_remote && b.name == name)
            .or_else(|| {
                branches
                    .iter()
                    .find(|b| b.is_remote && (b.name == name || b.friendly_name() == name))
            });
        Ok(found.cloned())
    }

    /// Commits reachable from `include` but not from `exclude`, newest first
    pub fn commits(
        &self,
        include: Oid,
        exclude: Option<Oid>,
        first_parent_only: bool,
    ) -> Result<Vec<Commit>> {
        self.repository.commits(include, exclude, first_parent_only)
    }

    /// Full history of `tip`, newest first
    pub fn history(&self, tip: Oid, first_parent_only: bool) -> Result<Arc<Vec<Commit>>> {
        self.histories
            .get_or_try_insert_with(&(tip, first_parent_only), || {
                self.repository.commits(tip, None, first_parent_only)
            })
    }

    pub fn find_commit(&self, id: Oid) -> Result<Commit> {
        self.repository.find_commit(id)
    }

    pub fn find_merge_base(&self, branch: &Branch, other: &Branch) -> Result<Option<Oid>> {
        self.merge_bases.find_merge_base(branch, other)
    }

    /// Uncached merge base of two commits, forward merges looked through
    pub fn find_commit_merge_base(&self, commit: Oid, other: Oid) -> Result<Option<Oid>> {
        self.merge_bases.find_commit_merge_base(commit, other)
    }

    /// Number of commits in `(source, current]`; everything reachable without a source
    pub fn count_commits(&self, source: Option<Oid>, current: Oid) -> Result<u64> {
        let count = match source {
            Some(source) => self.repository.commits(current, Some(source), false)?.len(),
            None => self.history(current, false)?.len(),
        };
        Ok(count as u64)
    }

    fn branches_where<F>(&self, predicate: F) -> Result<Vec<Branch>>
    where
        F: Fn(&MatchedBranch) -> bool,
    {
        Ok(self
            .branches()?
            .iter()
            .filter(|branch| predicate(&self.matched(branch)))
            .cloned()
            .collect())
    }

    /// Branches whose configuration is marked as a main branch
    pub fn main_branches(&self) -> Result<Vec<Branch>> {
        self.branches_where(|matched| matched.configuration.is_main_branch())
    }

    /// Branches whose configuration is marked as a release branch
    pub fn release_branches(&self) -> Result<Vec<Branch>> {
        self.branches_where(|matched| matched.configuration.is_release_branch())
    }

    /// Branches of the given configuration keys, excluding `exclude`
    pub fn branches_of_keys(&self, keys: &[String], exclude: &Branch) -> Result<Vec<Branch>> {
        let mut result = Vec::new();
        for key in keys {
            for branch in self.branches()?.iter() {
                if branch.friendly_name() == exclude.friendly_name() {
                    continue;
                }
                if self.matched(branch).key == *key && !result.contains(branch) {
                    result.push(branch.clone());
                }
            }
        }
        Ok(result)
    }

    /// Candidate parent branches for `branch`, most recent fork point first
    ///
    /// Only branches of the given source keys are considered. When several
    /// share the most recent fork point the first in `source_keys` order is
    /// used and the alternatives are reported.
    pub fn parent_branches(&self, branch: &Branch, source_keys: &[String]) -> Result<Vec<Branch>> {
        let mut candidates: Vec<(Branch, Commit)> = Vec::new();
        for candidate in self.branches_of_keys(source_keys, branch)? {
            let Some(base) = self.find_merge_base(branch, &candidate)? else {
                continue;
            };
            candidates.push((candidate, self.find_commit(base)?));
        }

        // stable sort keeps source-key order among equal fork points
        candidates.sort_by(|(_, a), (_, b)| b.when.cmp(&a.when));

        if let Some((first, base)) = candidates.first() {
            let tied: Vec<&str> = candidates
                .iter()
                .filter(|(_, other)| other.id == base.id)
                .map(|(candidate, _)| candidate.name.as_str())
                .collect();
            if tied.len() > 1 {
                tracing::warn!(
                    branch = %branch.name,
                    candidates = ?tied,
                    "Multiple possible parent branches found; using '{}'",
                    first.name
                );
            }
        }

        Ok(candidates.into_iter().map(|(candidate, _)| candidate).collect())
    }

    /// Branches whose history contains `commit`, tips equal to it first
    pub fn branches_containing_commit(&self, commit: Oid) -> Result<Vec<Branch>> {
        let mut at_tip = Vec::new();
        let mut containing = Vec::new();
        for branch in self.branches()?.iter() {
            let Some(tip) = branch.tip else {
                continue;
            };
            if tip == commit {
                at_tip.push(branch.clone());
            } else if self.repository.is_ancestor(commit, tip)? {
                containing.push(branch.clone());
            }
        }
        at_tip.extend(containing);
        Ok(at_tip)
    }

    /// Whether `commit` sits on the first-parent history of `tip`
    pub fn is_on_first_parent_history(&self, commit: Oid, tip: Oid) -> Result<bool> {
        Ok(self
            .history(tip, true)?
            .iter()
            .any(|candidate| candidate.id == commit))
    }
}
