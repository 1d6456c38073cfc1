//! State of one version calculation
//!
//! The context pins the branch and commit being evaluated and owns every
//! cache used while calculating. A new context is built per calculation, so
//! nothing leaks between repositories or runs.

use crate::cache::Memo;
use crate::config::GitVersionConfiguration;
use crate::domain::SemanticVersionWithTag;
use crate::error::{GitverError, Result};
use crate::git::{Branch, Commit, Repository};
use crate::graph::RepositoryStore;
use crate::increment::IncrementStrategyFinder;
use crate::resolver::{EffectiveBranchConfiguration, EffectiveBranchConfigurationFinder};
use crate::tags::{TaggedSemanticVersionRepository, TaggedSemanticVersionService};
use git2::Oid;
use std::str::FromStr;
use std::sync::Arc;

/// What to evaluate instead of HEAD
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationOptions {
    pub target_branch: Option<String>,
    /// Full or abbreviated sha on the target branch
    pub target_commit: Option<String>,
}

pub struct GitVersionContext<'r> {
    store: RepositoryStore<'r>,
    tags: TaggedSemanticVersionRepository,
    effective: Memo<(String, Option<Oid>), EffectiveBranchConfiguration>,
    pub current_branch: Branch,
    pub current_commit: Commit,
    pub uncommitted_changes: u64,
}

impl<'r> GitVersionContext<'r> {
    pub fn new(
        repository: &'r dyn Repository,
        configuration: &'r GitVersionConfiguration,
        options: &CalculationOptions,
    ) -> Result<Self> {
        let store = RepositoryStore::new(repository, configuration)?;

        let mut current_branch = match &options.target_branch {
            Some(name) => store.find_branch(name)?.ok_or_else(|| {
                GitverError::structural(format!(
                    "Branch '{}' does not exist. Fetch it or check the branch name",
                    name
                ))
            })?,
            None => repository.head()?,
        };

        let tip = current_branch.tip.ok_or_else(|| {
            GitverError::structural(format!("Branch '{}' has no commits", current_branch.name))
        })?;
        let current_commit = match &options.target_commit {
            Some(sha) => resolve_commit(&store, tip, sha)?,
            None => store.find_commit(tip)?,
        };

        if current_branch.is_detached_head() {
            let containing = store.branches_containing_commit(current_commit.id)?;
            if containing.len() > 1 {
                let names: Vec<&str> = containing.iter().map(|b| b.name.as_str()).collect();
                tracing::warn!(
                    commit = %current_commit.short_sha(),
                    candidates = ?names,
                    "Detached HEAD is contained in several branches; using '{}'",
                    names[0]
                );
            }
            if let Some(branch) = containing.into_iter().next() {
                current_branch = branch;
            }
        }

        tracing::info!(
            branch = %current_branch.name,
            commit = %current_commit.short_sha(),
            "Calculating version"
        );

        Ok(GitVersionContext {
            store,
            tags: TaggedSemanticVersionRepository::new(),
            effective: Memo::new("effective-configuration"),
            current_branch,
            current_commit,
            uncommitted_changes: repository.uncommitted_changes()? as u64,
        })
    }

    pub fn store(&self) -> &RepositoryStore<'r> {
        &self.store
    }

    pub fn tags(&self) -> &TaggedSemanticVersionRepository {
        &self.tags
    }

    pub fn configuration(&self) -> &'r GitVersionConfiguration {
        self.store.configuration()
    }

    pub fn tag_service(&self) -> TaggedSemanticVersionService<'_, 'r> {
        TaggedSemanticVersionService::new(&self.store, &self.tags)
    }

    pub fn increment_finder(&self) -> IncrementStrategyFinder<'_, 'r> {
        IncrementStrategyFinder::new(&self.store)
    }

    /// Resolved configuration of any branch, memoized per branch and tip
    pub fn effective_configuration(&self, branch: &Branch) -> Result<Arc<EffectiveBranchConfiguration>> {
        EffectiveBranchConfigurationFinder::new(&self.store, &self.effective).resolve(branch)
    }

    /// Resolved configuration of the branch being evaluated
    pub fn current_configuration(&self) -> Result<Arc<EffectiveBranchConfiguration>> {
        self.effective_configuration(&self.current_branch)
    }

    /// Highest version tagged on the current commit that fits the branch label
    pub fn current_commit_tag(
        &self,
        branch: &EffectiveBranchConfiguration,
    ) -> Result<Option<SemanticVersionWithTag>> {
        let label = branch.label(None);
        let Some(tagged) = self
            .tag_service()
            .tag_on_commit(&self.current_commit, &branch.configuration)?
        else {
            return Ok(None);
        };
        if tagged.value.pre_release_tag.is_match_for_label(&label) {
            return Ok(Some(tagged));
        }
        let index = self.tags.all_tagged(&self.store, &branch.configuration)?;
        Ok(index.get(&self.current_commit.id).and_then(|versions| {
            versions
                .iter()
                .find(|v| v.value.pre_release_tag.is_match_for_label(&label))
                .cloned()
        }))
    }

    pub fn is_current_commit_tagged(&self, branch: &EffectiveBranchConfiguration) -> Result<bool> {
        Ok(self.current_commit_tag(branch)?.is_some())
    }
}

fn resolve_commit(store: &RepositoryStore<'_>, tip: Oid, sha: &str) -> Result<Commit> {
    let sha = sha.trim().to_lowercase();
    if sha.is_empty() {
        return Err(GitverError::structural("An empty commit sha was given"));
    }
    if sha.len() == 40 {
        let oid = Oid::from_str(&sha)?;
        return store.find_commit(oid);
    }
    store
        .history(tip, false)?
        .iter()
        .find(|commit| commit.sha().starts_with(&sha))
        .cloned()
        .ok_or_else(|| {
            GitverError::structural(format!("Commit '{}' is not part of the target branch", sha))
        })
}
