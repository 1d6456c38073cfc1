use crate::config::EffectiveConfiguration;
use crate::domain::SemanticVersionWithTag;
use crate::error::Result;
use crate::git::{Branch, Commit};
use crate::graph::RepositoryStore;
use crate::tags::{TaggedSemanticVersionRepository, TaggedSemanticVersions};
use std::collections::{HashMap, HashSet};

/// A commit together with a version that applies to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedCommit {
    pub commit: Commit,
    pub version: SemanticVersionWithTag,
}

/// Composes the tag lookups visible to one branch at one commit
pub struct TaggedSemanticVersionService<'a, 'r> {
    store: &'a RepositoryStore<'r>,
    repository: &'a TaggedSemanticVersionRepository,
}

impl<'a, 'r> TaggedSemanticVersionService<'a, 'r> {
    pub fn new(store: &'a RepositoryStore<'r>, repository: &'a TaggedSemanticVersionRepository) -> Self {
        TaggedSemanticVersionService { store, repository }
    }

    /// Tagged versions visible to `branch`, newest commit first
    ///
    /// Commits newer than `current` and commits matched by the ignore
    /// configuration are dropped.
    pub fn tagged_versions(
        &self,
        branch: &Branch,
        current: &Commit,
        configuration: &EffectiveConfiguration,
        visible: TaggedSemanticVersions,
    ) -> Result<Vec<TaggedCommit>> {
        let mut groups = Vec::new();
        if visible.contains(TaggedSemanticVersions::OF_BRANCH) {
            groups.push(self.repository.of_branch(self.store, branch, configuration)?);
        }
        if visible.contains(TaggedSemanticVersions::OF_MERGE_TARGETS) {
            groups.push(self.repository.of_merge_target(self.store, branch, configuration)?);
        }
        if visible.contains(TaggedSemanticVersions::OF_MAIN_BRANCHES) {
            groups.push(self.repository.of_main_branches(self.store, branch, configuration)?);
        }
        if visible.contains(TaggedSemanticVersions::OF_RELEASE_BRANCHES) {
            groups.push(self.repository.of_release_branches(self.store, branch, configuration)?);
        }

        let mut commits: HashMap<git2::Oid, Commit> = HashMap::new();
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for group in groups {
            for (oid, version) in group.iter() {
                if !seen.insert((*oid, version.tag.name.clone())) {
                    continue;
                }
                let commit = match commits.get(oid) {
                    Some(commit) => commit.clone(),
                    None => {
                        let commit = self.store.find_commit(*oid)?;
                        commits.insert(*oid, commit.clone());
                        commit
                    }
                };
                if commit.when > current.when || configuration.ignore.is_ignored(&commit) {
                    continue;
                }
                result.push(TaggedCommit {
                    commit,
                    version: version.clone(),
                });
            }
        }

        result.sort_by(|a, b| {
            b.commit
                .when
                .cmp(&a.commit.when)
                .then_with(|| b.version.cmp(&a.version))
        });
        Ok(result)
    }

    /// Tagged versions using the visibility implied by the configuration
    pub fn visible_to(
        &self,
        branch: &Branch,
        current: &Commit,
        configuration: &EffectiveConfiguration,
    ) -> Result<Vec<TaggedCommit>> {
        self.tagged_versions(
            branch,
            current,
            configuration,
            TaggedSemanticVersions::for_configuration(configuration),
        )
    }

    /// Highest version tagged directly on `commit`, if any
    pub fn tag_on_commit(
        &self,
        commit: &Commit,
        configuration: &EffectiveConfiguration,
    ) -> Result<Option<SemanticVersionWithTag>> {
        if configuration.ignore.is_ignored(commit) {
            return Ok(None);
        }
        let index = self.repository.all_tagged(self.store, configuration)?;
        Ok(index
            .get(&commit.id)
            .and_then(|versions| versions.first())
            .cloned())
    }
}
