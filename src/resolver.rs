//! Resolution of `Inherit` increments across the branch hierarchy

use crate::cache::Memo;
use crate::config::{EffectiveConfiguration, IncrementStrategy};
use crate::domain::VersionField;
use crate::error::{GitverError, Result};
use crate::git::Branch;
use crate::graph::RepositoryStore;
use git2::Oid;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// A concrete branch with its matched key and resolved configuration
#[derive(Debug, Clone)]
pub struct EffectiveBranchConfiguration {
    pub branch: Branch,
    pub key: String,
    /// Named captures of the matching branch regex
    pub captures: BTreeMap<String, String>,
    pub configuration: EffectiveConfiguration,
}

impl EffectiveBranchConfiguration {
    pub fn label(&self, override_name: Option<&str>) -> String {
        self.configuration
            .expand_label(self.branch.friendly_name(), &self.captures, override_name)
    }
}

pub struct EffectiveBranchConfigurationFinder<'a, 'r> {
    store: &'a RepositoryStore<'r>,
    cache: &'a Memo<(String, Option<Oid>), EffectiveBranchConfiguration>,
}

impl<'a, 'r> EffectiveBranchConfigurationFinder<'a, 'r> {
    pub fn new(
        store: &'a RepositoryStore<'r>,
        cache: &'a Memo<(String, Option<Oid>), EffectiveBranchConfiguration>,
    ) -> Self {
        EffectiveBranchConfigurationFinder { store, cache }
    }

    /// Effective configuration of `branch`; the increment is never `Inherit`
    pub fn resolve(&self, branch: &Branch) -> Result<Arc<EffectiveBranchConfiguration>> {
        let key = (branch.name.clone(), branch.tip);
        self.cache.get_or_try_insert_with(&key, || {
            let mut visited = HashSet::new();
            self.resolve_with(branch, &mut visited)
        })
    }

    fn resolve_with(
        &self,
        branch: &Branch,
        visited: &mut HashSet<String>,
    ) -> Result<EffectiveBranchConfiguration> {
        let configuration = self.store.configuration();
        let matched = self.store.matched(branch);
        let mut effective = EffectiveConfiguration::new(configuration, &matched.key, &matched.configuration)?;

        let inherits = matched
            .configuration
            .inherit(&configuration.fallback_configuration())
            .increment
            == Some(IncrementStrategy::Inherit);

        if inherits {
            effective.increment = self.inherited_increment(branch, &effective, visited)?;
        }

        tracing::debug!(
            branch = %branch.name,
            key = %matched.key,
            increment = %effective.increment,
            "Resolved branch configuration"
        );

        Ok(EffectiveBranchConfiguration {
            branch: branch.clone(),
            key: matched.key,
            captures: matched.captures,
            configuration: effective,
        })
    }

    fn inherited_increment(
        &self,
        branch: &Branch,
        effective: &EffectiveConfiguration,
        visited: &mut HashSet<String>,
    ) -> Result<VersionField> {
        if !visited.insert(branch.name.clone()) {
            tracing::warn!(branch = %branch.name, "Cyclic increment inheritance; using Patch");
            return Ok(VersionField::Patch);
        }

        let parents = self
            .store
            .parent_branches(branch, &effective.source_branches)?;

        let parent = match parents.into_iter().next() {
            Some(parent) => parent,
            None if effective.is_main_branch => return Ok(VersionField::None),
            None => {
                let main = self
                    .store
                    .main_branches()?
                    .into_iter()
                    .find(|candidate| candidate.friendly_name() != branch.friendly_name());
                match main {
                    Some(main) => main,
                    None => {
                        return Err(GitverError::structural(format!(
                            "Branch '{}' inherits its increment but no source branch could be \
                             found. Make sure the local branches it was created from exist \
                             (e.g. fetch main), or set an explicit increment for '{}'",
                            branch.name, effective.branch_key
                        )))
                    }
                }
            }
        };

        let parent = self.resolve_with(&parent, visited)?;
        Ok(parent.configuration.increment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigurationBuilder;
    use crate::git::MockRepository;

    #[test]
    fn test_feature_inherits_from_develop() {
        let mut repo = MockRepository::new();
        repo.make_commit("A");
        repo.create_branch("develop", "main");
        repo.commit_on("develop", "D");
        repo.create_branch("feature/login", "develop");
        repo.commit_on("feature/login", "F");
        let configuration = ConfigurationBuilder::new().build().unwrap();
        let store = RepositoryStore::new(&repo, &configuration).unwrap();
        let cache = Memo::new("effective");
        let finder = EffectiveBranchConfigurationFinder::new(&store, &cache);

        let feature = store.find_branch("feature/login").unwrap().unwrap();
        let resolved = finder.resolve(&feature).unwrap();
        assert_eq!(resolved.key, "feature");
        assert_eq!(resolved.configuration.increment, VersionField::Minor);
        assert_eq!(resolved.label(None), "login");
    }

    #[test]
    fn test_feature_off_main_inherits_patch() {
        let mut repo = MockRepository::new();
        repo.make_commit("A");
        repo.create_branch("feature/login", "main");
        repo.commit_on("feature/login", "F");
        let configuration = ConfigurationBuilder::new().build().unwrap();
        let store = RepositoryStore::new(&repo, &configuration).unwrap();
        let cache = Memo::new("effective");
        let finder = EffectiveBranchConfigurationFinder::new(&store, &cache);

        let feature = store.find_branch("feature/login").unwrap().unwrap();
        assert_eq!(finder.resolve(&feature).unwrap().configuration.increment, VersionField::Patch);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let mut repo = MockRepository::new();
        repo.make_commit("A");
        repo.create_branch("hotfix/x", "main");
        let configuration = ConfigurationBuilder::new().build().unwrap();
        let store = RepositoryStore::new(&repo, &configuration).unwrap();
        let cache = Memo::new("effective");
        let finder = EffectiveBranchConfigurationFinder::new(&store, &cache);

        let hotfix = store.find_branch("hotfix/x").unwrap().unwrap();
        let first = finder.resolve(&hotfix).unwrap();
        let second = finder.resolve(&hotfix).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.configuration.increment, VersionField::Patch);
    }

    #[test]
    fn test_missing_source_branch_is_structural_error() {
        let mut repo = MockRepository::with_initial_branch("topic");
        repo.make_commit("A");
        let configuration = ConfigurationBuilder::new().build().unwrap();
        let store = RepositoryStore::new(&repo, &configuration).unwrap();
        let cache = Memo::new("effective");
        let finder = EffectiveBranchConfigurationFinder::new(&store, &cache);

        let topic = store.find_branch("topic").unwrap().unwrap();
        let err = finder.resolve(&topic).unwrap_err();
        assert!(matches!(err, GitverError::Structural(_)));
    }

    #[test]
    fn test_cyclic_inheritance_falls_back_to_patch() {
        let mut builder = ConfigurationBuilder::new();
        builder
            .add_override_str(
                r#"
workflow = ""
[branches.left]
regex = "^left$"
increment = "Inherit"
source-branches = ["right"]

[branches.right]
regex = "^right$"
increment = "Inherit"
source-branches = ["left"]
"#,
            )
            .unwrap();
        let configuration = builder.build().unwrap();

        let mut repo = MockRepository::with_initial_branch("left");
        repo.make_commit("A");
        repo.create_branch("right", "left");
        repo.commit_on("right", "R");
        repo.commit_on("left", "L");
        let store = RepositoryStore::new(&repo, &configuration).unwrap();
        let cache = Memo::new("effective");
        let finder = EffectiveBranchConfigurationFinder::new(&store, &cache);

        let left = store.find_branch("left").unwrap().unwrap();
        let resolved = finder.resolve(&left).unwrap();
        assert_eq!(resolved.configuration.increment, VersionField::Patch);
    }
}
