use crate::cache::Memo;
use crate::config::EffectiveConfiguration;
use crate::domain::{SemanticVersion, SemanticVersionFormat, SemanticVersionWithTag};
use crate::error::Result;
use crate::git::Branch;
use crate::graph::RepositoryStore;
use git2::Oid;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

type FormatKey = (String, SemanticVersionFormat);
type BranchKey = (String, Option<Oid>, String, SemanticVersionFormat);

/// Parsed tags keyed by the commit they point at, highest version first
pub type TagIndex = HashMap<Oid, Vec<SemanticVersionWithTag>>;

/// Tag/commit pairs; the commit is the one the version applies to
pub type TaggedVersions = Vec<(Oid, SemanticVersionWithTag)>;

/// Memoized tag lookups for one calculation
///
/// Tags that do not parse under the configured prefix and format are left
/// out silently.
pub struct TaggedSemanticVersionRepository {
    all: Memo<FormatKey, TagIndex>,
    of_branch: Memo<BranchKey, TaggedVersions>,
    of_merge_target: Memo<BranchKey, TaggedVersions>,
    of_main_branches: Memo<BranchKey, TaggedVersions>,
    of_release_branches: Memo<BranchKey, TaggedVersions>,
}

fn format_key(configuration: &EffectiveConfiguration) -> FormatKey {
    (
        configuration.tag_prefix.clone(),
        configuration.semantic_version_format,
    )
}

fn branch_key(branch: &Branch, configuration: &EffectiveConfiguration) -> BranchKey {
    (
        branch.name.clone(),
        branch.tip,
        configuration.tag_prefix.clone(),
        configuration.semantic_version_format,
    )
}

impl Default for TaggedSemanticVersionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl TaggedSemanticVersionRepository {
    pub fn new() -> Self {
        TaggedSemanticVersionRepository {
            all: Memo::new("tags"),
            of_branch: Memo::new("tags-of-branch"),
            of_merge_target: Memo::new("tags-of-merge-target"),
            of_main_branches: Memo::new("tags-of-main-branches"),
            of_release_branches: Memo::new("tags-of-release-branches"),
        }
    }

    /// Every semantic version tag in the repository
    pub fn all_tagged(
        &self,
        store: &RepositoryStore<'_>,
        configuration: &EffectiveConfiguration,
    ) -> Result<Arc<TagIndex>> {
        self.all
            .get_or_try_insert_with(&format_key(configuration), || {
                let mut index = TagIndex::new();
                for tag in store.repository().tags()? {
                    let name = tag.name.strip_prefix("refs/tags/").unwrap_or(&tag.name);
                    let Some(version) = SemanticVersion::try_parse(
                        name,
                        configuration.tag_prefix_regex.as_ref(),
                        configuration.semantic_version_format,
                    ) else {
                        tracing::trace!(tag = %tag.name, "Skipping tag that is not a version");
                        continue;
                    };
                    index
                        .entry(tag.target)
                        .or_default()
                        .push(SemanticVersionWithTag::new(version, tag));
                }
                for versions in index.values_mut() {
                    versions.sort_by(|a, b| b.cmp(a));
                }
                Ok(index)
            })
    }

    /// Tags on commits reachable from the branch tip
    pub fn of_branch(
        &self,
        store: &RepositoryStore<'_>,
        branch: &Branch,
        configuration: &EffectiveConfiguration,
    ) -> Result<Arc<TaggedVersions>> {
        self.of_branch
            .get_or_try_insert_with(&branch_key(branch, configuration), || {
                let Some(tip) = branch.tip else {
                    return Ok(Vec::new());
                };
                let index = self.all_tagged(store, configuration)?;
                let mut result = Vec::new();
                for commit in store.history(tip, false)?.iter() {
                    for version in index.get(&commit.id).into_iter().flatten() {
                        result.push((commit.id, version.clone()));
                    }
                }
                Ok(result)
            })
    }

    /// Tags on merge commits that merged part of this branch elsewhere
    ///
    /// The version is attributed to the merged commit of this branch, not to
    /// the merge commit carrying the tag.
    pub fn of_merge_target(
        &self,
        store: &RepositoryStore<'_>,
        branch: &Branch,
        configuration: &EffectiveConfiguration,
    ) -> Result<Arc<TaggedVersions>> {
        self.of_merge_target
            .get_or_try_insert_with(&branch_key(branch, configuration), || {
                let Some(tip) = branch.tip else {
                    return Ok(Vec::new());
                };
                let history: HashSet<Oid> = store.history(tip, false)?.iter().map(|c| c.id).collect();
                let index = self.all_tagged(store, configuration)?;

                let mut result = Vec::new();
                for (target, versions) in index.iter() {
                    if history.contains(target) {
                        continue;
                    }
                    let merge = store.find_commit(*target)?;
                    if !merge.is_merge() {
                        continue;
                    }
                    for parent in merge.parents.iter().skip(1).filter(|p| history.contains(p)) {
                        for version in versions {
                            result.push((*parent, version.clone()));
                        }
                    }
                }
                Ok(result)
            })
    }

    /// Tags of every main branch except `branch` itself
    pub fn of_main_branches(
        &self,
        store: &RepositoryStore<'_>,
        branch: &Branch,
        configuration: &EffectiveConfiguration,
    ) -> Result<Arc<TaggedVersions>> {
        self.of_main_branches
            .get_or_try_insert_with(&branch_key(branch, configuration), || {
                let others = store.main_branches()?;
                self.union_of(store, branch, &others, configuration)
            })
    }

    /// Tags of every release branch except `branch` itself
    pub fn of_release_branches(
        &self,
        store: &RepositoryStore<'_>,
        branch: &Branch,
        configuration: &EffectiveConfiguration,
    ) -> Result<Arc<TaggedVersions>> {
        self.of_release_branches
            .get_or_try_insert_with(&branch_key(branch, configuration), || {
                let others = store.release_branches()?;
                self.union_of(store, branch, &others, configuration)
            })
    }

    fn union_of(
        &self,
        store: &RepositoryStore<'_>,
        branch: &Branch,
        others: &[Branch],
        configuration: &EffectiveConfiguration,
    ) -> Result<TaggedVersions> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for other in others {
            if other.friendly_name() == branch.friendly_name() {
                continue;
            }
            for (commit, version) in self.of_branch(store, other, configuration)?.iter() {
                if seen.insert((*commit, version.tag.name.clone())) {
                    result.push((*commit, version.clone()));
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigurationBuilder;
    use crate::git::MockRepository;

    fn effective(key: &str) -> (crate::config::GitVersionConfiguration, EffectiveConfiguration) {
        let configuration = ConfigurationBuilder::new().build().unwrap();
        let branch = configuration.branch(key).unwrap().clone();
        let effective = EffectiveConfiguration::new(&configuration, key, &branch).unwrap();
        (configuration, effective)
    }

    #[test]
    fn test_unparsable_tags_are_skipped() {
        let mut repo = MockRepository::new();
        let a = repo.make_commit("A");
        repo.apply_tag("v1.0.0", a);
        repo.apply_tag("nightly", a);
        repo.apply_tag("1.1.0", a);
        let (configuration, main) = effective("main");
        let store = RepositoryStore::new(&repo, &configuration).unwrap();
        let tags = TaggedSemanticVersionRepository::new();

        let index = tags.all_tagged(&store, &main).unwrap();
        let names: Vec<&str> = index[&a].iter().map(|t| t.tag.name.as_str()).collect();
        assert_eq!(names, vec!["1.1.0", "v1.0.0"]);
    }

    #[test]
    fn test_of_branch_only_sees_own_history() {
        let mut repo = MockRepository::new();
        let a = repo.make_commit("A");
        repo.apply_tag("1.0.0", a);
        repo.create_branch("develop", "main");
        let d = repo.commit_on("develop", "D");
        repo.apply_tag("1.1.0-alpha.1", d);
        let (configuration, main) = effective("main");
        let store = RepositoryStore::new(&repo, &configuration).unwrap();
        let tags = TaggedSemanticVersionRepository::new();

        let main_branch = store.find_branch("main").unwrap().unwrap();
        let visible = tags.of_branch(&store, &main_branch, &main).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].1.tag.name, "1.0.0");
    }

    #[test]
    fn test_of_merge_target_attributes_to_merged_commit() {
        let mut repo = MockRepository::new();
        repo.make_commit("A");
        repo.create_branch("develop", "main");
        let d = repo.commit_on("develop", "D");
        let merge = repo.merge("develop", "main");
        repo.apply_tag("1.0.0", merge);
        let (configuration, develop_config) = effective("develop");
        let store = RepositoryStore::new(&repo, &configuration).unwrap();
        let tags = TaggedSemanticVersionRepository::new();

        let develop = store.find_branch("develop").unwrap().unwrap();
        let visible = tags.of_merge_target(&store, &develop, &develop_config).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].0, d);
        assert_eq!(visible[0].1.tag.target, merge);
    }

    #[test]
    fn test_of_main_branches_excludes_self() {
        let mut repo = MockRepository::new();
        let a = repo.make_commit("A");
        repo.apply_tag("1.0.0", a);
        repo.create_branch("feature/x", "main");
        let (configuration, main_config) = effective("main");
        let store = RepositoryStore::new(&repo, &configuration).unwrap();
        let tags = TaggedSemanticVersionRepository::new();

        let main = store.find_branch("main").unwrap().unwrap();
        let feature = store.find_branch("feature/x").unwrap().unwrap();
        assert!(tags.of_main_branches(&store, &main, &main_config).unwrap().is_empty());
        assert_eq!(tags.of_main_branches(&store, &feature, &main_config).unwrap().len(), 1);
    }
}
