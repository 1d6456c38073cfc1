use crate::context::GitVersionContext;
use crate::domain::{BaseVersion, BaseVersionKind, BuildMetaData};
use crate::error::Result;
use crate::resolver::EffectiveBranchConfiguration;
use crate::strategies::BaseVersionStrategy;
use std::collections::HashSet;

/// Versions from tags visible to the branch
///
/// Only the highest tag of each commit is considered, and pre-release tags
/// must carry the branch's label.
pub struct TaggedCommitStrategy;

impl BaseVersionStrategy for TaggedCommitStrategy {
    fn name(&self) -> &'static str {
        "TaggedCommit"
    }

    fn base_versions(
        &self,
        context: &GitVersionContext<'_>,
        branch: &EffectiveBranchConfiguration,
    ) -> Result<Vec<BaseVersion>> {
        let configuration = &branch.configuration;
        let label = branch.label(None);
        let current = &context.current_commit;
        let tagged = context
            .tag_service()
            .visible_to(&branch.branch, current, configuration)?;

        let mut seen_commits = HashSet::new();
        let mut result = Vec::new();
        // newest commit first, highest version first within a commit
        for tagged_commit in tagged {
            if !seen_commits.insert(tagged_commit.commit.id) {
                continue;
            }
            let version = &tagged_commit.version;
            if !version.value.pre_release_tag.is_match_for_label(&label) {
                continue;
            }

            let mut should_increment = version.tag.target != current.id
                || !configuration.prevent_increment_when_current_commit_tagged;
            if should_increment
                && configuration.prevent_increment_when_branch_merged
                && !context
                    .store()
                    .is_on_first_parent_history(tagged_commit.commit.id, current.id)?
            {
                should_increment = false;
            }

            let mut value = version.value.clone();
            value.build_metadata = BuildMetaData::default();
            result.push(BaseVersion::new(
                BaseVersionKind::TaggedCommit,
                format!("Git tag '{}'", version.tag.name),
                value,
                Some(tagged_commit.commit.id),
                should_increment,
            ));
        }
        Ok(result)
    }
}
