use crate::context::GitVersionContext;
use crate::domain::{BaseVersion, BaseVersionKind, BuildMetaData};
use crate::error::Result;
use crate::resolver::EffectiveBranchConfiguration;
use crate::strategies::{version_in_branch_name, BaseVersionStrategy};
use crate::tags::TaggedSemanticVersions;

/// Versions of open release branches, seen from a branch that tracks them
///
/// Typically `develop`: once `release/2.0.0` exists, develop moves on to
/// the version after it.
pub struct TrackReleaseBranchesStrategy;

impl TrackReleaseBranchesStrategy {
    fn release_branch_names(
        &self,
        context: &GitVersionContext<'_>,
        branch: &EffectiveBranchConfiguration,
    ) -> Result<Vec<BaseVersion>> {
        let store = context.store();
        let current = &context.current_commit;
        let mut result = Vec::new();

        for release in store.release_branches()? {
            if release.friendly_name() == branch.branch.friendly_name() {
                continue;
            }
            let Some((version, _)) = version_in_branch_name(release.friendly_name(), branch) else {
                continue;
            };
            let Some(source) = store.find_merge_base(&release, &branch.branch)? else {
                continue;
            };
            // a release branch cut at the current commit has nothing to track yet
            if source == current.id {
                continue;
            }
            let release_key = store.matched(&release).key;
            result.push(
                BaseVersion::new(
                    BaseVersionKind::TrackReleaseBranches,
                    format!("Release branch exists -> '{}'", release.name),
                    version,
                    Some(source),
                    true,
                )
                .with_source_branch(release_key),
            );
        }
        Ok(result)
    }

    fn release_branch_tags(
        &self,
        context: &GitVersionContext<'_>,
        branch: &EffectiveBranchConfiguration,
    ) -> Result<Vec<BaseVersion>> {
        let store = context.store();
        let current = &context.current_commit;
        let tagged = context.tag_service().tagged_versions(
            &branch.branch,
            current,
            &branch.configuration,
            TaggedSemanticVersions::OF_RELEASE_BRANCHES,
        )?;

        let Some(highest) = tagged.iter().max_by(|a, b| a.version.cmp(&b.version)) else {
            return Ok(Vec::new());
        };
        let source = store
            .find_commit_merge_base(current.id, highest.commit.id)?
            .unwrap_or(highest.commit.id);
        let distance = store.count_commits(Some(source), current.id)?;

        let mut value = highest.version.value.clone();
        value.build_metadata = BuildMetaData::default();
        Ok(vec![BaseVersion::new(
            BaseVersionKind::TrackReleaseBranches,
            format!("Release branch tag '{}'", highest.version.tag.name),
            value,
            Some(source),
            distance > 0,
        )])
    }
}

impl BaseVersionStrategy for TrackReleaseBranchesStrategy {
    fn name(&self) -> &'static str {
        "TrackReleaseBranches"
    }

    fn base_versions(
        &self,
        context: &GitVersionContext<'_>,
        branch: &EffectiveBranchConfiguration,
    ) -> Result<Vec<BaseVersion>> {
        if !branch.configuration.tracks_release_branches {
            return Ok(Vec::new());
        }
        let mut result = self.release_branch_names(context, branch)?;
        result.extend(self.release_branch_tags(context, branch)?);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigurationBuilder;
    use crate::context::CalculationOptions;
    use crate::git::MockRepository;
    use crate::strategies::test_support::candidates;

    fn release_version(result: &[BaseVersion]) -> Option<&BaseVersion> {
        result
            .iter()
            .find(|base| base.semantic_version.to_string() == "1.2.0")
    }

    #[test]
    fn test_develop_tracks_an_open_release_branch() {
        let mut repo = MockRepository::new();
        repo.make_commit("A");
        repo.create_branch("develop", "main");
        let d1 = repo.commit_on("develop", "D1");
        repo.create_branch("release/1.2.0", "develop");
        repo.commit_on("release/1.2.0", "R1");
        repo.commit_on("develop", "D2");
        repo.checkout("develop");

        let result = candidates(&repo, "", &TrackReleaseBranchesStrategy);
        let tracked = release_version(&result).unwrap();
        assert_eq!(tracked.source, Some(d1));
        assert!(tracked.should_increment);
        assert_eq!(tracked.source_branch.as_deref(), Some("release"));
    }

    #[test]
    fn test_release_cut_at_the_current_commit_is_skipped() {
        let mut repo = MockRepository::new();
        repo.make_commit("A");
        repo.create_branch("develop", "main");
        repo.commit_on("develop", "D1");
        repo.create_branch("release/1.2.0", "develop");
        repo.checkout("develop");

        let result = candidates(&repo, "", &TrackReleaseBranchesStrategy);
        assert!(release_version(&result).is_none());
    }

    #[test]
    fn test_branches_not_tracking_releases() {
        let mut repo = MockRepository::new();
        repo.make_commit("A");
        repo.create_branch("release/1.2.0", "main");
        repo.commit_on("release/1.2.0", "R1");

        assert!(candidates(&repo, "", &TrackReleaseBranchesStrategy).is_empty());
    }

    #[test]
    fn test_develop_projects_the_highest_release_tag() {
        let mut repo = MockRepository::new();
        repo.make_commit("A");
        repo.create_branch("develop", "main");
        let d1 = repo.commit_on("develop", "D1");
        repo.create_branch("release/1.2.0", "develop");
        let r1 = repo.commit_on("release/1.2.0", "R1");
        repo.apply_tag("v1.2.0-beta.1", r1);
        repo.commit_on("develop", "D2");
        repo.checkout("develop");

        let configuration = ConfigurationBuilder::new().build().unwrap();
        let context =
            GitVersionContext::new(&repo, &configuration, &CalculationOptions::default()).unwrap();
        let branch = context.current_configuration().unwrap();
        let result = TrackReleaseBranchesStrategy
            .base_versions(&context, &branch)
            .unwrap();

        let tagged = result
            .iter()
            .find(|base| base.semantic_version.to_string() == "1.2.0-beta.1")
            .unwrap();
        assert!(tagged.description.contains("v1.2.0-beta.1"));
        assert_eq!(tagged.source, Some(d1));
        let distance = context
            .store()
            .count_commits(tagged.source, context.current_commit.id)
            .unwrap();
        assert_eq!(distance, 1);
        assert!(tagged.should_increment);
    }

    #[test]
    fn test_release_tag_after_the_current_commit_is_not_visible() {
        let mut repo = MockRepository::new();
        repo.make_commit("A");
        repo.create_branch("develop", "main");
        repo.commit_on("develop", "D1");
        repo.create_branch("release/1.2.0", "develop");
        repo.commit_on("develop", "D2");
        let r1 = repo.commit_on("release/1.2.0", "R1");
        repo.apply_tag("v1.2.0-beta.1", r1);
        repo.checkout("develop");

        let result = candidates(&repo, "", &TrackReleaseBranchesStrategy);
        assert!(result.iter().all(|base| !base.semantic_version.is_pre_release()));
    }
}
