use crate::context::GitVersionContext;
use crate::domain::{BaseVersion, BaseVersionKind};
use crate::error::Result;
use crate::resolver::EffectiveBranchConfiguration;
use crate::strategies::{version_in_branch_name, BaseVersionStrategy};

/// Version embedded in a release branch name, e.g. `release/1.2.0`
///
/// The version is a declared floor and is never incremented. It is anchored
/// at the point the branch was created from its source branch.
pub struct VersionInBranchNameStrategy;

impl BaseVersionStrategy for VersionInBranchNameStrategy {
    fn name(&self) -> &'static str {
        "VersionInBranchName"
    }

    fn base_versions(
        &self,
        context: &GitVersionContext<'_>,
        branch: &EffectiveBranchConfiguration,
    ) -> Result<Vec<BaseVersion>> {
        if !branch.configuration.is_release_branch {
            return Ok(Vec::new());
        }
        let name = branch.branch.friendly_name();
        let Some((version, remainder)) = version_in_branch_name(name, branch) else {
            return Ok(Vec::new());
        };

        let store = context.store();
        let source = match store
            .parent_branches(&branch.branch, &branch.configuration.source_branches)?
            .first()
        {
            Some(parent) => store.find_merge_base(&branch.branch, parent)?,
            None => None,
        };

        let mut base = BaseVersion::new(
            BaseVersionKind::VersionInBranchName,
            format!("Version in branch name '{}'", name),
            version,
            source,
            false,
        );
        if !remainder.is_empty() {
            base = base.with_branch_name_override(remainder);
        }
        Ok(vec![base])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;
    use crate::strategies::test_support::candidates;

    #[test]
    fn test_release_branch_version_is_anchored_at_the_fork() {
        let mut repo = MockRepository::new();
        repo.make_commit("A");
        repo.create_branch("develop", "main");
        let d1 = repo.commit_on("develop", "D1");
        repo.create_branch("release/1.2.0", "develop");
        repo.commit_on("release/1.2.0", "R1");
        repo.checkout("release/1.2.0");

        let result = candidates(&repo, "", &VersionInBranchNameStrategy);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].semantic_version.to_string(), "1.2.0");
        assert_eq!(result[0].kind, BaseVersionKind::VersionInBranchName);
        assert_eq!(result[0].source, Some(d1));
        assert!(!result[0].should_increment);
        assert_eq!(result[0].branch_name_override.as_deref(), Some("release"));
    }

    #[test]
    fn test_only_release_branches_declare_a_version() {
        let mut repo = MockRepository::new();
        repo.make_commit("A");
        repo.create_branch("develop", "main");
        repo.commit_on("develop", "D1");
        repo.create_branch("feature/1.5.0", "develop");
        repo.commit_on("feature/1.5.0", "F1");
        repo.checkout("feature/1.5.0");

        assert!(candidates(&repo, "", &VersionInBranchNameStrategy).is_empty());
    }

    fn release_branch(name: &str) -> MockRepository {
        let mut repo = MockRepository::new();
        repo.make_commit("A");
        repo.create_branch("develop", "main");
        repo.commit_on("develop", "D1");
        repo.create_branch(name, "develop");
        repo.commit_on(name, "R1");
        repo.checkout(name);
        repo
    }

    #[test]
    fn test_major_only_name_is_not_a_version() {
        let repo = release_branch("release/2");

        assert!(candidates(&repo, "", &VersionInBranchNameStrategy).is_empty());
    }

    #[test]
    fn test_suffix_after_the_version_stays_in_the_version() {
        let repo = release_branch("release/1.2.0-rc");

        let result = candidates(&repo, "", &VersionInBranchNameStrategy);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].semantic_version.to_string(), "1.2.0-rc");
        assert_eq!(result[0].branch_name_override.as_deref(), Some("release"));
    }

    #[test]
    fn test_major_minor_name() {
        let repo = release_branch("release/v1.4");

        let result = candidates(&repo, "", &VersionInBranchNameStrategy);
        assert_eq!(result[0].semantic_version.to_string(), "1.4.0");
    }
}
