//! Selection of the winning base version and final formatting

use crate::config::{DeploymentMode, GitVersionConfiguration};
use crate::context::{CalculationOptions, GitVersionContext};
use crate::domain::{
    BaseVersion, BaseVersionKind, BuildMetaData, PreReleaseTag, SemanticVersion,
};
use crate::error::{GitverError, Result};
use crate::git::Repository;
use crate::output::VersionVariables;
use crate::resolver::EffectiveBranchConfiguration;
use crate::strategies::{strategies_for, BaseVersionStrategy, FallbackStrategy};
use std::cmp::Ordering;
use std::sync::Arc;

/// The calculated version and how it was reached
#[derive(Debug, Clone)]
pub struct NextVersion {
    pub semantic_version: SemanticVersion,
    pub base_version: BaseVersion,
    pub configuration: Arc<EffectiveBranchConfiguration>,
}

/// A base version after its own increment decision
#[derive(Debug, Clone)]
struct Candidate {
    base: BaseVersion,
    incremented: SemanticVersion,
    distance: u64,
    weight: i64,
}

impl Candidate {
    /// Higher version, then stronger kind, then closer source, then weight
    fn rank(&self, other: &Candidate) -> Ordering {
        self.incremented
            .compare_precedence(&other.incremented)
            .then_with(|| self.base.kind.cmp(&other.base.kind))
            .then_with(|| other.distance.cmp(&self.distance))
            .then_with(|| self.weight.cmp(&other.weight))
    }
}

pub struct NextVersionCalculator<'a, 'r> {
    context: &'a GitVersionContext<'r>,
}

impl<'a, 'r> NextVersionCalculator<'a, 'r> {
    pub fn new(context: &'a GitVersionContext<'r>) -> Self {
        NextVersionCalculator { context }
    }

    pub fn find_version(&self) -> Result<NextVersion> {
        let branch = self.context.current_configuration()?;
        let configuration = &branch.configuration;

        if configuration.prevent_increment_when_current_commit_tagged {
            if let Some(tagged) = self.context.current_commit_tag(&branch)? {
                tracing::info!(tag = %tagged.tag.name, "Current commit is tagged");
                let mut version = tagged.value.clone();
                version.build_metadata =
                    self.build_metadata(&branch, None, Some(self.context.current_commit.id), 0);
                let base = BaseVersion::new(
                    BaseVersionKind::TaggedCommit,
                    format!("Git tag '{}'", tagged.tag.name),
                    tagged.value,
                    Some(self.context.current_commit.id),
                    false,
                );
                return Ok(NextVersion {
                    semantic_version: version,
                    base_version: base,
                    configuration: branch,
                });
            }
        }

        let candidates = self.candidates(&branch)?;
        let winner = candidates
            .into_iter()
            .max_by(|a, b| a.rank(b))
            .ok_or_else(|| GitverError::structural("No base version could be determined"))?;

        tracing::info!(base_version = %winner.base, version = %winner.incremented, "Selected base version");

        let semantic_version = if winner.base.kind == BaseVersionKind::Mainline {
            let mut version = winner.incremented.clone();
            let commits_since_tag = version.build_metadata.commits_since_tag;
            version.build_metadata =
                self.build_metadata(&branch, commits_since_tag, winner.base.source, winner.distance);
            version
        } else {
            let mut version = self.apply_label(&branch, &winner)?;
            version.build_metadata =
                self.build_metadata(&branch, Some(winner.distance), winner.base.source, winner.distance);
            version
        };

        Ok(NextVersion {
            semantic_version,
            base_version: winner.base,
            configuration: branch,
        })
    }

    fn candidates(&self, branch: &EffectiveBranchConfiguration) -> Result<Vec<Candidate>> {
        let strategies = strategies_for(&branch.configuration.strategies);
        let mut bases = Vec::new();
        for strategy in strategies.iter().filter(|s| s.name() != "Fallback") {
            for base in strategy.base_versions(self.context, branch)? {
                tracing::debug!(strategy = strategy.name(), candidate = %base, "Base version candidate");
                bases.push(base);
            }
        }
        if bases.is_empty() {
            bases = FallbackStrategy.base_versions(self.context, branch)?;
        }

        let finder = self.context.increment_finder();
        let store = self.context.store();
        let current = &self.context.current_commit;
        bases
            .into_iter()
            .map(|base| {
                let incremented = if base.kind != BaseVersionKind::Mainline && base.should_increment {
                    let field = finder.determine_increment(base.source, current, &branch.configuration)?;
                    base.semantic_version.increment(field)
                } else {
                    base.semantic_version.clone()
                };
                let distance = store.count_commits(base.source, current.id)?;
                let weight = base
                    .source_branch
                    .as_deref()
                    .and_then(|key| store.configuration().branch(key))
                    .and_then(|b| b.pre_release_weight)
                    .unwrap_or(branch.configuration.pre_release_weight);
                Ok(Candidate {
                    base,
                    incremented,
                    distance,
                    weight,
                })
            })
            .collect()
    }

    /// Pre-release tag for the winning candidate according to the deployment mode
    fn apply_label(
        &self,
        branch: &EffectiveBranchConfiguration,
        winner: &Candidate,
    ) -> Result<SemanticVersion> {
        let mut version = winner.incremented.clone();
        let mode = branch.configuration.deployment_mode;
        if mode == DeploymentMode::ContinuousDeployment {
            version.pre_release_tag = PreReleaseTag::default();
            return Ok(version);
        }

        let label = branch.label(winner.base.branch_name_override.as_deref());
        let mut number = if version.pre_release_tag.has_tag()
            && version.pre_release_tag.name.eq_ignore_ascii_case(&label)
        {
            version.pre_release_tag.number.unwrap_or(0)
        } else {
            0
        };

        // earlier pre-releases of the same version and label continue the sequence
        let visible = self.context.tag_service().visible_to(
            &branch.branch,
            &self.context.current_commit,
            &branch.configuration,
        )?;
        for tagged in &visible {
            let value = &tagged.version.value;
            if (value.major, value.minor, value.patch) == (version.major, version.minor, version.patch)
                && value.pre_release_tag.has_tag()
                && value.pre_release_tag.name.eq_ignore_ascii_case(&label)
            {
                number = number.max(value.pre_release_tag.number.unwrap_or(0));
            }
        }

        let number = match mode {
            DeploymentMode::ManualDeployment => number + 1,
            _ => (number + winner.distance).max(1),
        };
        version.pre_release_tag = PreReleaseTag::new(label, Some(number));
        Ok(version)
    }

    fn build_metadata(
        &self,
        branch: &EffectiveBranchConfiguration,
        commits_since_tag: Option<u64>,
        source: Option<git2::Oid>,
        commits_since_source: u64,
    ) -> BuildMetaData {
        let current = &self.context.current_commit;
        BuildMetaData {
            commits_since_tag,
            branch: Some(branch.branch.friendly_name().to_string()),
            sha: Some(current.sha()),
            short_sha: Some(current.short_sha()),
            other_metadata: None,
            commit_date: Some(current.when),
            version_source_sha: source.map(|oid| oid.to_string()),
            commits_since_version_source: commits_since_source,
            uncommitted_changes: self.context.uncommitted_changes,
        }
    }
}

/// Entry point: calculate the version of a repository
///
/// ```rust,no_run
/// # use gitver::{ConfigurationBuilder, Git2Repository, GitVersionCalculator};
/// # fn example() -> gitver::Result<()> {
/// let repository = Git2Repository::open(".")?;
/// let configuration = ConfigurationBuilder::new().build()?;
/// let variables = GitVersionCalculator::new(&repository, configuration).calculate()?;
/// println!("{}", variables.full_sem_ver);
/// # Ok(())
/// # }
/// ```
pub struct GitVersionCalculator<'r> {
    repository: &'r dyn Repository,
    configuration: GitVersionConfiguration,
    options: CalculationOptions,
}

impl<'r> GitVersionCalculator<'r> {
    pub fn new(repository: &'r dyn Repository, configuration: GitVersionConfiguration) -> Self {
        GitVersionCalculator {
            repository,
            configuration,
            options: CalculationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CalculationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn configuration(&self) -> &GitVersionConfiguration {
        &self.configuration
    }

    /// Full calculation result including the winning base version
    pub fn next_version(&self) -> Result<NextVersion> {
        let context = GitVersionContext::new(self.repository, &self.configuration, &self.options)?;
        NextVersionCalculator::new(&context).find_version()
    }

    pub fn semantic_version(&self) -> Result<SemanticVersion> {
        Ok(self.next_version()?.semantic_version)
    }

    pub fn calculate(&self) -> Result<VersionVariables> {
        let next = self.next_version()?;
        Ok(VersionVariables::from_version(
            &next.semantic_version,
            &next.configuration.configuration,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(kind: BaseVersionKind, version: &str, distance: u64, weight: i64) -> Candidate {
        let version = SemanticVersion::parse(version, None, crate::domain::SemanticVersionFormat::Strict).unwrap();
        Candidate {
            base: BaseVersion::new(kind, "test", version.clone(), None, false),
            incremented: version,
            distance,
            weight,
        }
    }

    fn winner(candidates: Vec<Candidate>) -> Candidate {
        candidates.into_iter().max_by(|a, b| a.rank(b)).unwrap()
    }

    #[test]
    fn test_highest_version_wins() {
        let best = winner(vec![
            candidate(BaseVersionKind::TaggedCommit, "1.0.0", 0, 0),
            candidate(BaseVersionKind::VersionInBranchName, "1.1.0", 5, 0),
        ]);
        assert_eq!(best.incremented.to_string(), "1.1.0");
    }

    #[test]
    fn test_tag_beats_branch_name_on_equal_version() {
        let best = winner(vec![
            candidate(BaseVersionKind::VersionInBranchName, "2.0.0", 1, 0),
            candidate(BaseVersionKind::TaggedCommit, "2.0.0", 3, 0),
        ]);
        assert_eq!(best.base.kind, BaseVersionKind::TaggedCommit);
    }

    #[test]
    fn test_closer_then_heavier_candidate_wins() {
        let best = winner(vec![
            candidate(BaseVersionKind::TrackReleaseBranches, "2.0.0", 4, 0),
            candidate(BaseVersionKind::TrackReleaseBranches, "2.0.0", 2, 0),
        ]);
        assert_eq!(best.distance, 2);

        let best = winner(vec![
            candidate(BaseVersionKind::TrackReleaseBranches, "2.0.0", 2, 30000),
            candidate(BaseVersionKind::TrackReleaseBranches, "2.0.0", 2, 55000),
        ]);
        assert_eq!(best.weight, 55000);
    }
}
