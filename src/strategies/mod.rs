//! Base version strategies
//!
//! Each strategy looks at the repository from the point of view of one
//! branch and proposes zero or more [`BaseVersion`] candidates. Strategies
//! never decide between candidates; that is the job of the
//! [`crate::calculator::NextVersionCalculator`].

pub mod configured;
pub mod fallback;
pub mod mainline;
pub mod merge_message;
pub mod tagged_commit;
pub mod track_release;
pub mod version_in_branch;

pub use configured::ConfiguredNextVersionStrategy;
pub use fallback::FallbackStrategy;
pub use mainline::MainlineStrategy;
pub use merge_message::{MergeMessage, MergeMessageStrategy};
pub use tagged_commit::TaggedCommitStrategy;
pub use track_release::TrackReleaseBranchesStrategy;
pub use version_in_branch::VersionInBranchNameStrategy;

use crate::config::VersionStrategy;
use crate::context::GitVersionContext;
use crate::domain::{BaseVersion, SemanticVersion};
use crate::error::Result;
use crate::resolver::EffectiveBranchConfiguration;

/// A source of candidate base versions
pub trait BaseVersionStrategy {
    fn name(&self) -> &'static str;

    fn base_versions(
        &self,
        context: &GitVersionContext<'_>,
        branch: &EffectiveBranchConfiguration,
    ) -> Result<Vec<BaseVersion>>;
}

/// Strategy implementations for the configured strategy list
pub fn strategies_for(enabled: &[VersionStrategy]) -> Vec<Box<dyn BaseVersionStrategy>> {
    enabled
        .iter()
        .map(|strategy| -> Box<dyn BaseVersionStrategy> {
            match strategy {
                VersionStrategy::Fallback => Box::new(FallbackStrategy),
                VersionStrategy::ConfiguredNextVersion => Box::new(ConfiguredNextVersionStrategy),
                VersionStrategy::MergeMessage => Box::new(MergeMessageStrategy),
                VersionStrategy::TaggedCommit => Box::new(TaggedCommitStrategy),
                VersionStrategy::TrackReleaseBranches => Box::new(TrackReleaseBranchesStrategy),
                VersionStrategy::VersionInBranchName => Box::new(VersionInBranchNameStrategy),
                VersionStrategy::Mainline => Box::new(MainlineStrategy),
            }
        })
        .collect()
}

/// Version embedded in a branch name and the name with the version removed
pub(crate) fn version_in_branch_name(
    name: &str,
    branch: &EffectiveBranchConfiguration,
) -> Option<(SemanticVersion, String)> {
    let configuration = &branch.configuration;
    let captures = configuration.version_in_branch_regex.captures(name)?;
    let version_match = captures.name("version").or_else(|| captures.get(0))?;
    let version = SemanticVersion::try_parse(
        version_match.as_str(),
        configuration.tag_prefix_regex.as_ref(),
        crate::domain::SemanticVersionFormat::Loose,
    )?;

    let whole = captures.get(0)?;
    let remainder = format!("{}{}", &name[..whole.start()], &name[whole.end()..]);
    Some((version, remainder))
}
