use crate::context::GitVersionContext;
use crate::domain::{BaseVersion, BaseVersionKind};
use crate::error::Result;
use crate::mainline::MainlineVersionCalculator;
use crate::resolver::EffectiveBranchConfiguration;
use crate::strategies::BaseVersionStrategy;

/// The replayed mainline version; already final, so never incremented again
pub struct MainlineStrategy;

impl BaseVersionStrategy for MainlineStrategy {
    fn name(&self) -> &'static str {
        "Mainline"
    }

    fn base_versions(
        &self,
        context: &GitVersionContext<'_>,
        branch: &EffectiveBranchConfiguration,
    ) -> Result<Vec<BaseVersion>> {
        let mainline = MainlineVersionCalculator::new(context).find_mainline_version(branch)?;
        Ok(vec![BaseVersion::new(
            BaseVersionKind::Mainline,
            format!(
                "Mainline version ({} commits since last increment)",
                mainline.commits_since_increment
            ),
            mainline.version,
            mainline.source,
            false,
        )])
    }
}
