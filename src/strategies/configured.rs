use crate::context::GitVersionContext;
use crate::domain::{BaseVersion, BaseVersionKind, SemanticVersion, SemanticVersionFormat};
use crate::error::{GitverError, Result};
use crate::resolver::EffectiveBranchConfiguration;
use crate::strategies::BaseVersionStrategy;

/// `next-version` from the configuration, taken verbatim
pub struct ConfiguredNextVersionStrategy;

impl BaseVersionStrategy for ConfiguredNextVersionStrategy {
    fn name(&self) -> &'static str {
        "ConfiguredNextVersion"
    }

    fn base_versions(
        &self,
        context: &GitVersionContext<'_>,
        branch: &EffectiveBranchConfiguration,
    ) -> Result<Vec<BaseVersion>> {
        let Some(next_version) = branch.configuration.next_version.as_deref() else {
            return Ok(Vec::new());
        };
        if context.is_current_commit_tagged(branch)? {
            return Ok(Vec::new());
        }

        let version = SemanticVersion::parse(next_version, None, SemanticVersionFormat::Loose)
            .map_err(|e| GitverError::config(format!("next-version: {}", e)))?;
        Ok(vec![BaseVersion::new(
            BaseVersionKind::ConfiguredNextVersion,
            "NextVersion in configuration file",
            version,
            None,
            false,
        )])
    }
}
