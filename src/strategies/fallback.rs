use crate::context::GitVersionContext;
use crate::domain::{BaseVersion, BaseVersionKind, SemanticVersion};
use crate::error::Result;
use crate::resolver::EffectiveBranchConfiguration;
use crate::strategies::BaseVersionStrategy;

/// `0.0.0` counted from the root commit
///
/// Only used when no other strategy produced a candidate.
pub struct FallbackStrategy;

impl BaseVersionStrategy for FallbackStrategy {
    fn name(&self) -> &'static str {
        "Fallback"
    }

    fn base_versions(
        &self,
        _context: &GitVersionContext<'_>,
        _branch: &EffectiveBranchConfiguration,
    ) -> Result<Vec<BaseVersion>> {
        Ok(vec![BaseVersion::new(
            BaseVersionKind::Fallback,
            "Fallback base version",
            SemanticVersion::new(0, 0, 0),
            None,
            true,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;
    use crate::strategies::test_support::candidates;

    #[test]
    fn test_counts_from_the_root() {
        let mut repo = MockRepository::new();
        repo.make_commit("A");

        let result = candidates(&repo, "", &FallbackStrategy);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].semantic_version, SemanticVersion::new(0, 0, 0));
        assert_eq!(result[0].source, None);
        assert!(result[0].should_increment);
    }
}
