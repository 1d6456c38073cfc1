use crate::domain::SemanticVersion;
use git2::Oid;
use std::fmt;

/// Which strategy proposed a candidate
///
/// Variant order is the tie-break rank between candidates with the same
/// resulting version: later variants win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BaseVersionKind {
    Fallback,
    ConfiguredNextVersion,
    VersionInBranchName,
    TrackReleaseBranches,
    MergeMessage,
    Mainline,
    TaggedCommit,
}

/// A starting version proposed by one strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseVersion {
    pub description: String,
    pub semantic_version: SemanticVersion,
    /// Commit the version is anchored at; `None` counts from the root
    pub source: Option<Oid>,
    pub should_increment: bool,
    pub kind: BaseVersionKind,
    /// Replaces the branch name when expanding `{BranchName}` in labels
    pub branch_name_override: Option<String>,
    /// Branch whose pre-release weight breaks ties for this candidate
    pub source_branch: Option<String>,
}

impl BaseVersion {
    pub fn new(
        kind: BaseVersionKind,
        description: impl Into<String>,
        semantic_version: SemanticVersion,
        source: Option<Oid>,
        should_increment: bool,
    ) -> Self {
        BaseVersion {
            description: description.into(),
            semantic_version,
            source,
            should_increment,
            kind,
            branch_name_override: None,
            source_branch: None,
        }
    }

    pub fn with_branch_name_override(mut self, name: impl Into<String>) -> Self {
        self.branch_name_override = Some(name.into());
        self
    }

    pub fn with_source_branch(mut self, branch: impl Into<String>) -> Self {
        self.source_branch = Some(branch.into());
        self
    }
}

impl fmt::Display for BaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = self
            .source
            .map(|oid| oid.to_string().chars().take(7).collect::<String>())
            .unwrap_or_else(|| "root".to_string());
        write!(
            f,
            "{}: {} with version source {} (increment: {})",
            self.description,
            self.semantic_version,
            source,
            if self.should_increment { "yes" } else { "no" }
        )
    }
}
