//! Tags that parse as semantic versions and which of them a branch can see
//!
//! [repository::TaggedSemanticVersionRepository] indexes tags and answers
//! the four lookup shapes; [service::TaggedSemanticVersionService] composes
//! them for a branch according to its configuration.

pub mod repository;
pub mod service;

pub use repository::TaggedSemanticVersionRepository;
pub use service::{TaggedCommit, TaggedSemanticVersionService};

use crate::config::EffectiveConfiguration;
use std::ops::{BitOr, BitOrAssign};

/// Which groups of tags are visible to a branch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TaggedSemanticVersions(u8);

impl TaggedSemanticVersions {
    pub const NONE: Self = TaggedSemanticVersions(0);
    /// Tags on the branch's own history
    pub const OF_BRANCH: Self = TaggedSemanticVersions(1);
    /// Tags on merge commits elsewhere that merged this branch
    pub const OF_MERGE_TARGETS: Self = TaggedSemanticVersions(1 << 1);
    pub const OF_MAIN_BRANCHES: Self = TaggedSemanticVersions(1 << 2);
    pub const OF_RELEASE_BRANCHES: Self = TaggedSemanticVersions(1 << 3);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Visibility implied by a branch configuration
    pub fn for_configuration(configuration: &EffectiveConfiguration) -> Self {
        let mut visible = Self::OF_BRANCH;
        if configuration.track_merge_target {
            visible |= Self::OF_MERGE_TARGETS;
        }
        if configuration.tracks_release_branches {
            visible |= Self::OF_RELEASE_BRANCHES;
        }
        if !configuration.is_main_branch && !configuration.is_release_branch {
            visible |= Self::OF_MAIN_BRANCHES;
        }
        visible
    }
}

impl BitOr for TaggedSemanticVersions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        TaggedSemanticVersions(self.0 | rhs.0)
    }
}

impl BitOrAssign for TaggedSemanticVersions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
