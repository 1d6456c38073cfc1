//! Domain logic - version values and candidates independent of git access

pub mod base_version;
pub mod tag;
pub mod version;

pub use base_version::{BaseVersion, BaseVersionKind};
pub use tag::SemanticVersionWithTag;
pub use version::{
    BuildMetaData, PreReleaseTag, SemanticVersion, SemanticVersionFormat, VersionField,
    VersionFormat,
};
