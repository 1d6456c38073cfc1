use crate::domain::SemanticVersion;
use crate::git::Tag;
use std::cmp::Ordering;

/// A git tag together with the semantic version its name encodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticVersionWithTag {
    pub value: SemanticVersion,
    pub tag: Tag,
}

impl SemanticVersionWithTag {
    pub fn new(value: SemanticVersion, tag: Tag) -> Self {
        SemanticVersionWithTag { value, tag }
    }
}

impl Ord for SemanticVersionWithTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .cmp(&other.value)
            .then_with(|| self.tag.name.cmp(&other.tag.name))
            .then_with(|| self.tag.target.cmp(&other.tag.target))
            .then_with(|| self.tag.is_annotated.cmp(&other.tag.is_annotated))
    }
}

impl PartialOrd for SemanticVersionWithTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
