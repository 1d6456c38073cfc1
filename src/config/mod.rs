//! Configuration model
//!
//! Every field is optional so that configuration layers (built-in ruleset,
//! file, command line) can be merged field by field: a layer only overrides
//! what it sets. [`builder::ConfigurationBuilder`] produces the merged and
//! validated [`GitVersionConfiguration`]; [`effective::EffectiveConfiguration`]
//! is the non-optional view for one branch.

pub mod builder;
pub mod defaults;
pub mod effective;
pub mod loader;
pub mod matcher;

pub use builder::ConfigurationBuilder;
pub use effective::{sanitize, EffectiveConfiguration};
pub use loader::load_configuration;
pub use matcher::{BranchMatcher, MatchedBranch};

use crate::domain::{SemanticVersionFormat, VersionField};
use crate::git::Commit;
use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// How a branch type bumps the version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncrementStrategy {
    None,
    Patch,
    Minor,
    Major,
    /// Take the increment of the branch this one was created from
    Inherit,
}

impl IncrementStrategy {
    /// `None` for [`IncrementStrategy::Inherit`], which has no field of its own
    pub fn to_version_field(self) -> Option<VersionField> {
        match self {
            IncrementStrategy::None => Some(VersionField::None),
            IncrementStrategy::Patch => Some(VersionField::Patch),
            IncrementStrategy::Minor => Some(VersionField::Minor),
            IncrementStrategy::Major => Some(VersionField::Major),
            IncrementStrategy::Inherit => None,
        }
    }
}

/// Pre-release numbering scheme of a branch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeploymentMode {
    /// `label.n+1`, advanced only when a new version is tagged
    ManualDeployment,
    /// `label.n+commits`, every commit is a distinct pre-release
    #[default]
    ContinuousDelivery,
    /// Every commit is a release: no pre-release tag at all
    ContinuousDeployment,
    /// Repository-level switch to mainline versioning; invalid on a branch
    Mainline,
}

/// Whether `+semver:` messages drive increments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommitMessageIncrementMode {
    #[default]
    Enabled,
    Disabled,
    MergeMessageOnly,
}

/// Algorithms that propose base versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionStrategy {
    Fallback,
    ConfiguredNextVersion,
    MergeMessage,
    TaggedCommit,
    TrackReleaseBranches,
    VersionInBranchName,
    Mainline,
}

/// Commits whose tags and versions are disregarded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct IgnoreConfiguration {
    /// Full or abbreviated shas
    pub sha: Vec<String>,
    /// RFC 3339 timestamp; older commits are ignored
    pub commits_before: Option<DateTime<Utc>>,
}

impl IgnoreConfiguration {
    pub fn is_empty(&self) -> bool {
        self.sha.is_empty() && self.commits_before.is_none()
    }

    pub fn is_ignored(&self, commit: &Commit) -> bool {
        if let Some(before) = self.commits_before {
            if commit.when < before {
                return true;
            }
        }
        let sha = commit.sha();
        self.sha
            .iter()
            .any(|ignored| !ignored.is_empty() && sha.starts_with(&ignored.to_lowercase()))
    }
}

/// Rules for one branch type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BranchConfiguration {
    pub regex: Option<String>,
    pub label: Option<String>,
    pub increment: Option<IncrementStrategy>,
    pub deployment_mode: Option<DeploymentMode>,
    pub source_branches: Option<Vec<String>>,
    pub is_source_branch_for: Option<Vec<String>>,
    pub track_merge_target: Option<bool>,
    pub track_merge_message: Option<bool>,
    pub tracks_release_branches: Option<bool>,
    pub is_release_branch: Option<bool>,
    pub is_main_branch: Option<bool>,
    pub prevent_increment_of_merged_branch: Option<bool>,
    pub prevent_increment_when_branch_merged: Option<bool>,
    pub prevent_increment_when_current_commit_tagged: Option<bool>,
    pub pre_release_weight: Option<i64>,
    pub commit_message_incrementing: Option<CommitMessageIncrementMode>,
}

fn pick<T: Clone>(preferred: &Option<T>, fallback: &Option<T>) -> Option<T> {
    preferred.clone().or_else(|| fallback.clone())
}

impl BranchConfiguration {
    /// Field-wise merge where every value set in `overrides` wins
    pub fn merge(&self, overrides: &BranchConfiguration) -> BranchConfiguration {
        BranchConfiguration {
            regex: pick(&overrides.regex, &self.regex),
            label: pick(&overrides.label, &self.label),
            increment: pick(&overrides.increment, &self.increment),
            deployment_mode: pick(&overrides.deployment_mode, &self.deployment_mode),
            source_branches: pick(&overrides.source_branches, &self.source_branches),
            is_source_branch_for: pick(&overrides.is_source_branch_for, &self.is_source_branch_for),
            track_merge_target: pick(&overrides.track_merge_target, &self.track_merge_target),
            track_merge_message: pick(&overrides.track_merge_message, &self.track_merge_message),
            tracks_release_branches: pick(
                &overrides.tracks_release_branches,
                &self.tracks_release_branches,
            ),
            is_release_branch: pick(&overrides.is_release_branch, &self.is_release_branch),
            is_main_branch: pick(&overrides.is_main_branch, &self.is_main_branch),
            prevent_increment_of_merged_branch: pick(
                &overrides.prevent_increment_of_merged_branch,
                &self.prevent_increment_of_merged_branch,
            ),
            prevent_increment_when_branch_merged: pick(
                &overrides.prevent_increment_when_branch_merged,
                &self.prevent_increment_when_branch_merged,
            ),
            prevent_increment_when_current_commit_tagged: pick(
                &overrides.prevent_increment_when_current_commit_tagged,
                &self.prevent_increment_when_current_commit_tagged,
            ),
            pre_release_weight: pick(&overrides.pre_release_weight, &self.pre_release_weight),
            commit_message_incrementing: pick(
                &overrides.commit_message_incrementing,
                &self.commit_message_incrementing,
            ),
        }
    }

    /// Fill unset fields from `parent`; values already set are kept
    pub fn inherit(&self, parent: &BranchConfiguration) -> BranchConfiguration {
        parent.merge(self)
    }

    /// The subset of fields that top-level settings may push down into branches
    pub(crate) fn propagatable(&self) -> BranchConfiguration {
        BranchConfiguration {
            regex: None,
            source_branches: None,
            is_source_branch_for: None,
            ..self.clone()
        }
    }

    pub fn is_main_branch(&self) -> bool {
        self.is_main_branch.unwrap_or(false)
    }

    pub fn is_release_branch(&self) -> bool {
        self.is_release_branch.unwrap_or(false)
    }
}

/// Branch configurations keyed by branch type, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchMap(Vec<(String, BranchConfiguration)>);

impl BranchMap {
    pub fn new() -> Self {
        BranchMap(Vec::new())
    }

    pub fn get(&self, key: &str) -> Option<&BranchConfiguration> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut BranchConfiguration> {
        self.0.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Replace in place when the key exists, otherwise append
    pub fn insert(&mut self, key: impl Into<String>, value: BranchConfiguration) {
        let key = key.into();
        match self.get_mut(&key) {
            Some(existing) => *existing = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BranchConfiguration)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut BranchConfiguration)> {
        self.0.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, BranchConfiguration)> for BranchMap {
    fn from_iter<I: IntoIterator<Item = (String, BranchConfiguration)>>(iter: I) -> Self {
        let mut map = BranchMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl Serialize for BranchMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct BranchMapVisitor;

impl<'de> Visitor<'de> for BranchMapVisitor {
    type Value = BranchMap;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a table of branch configurations")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = BranchMap::new();
        while let Some((key, value)) = access.next_entry::<String, BranchConfiguration>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for BranchMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(BranchMapVisitor)
    }
}

/// Repository-wide configuration
///
/// Top-level branch keys (`increment`, `label`, ...) live in
/// `branch_defaults` and are pushed down into every branch that does not set
/// them when the configuration is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GitVersionConfiguration {
    /// Built-in ruleset: `GitFlow/v1`, `GitHubFlow/v1` or empty for none
    pub workflow: Option<String>,
    pub tag_prefix: Option<String>,
    pub next_version: Option<String>,
    pub major_version_bump_message: Option<String>,
    pub minor_version_bump_message: Option<String>,
    pub patch_version_bump_message: Option<String>,
    pub no_bump_message: Option<String>,
    pub semantic_version_format: Option<SemanticVersionFormat>,
    pub version_in_branch_pattern: Option<String>,
    pub commit_date_format: Option<String>,
    pub informational_version_format: Option<String>,
    pub strategies: Option<Vec<VersionStrategy>>,
    pub merge_message_formats: Option<BTreeMap<String, String>>,
    pub ignore: Option<IgnoreConfiguration>,
    #[serde(flatten)]
    pub branch_defaults: BranchConfiguration,
    pub branches: BranchMap,
}

impl GitVersionConfiguration {
    /// Layer `overrides` on top of this configuration
    ///
    /// Scalars are replaced when set, branch tables merge by key (existing
    /// keys keep their position, new keys are appended) and merge-message
    /// formats merge by name.
    pub fn merge(&self, overrides: &GitVersionConfiguration) -> GitVersionConfiguration {
        let merge_message_formats = match (&self.merge_message_formats, &overrides.merge_message_formats) {
            (Some(base), Some(over)) => {
                let mut merged = base.clone();
                merged.extend(over.iter().map(|(k, v)| (k.clone(), v.clone())));
                Some(merged)
            }
            (base, over) => pick(over, base),
        };

        let mut branches = self.branches.clone();
        for (key, value) in overrides.branches.iter() {
            let merged = match branches.get(key) {
                Some(existing) => existing.merge(value),
                None => value.clone(),
            };
            branches.insert(key, merged);
        }

        GitVersionConfiguration {
            workflow: pick(&overrides.workflow, &self.workflow),
            tag_prefix: pick(&overrides.tag_prefix, &self.tag_prefix),
            next_version: pick(&overrides.next_version, &self.next_version),
            major_version_bump_message: pick(
                &overrides.major_version_bump_message,
                &self.major_version_bump_message,
            ),
            minor_version_bump_message: pick(
                &overrides.minor_version_bump_message,
                &self.minor_version_bump_message,
            ),
            patch_version_bump_message: pick(
                &overrides.patch_version_bump_message,
                &self.patch_version_bump_message,
            ),
            no_bump_message: pick(&overrides.no_bump_message, &self.no_bump_message),
            semantic_version_format: pick(
                &overrides.semantic_version_format,
                &self.semantic_version_format,
            ),
            version_in_branch_pattern: pick(
                &overrides.version_in_branch_pattern,
                &self.version_in_branch_pattern,
            ),
            commit_date_format: pick(&overrides.commit_date_format, &self.commit_date_format),
            informational_version_format: pick(
                &overrides.informational_version_format,
                &self.informational_version_format,
            ),
            strategies: pick(&overrides.strategies, &self.strategies),
            merge_message_formats,
            ignore: pick(&overrides.ignore, &self.ignore),
            branch_defaults: self.branch_defaults.merge(&overrides.branch_defaults),
            branches,
        }
    }

    pub fn branch(&self, key: &str) -> Option<&BranchConfiguration> {
        self.branches.get(key)
    }

    /// Strategies to run, defaulting by versioning mode
    pub fn version_strategies(&self) -> Vec<VersionStrategy> {
        self.strategies
            .clone()
            .unwrap_or_else(defaults::default_strategies)
    }

    pub fn is_mainline(&self) -> bool {
        self.version_strategies().contains(&VersionStrategy::Mainline)
    }

    /// Global defaults used to fill whatever a matched branch leaves unset
    pub fn fallback_configuration(&self) -> BranchConfiguration {
        self.branch_defaults
            .propagatable()
            .inherit(&defaults::global_fallback())
    }

    pub fn ignore(&self) -> IgnoreConfiguration {
        self.ignore.clone().unwrap_or_default()
    }
}
