use crate::config::{
    defaults, BranchConfiguration, CommitMessageIncrementMode, DeploymentMode,
    GitVersionConfiguration, IgnoreConfiguration, VersionStrategy,
};
use crate::domain::{SemanticVersionFormat, VersionField};
use crate::error::{GitverError, Result};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;

/// Fully resolved configuration for one branch
///
/// Built from a matched [`BranchConfiguration`] whose increment has already
/// been resolved (never `Inherit`), with every unset value taken from the
/// repository-wide defaults.
#[derive(Debug, Clone)]
pub struct EffectiveConfiguration {
    pub branch_key: String,
    pub regex: String,
    pub label: String,
    pub increment: VersionField,
    pub deployment_mode: DeploymentMode,
    pub source_branches: Vec<String>,
    pub track_merge_target: bool,
    pub track_merge_message: bool,
    pub tracks_release_branches: bool,
    pub is_release_branch: bool,
    pub is_main_branch: bool,
    pub prevent_increment_of_merged_branch: bool,
    pub prevent_increment_when_branch_merged: bool,
    pub prevent_increment_when_current_commit_tagged: bool,
    pub pre_release_weight: i64,
    pub commit_message_incrementing: CommitMessageIncrementMode,

    pub tag_prefix: String,
    pub tag_prefix_regex: Option<Regex>,
    pub semantic_version_format: SemanticVersionFormat,
    pub next_version: Option<String>,
    pub major_version_bump_message: Regex,
    pub minor_version_bump_message: Regex,
    pub patch_version_bump_message: Regex,
    pub no_bump_message: Regex,
    pub version_in_branch_regex: Regex,
    pub commit_date_format: String,
    pub informational_version_format: String,
    pub merge_message_formats: BTreeMap<String, String>,
    pub ignore: IgnoreConfiguration,
    pub strategies: Vec<VersionStrategy>,
}

fn message_regex(pattern: Option<&str>, default: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern.unwrap_or(default))
        .case_insensitive(true)
        .multi_line(true)
        .build()?)
}

fn required<T>(value: Option<T>, key: &str, field: &str) -> Result<T> {
    value.ok_or_else(|| {
        GitverError::config(format!(
            "Branch configuration '{}' has no value for '{}' and no default applies",
            key, field
        ))
    })
}

impl EffectiveConfiguration {
    pub fn new(
        configuration: &GitVersionConfiguration,
        key: &str,
        branch: &BranchConfiguration,
    ) -> Result<Self> {
        let resolved = branch.inherit(&configuration.fallback_configuration());

        let increment = required(resolved.increment, key, "increment")?
            .to_version_field()
            .unwrap_or(VersionField::None);
        let deployment_mode = required(resolved.deployment_mode, key, "deployment-mode")?;
        if deployment_mode == DeploymentMode::Mainline {
            return Err(GitverError::config(format!(
                "Branch configuration '{}' sets deployment-mode 'Mainline'; set it at the top level instead",
                key
            )));
        }

        let tag_prefix = configuration
            .tag_prefix
            .clone()
            .unwrap_or_else(|| defaults::DEFAULT_TAG_PREFIX.to_string());
        let tag_prefix_regex = if tag_prefix.is_empty() {
            None
        } else {
            Some(Regex::new(&format!("^(?:{})", tag_prefix))?)
        };

        Ok(EffectiveConfiguration {
            branch_key: key.to_string(),
            regex: resolved.regex.clone().unwrap_or_default(),
            label: resolved.label.clone().unwrap_or_default(),
            increment,
            deployment_mode,
            source_branches: resolved.source_branches.clone().unwrap_or_default(),
            track_merge_target: resolved.track_merge_target.unwrap_or(false),
            track_merge_message: resolved.track_merge_message.unwrap_or(true),
            tracks_release_branches: resolved.tracks_release_branches.unwrap_or(false),
            is_release_branch: resolved.is_release_branch(),
            is_main_branch: resolved.is_main_branch(),
            prevent_increment_of_merged_branch: resolved
                .prevent_increment_of_merged_branch
                .unwrap_or(false),
            prevent_increment_when_branch_merged: resolved
                .prevent_increment_when_branch_merged
                .unwrap_or(false),
            prevent_increment_when_current_commit_tagged: resolved
                .prevent_increment_when_current_commit_tagged
                .unwrap_or(true),
            pre_release_weight: resolved.pre_release_weight.unwrap_or(0),
            commit_message_incrementing: resolved.commit_message_incrementing.unwrap_or_default(),

            tag_prefix,
            tag_prefix_regex,
            semantic_version_format: configuration.semantic_version_format.unwrap_or_default(),
            next_version: configuration.next_version.clone(),
            major_version_bump_message: message_regex(
                configuration.major_version_bump_message.as_deref(),
                defaults::DEFAULT_MAJOR_BUMP_MESSAGE,
            )?,
            minor_version_bump_message: message_regex(
                configuration.minor_version_bump_message.as_deref(),
                defaults::DEFAULT_MINOR_BUMP_MESSAGE,
            )?,
            patch_version_bump_message: message_regex(
                configuration.patch_version_bump_message.as_deref(),
                defaults::DEFAULT_PATCH_BUMP_MESSAGE,
            )?,
            no_bump_message: message_regex(
                configuration.no_bump_message.as_deref(),
                defaults::DEFAULT_NO_BUMP_MESSAGE,
            )?,
            version_in_branch_regex: Regex::new(
                configuration
                    .version_in_branch_pattern
                    .as_deref()
                    .unwrap_or(defaults::DEFAULT_VERSION_IN_BRANCH_PATTERN),
            )?,
            commit_date_format: configuration
                .commit_date_format
                .clone()
                .unwrap_or_else(|| defaults::DEFAULT_COMMIT_DATE_FORMAT.to_string()),
            informational_version_format: configuration
                .informational_version_format
                .clone()
                .unwrap_or_else(|| defaults::DEFAULT_INFORMATIONAL_VERSION_FORMAT.to_string()),
            merge_message_formats: configuration.merge_message_formats.clone().unwrap_or_default(),
            ignore: configuration.ignore(),
            strategies: configuration.version_strategies(),
        })
    }

    /// Expand the label template for a concrete branch
    ///
    /// `{BranchName}` is the `BranchName` capture of the branch regex when
    /// present, otherwise the whole branch name; `override_name` replaces both.
    /// Other `{Name}` placeholders are filled from capture groups. The result
    /// only contains `[a-zA-Z0-9-]`.
    pub fn expand_label(
        &self,
        branch_name: &str,
        captures: &BTreeMap<String, String>,
        override_name: Option<&str>,
    ) -> String {
        let branch_value = override_name
            .or_else(|| captures.get("BranchName").map(String::as_str))
            .unwrap_or(branch_name);

        let mut label = self.label.replace("{BranchName}", branch_value);
        for (name, value) in captures {
            label = label.replace(&format!("{{{}}}", name), value);
        }
        sanitize(&label)
    }

    pub fn is_enabled(&self, strategy: VersionStrategy) -> bool {
        self.strategies.contains(&strategy)
    }
}

/// Replace everything outside `[a-zA-Z0-9-]` with `-`
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigurationBuilder, IncrementStrategy};

    fn effective(key: &str) -> EffectiveConfiguration {
        let configuration = ConfigurationBuilder::new().build().unwrap();
        let branch = configuration.branch(key).unwrap().clone();
        EffectiveConfiguration::new(&configuration, key, &branch).unwrap()
    }

    #[test]
    fn test_effective_configuration_fills_defaults() {
        let develop = effective("develop");
        assert_eq!(develop.label, "alpha");
        assert_eq!(develop.increment, VersionField::Minor);
        assert!(develop.track_merge_target);
        assert!(develop.prevent_increment_when_current_commit_tagged);
        assert_eq!(develop.tag_prefix, "[vV]?");
        assert_eq!(develop.commit_date_format, "%Y-%m-%d");
    }

    #[test]
    fn test_unresolved_inherit_becomes_none() {
        let configuration = ConfigurationBuilder::new().build().unwrap();
        let branch = BranchConfiguration {
            increment: Some(IncrementStrategy::Inherit),
            ..configuration.branch("feature").unwrap().clone()
        };
        let effective = EffectiveConfiguration::new(&configuration, "feature", &branch).unwrap();
        assert_eq!(effective.increment, VersionField::None);
    }

    #[test]
    fn test_expand_label_with_captures() {
        let feature = effective("feature");
        let mut captures = BTreeMap::new();
        captures.insert("BranchName".to_string(), "login_form".to_string());
        assert_eq!(feature.expand_label("feature/login_form", &captures, None), "login-form");
        assert_eq!(feature.expand_label("feature/x", &captures, Some("1.2")), "1-2");

        let pull_request = effective("pull-request");
        let mut captures = BTreeMap::new();
        captures.insert("Number".to_string(), "17".to_string());
        assert_eq!(pull_request.expand_label("pr/17", &captures, None), "PullRequest17");
    }

    #[test]
    fn test_bump_messages_are_case_insensitive() {
        let main = effective("main");
        assert!(main.major_version_bump_message.is_match("Fix\n\n+SEMVER: Breaking"));
        assert!(main.no_bump_message.is_match("+semver: skip"));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("feature/ABC_1.2"), "feature-ABC-1-2");
    }
}
