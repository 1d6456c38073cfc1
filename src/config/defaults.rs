//! Built-in rulesets
//!
//! `GitFlow/v1` is used unless a configuration layer names another workflow.

use crate::config::{
    BranchConfiguration, BranchMap, CommitMessageIncrementMode, DeploymentMode,
    GitVersionConfiguration, IncrementStrategy, VersionStrategy,
};
use crate::domain::SemanticVersionFormat;
use crate::error::{GitverError, Result};

pub const GIT_FLOW: &str = "GitFlow/v1";
pub const GITHUB_FLOW: &str = "GitHubFlow/v1";

pub const MAIN: &str = "main";
pub const DEVELOP: &str = "develop";
pub const RELEASE: &str = "release";
pub const FEATURE: &str = "feature";
pub const PULL_REQUEST: &str = "pull-request";
pub const HOTFIX: &str = "hotfix";
pub const SUPPORT: &str = "support";
pub const UNKNOWN: &str = "unknown";

pub const DEFAULT_TAG_PREFIX: &str = "[vV]?";
pub const DEFAULT_MAJOR_BUMP_MESSAGE: &str = r"\+semver:\s?(breaking|major)";
pub const DEFAULT_MINOR_BUMP_MESSAGE: &str = r"\+semver:\s?(feature|minor)";
pub const DEFAULT_PATCH_BUMP_MESSAGE: &str = r"\+semver:\s?(fix|patch)";
pub const DEFAULT_NO_BUMP_MESSAGE: &str = r"\+semver:\s?(none|skip)";
pub const DEFAULT_VERSION_IN_BRANCH_PATTERN: &str = r"[/-](?P<version>v?\d+\.\d+.*)";
pub const DEFAULT_COMMIT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_INFORMATIONAL_VERSION_FORMAT: &str = "{InformationalVersion}";

/// Weight used for stable versions in `WeightedPreReleaseNumber`
pub const STABLE_PRE_RELEASE_WEIGHT: u64 = 60000;

/// Values that apply when neither a branch nor the top level sets them
pub fn global_fallback() -> BranchConfiguration {
    BranchConfiguration {
        regex: None,
        label: None,
        increment: Some(IncrementStrategy::Inherit),
        deployment_mode: Some(DeploymentMode::ContinuousDelivery),
        source_branches: None,
        is_source_branch_for: None,
        track_merge_target: Some(false),
        track_merge_message: Some(true),
        tracks_release_branches: Some(false),
        is_release_branch: Some(false),
        is_main_branch: Some(false),
        prevent_increment_of_merged_branch: Some(false),
        prevent_increment_when_branch_merged: Some(false),
        prevent_increment_when_current_commit_tagged: Some(true),
        pre_release_weight: Some(0),
        commit_message_incrementing: Some(CommitMessageIncrementMode::Enabled),
    }
}

pub fn default_strategies() -> Vec<VersionStrategy> {
    vec![
        VersionStrategy::Fallback,
        VersionStrategy::ConfiguredNextVersion,
        VersionStrategy::MergeMessage,
        VersionStrategy::TaggedCommit,
        VersionStrategy::TrackReleaseBranches,
        VersionStrategy::VersionInBranchName,
    ]
}

pub fn default_mainline_strategies() -> Vec<VersionStrategy> {
    vec![VersionStrategy::Mainline]
}

/// Ruleset for a workflow name; `None` selects GitFlow, an empty name selects nothing
pub fn for_workflow(workflow: Option<&str>) -> Result<GitVersionConfiguration> {
    match workflow {
        None => Ok(git_flow()),
        Some("") => Ok(GitVersionConfiguration::default()),
        Some(name) if name.eq_ignore_ascii_case(GIT_FLOW) => Ok(git_flow()),
        Some(name) if name.eq_ignore_ascii_case(GITHUB_FLOW) => Ok(github_flow()),
        Some(name) => Err(GitverError::config(format!(
            "Unknown workflow '{}'. Use '{}', '{}' or an empty string to start without defaults",
            name, GIT_FLOW, GITHUB_FLOW
        ))),
    }
}

fn strings(values: &[&str]) -> Option<Vec<String>> {
    Some(values.iter().map(|v| v.to_string()).collect())
}

fn base(workflow: &str) -> GitVersionConfiguration {
    GitVersionConfiguration {
        workflow: Some(workflow.to_string()),
        tag_prefix: Some(DEFAULT_TAG_PREFIX.to_string()),
        next_version: None,
        major_version_bump_message: Some(DEFAULT_MAJOR_BUMP_MESSAGE.to_string()),
        minor_version_bump_message: Some(DEFAULT_MINOR_BUMP_MESSAGE.to_string()),
        patch_version_bump_message: Some(DEFAULT_PATCH_BUMP_MESSAGE.to_string()),
        no_bump_message: Some(DEFAULT_NO_BUMP_MESSAGE.to_string()),
        semantic_version_format: Some(SemanticVersionFormat::Strict),
        version_in_branch_pattern: Some(DEFAULT_VERSION_IN_BRANCH_PATTERN.to_string()),
        commit_date_format: Some(DEFAULT_COMMIT_DATE_FORMAT.to_string()),
        informational_version_format: Some(DEFAULT_INFORMATIONAL_VERSION_FORMAT.to_string()),
        strategies: None,
        merge_message_formats: None,
        ignore: None,
        branch_defaults: global_fallback(),
        branches: BranchMap::new(),
    }
}

fn main_branch(source_branches: &[&str]) -> BranchConfiguration {
    BranchConfiguration {
        regex: Some("^master$|^main$".to_string()),
        label: Some(String::new()),
        increment: Some(IncrementStrategy::Patch),
        deployment_mode: Some(DeploymentMode::ContinuousDeployment),
        source_branches: strings(source_branches),
        is_main_branch: Some(true),
        is_release_branch: Some(false),
        tracks_release_branches: Some(false),
        track_merge_target: Some(false),
        prevent_increment_of_merged_branch: Some(true),
        pre_release_weight: Some(55000),
        ..Default::default()
    }
}

fn release_branch(source_branches: &[&str]) -> BranchConfiguration {
    BranchConfiguration {
        regex: Some(r"^releases?[\/-](?P<BranchName>.+)".to_string()),
        label: Some("beta".to_string()),
        increment: Some(IncrementStrategy::None),
        deployment_mode: Some(DeploymentMode::ManualDeployment),
        source_branches: strings(source_branches),
        is_release_branch: Some(true),
        is_main_branch: Some(false),
        tracks_release_branches: Some(false),
        prevent_increment_of_merged_branch: Some(true),
        pre_release_weight: Some(30000),
        ..Default::default()
    }
}

fn feature_branch(source_branches: &[&str]) -> BranchConfiguration {
    BranchConfiguration {
        regex: Some(r"^features?[\/-](?P<BranchName>.+)".to_string()),
        label: Some("{BranchName}".to_string()),
        increment: Some(IncrementStrategy::Inherit),
        deployment_mode: Some(DeploymentMode::ManualDeployment),
        source_branches: strings(source_branches),
        is_release_branch: Some(false),
        is_main_branch: Some(false),
        pre_release_weight: Some(30000),
        ..Default::default()
    }
}

fn pull_request_branch(source_branches: &[&str]) -> BranchConfiguration {
    BranchConfiguration {
        regex: Some(r"^(pull-requests|pull|pr)[\/-](?P<Number>\d*)".to_string()),
        label: Some("PullRequest{Number}".to_string()),
        increment: Some(IncrementStrategy::Inherit),
        deployment_mode: Some(DeploymentMode::ContinuousDelivery),
        source_branches: strings(source_branches),
        is_release_branch: Some(false),
        is_main_branch: Some(false),
        pre_release_weight: Some(30000),
        ..Default::default()
    }
}

fn unknown_branch(source_branches: &[&str]) -> BranchConfiguration {
    BranchConfiguration {
        regex: Some("(?P<BranchName>.+)".to_string()),
        label: Some("{BranchName}".to_string()),
        increment: Some(IncrementStrategy::Inherit),
        deployment_mode: Some(DeploymentMode::ManualDeployment),
        source_branches: strings(source_branches),
        is_release_branch: Some(false),
        is_main_branch: Some(false),
        pre_release_weight: Some(30000),
        ..Default::default()
    }
}

/// GitFlow: long-lived `develop`, release/hotfix/support branches off `main`
pub fn git_flow() -> GitVersionConfiguration {
    let mut config = base(GIT_FLOW);

    config.branches.insert(
        DEVELOP,
        BranchConfiguration {
            regex: Some("^dev(elop)?(ment)?$".to_string()),
            label: Some("alpha".to_string()),
            increment: Some(IncrementStrategy::Minor),
            source_branches: strings(&[MAIN]),
            track_merge_target: Some(true),
            tracks_release_branches: Some(true),
            is_release_branch: Some(false),
            is_main_branch: Some(false),
            pre_release_weight: Some(0),
            ..Default::default()
        },
    );
    config.branches.insert(MAIN, main_branch(&[]));
    config
        .branches
        .insert(RELEASE, release_branch(&[DEVELOP, MAIN, SUPPORT, RELEASE]));
    config.branches.insert(
        FEATURE,
        feature_branch(&[DEVELOP, MAIN, RELEASE, SUPPORT, HOTFIX]),
    );
    config.branches.insert(
        PULL_REQUEST,
        pull_request_branch(&[DEVELOP, MAIN, RELEASE, FEATURE, SUPPORT, HOTFIX]),
    );
    config.branches.insert(
        HOTFIX,
        BranchConfiguration {
            regex: Some(r"^hotfix(es)?[\/-](?P<BranchName>.+)".to_string()),
            label: Some("beta".to_string()),
            increment: Some(IncrementStrategy::Patch),
            deployment_mode: Some(DeploymentMode::ManualDeployment),
            source_branches: strings(&[MAIN, SUPPORT]),
            is_release_branch: Some(false),
            is_main_branch: Some(false),
            pre_release_weight: Some(30000),
            ..Default::default()
        },
    );
    config.branches.insert(
        SUPPORT,
        BranchConfiguration {
            regex: Some(r"^support[\/-](?P<BranchName>.+)".to_string()),
            label: Some(String::new()),
            increment: Some(IncrementStrategy::Patch),
            deployment_mode: Some(DeploymentMode::ContinuousDeployment),
            source_branches: strings(&[MAIN]),
            is_main_branch: Some(true),
            is_release_branch: Some(false),
            tracks_release_branches: Some(false),
            prevent_increment_of_merged_branch: Some(true),
            pre_release_weight: Some(55000),
            ..Default::default()
        },
    );
    config.branches.insert(
        UNKNOWN,
        unknown_branch(&[MAIN, DEVELOP, RELEASE, FEATURE, PULL_REQUEST, HOTFIX, SUPPORT]),
    );
    config
}

/// GitHub Flow: everything branches off and merges back into `main`
pub fn github_flow() -> GitVersionConfiguration {
    let mut config = base(GITHUB_FLOW);

    config.branches.insert(MAIN, main_branch(&[]));
    config.branches.insert(RELEASE, release_branch(&[MAIN, RELEASE]));
    config
        .branches
        .insert(FEATURE, feature_branch(&[MAIN, RELEASE]));
    config
        .branches
        .insert(PULL_REQUEST, pull_request_branch(&[MAIN, RELEASE, FEATURE]));
    config.branches.insert(
        UNKNOWN,
        unknown_branch(&[MAIN, RELEASE, FEATURE, PULL_REQUEST]),
    );
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_flow_declares_canonical_branches() {
        let config = git_flow();
        let keys: Vec<&str> = config.branches.keys().collect();
        assert_eq!(
            keys,
            vec![DEVELOP, MAIN, RELEASE, FEATURE, PULL_REQUEST, HOTFIX, SUPPORT, UNKNOWN]
        );
    }

    #[test]
    fn test_github_flow_has_no_develop() {
        let config = github_flow();
        assert!(!config.branches.contains_key(DEVELOP));
        assert!(config.branches.contains_key(MAIN));
    }

    #[test]
    fn test_every_source_branch_is_declared() {
        for config in [git_flow(), github_flow()] {
            for (key, branch) in config.branches.iter() {
                for source in branch.source_branches.as_deref().unwrap_or_default() {
                    assert!(
                        config.branches.contains_key(source),
                        "{} references undeclared {}",
                        key,
                        source
                    );
                }
            }
        }
    }

    #[test]
    fn test_unknown_workflow_is_rejected() {
        assert!(for_workflow(Some("TrunkFlow/v9")).is_err());
        assert!(for_workflow(Some("")).unwrap().branches.is_empty());
        assert_eq!(for_workflow(None).unwrap().workflow.as_deref(), Some(GIT_FLOW));
    }
}
