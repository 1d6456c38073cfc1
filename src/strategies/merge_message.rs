use crate::context::GitVersionContext;
use crate::domain::{BaseVersion, BaseVersionKind, SemanticVersion, SemanticVersionFormat};
use crate::error::Result;
use crate::git::Commit;
use crate::resolver::EffectiveBranchConfiguration;
use crate::strategies::{version_in_branch_name, BaseVersionStrategy};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Built-in merge message grammars, tried after any configured formats
const DEFAULT_FORMATS: [(&str, &str); 8] = [
    (
        "Default",
        r"^Merge (branch|tag) '(?P<SourceBranch>[^']*)'(?: into (?P<TargetBranch>[^\s]*))*",
    ),
    (
        "SmartGit",
        r"^Finish (?P<SourceBranch>[^\s]*)(?: into (?P<TargetBranch>[^\s]*))*",
    ),
    (
        "BitBucketPull",
        r"^Merge pull request #(?P<PullRequestNumber>\d+) (from|in) (?P<Source>.*) from (?P<SourceBranch>[^\s]*) to (?P<TargetBranch>[^\s]*)",
    ),
    (
        "BitBucketPullv7",
        r"^Pull request #(?P<PullRequestNumber>\d+).*\r?\n\r?\nMerge in (?P<Source>.*) from (?P<SourceBranch>[^\s]*) to (?P<TargetBranch>[^\s]*)",
    ),
    (
        "BitBucketCloudPull",
        r"^Merged in (?P<SourceBranch>[^\s]*) \(pull request #(?P<PullRequestNumber>\d+)\)",
    ),
    (
        "GitHubPull",
        r"^Merge pull request #(?P<PullRequestNumber>\d+) (from|in) (?:[^\s/]+/)?(?P<SourceBranch>[^\s]*)(?: into (?P<TargetBranch>[^\s]*))*",
    ),
    (
        "RemoteTracking",
        r"^Merge remote-tracking branch '(?P<SourceBranch>[^\s]*)'(?: into (?P<TargetBranch>[^\s]*))*",
    ),
    (
        "AzureDevOpsPull",
        r"^Merge pull request (?P<PullRequestNumber>\d+) from (?P<SourceBranch>[^\s]*) into (?P<TargetBranch>[^\s]*)",
    ),
];

fn default_formats() -> &'static [(&'static str, Regex)] {
    static FORMATS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    FORMATS.get_or_init(|| {
        DEFAULT_FORMATS
            .iter()
            .filter_map(|(name, pattern)| Regex::new(pattern).ok().map(|regex| (*name, regex)))
            .collect()
    })
}

/// A merge commit message broken into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeMessage {
    pub format_name: String,
    /// Merged branch with any remote or ref prefix removed
    pub merged_branch: String,
    pub target_branch: Option<String>,
    pub pull_request_number: Option<u64>,
}

impl MergeMessage {
    /// Parse with the configured formats first, then the built-in ones
    pub fn parse(message: &str, custom_formats: &BTreeMap<String, String>) -> Option<Self> {
        for (name, pattern) in custom_formats {
            match Regex::new(pattern) {
                Ok(regex) => {
                    if let Some(parsed) = Self::try_format(name, &regex, message) {
                        return Some(parsed);
                    }
                }
                Err(e) => tracing::warn!(format = %name, error = %e, "Skipping invalid merge message format"),
            }
        }
        default_formats()
            .iter()
            .find_map(|(name, regex)| Self::try_format(name, regex, message))
    }

    fn try_format(name: &str, regex: &Regex, message: &str) -> Option<Self> {
        let captures = regex.captures(message)?;
        let source = captures.name("SourceBranch")?.as_str();
        let remote_tracking = name == "RemoteTracking";

        Some(MergeMessage {
            format_name: name.to_string(),
            merged_branch: clean_branch_name(source, remote_tracking),
            target_branch: captures
                .name("TargetBranch")
                .map(|m| clean_branch_name(m.as_str(), false)),
            pull_request_number: captures
                .name("PullRequestNumber")
                .and_then(|m| m.as_str().parse().ok()),
        })
    }

    pub fn is_pull_request(&self) -> bool {
        self.pull_request_number.is_some()
    }
}

fn clean_branch_name(name: &str, has_remote: bool) -> String {
    let name = name
        .strip_prefix("refs/heads/")
        .or_else(|| name.strip_prefix("refs/remotes/"))
        .unwrap_or(name);
    let name = if has_remote {
        name.split_once('/').map_or(name, |(_, rest)| rest)
    } else {
        name
    };
    name.strip_prefix("origin/").unwrap_or(name).to_string()
}

/// Versions from the names of branches merged into this branch
pub struct MergeMessageStrategy;

impl MergeMessageStrategy {
    fn candidate(
        &self,
        context: &GitVersionContext<'_>,
        branch: &EffectiveBranchConfiguration,
        commit: &Commit,
    ) -> Option<BaseVersion> {
        let configuration = &branch.configuration;
        let message = MergeMessage::parse(&commit.message, &configuration.merge_message_formats)?;

        let version = SemanticVersion::try_parse(
            &message.merged_branch,
            configuration.tag_prefix_regex.as_ref(),
            SemanticVersionFormat::Strict,
        )
        .or_else(|| version_in_branch_name(&message.merged_branch, branch).map(|(v, _)| v))?;

        let store = context.store();
        let merged = store
            .matcher()
            .resolve(store.configuration(), &message.merged_branch);
        let should_increment =
            commit.id != context.current_commit.id && !configuration.prevent_increment_of_merged_branch;

        Some(
            BaseVersion::new(
                BaseVersionKind::MergeMessage,
                format!("Merge message '{}'", commit.summary()),
                version,
                Some(commit.id),
                should_increment,
            )
            .with_source_branch(merged.key),
        )
    }
}

impl BaseVersionStrategy for MergeMessageStrategy {
    fn name(&self) -> &'static str {
        "MergeMessage"
    }

    fn base_versions(
        &self,
        context: &GitVersionContext<'_>,
        branch: &EffectiveBranchConfiguration,
    ) -> Result<Vec<BaseVersion>> {
        if !branch.configuration.track_merge_message {
            return Ok(Vec::new());
        }

        let history = context.store().history(context.current_commit.id, false)?;
        Ok(history
            .iter()
            .filter(|commit| commit.is_merge())
            .filter(|commit| !branch.configuration.ignore.is_ignored(commit))
            .filter_map(|commit| self.candidate(context, branch, commit))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(message: &str) -> Option<MergeMessage> {
        MergeMessage::parse(message, &BTreeMap::new())
    }

    #[test]
    fn test_default_git_merge() {
        let parsed = parse("Merge branch 'release-1.2.0'").unwrap();
        assert_eq!(parsed.format_name, "Default");
        assert_eq!(parsed.merged_branch, "release-1.2.0");
        assert_eq!(parsed.target_branch, None);

        let parsed = parse("Merge branch 'feature/x' into develop").unwrap();
        assert_eq!(parsed.target_branch.as_deref(), Some("develop"));
    }

    #[test]
    fn test_github_pull_request() {
        let parsed = parse("Merge pull request #42 from acme/release/2.0.0\n\nShip it").unwrap();
        assert_eq!(parsed.format_name, "GitHubPull");
        assert_eq!(parsed.merged_branch, "release/2.0.0");
        assert_eq!(parsed.pull_request_number, Some(42));
        assert!(parsed.is_pull_request());
    }

    #[test]
    fn test_bitbucket_pull_request() {
        let parsed =
            parse("Merge pull request #7 in PROJ/repo from release/1.0.0 to main").unwrap();
        assert_eq!(parsed.format_name, "BitBucketPull");
        assert_eq!(parsed.merged_branch, "release/1.0.0");
        assert_eq!(parsed.target_branch.as_deref(), Some("main"));
    }

    #[test]
    fn test_remote_tracking_strips_remote() {
        let parsed = parse("Merge remote-tracking branch 'origin/release/3.1.0'").unwrap();
        assert_eq!(parsed.merged_branch, "release/3.1.0");
    }

    #[test]
    fn test_azure_devops_and_smartgit() {
        let parsed = parse("Merge pull request 9 from hotfix/1.0.1 into main").unwrap();
        assert_eq!(parsed.format_name, "AzureDevOpsPull");
        assert_eq!(parsed.merged_branch, "hotfix/1.0.1");

        let parsed = parse("Finish release/4.0.0").unwrap();
        assert_eq!(parsed.format_name, "SmartGit");
        assert_eq!(parsed.merged_branch, "release/4.0.0");
    }

    #[test]
    fn test_custom_format_takes_precedence() {
        let mut formats = BTreeMap::new();
        formats.insert(
            "Landed".to_string(),
            r"^Landed (?P<SourceBranch>\S+)".to_string(),
        );
        let parsed = MergeMessage::parse("Landed release/5.0.0", &formats).unwrap();
        assert_eq!(parsed.format_name, "Landed");
        assert_eq!(parsed.merged_branch, "release/5.0.0");
    }

    #[test]
    fn test_plain_commit_is_not_a_merge_message() {
        assert!(parse("fix: handle empty input").is_none());
    }
}
