use crate::config::{defaults, BranchConfiguration, GitVersionConfiguration, IncrementStrategy};
use crate::error::Result;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;

/// Result of matching a concrete branch name against the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedBranch {
    /// Configuration key, `unknown` when nothing else matched
    pub key: String,
    pub configuration: BranchConfiguration,
    /// Named capture groups of the matching regex, used as label placeholders
    pub captures: BTreeMap<String, String>,
}

/// Ordered regex dispatch from branch names to branch configurations
#[derive(Debug, Clone)]
pub struct BranchMatcher {
    entries: Vec<(String, Regex)>,
    unknown: Option<Regex>,
}

fn case_insensitive(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

impl BranchMatcher {
    pub fn new(configuration: &GitVersionConfiguration) -> Result<Self> {
        let mut entries = Vec::new();
        let mut unknown = None;

        for (key, branch) in configuration.branches.iter() {
            let Some(pattern) = branch.regex.as_deref() else {
                continue;
            };
            let regex = case_insensitive(pattern)?;
            if key == defaults::UNKNOWN {
                unknown = Some(regex);
            } else {
                entries.push((key.to_string(), regex));
            }
        }

        Ok(BranchMatcher { entries, unknown })
    }

    /// Keys of all configurations whose regex matches, in declaration order
    pub fn matching_keys(&self, branch_name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, regex)| regex.is_match(branch_name))
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// Whether `branch_name` matches the configuration registered under `key`
    pub fn is_match(&self, key: &str, branch_name: &str) -> bool {
        if key == defaults::UNKNOWN {
            return self
                .unknown
                .as_ref()
                .is_some_and(|regex| regex.is_match(branch_name));
        }
        self.entries
            .iter()
            .any(|(k, regex)| k == key && regex.is_match(branch_name))
    }

    /// Pick the configuration for `branch_name`
    ///
    /// The first declared match wins; `unknown` only applies when nothing
    /// else matches, and a synthesized `unknown` is used when the
    /// configuration has none.
    pub fn resolve(
        &self,
        configuration: &GitVersionConfiguration,
        branch_name: &str,
    ) -> MatchedBranch {
        let matches: Vec<&(String, Regex)> = self
            .entries
            .iter()
            .filter(|(_, regex)| regex.is_match(branch_name))
            .collect();

        if matches.len() > 1 {
            let candidates: Vec<&str> = matches.iter().map(|(key, _)| key.as_str()).collect();
            tracing::warn!(
                branch = branch_name,
                candidates = ?candidates,
                "Multiple branch configurations match; using '{}'",
                candidates[0]
            );
        }

        let selected = matches
            .first()
            .map(|(key, regex)| (key.as_str(), regex))
            .or_else(|| {
                self.unknown
                    .as_ref()
                    .filter(|regex| regex.is_match(branch_name))
                    .map(|regex| (defaults::UNKNOWN, regex))
            });

        match selected {
            Some((key, regex)) => MatchedBranch {
                key: key.to_string(),
                configuration: configuration.branch(key).cloned().unwrap_or_default(),
                captures: captures(regex, branch_name),
            },
            None => MatchedBranch {
                key: defaults::UNKNOWN.to_string(),
                configuration: synthesized_unknown(configuration),
                captures: BTreeMap::new(),
            },
        }
    }
}

fn captures(regex: &Regex, branch_name: &str) -> BTreeMap<String, String> {
    let Some(found) = regex.captures(branch_name) else {
        return BTreeMap::new();
    };
    regex
        .capture_names()
        .flatten()
        .filter_map(|name| {
            found
                .name(name)
                .map(|m| (name.to_string(), m.as_str().to_string()))
        })
        .collect()
}

fn synthesized_unknown(configuration: &GitVersionConfiguration) -> BranchConfiguration {
    let explicit = BranchConfiguration {
        regex: Some(".*".to_string()),
        label: Some("{BranchName}".to_string()),
        increment: Some(IncrementStrategy::Inherit),
        source_branches: Some(configuration.branches.keys().map(str::to_string).collect()),
        ..Default::default()
    };
    configuration.branch_defaults.propagatable().merge(&explicit)
}
