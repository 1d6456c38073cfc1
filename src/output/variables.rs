use crate::config::{defaults, sanitize, EffectiveConfiguration};
use crate::domain::{SemanticVersion, VersionFormat};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Flat set of named values derived from a calculated version
///
/// This is the surface CI integrations and file writers consume, both as
/// JSON and through [`VersionVariables::get`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionVariables {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre_release_tag: String,
    pub pre_release_tag_with_dash: String,
    pub pre_release_label: String,
    pub pre_release_label_with_dash: String,
    pub pre_release_number: Option<u64>,
    pub weighted_pre_release_number: i64,
    pub build_meta_data: Option<u64>,
    pub full_build_meta_data: String,
    pub major_minor_patch: String,
    pub sem_ver: String,
    pub full_sem_ver: String,
    pub informational_version: String,
    pub branch_name: String,
    pub escaped_branch_name: String,
    pub sha: String,
    pub short_sha: String,
    pub version_source_sha: String,
    pub commits_since_version_source: u64,
    pub commit_date: String,
    pub uncommitted_changes: u64,
}

/// Variable names in output order
pub const VARIABLE_NAMES: [&str; 23] = [
    "Major",
    "Minor",
    "Patch",
    "PreReleaseTag",
    "PreReleaseTagWithDash",
    "PreReleaseLabel",
    "PreReleaseLabelWithDash",
    "PreReleaseNumber",
    "WeightedPreReleaseNumber",
    "BuildMetaData",
    "FullBuildMetaData",
    "MajorMinorPatch",
    "SemVer",
    "FullSemVer",
    "InformationalVersion",
    "BranchName",
    "EscapedBranchName",
    "Sha",
    "ShortSha",
    "VersionSourceSha",
    "CommitsSinceVersionSource",
    "CommitDate",
    "UncommittedChanges",
];

fn format_date(date: &DateTime<Utc>, format: &str) -> String {
    // chrono panics when displaying an invalid format string
    let valid = !StrftimeItems::new(format).any(|item| matches!(item, Item::Error));
    let format = if valid {
        format
    } else {
        tracing::warn!(format, "Invalid commit date format; using the default");
        defaults::DEFAULT_COMMIT_DATE_FORMAT
    };
    date.format(format).to_string()
}

impl VersionVariables {
    pub fn from_version(version: &SemanticVersion, configuration: &EffectiveConfiguration) -> Self {
        let tag = &version.pre_release_tag;
        let metadata = &version.build_metadata;
        let with_dash = |value: String| {
            if value.is_empty() {
                value
            } else {
                format!("-{}", value)
            }
        };

        let pre_release_tag = if tag.has_tag() { tag.to_string() } else { String::new() };
        let weighted_pre_release_number = if tag.has_tag() {
            configuration.pre_release_weight + tag.number.unwrap_or(0) as i64
        } else {
            defaults::STABLE_PRE_RELEASE_WEIGHT as i64
        };
        let branch_name = metadata.branch.clone().unwrap_or_default();

        let mut variables = VersionVariables {
            major: version.major,
            minor: version.minor,
            patch: version.patch,
            pre_release_tag_with_dash: with_dash(pre_release_tag.clone()),
            pre_release_tag,
            pre_release_label: tag.name.clone(),
            pre_release_label_with_dash: with_dash(tag.name.clone()),
            pre_release_number: tag.number,
            weighted_pre_release_number,
            build_meta_data: metadata.commits_since_tag,
            full_build_meta_data: metadata.full(),
            major_minor_patch: version.format(VersionFormat::MajorMinorPatch),
            sem_ver: version.format(VersionFormat::SemVer),
            full_sem_ver: version.format(VersionFormat::FullSemVer),
            informational_version: version.format(VersionFormat::Informational),
            escaped_branch_name: sanitize(&branch_name),
            branch_name,
            sha: metadata.sha.clone().unwrap_or_default(),
            short_sha: metadata.short_sha.clone().unwrap_or_default(),
            version_source_sha: metadata.version_source_sha.clone().unwrap_or_default(),
            commits_since_version_source: metadata.commits_since_version_source,
            commit_date: metadata
                .commit_date
                .map(|date| format_date(&date, &configuration.commit_date_format))
                .unwrap_or_default(),
            uncommitted_changes: metadata.uncommitted_changes,
        };
        variables.informational_version = variables.expand(&configuration.informational_version_format);
        variables
    }

    /// Value of one variable by its PascalCase name; empty values render as ""
    pub fn get(&self, name: &str) -> Option<String> {
        let optional = |value: Option<u64>| value.map(|v| v.to_string()).unwrap_or_default();
        let value = match name {
            "Major" => self.major.to_string(),
            "Minor" => self.minor.to_string(),
            "Patch" => self.patch.to_string(),
            "PreReleaseTag" => self.pre_release_tag.clone(),
            "PreReleaseTagWithDash" => self.pre_release_tag_with_dash.clone(),
            "PreReleaseLabel" => self.pre_release_label.clone(),
            "PreReleaseLabelWithDash" => self.pre_release_label_with_dash.clone(),
            "PreReleaseNumber" => optional(self.pre_release_number),
            "WeightedPreReleaseNumber" => self.weighted_pre_release_number.to_string(),
            "BuildMetaData" => optional(self.build_meta_data),
            "FullBuildMetaData" => self.full_build_meta_data.clone(),
            "MajorMinorPatch" => self.major_minor_patch.clone(),
            "SemVer" => self.sem_ver.clone(),
            "FullSemVer" => self.full_sem_ver.clone(),
            "InformationalVersion" => self.informational_version.clone(),
            "BranchName" => self.branch_name.clone(),
            "EscapedBranchName" => self.escaped_branch_name.clone(),
            "Sha" => self.sha.clone(),
            "ShortSha" => self.short_sha.clone(),
            "VersionSourceSha" => self.version_source_sha.clone(),
            "CommitsSinceVersionSource" => self.commits_since_version_source.to_string(),
            "CommitDate" => self.commit_date.clone(),
            "UncommittedChanges" => self.uncommitted_changes.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// All variables as ordered `(name, value)` pairs
    pub fn to_map(&self) -> Vec<(&'static str, String)> {
        VARIABLE_NAMES
            .iter()
            .filter_map(|name| self.get(name).map(|value| (*name, value)))
            .collect()
    }

    /// Replace `{Name}` placeholders with variable values; unknown names are kept
    pub fn expand(&self, template: &str) -> String {
        let mut expanded = template.to_string();
        for (name, value) in self.to_map() {
            expanded = expanded.replace(&format!("{{{}}}", name), &value);
        }
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigurationBuilder, GitVersionConfiguration};
    use crate::domain::{BuildMetaData, PreReleaseTag};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn configuration(config: &GitVersionConfiguration, key: &str) -> EffectiveConfiguration {
        let branch = config.branch(key).unwrap();
        EffectiveConfiguration::new(config, key, branch).unwrap()
    }

    fn feature_version() -> SemanticVersion {
        let mut version = SemanticVersion::new(1, 3, 0).with_pre_release(PreReleaseTag::new("login", Some(4)));
        version.build_metadata = BuildMetaData {
            commits_since_tag: Some(4),
            branch: Some("feature/login".to_string()),
            sha: Some("0123456789abcdef0123456789abcdef01234567".to_string()),
            short_sha: Some("0123456".to_string()),
            other_metadata: None,
            commit_date: Some(Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap()),
            version_source_sha: Some("fedcba9876543210fedcba9876543210fedcba98".to_string()),
            commits_since_version_source: 4,
            uncommitted_changes: 0,
        };
        version
    }

    #[test]
    fn test_pre_release_variables() {
        let config = ConfigurationBuilder::new().build().unwrap();
        let variables = VersionVariables::from_version(&feature_version(), &configuration(&config, "feature"));

        assert_eq!(variables.sem_ver, "1.3.0-login.4");
        assert_eq!(variables.full_sem_ver, "1.3.0-login.4+4");
        assert_eq!(variables.pre_release_tag_with_dash, "-login.4");
        assert_eq!(variables.pre_release_label_with_dash, "-login");
        assert_eq!(variables.pre_release_number, Some(4));
        assert_eq!(variables.escaped_branch_name, "feature-login");
        assert_eq!(variables.commit_date, "2024-03-09");
        assert_eq!(
            variables.informational_version,
            "1.3.0-login.4+4.Branch.feature-login.Sha.0123456789abcdef0123456789abcdef01234567"
        );
    }

    #[test]
    fn test_stable_version_weight() {
        let config = ConfigurationBuilder::new().build().unwrap();
        let mut version = feature_version();
        version.pre_release_tag = PreReleaseTag::default();
        let variables = VersionVariables::from_version(&version, &configuration(&config, "main"));

        assert_eq!(variables.weighted_pre_release_number, 60000);
        assert_eq!(variables.pre_release_tag, "");
        assert_eq!(variables.pre_release_tag_with_dash, "");
        assert_eq!(variables.get("PreReleaseNumber").as_deref(), Some(""));
    }

    #[test]
    fn test_informational_template_and_date_format() {
        let mut builder = ConfigurationBuilder::new();
        builder
            .add_override_str(
                "informational-version-format = \"{SemVer}+{ShortSha}\"\ncommit-date-format = \"%d.%m.%Y\"",
            )
            .unwrap();
        let config = builder.build().unwrap();
        let variables = VersionVariables::from_version(&feature_version(), &configuration(&config, "feature"));

        assert_eq!(variables.informational_version, "1.3.0-login.4+0123456");
        assert_eq!(variables.commit_date, "09.03.2024");
    }

    #[test]
    fn test_map_preserves_order_and_json_names() {
        let config = ConfigurationBuilder::new().build().unwrap();
        let variables = VersionVariables::from_version(&feature_version(), &configuration(&config, "feature"));

        let names: Vec<&str> = variables.to_map().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, VARIABLE_NAMES.to_vec());
        assert!(variables.get("NoSuchVariable").is_none());

        let json = serde_json::to_value(&variables).unwrap();
        assert_eq!(json["FullSemVer"], "1.3.0-login.4+4");
        assert_eq!(json["Major"], 1);
    }
}
