use crate::config::sanitize;
use crate::error::{GitverError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// Compile a built-in pattern once; `None` only if the pattern itself is broken
fn builtin(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// Which part of a version an increment touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VersionField {
    None,
    Patch,
    Minor,
    Major,
}

impl fmt::Display for VersionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VersionField::None => "None",
            VersionField::Patch => "Patch",
            VersionField::Minor => "Minor",
            VersionField::Major => "Major",
        };
        f.write_str(name)
    }
}

/// Grammar accepted when parsing tags and branch names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticVersionFormat {
    /// SemVer 2.0 exactly
    #[default]
    Strict,
    /// Allows `1`, `1.2`, a fourth numeric part and pre-release tags without dots
    Loose,
}

/// Output shapes of a semantic version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionFormat {
    MajorMinorPatch,
    SemVer,
    FullSemVer,
    Informational,
}

/// Pre-release part of a version, e.g. `beta.4`
///
/// An empty name with a number renders as the bare number (`1.0.0-3`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PreReleaseTag {
    pub name: String,
    pub number: Option<u64>,
}

impl PreReleaseTag {
    pub fn new(name: impl Into<String>, number: Option<u64>) -> Self {
        PreReleaseTag {
            name: name.into(),
            number,
        }
    }

    pub fn has_tag(&self) -> bool {
        !self.name.is_empty() || self.number.is_some()
    }

    /// Parse `name[.]number`; anything without a trailing number is all name
    pub fn parse(value: &str) -> Self {
        static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

        if value.is_empty() {
            return PreReleaseTag::default();
        }

        let pattern = builtin(&PATTERN, r"^(?P<name>.*?)\.?(?P<number>\d+)?$");
        match pattern.and_then(|p| p.captures(value)) {
            Some(captures) => {
                let name = captures.name("name").map_or("", |m| m.as_str());
                match captures.name("number").map(|m| m.as_str().parse::<u64>()) {
                    Some(Ok(number)) => PreReleaseTag::new(name, Some(number)),
                    Some(Err(_)) => PreReleaseTag::new(value, None),
                    None => PreReleaseTag::new(name, None),
                }
            }
            None => PreReleaseTag::new(value, None),
        }
    }

    /// Whether this tag belongs to the given label (stable versions match every label)
    pub fn is_match_for_label(&self, label: &str) -> bool {
        !self.has_tag() || self.name.eq_ignore_ascii_case(label)
    }
}

impl Ord for PreReleaseTag {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.has_tag(), other.has_tag()) {
            (false, false) => Ordering::Equal,
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (true, true) => self
                .name
                .to_lowercase()
                .cmp(&other.name.to_lowercase())
                .then_with(|| self.name.cmp(&other.name))
                .then_with(|| self.number.cmp(&other.number)),
        }
    }
}

impl PartialOrd for PreReleaseTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PreReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.number {
            Some(number) if self.name.is_empty() => write!(f, "{}", number),
            Some(number) => write!(f, "{}.{}", self.name, number),
            None => f.write_str(&self.name),
        }
    }
}

/// Build metadata attached to a calculated version
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuildMetaData {
    pub commits_since_tag: Option<u64>,
    pub branch: Option<String>,
    pub sha: Option<String>,
    pub short_sha: Option<String>,
    pub other_metadata: Option<String>,
    pub commit_date: Option<DateTime<Utc>>,
    pub version_source_sha: Option<String>,
    pub commits_since_version_source: u64,
    pub uncommitted_changes: u64,
}

impl BuildMetaData {
    /// Parse `commits[.Branch.<name>][.Sha.<sha>][.other]`
    pub fn parse(value: &str) -> Self {
        static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
        let pattern = builtin(
            &PATTERN,
            r"^(?P<commits>\d+)?(?:\.?Branch(?:Name)?\.(?P<branch>[^.]+))?(?:\.?Sha\.(?P<sha>[^.]+))?\.?(?P<other>.*)$",
        );

        let mut metadata = BuildMetaData::default();
        if let Some(captures) = pattern.and_then(|p| p.captures(value)) {
            metadata.commits_since_tag = captures
                .name("commits")
                .and_then(|m| m.as_str().parse().ok());
            metadata.branch = captures.name("branch").map(|m| m.as_str().to_string());
            metadata.sha = captures.name("sha").map(|m| m.as_str().to_string());
            metadata.other_metadata = captures
                .name("other")
                .map(|m| m.as_str())
                .filter(|other| !other.is_empty())
                .map(str::to_string);
        }
        metadata
    }

    /// Short form: commits since tag only
    pub fn short(&self) -> String {
        self.commits_since_tag
            .map(|commits| commits.to_string())
            .unwrap_or_default()
    }

    /// The part of the metadata that [`BuildMetaData::full`] carries, with
    /// the branch escaped the same way
    ///
    /// Commit date, short sha, version source and change counters describe
    /// the calculation and are not part of a rendered version.
    pub fn rendered(&self) -> Self {
        BuildMetaData {
            commits_since_tag: self.commits_since_tag,
            branch: self.branch.as_deref().map(sanitize),
            sha: self.sha.clone(),
            other_metadata: self.other_metadata.clone(),
            ..Default::default()
        }
    }

    /// Full form including branch, sha and other metadata
    pub fn full(&self) -> String {
        let mut parts = Vec::new();
        if let Some(commits) = self.commits_since_tag {
            parts.push(commits.to_string());
        }
        if let Some(branch) = &self.branch {
            parts.push(format!("Branch.{}", sanitize(branch)));
        }
        if let Some(sha) = &self.sha {
            parts.push(format!("Sha.{}", sha));
        }
        if let Some(other) = &self.other_metadata {
            parts.push(other.clone());
        }
        parts.join(".")
    }
}

/// Semantic version with pre-release tag and build metadata
///
/// Ordering compares the numeric triple first, then the pre-release tag
/// (absence sorts higher), and falls back to build metadata only to stay
/// consistent with equality. Use [`SemanticVersion::compare_precedence`] when
/// metadata must be ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre_release_tag: PreReleaseTag,
    pub build_metadata: BuildMetaData,
}

impl SemanticVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        SemanticVersion {
            major,
            minor,
            patch,
            ..Default::default()
        }
    }

    pub fn with_pre_release(mut self, tag: PreReleaseTag) -> Self {
        self.pre_release_tag = tag;
        self
    }

    pub fn is_pre_release(&self) -> bool {
        self.pre_release_tag.has_tag()
    }

    /// This version as it reads back from its informational form
    pub fn rendered(&self) -> Self {
        SemanticVersion {
            build_metadata: self.build_metadata.rendered(),
            ..self.clone()
        }
    }

    /// Parse a version string, stripping an optional tag prefix regex first
    pub fn parse(
        version: &str,
        tag_prefix: Option<&str>,
        format: SemanticVersionFormat,
    ) -> Result<Self> {
        let prefix = match tag_prefix.filter(|p| !p.is_empty()) {
            Some(p) => Some(Regex::new(&format!("^(?:{})", p))?),
            None => None,
        };
        Self::parse_with_prefix(version, prefix.as_ref(), format)
    }

    /// Like [`SemanticVersion::parse`] with an already compiled, start-anchored prefix
    pub fn parse_with_prefix(
        version: &str,
        tag_prefix: Option<&Regex>,
        format: SemanticVersionFormat,
    ) -> Result<Self> {
        let stripped = match tag_prefix {
            Some(prefix) => match prefix.find(version) {
                Some(m) if m.start() == 0 => &version[m.end()..],
                _ => {
                    return Err(GitverError::version(format!(
                        "'{}' does not start with the tag prefix '{}'",
                        version,
                        prefix.as_str()
                    )))
                }
            },
            None => version,
        };

        match format {
            SemanticVersionFormat::Strict => Self::parse_strict(stripped),
            SemanticVersionFormat::Loose => Self::parse_loose(stripped),
        }
    }

    /// Returns `None` instead of an error for strings that are not versions
    pub fn try_parse(
        version: &str,
        tag_prefix: Option<&Regex>,
        format: SemanticVersionFormat,
    ) -> Option<Self> {
        Self::parse_with_prefix(version, tag_prefix, format).ok()
    }

    fn parse_strict(value: &str) -> Result<Self> {
        let parsed = semver::Version::parse(value)
            .map_err(|e| GitverError::version(format!("'{}': {}", value, e)))?;

        Ok(SemanticVersion {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            pre_release_tag: PreReleaseTag::parse(parsed.pre.as_str()),
            build_metadata: if parsed.build.is_empty() {
                BuildMetaData::default()
            } else {
                BuildMetaData::parse(parsed.build.as_str())
            },
        })
    }

    fn parse_loose(value: &str) -> Result<Self> {
        static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
        let pattern = builtin(
            &PATTERN,
            r"^(?P<major>\d+)(?:\.(?P<minor>\d+))?(?:\.(?P<patch>\d+))?(?:\.(?P<fourth>\d+))?(?:-(?P<tag>[^+]*))?(?:\+(?P<build>.*))?$",
        );

        let captures = pattern.and_then(|p| p.captures(value)).ok_or_else(|| {
            GitverError::version(format!("'{}' is not a semantic version", value))
        })?;

        let number = |name: &str| -> Result<u64> {
            match captures.name(name) {
                Some(m) => m.as_str().parse::<u64>().map_err(|_| {
                    GitverError::version(format!("Invalid {} version in '{}'", name, value))
                }),
                None => Ok(0),
            }
        };

        let mut build_metadata = captures
            .name("build")
            .map(|m| BuildMetaData::parse(m.as_str()))
            .unwrap_or_default();
        if let Some(fourth) = captures.name("fourth") {
            build_metadata.other_metadata = Some(match build_metadata.other_metadata.take() {
                Some(other) => format!("{}.{}", fourth.as_str(), other),
                None => fourth.as_str().to_string(),
            });
        }

        Ok(SemanticVersion {
            major: number("major")?,
            minor: number("minor")?,
            patch: number("patch")?,
            pre_release_tag: captures
                .name("tag")
                .map(|m| PreReleaseTag::parse(m.as_str()))
                .unwrap_or_default(),
            build_metadata,
        })
    }

    /// SemVer precedence: numeric triple, then pre-release; metadata ignored
    pub fn compare_precedence(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| self.pre_release_tag.cmp(&other.pre_release_tag))
    }

    pub fn is_same_version(&self, other: &Self) -> bool {
        self.compare_precedence(other) == Ordering::Equal
    }

    /// Apply an increment to the numeric triple.
    ///
    /// A pre-release is not bumped again when its triple already reflects the
    /// requested field: `1.3.0-beta` stays `1.3.0` for Minor. The pre-release
    /// tag is cleared whenever the triple changes.
    pub fn increment(&self, field: VersionField) -> Self {
        let pre_release = self.is_pre_release();
        let mut next = self.clone();

        match field {
            VersionField::None => {}
            VersionField::Patch => {
                if !pre_release {
                    next.patch += 1;
                }
            }
            VersionField::Minor => {
                if !pre_release || self.patch != 0 {
                    next.minor += 1;
                    next.patch = 0;
                }
            }
            VersionField::Major => {
                if !pre_release || self.minor != 0 || self.patch != 0 {
                    next.major += 1;
                    next.minor = 0;
                    next.patch = 0;
                }
            }
        }

        if (next.major, next.minor, next.patch) != (self.major, self.minor, self.patch) {
            next.pre_release_tag = PreReleaseTag::default();
        }
        next
    }

    pub fn format(&self, format: VersionFormat) -> String {
        let major_minor_patch = format!("{}.{}.{}", self.major, self.minor, self.patch);
        let sem_ver = if self.is_pre_release() {
            format!("{}-{}", major_minor_patch, self.pre_release_tag)
        } else {
            major_minor_patch.clone()
        };

        match format {
            VersionFormat::MajorMinorPatch => major_minor_patch,
            VersionFormat::SemVer => sem_ver,
            VersionFormat::FullSemVer => {
                let short = self.build_metadata.short();
                if short.is_empty() {
                    sem_ver
                } else {
                    format!("{}+{}", sem_ver, short)
                }
            }
            VersionFormat::Informational => {
                let full = self.build_metadata.full();
                if full.is_empty() {
                    sem_ver
                } else {
                    format!("{}+{}", sem_ver, full)
                }
            }
        }
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(VersionFormat::SemVer))
    }
}
