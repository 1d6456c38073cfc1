use crate::config::{
    defaults, BranchConfiguration, DeploymentMode, GitVersionConfiguration, VersionStrategy,
};
use crate::domain::{SemanticVersion, SemanticVersionFormat};
use crate::error::{GitverError, Result};
use regex::Regex;

/// Layers configuration overrides on top of a built-in workflow
///
/// Overrides are applied in the order they were added; the last one to set a
/// value wins. The workflow itself is taken from the last override that names
/// one, so a file can opt out of the GitFlow defaults entirely.
#[derive(Debug, Default)]
pub struct ConfigurationBuilder {
    overrides: Vec<GitVersionConfiguration>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        ConfigurationBuilder::default()
    }

    pub fn add_override(&mut self, configuration: GitVersionConfiguration) -> &mut Self {
        self.overrides.push(configuration);
        self
    }

    /// Add an untyped override, e.g. a table parsed from the command line
    pub fn add_override_table(&mut self, table: toml::Table) -> Result<&mut Self> {
        let configuration: GitVersionConfiguration = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| GitverError::config(format!("Invalid override: {}", e)))?;
        Ok(self.add_override(configuration))
    }

    pub fn add_override_str(&mut self, content: &str) -> Result<&mut Self> {
        let configuration: GitVersionConfiguration = toml::from_str(content)?;
        Ok(self.add_override(configuration))
    }

    /// Parse `key=value` pairs into one override table
    ///
    /// Keys may be dotted (`branches.main.label=rc`). Values are read as TOML
    /// and fall back to a plain string, so `next-version=2.0.0` needs no quotes.
    pub fn parse_cli_overrides(pairs: &[String]) -> Result<toml::Table> {
        let mut document = String::new();
        for pair in pairs {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                GitverError::config(format!(
                    "Override '{}' must have the form key=value",
                    pair
                ))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(GitverError::config(format!("Override '{}' has an empty key", pair)));
            }
            let value = value.trim();
            let literal = if toml::from_str::<toml::Table>(&format!("v = {}", value)).is_ok() {
                value.to_string()
            } else {
                toml::Value::String(value.to_string()).to_string()
            };
            document.push_str(&format!("{} = {}\n", key, literal));
        }
        Ok(toml::from_str(&document)?)
    }

    /// Merge all layers, push top-level values into branches and validate
    pub fn build(&self) -> Result<GitVersionConfiguration> {
        let workflow = self
            .overrides
            .iter()
            .rev()
            .find_map(|o| o.workflow.clone());

        let mut configuration = defaults::for_workflow(workflow.as_deref())?;
        for layer in &self.overrides {
            configuration = configuration.merge(layer);
        }

        let configuration = finalize(configuration);
        validate(&configuration)?;
        Ok(configuration)
    }
}

fn finalize(mut configuration: GitVersionConfiguration) -> GitVersionConfiguration {
    if configuration.branch_defaults.deployment_mode == Some(DeploymentMode::Mainline) {
        let mut strategies = configuration
            .strategies
            .take()
            .unwrap_or_else(defaults::default_mainline_strategies);
        if !strategies.contains(&VersionStrategy::Mainline) {
            strategies.push(VersionStrategy::Mainline);
        }
        configuration.strategies = Some(strategies);
        configuration.branch_defaults.deployment_mode = Some(DeploymentMode::ContinuousDelivery);
    }

    let inherited = configuration.branch_defaults.propagatable();
    for (_, branch) in configuration.branches.iter_mut() {
        *branch = inherited.merge(branch);
    }

    let reciprocal: Vec<(String, String)> = configuration
        .branches
        .iter()
        .flat_map(|(key, branch)| {
            branch
                .is_source_branch_for
                .iter()
                .flatten()
                .map(move |target| (target.clone(), key.to_string()))
        })
        .collect();

    for (target, source) in reciprocal {
        if let Some(branch) = configuration.branches.get_mut(&target) {
            let sources = branch.source_branches.get_or_insert_with(Vec::new);
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
    }

    configuration
}

fn compile(name: &str, pattern: &Option<String>) -> Result<()> {
    if let Some(pattern) = pattern {
        Regex::new(pattern).map_err(|e| {
            GitverError::config(format!("'{}' is not a valid regular expression: {}", name, e))
        })?;
    }
    Ok(())
}

fn validate(configuration: &GitVersionConfiguration) -> Result<()> {
    for (key, branch) in configuration.branches.iter() {
        validate_branch(configuration, key, branch)?;
    }

    if let Some(next_version) = &configuration.next_version {
        SemanticVersion::parse(next_version, None, SemanticVersionFormat::Loose).map_err(|_| {
            GitverError::config(format!(
                "next-version '{}' is not a semantic version",
                next_version
            ))
        })?;
    }

    compile("tag-prefix", &configuration.tag_prefix)?;
    compile("major-version-bump-message", &configuration.major_version_bump_message)?;
    compile("minor-version-bump-message", &configuration.minor_version_bump_message)?;
    compile("patch-version-bump-message", &configuration.patch_version_bump_message)?;
    compile("no-bump-message", &configuration.no_bump_message)?;
    compile("version-in-branch-pattern", &configuration.version_in_branch_pattern)?;
    for (name, format) in configuration.merge_message_formats.iter().flatten() {
        compile(&format!("merge-message-formats.{}", name), &Some(format.clone()))?;
    }
    Ok(())
}

fn validate_branch(
    configuration: &GitVersionConfiguration,
    key: &str,
    branch: &BranchConfiguration,
) -> Result<()> {
    let regex = branch.regex.as_ref().ok_or_else(|| {
        GitverError::config(format!(
            "Branch configuration '{}' is missing required configuration 'regex'. \
             Add a regex that matches the branch names of this type",
            key
        ))
    })?;
    Regex::new(regex).map_err(|e| {
        GitverError::config(format!(
            "Branch configuration '{}' has an invalid regex '{}': {}",
            key, regex, e
        ))
    })?;

    let sources = branch.source_branches.as_ref().ok_or_else(|| {
        GitverError::config(format!(
            "Branch configuration '{}' is missing required configuration 'source-branches'. \
             Use an empty list if the branch has no source branches",
            key
        ))
    })?;
    for source in sources {
        if !configuration.branches.contains_key(source) {
            return Err(GitverError::config(format!(
                "Branch configuration '{}' lists undeclared source branch '{}'",
                key, source
            )));
        }
    }

    for target in branch.is_source_branch_for.iter().flatten() {
        if !configuration.branches.contains_key(target) {
            return Err(GitverError::config(format!(
                "Branch configuration '{}' is-source-branch-for references undeclared branch '{}'",
                key, target
            )));
        }
    }

    if branch.deployment_mode == Some(DeploymentMode::Mainline) {
        return Err(GitverError::config(format!(
            "Branch configuration '{}' sets deployment-mode 'Mainline'. Mainline versioning \
             applies to the whole repository: set deployment-mode = \"Mainline\" at the top level",
            key
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IncrementStrategy;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_defaults_to_git_flow() {
        let configuration = ConfigurationBuilder::new().build().unwrap();
        assert_eq!(configuration.workflow.as_deref(), Some(defaults::GIT_FLOW));
        assert!(configuration.branch("develop").is_some());
        assert!(!configuration.is_mainline());
    }

    #[test]
    fn test_top_level_values_propagate_into_branches() {
        let mut builder = ConfigurationBuilder::new();
        builder
            .add_override_str("prevent-increment-when-branch-merged = true\nlabel = \"x\"")
            .unwrap();
        let configuration = builder.build().unwrap();

        let feature = configuration.branch("feature").unwrap();
        assert_eq!(feature.prevent_increment_when_branch_merged, Some(true));
        // branches that set their own label keep it
        assert_eq!(feature.label.as_deref(), Some("{BranchName}"));
    }

    #[test]
    fn test_is_source_branch_for_is_reciprocal() {
        let mut builder = ConfigurationBuilder::new();
        builder
            .add_override_str(
                r#"
[branches.integration]
regex = "^integration$"
source-branches = ["main"]
is-source-branch-for = ["feature", "hotfix"]
"#,
            )
            .unwrap();
        let configuration = builder.build().unwrap();

        let feature = configuration.branch("feature").unwrap();
        assert!(feature
            .source_branches
            .as_ref()
            .unwrap()
            .contains(&"integration".to_string()));
    }

    #[test]
    fn test_missing_regex_is_a_configuration_error() {
        let mut builder = ConfigurationBuilder::new();
        builder
            .add_override_str("[branches.custom]\nsource-branches = []\n")
            .unwrap();
        let err = builder.build().unwrap_err().to_string();
        assert!(err.contains("custom"));
        assert!(err.contains("regex"));
    }

    #[test]
    fn test_undeclared_source_branch_is_rejected() {
        let mut builder = ConfigurationBuilder::new();
        builder
            .add_override_str("[branches.custom]\nregex = \"^c$\"\nsource-branches = [\"nope\"]\n")
            .unwrap();
        let err = builder.build().unwrap_err().to_string();
        assert!(err.contains("nope"));
    }

    #[test]
    fn test_mainline_on_branch_is_rejected() {
        let mut builder = ConfigurationBuilder::new();
        builder
            .add_override_str("[branches.main]\ndeployment-mode = \"Mainline\"\n")
            .unwrap();
        let err = builder.build().unwrap_err().to_string();
        assert!(err.contains("top level"));
    }

    #[test]
    fn test_top_level_mainline_enables_mainline_strategy() {
        let mut builder = ConfigurationBuilder::new();
        builder.add_override_str("deployment-mode = \"Mainline\"").unwrap();
        let configuration = builder.build().unwrap();

        assert!(configuration.is_mainline());
        assert_eq!(configuration.version_strategies(), vec![VersionStrategy::Mainline]);
        assert_eq!(
            configuration.branch_defaults.deployment_mode,
            Some(DeploymentMode::ContinuousDelivery)
        );
    }

    #[test]
    fn test_cli_overrides_layer_last() {
        let table = ConfigurationBuilder::parse_cli_overrides(&[
            "next-version=2.0.0".to_string(),
            "branches.main.increment=\"Minor\"".to_string(),
            "workflow=GitHubFlow/v1".to_string(),
        ])
        .unwrap();

        let mut builder = ConfigurationBuilder::new();
        builder.add_override_str("next-version = \"1.0.0\"").unwrap();
        builder.add_override_table(table).unwrap();
        let configuration = builder.build().unwrap();

        assert_eq!(configuration.next_version.as_deref(), Some("2.0.0"));
        assert_eq!(configuration.workflow.as_deref(), Some(defaults::GITHUB_FLOW));
        assert!(configuration.branch("develop").is_none());
        assert_eq!(
            configuration.branch("main").unwrap().increment,
            Some(IncrementStrategy::Minor)
        );
    }

    #[test]
    fn test_cli_override_without_equals_is_rejected() {
        assert!(ConfigurationBuilder::parse_cli_overrides(&["next-version".to_string()]).is_err());
    }

    #[test]
    fn test_invalid_next_version_is_rejected() {
        let mut builder = ConfigurationBuilder::new();
        builder.add_override_str("next-version = \"banana\"").unwrap();
        assert!(builder.build().is_err());
    }
}
