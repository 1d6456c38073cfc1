// tests/config_test.rs
use gitver::config::{load_configuration, DeploymentMode, IncrementStrategy, VersionStrategy};
use gitver::{ConfigurationBuilder, GitverError};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_from_working_directory() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("gitver.toml"),
        r#"
tag-prefix = "release-"
next-version = "3.0"

[branches.develop]
label = "dev"
"#,
    )
    .unwrap();

    let file = load_configuration(None, temp_dir.path()).unwrap().unwrap();
    let mut builder = ConfigurationBuilder::new();
    builder.add_override(file);
    let config = builder.build().unwrap();

    assert_eq!(config.tag_prefix.as_deref(), Some("release-"));
    assert_eq!(config.next_version.as_deref(), Some("3.0"));
    let develop = config.branch("develop").unwrap();
    assert_eq!(develop.label.as_deref(), Some("dev"));
    assert_eq!(develop.increment, Some(IncrementStrategy::Minor));
}

#[test]
fn test_explicit_path_must_exist() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.toml");

    let result = load_configuration(Some(missing.as_path()), temp_dir.path());
    assert!(result.is_err());
}

#[test]
fn test_parse_error_names_the_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    fs::write(&path, "tag-prefix = [").unwrap();

    let error = load_configuration(Some(path.as_path()), temp_dir.path()).unwrap_err();
    assert!(error.to_string().contains("broken.toml"));
}

#[test]
fn test_github_flow_has_no_develop() {
    let mut builder = ConfigurationBuilder::new();
    builder.add_override_str("workflow = \"GitHubFlow/v1\"").unwrap();
    let config = builder.build().unwrap();

    assert!(config.branch("develop").is_none());
    assert!(config.branch("main").is_some());
    assert!(config.branch("feature").is_some());
}

#[test]
fn test_command_line_overrides_win() {
    let table = ConfigurationBuilder::parse_cli_overrides(&[
        "branches.main.label=rc".to_string(),
        "next-version=2.0.0".to_string(),
        "branches.develop.pre-release-weight=10".to_string(),
    ])
    .unwrap();

    let mut builder = ConfigurationBuilder::new();
    builder.add_override_str("next-version = \"1.0.0\"").unwrap();
    builder.add_override_table(table).unwrap();
    let config = builder.build().unwrap();

    assert_eq!(config.next_version.as_deref(), Some("2.0.0"));
    assert_eq!(config.branch("main").unwrap().label.as_deref(), Some("rc"));
    assert_eq!(config.branch("develop").unwrap().pre_release_weight, Some(10));
}

#[test]
fn test_mainline_switches_strategies() {
    let mut builder = ConfigurationBuilder::new();
    builder.add_override_str("deployment-mode = \"Mainline\"").unwrap();
    let config = builder.build().unwrap();

    assert!(config.is_mainline());
    assert!(config.version_strategies().contains(&VersionStrategy::Mainline));
    assert_eq!(
        config.branch_defaults.deployment_mode,
        Some(DeploymentMode::ContinuousDelivery)
    );
}

#[test]
fn test_mainline_on_branch_is_rejected() {
    let mut builder = ConfigurationBuilder::new();
    builder
        .add_override_str("[branches.develop]\ndeployment-mode = \"Mainline\"")
        .unwrap();

    match builder.build() {
        Err(GitverError::Configuration(message)) => assert!(message.contains("top level")),
        other => panic!("expected a configuration error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_undeclared_source_branch_is_rejected() {
    let mut builder = ConfigurationBuilder::new();
    builder
        .add_override_str("[branches.feature]\nsource-branches = [\"trunk\"]")
        .unwrap();

    assert!(matches!(builder.build(), Err(GitverError::Configuration(_))));
}
