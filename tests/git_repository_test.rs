// tests/git_repository_test.rs
use git2::{Oid, Repository as Git2Repo, Signature};
use gitver::{CalculationOptions, ConfigurationBuilder, Git2Repository, GitVersionCalculator};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// Helper function to create a test repository
fn setup_test_repo() -> (TempDir, Git2Repo) {
    let temp_dir = TempDir::new().unwrap();
    let repo = Git2Repo::init(temp_dir.path()).unwrap();
    // independent of init.defaultBranch
    repo.set_head("refs/heads/main").unwrap();

    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();

    (temp_dir, repo)
}

fn commit(repo: &Git2Repo, dir: &Path, content: &str, message: &str) -> Oid {
    fs::write(dir.join("CHANGELOG.md"), content).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new("CHANGELOG.md")).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let signature = Signature::now("Test User", "test@example.com").unwrap();
    let parent = repo
        .head()
        .ok()
        .and_then(|head| head.target())
        .map(|oid| repo.find_commit(oid).unwrap());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .unwrap()
}

#[test]
fn test_version_from_real_repository() {
    let (temp_dir, repo) = setup_test_repo();
    let first = commit(&repo, temp_dir.path(), "one\n", "Initial commit");
    repo.tag_lightweight("v1.0.0", &repo.find_object(first, None).unwrap(), false)
        .unwrap();
    let second = commit(&repo, temp_dir.path(), "two\n", "Fix parser");

    let repository = Git2Repository::from_git2(repo);
    let configuration = ConfigurationBuilder::new().build().unwrap();
    let variables = GitVersionCalculator::new(&repository, configuration)
        .calculate()
        .unwrap();

    assert_eq!(variables.full_sem_ver, "1.0.1+1");
    assert_eq!(variables.sha, second.to_string());
    assert_eq!(variables.short_sha, second.to_string()[..7].to_string());
    assert_eq!(variables.version_source_sha, first.to_string());
    assert_eq!(variables.uncommitted_changes, 0);
}

#[test]
fn test_annotated_tag_on_head_is_exact() {
    let (temp_dir, repo) = setup_test_repo();
    let first = commit(&repo, temp_dir.path(), "one\n", "Initial commit");
    let signature = Signature::now("Test User", "test@example.com").unwrap();
    repo.tag(
        "v2.3.4",
        &repo.find_object(first, None).unwrap(),
        &signature,
        "Release 2.3.4",
        false,
    )
    .unwrap();

    let repository = Git2Repository::from_git2(repo);
    let configuration = ConfigurationBuilder::new().build().unwrap();
    let variables = GitVersionCalculator::new(&repository, configuration)
        .calculate()
        .unwrap();

    assert_eq!(variables.full_sem_ver, "2.3.4");
}

#[test]
fn test_explicit_commit_and_open_by_path() {
    let (temp_dir, repo) = setup_test_repo();
    let first = commit(&repo, temp_dir.path(), "one\n", "Initial commit");
    commit(&repo, temp_dir.path(), "two\n", "Second commit");
    let branch = repo.head().unwrap().shorthand().unwrap().to_string();
    drop(repo);

    let repository = Git2Repository::open(temp_dir.path()).unwrap();
    let configuration = ConfigurationBuilder::new().build().unwrap();
    let options = CalculationOptions {
        target_branch: Some(branch),
        target_commit: Some(first.to_string()),
    };
    let variables = GitVersionCalculator::new(&repository, configuration)
        .with_options(options)
        .calculate()
        .unwrap();

    assert_eq!(variables.full_sem_ver, "0.0.1+1");
    assert_eq!(variables.sha, first.to_string());
}

#[test]
fn test_untracked_file_counts_as_uncommitted_change() {
    let (temp_dir, repo) = setup_test_repo();
    commit(&repo, temp_dir.path(), "one\n", "Initial commit");
    fs::write(temp_dir.path().join("notes.txt"), "draft\n").unwrap();

    let repository = Git2Repository::from_git2(repo);
    let configuration = ConfigurationBuilder::new().build().unwrap();
    let variables = GitVersionCalculator::new(&repository, configuration)
        .calculate()
        .unwrap();

    assert_eq!(variables.uncommitted_changes, 1);
    assert_eq!(variables.full_sem_ver, "0.0.1+1");
}
