//! Mainline versioning
//!
//! Replays the first-parent history of the main branch from the root,
//! applying an increment at every commit that asks for one. Tags are
//! checkpoints: the version jumps to the tag and counting restarts. For any
//! other branch the main history is replayed up to the fork point and the
//! branch's own commits are added on top, with the branch increment applied
//! once.

use crate::config::{CommitMessageIncrementMode, EffectiveConfiguration};
use crate::context::GitVersionContext;
use crate::domain::{BuildMetaData, PreReleaseTag, SemanticVersion, VersionField};
use crate::error::{GitverError, Result};
use crate::git::{Branch, Commit};
use crate::increment::increment_from_messages;
use crate::resolver::EffectiveBranchConfiguration;
use crate::strategies::MergeMessage;
use git2::Oid;

/// Outcome of a mainline replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainlineVersion {
    /// Final version including pre-release and `commits_since_tag`
    pub version: SemanticVersion,
    /// Commit of the last applied increment or tag
    pub source: Option<Oid>,
    /// Commits since the last increment or tag, the evaluated one included
    pub count: u64,
    /// Commits after the last increment or tag
    pub commits_since_increment: u64,
}

#[derive(Debug, Default)]
struct State {
    version: SemanticVersion,
    source: Option<Oid>,
    count: u64,
    since: u64,
}

impl State {
    fn apply(&mut self, field: VersionField, commit: Oid) {
        if field == VersionField::None {
            self.count += 1;
            self.since += 1;
            return;
        }
        let next = self.version.increment(field);
        tracing::trace!(from = %self.version, to = %next, commit = %commit, "Mainline increment");
        self.version = next;
        self.source = Some(commit);
        self.count = 1;
        self.since = 0;
    }

    fn skip(&mut self) {
        self.count += 1;
        self.since += 1;
    }

    fn reset_to_tag(&mut self, tagged: &SemanticVersion, commit: Oid) {
        let mut tagged = tagged.clone();
        tagged.build_metadata = BuildMetaData::default();
        if tagged.compare_precedence(&self.version).is_gt() {
            self.version = tagged;
        }
        self.source = Some(commit);
        self.count = 0;
        self.since = 0;
    }
}

/// Message increment when one matched, otherwise the configured one
fn prefer(from_messages: Option<VersionField>, configured: VersionField) -> VersionField {
    from_messages.unwrap_or(configured)
}

pub struct MainlineVersionCalculator<'a, 'r> {
    context: &'a GitVersionContext<'r>,
}

impl<'a, 'r> MainlineVersionCalculator<'a, 'r> {
    pub fn new(context: &'a GitVersionContext<'r>) -> Self {
        MainlineVersionCalculator { context }
    }

    pub fn find_mainline_version(
        &self,
        branch: &EffectiveBranchConfiguration,
    ) -> Result<MainlineVersion> {
        let store = self.context.store();
        let current = &self.context.current_commit;

        let main = if branch.configuration.is_main_branch {
            branch.clone()
        } else {
            let main = self.find_main_branch(&branch.branch)?;
            (*self.context.effective_configuration(&main)?).clone()
        };

        let (main_commits, branch_commits) = if branch.configuration.is_main_branch {
            (oldest_first(store.commits(current.id, None, true)?), Vec::new())
        } else {
            match store.find_merge_base(&branch.branch, &main.branch)? {
                Some(base) => (
                    oldest_first(store.commits(base, None, true)?),
                    oldest_first(store.commits(current.id, Some(base), true)?),
                ),
                None => (Vec::new(), oldest_first(store.commits(current.id, None, true)?)),
            }
        };

        let mut state = State::default();
        let main_label = main.label(None);
        for commit in &main_commits {
            if let Some(tagged) = self.tag_on(commit, &main.configuration, &main_label)? {
                state.reset_to_tag(&tagged, commit.id);
                continue;
            }
            let increment = self.main_increment(commit, &main)?;
            state.apply(increment, commit.id);
        }

        let label = branch.label(None);
        if !branch_commits.is_empty() {
            let configuration = &branch.configuration;
            let from_messages = match configuration.commit_message_incrementing {
                CommitMessageIncrementMode::Enabled => increment_from_messages(&branch_commits, configuration),
                _ => None,
            };
            let increment = prefer(from_messages, configuration.increment);

            let mut pending = true;
            for commit in &branch_commits {
                if let Some(tagged) = self.tag_on(commit, configuration, &label)? {
                    state.reset_to_tag(&tagged, commit.id);
                    pending = true;
                } else if pending {
                    state.apply(increment, commit.id);
                    pending = false;
                } else {
                    state.skip();
                }
            }
        }

        tracing::debug!(
            version = %state.version,
            count = state.count,
            since = state.since,
            "Mainline replay finished"
        );

        let mut version = state.version.clone();
        if state.count > 0 {
            version.pre_release_tag = PreReleaseTag::new(label, Some(state.count));
        }
        version.build_metadata.commits_since_tag = Some(state.since);

        Ok(MainlineVersion {
            version,
            source: state.source,
            count: state.count,
            commits_since_increment: state.since,
        })
    }

    fn find_main_branch(&self, branch: &Branch) -> Result<Branch> {
        let store = self.context.store();
        let declared = store
            .configuration()
            .branches
            .iter()
            .any(|(_, configuration)| configuration.is_main_branch());
        if !declared {
            return Err(GitverError::config(
                "Mainline versioning needs a branch configuration with is-main-branch = true",
            ));
        }

        let mut best: Option<(Branch, Commit)> = None;
        for main in store.main_branches()? {
            let Some(base) = store.find_merge_base(branch, &main)? else {
                continue;
            };
            let base = store.find_commit(base)?;
            if best.as_ref().map_or(true, |(_, current)| base.when > current.when) {
                best = Some((main, base));
            }
        }

        best.map(|(main, _)| main).ok_or_else(|| {
            GitverError::config(format!(
                "No main branch could be found for '{}'. Mainline versioning needs a local \
                 branch matching a configuration with is-main-branch = true",
                branch.name
            ))
        })
    }

    fn tag_on(
        &self,
        commit: &Commit,
        configuration: &EffectiveConfiguration,
        label: &str,
    ) -> Result<Option<SemanticVersion>> {
        if configuration.ignore.is_ignored(commit) {
            return Ok(None);
        }
        let index = self
            .context
            .tags()
            .all_tagged(self.context.store(), configuration)?;
        Ok(index.get(&commit.id).and_then(|versions| {
            versions
                .iter()
                .find(|v| v.value.pre_release_tag.is_match_for_label(label))
                .map(|v| v.value.clone())
        }))
    }

    /// Increment applied by one commit on the main branch
    fn main_increment(&self, commit: &Commit, main: &EffectiveBranchConfiguration) -> Result<VersionField> {
        let configuration = &main.configuration;
        let mode = configuration.commit_message_incrementing;

        if !commit.is_merge() {
            let from_messages = match mode {
                CommitMessageIncrementMode::Enabled => {
                    increment_from_messages(std::iter::once(commit), configuration)
                }
                _ => None,
            };
            return Ok(prefer(from_messages, configuration.increment));
        }

        let store = self.context.store();
        let merged_increment = MergeMessage::parse(&commit.message, &configuration.merge_message_formats)
            .map(|message| {
                let matched = store
                    .matcher()
                    .resolve(store.configuration(), &message.merged_branch);
                matched
                    .configuration
                    .increment
                    .and_then(|increment| increment.to_version_field())
                    .unwrap_or(configuration.increment)
            })
            .unwrap_or(configuration.increment);

        let from_messages = match mode {
            CommitMessageIncrementMode::Disabled => None,
            _ => {
                let merged = store.commits(commit.id, Some(commit.parents[0]), false)?;
                increment_from_messages(&merged, configuration)
            }
        };
        Ok(prefer(from_messages, merged_increment))
    }
}

fn oldest_first(mut commits: Vec<Commit>) -> Vec<Commit> {
    commits.reverse();
    commits
}
