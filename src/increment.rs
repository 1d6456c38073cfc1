//! Increment determination from branch configuration and `+semver:` messages

use crate::config::{CommitMessageIncrementMode, EffectiveConfiguration};
use crate::domain::VersionField;
use crate::error::Result;
use crate::git::Commit;
use crate::graph::RepositoryStore;
use git2::Oid;

/// Highest increment requested by the given messages
///
/// `Some(VersionField::None)` means a `none|skip` message was found, which
/// overrides every other match.
pub fn increment_from_messages<'c, I>(commits: I, configuration: &EffectiveConfiguration) -> Option<VersionField>
where
    I: IntoIterator<Item = &'c Commit>,
{
    let mut highest: Option<VersionField> = None;
    for commit in commits {
        let message = commit.message.as_str();
        if configuration.no_bump_message.is_match(message) {
            return Some(VersionField::None);
        }
        let field = if configuration.major_version_bump_message.is_match(message) {
            VersionField::Major
        } else if configuration.minor_version_bump_message.is_match(message) {
            VersionField::Minor
        } else if configuration.patch_version_bump_message.is_match(message) {
            VersionField::Patch
        } else {
            continue;
        };
        highest = highest.max(Some(field));
    }
    highest
}

/// Combine the configured increment with a message-driven one
pub fn combine(configured: VersionField, from_messages: Option<VersionField>) -> VersionField {
    match from_messages {
        Some(VersionField::None) => VersionField::None,
        Some(field) => field.max(configured),
        None => configured,
    }
}

pub struct IncrementStrategyFinder<'a, 'r> {
    store: &'a RepositoryStore<'r>,
}

impl<'a, 'r> IncrementStrategyFinder<'a, 'r> {
    pub fn new(store: &'a RepositoryStore<'r>) -> Self {
        IncrementStrategyFinder { store }
    }

    /// Message-driven increment over `(source, current]`, `None` when disabled or unmatched
    pub fn message_increment(
        &self,
        source: Option<Oid>,
        current: &Commit,
        configuration: &EffectiveConfiguration,
    ) -> Result<Option<VersionField>> {
        let commits = match configuration.commit_message_incrementing {
            CommitMessageIncrementMode::Disabled => return Ok(None),
            CommitMessageIncrementMode::Enabled => self.store.commits(current.id, source, false)?,
            CommitMessageIncrementMode::MergeMessageOnly => self
                .store
                .commits(current.id, source, true)?
                .into_iter()
                .filter(Commit::is_merge)
                .collect(),
        };
        Ok(increment_from_messages(&commits, configuration))
    }

    /// Final increment for a base version anchored at `source`
    pub fn determine_increment(
        &self,
        source: Option<Oid>,
        current: &Commit,
        configuration: &EffectiveConfiguration,
    ) -> Result<VersionField> {
        let from_messages = self.message_increment(source, current, configuration)?;
        let increment = combine(configuration.increment, from_messages);
        tracing::debug!(
            configured = %configuration.increment,
            messages = ?from_messages,
            increment = %increment,
            "Determined increment"
        );
        Ok(increment)
    }
}
