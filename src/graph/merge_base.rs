use crate::cache::Memo;
use crate::error::Result;
use crate::git::{Branch, Repository};
use git2::Oid;

type MergeBaseKey = (String, Oid, String, Oid);

/// Finds where two branches diverged
///
/// A plain merge-base is wrong when the other branch forward-merged our
/// history: the merge base then points at the commit that was merged across
/// instead of the original fork point. Such merges are looked through until
/// the result stops moving.
pub struct MergeBaseFinder<'r> {
    repository: &'r dyn Repository,
    cache: Memo<MergeBaseKey, Option<Oid>>,
}

impl<'r> MergeBaseFinder<'r> {
    pub fn new(repository: &'r dyn Repository) -> Self {
        MergeBaseFinder {
            repository,
            cache: Memo::new("merge-base"),
        }
    }

    /// Merge base of `branch` relative to `other`
    ///
    /// The arguments are not interchangeable, so results are cached per
    /// ordered pair.
    pub fn find_merge_base(&self, branch: &Branch, other: &Branch) -> Result<Option<Oid>> {
        let (Some(tip), Some(other_tip)) = (branch.tip, other.tip) else {
            return Ok(None);
        };
        let key = (branch.name.clone(), tip, other.name.clone(), other_tip);
        let base = self
            .cache
            .get_or_try_insert_with(&key, || self.compute(tip, other_tip))?;

        if let Some(base) = *base {
            tracing::debug!(
                branch = %branch.name,
                other = %other.name,
                merge_base = %base,
                "Found merge base"
            );
        }
        Ok(*base)
    }

    /// Merge base of two commits with forward merges looked through
    pub fn find_commit_merge_base(&self, tip: Oid, other_tip: Oid) -> Result<Option<Oid>> {
        self.compute(tip, other_tip)
    }

    fn compute(&self, tip: Oid, other_tip: Oid) -> Result<Option<Oid>> {
        let mut other = other_tip;

        // `other` is the merge of our tip: look at what it was before the merge
        let other_commit = self.repository.find_commit(other_tip)?;
        if other_commit.parents.iter().skip(1).any(|parent| *parent == tip) {
            other = other_commit.parents[0];
        }

        let Some(mut base) = self.repository.merge_base(tip, other)? else {
            return Ok(None);
        };

        let limit = self.repository.commits(tip, None, false)?.len().max(1);
        for _ in 0..limit {
            let Some(forward_merge) = self.find_forward_merge(other, base)? else {
                break;
            };
            let Some(before_merge) = forward_merge
                .parents
                .iter()
                .copied()
                .find(|parent| *parent != base)
            else {
                break;
            };

            match self.repository.merge_base(tip, before_merge)? {
                Some(next) if next != base => {
                    tracing::debug!(
                        forward_merge = %forward_merge.short_sha(),
                        previous = %base,
                        next = %next,
                        "Merge base moved past forward merge"
                    );
                    base = next;
                    other = before_merge;
                }
                _ => break,
            }
        }

        Ok(Some(base))
    }

    /// First merge commit on `other` (after `base`) that has `base` as a parent
    fn find_forward_merge(&self, other: Oid, base: Oid) -> Result<Option<crate::git::Commit>> {
        Ok(self
            .repository
            .commits(other, Some(base), false)?
            .into_iter()
            .find(|commit| commit.is_merge() && commit.parents.contains(&base)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;

    fn branch(repo: &MockRepository, name: &str) -> Branch {
        Branch::local(name, repo.branch_tip(name).unwrap())
    }

    #[test]
    fn test_simple_fork_point() {
        let mut repo = MockRepository::new();
        let a = repo.make_commit("A");
        repo.create_branch("develop", "main");
        repo.commit_on("develop", "D1");
        repo.commit_on("main", "B");

        let finder = MergeBaseFinder::new(&repo);
        let base = finder
            .find_merge_base(&branch(&repo, "develop"), &branch(&repo, "main"))
            .unwrap();
        assert_eq!(base, Some(a));
    }

    #[test]
    fn test_merged_tip_looks_behind_the_merge() {
        let mut repo = MockRepository::new();
        let a = repo.make_commit("A");
        repo.create_branch("develop", "main");
        repo.commit_on("develop", "D1");
        repo.merge("develop", "main");

        let finder = MergeBaseFinder::new(&repo);
        let base = finder
            .find_merge_base(&branch(&repo, "develop"), &branch(&repo, "main"))
            .unwrap();
        assert_eq!(base, Some(a));
    }

    #[test]
    fn test_forward_merge_is_looked_through() {
        let mut repo = MockRepository::new();
        let a = repo.make_commit("A");
        repo.create_branch("develop", "main");
        repo.commit_on("develop", "D1");
        repo.commit_on("main", "B");
        // main is forward merged into develop
        repo.merge("main", "develop");

        let finder = MergeBaseFinder::new(&repo);
        let base = finder
            .find_merge_base(&branch(&repo, "main"), &branch(&repo, "develop"))
            .unwrap();
        assert_eq!(base, Some(a));
    }

    #[test]
    fn test_repeated_lookups_are_identical() {
        let mut repo = MockRepository::new();
        repo.make_commit("A");
        repo.create_branch("feature/x", "main");
        repo.commit_on("feature/x", "F1");
        repo.commit_on("main", "B");

        let finder = MergeBaseFinder::new(&repo);
        let feature = branch(&repo, "feature/x");
        let main = branch(&repo, "main");
        let first = finder.find_merge_base(&feature, &main).unwrap();
        let second = finder.find_merge_base(&feature, &main).unwrap();
        assert_eq!(first, second);
        assert_eq!(finder.cache.len(), 1);
    }

    #[test]
    fn test_unrelated_histories_have_no_merge_base() {
        let mut repo = MockRepository::new();
        repo.make_commit("A");
        repo.commit_on("orphan", "O");

        let finder = MergeBaseFinder::new(&repo);
        let base = finder
            .find_merge_base(&branch(&repo, "orphan"), &branch(&repo, "main"))
            .unwrap();
        assert_eq!(base, None);
    }
}
