//! Commit-graph queries shared by the strategies
//!
//! - [merge_base::MergeBaseFinder]: merge-base with forward-merge correction
//! - [store::RepositoryStore]: branch lookups and memoized history walks

pub mod merge_base;
pub mod store;

pub use merge_base::MergeBaseFinder;
pub use store::RepositoryStore;
