//! Deterministic semantic versions from git history
//!
//! The engine reads a repository through the [git::Repository] trait,
//! matches the current branch against the configured branch rules, collects
//! candidate base versions from several strategies and formats the winner
//! into a [output::VersionVariables] map.

pub mod cache;
pub mod calculator;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod git;
pub mod graph;
pub mod increment;
pub mod logging;
pub mod mainline;
pub mod output;
pub mod resolver;
pub mod strategies;
pub mod tags;

pub use calculator::{GitVersionCalculator, NextVersion, NextVersionCalculator};
pub use config::{ConfigurationBuilder, GitVersionConfiguration};
pub use context::{CalculationOptions, GitVersionContext};
pub use domain::{SemanticVersion, SemanticVersionFormat, VersionField, VersionFormat};
pub use error::{GitverError, Result};
pub use git::{Git2Repository, MockRepository, Repository};
pub use output::VersionVariables;
