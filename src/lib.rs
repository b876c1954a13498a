pub mod analyzer;
pub mod changelog;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod git;
pub mod graph;
pub mod manifest;
pub mod split;
pub mod ui;
pub mod warnings;

pub use engine::{ReleaseCandidate, ReleaseEngine, ReleasePlan};
pub use error::{ReleasePlanError, Result};
