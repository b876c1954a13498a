//! Domain logic - pure release rules independent of git and configuration files

pub mod commit;
pub mod component;
pub mod tag;
pub mod version;

pub use commit::{ConventionalCommit, Note, RawCommit, Reference};
pub use component::{CascadePolicy, Component, ComponentStrategy, FileUpdate, ReleasePolicy};
pub use tag::{TagFormat, TagName};
pub use version::{BumpLevel, VersionBump};
