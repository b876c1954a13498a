//! Version bump resolution for the commits assigned to a component

pub mod version_analyzer;

pub use version_analyzer::VersionAnalyzer;
