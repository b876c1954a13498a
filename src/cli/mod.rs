//! Command line support shared by the binary and its tests

pub mod orchestration;
