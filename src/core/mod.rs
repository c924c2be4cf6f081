//! Core data model shared across the selection pipeline.

pub mod types;

pub use types::{FileDiff, FileStatus, FunctionSpan, NabazRun, Scope, SkippedTest, TestRun};
