//! Source control: working-tree access and commit history.

pub mod code;
pub mod history;

pub use code::CodeDirectory;
pub use history::{GitHistory, LocalGitHistory};
