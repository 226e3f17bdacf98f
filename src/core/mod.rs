pub mod container;
pub mod defaults;
pub mod error;
pub mod git;
pub mod github;
pub mod jenkins;
pub mod keychain;
pub mod paths;
pub mod pipeline;
pub mod scaffold;
pub mod terraform;
pub mod tools;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
