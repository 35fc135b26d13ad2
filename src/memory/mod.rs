//! In-memory implementations of the collaborator traits
//!
//! They are useful for tests, for the `courier` tool, and as a reference for other backends.

mod tree;
pub use tree::{MemoryTree, Node};
mod directory;
pub use directory::MemoryDirectory;
