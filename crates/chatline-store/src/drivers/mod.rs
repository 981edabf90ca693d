//! Bundled drivers

pub mod fs;
pub mod memory;

pub use fs::FsConnector;
pub use memory::MemoryStore;
