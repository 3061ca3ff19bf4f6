//! Settings persistence for the preferences panel
//!
//! This module provides:
//! - **schema**: the four persisted keys and their defaults
//! - **store**: the `ConfigStore` seam plus an in-memory implementation
//! - **file_store**: the JSON file-backed store used by the CLI

pub mod file_store;
pub mod schema;
pub mod store;

// Re-export commonly used types
pub use file_store::JsonFileStore;
pub use schema::Settings;
pub use store::{ConfigStore, MemoryStore, StoreChanged};
