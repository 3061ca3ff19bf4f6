#![forbid(unsafe_code)]

//! lidsleep preferences core
//!
//! Keeps the list of sleep-inhibiting applications and the panel switches in
//! sync with the settings store, without reacting to its own writes.

pub mod apps;
pub mod config;
pub mod constants;
pub mod error;
pub mod rules;
pub mod sync;
pub mod toggles;
pub mod view;
pub mod watcher;

pub use config::{ConfigStore, JsonFileStore, MemoryStore, Settings};
pub use error::RuleError;
pub use rules::{RuleEntry, RuleListModel};
pub use sync::{AddOutcome, SyncController, SyncState};
pub use toggles::{ToggleFlag, ToggleFlags};
