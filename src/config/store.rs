//! Key/value store abstraction the preferences panel is bound to
//!
//! A store exposes typed get/set on named keys plus one undifferentiated
//! change stream. Notifications are pushed synchronously into each
//! subscriber's channel at the moment a write changes a value, so a writer
//! can find its own echo queued right after the write returns.

use anyhow::Result;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::debug;

use super::schema::Settings;

/// "Something in the store changed"; carries no key on purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreChanged;

/// Settings backend consumed by the sync controller
pub trait ConfigStore {
    fn get_bool(&self, key: &str) -> Result<bool>;
    fn set_bool(&mut self, key: &str, value: bool) -> Result<()>;
    fn get_string_list(&self, key: &str) -> Result<Vec<String>>;
    fn set_string_list(&mut self, key: &str, value: &[String]) -> Result<()>;

    /// Register a new listener on the change stream
    fn subscribe(&mut self) -> Receiver<StoreChanged>;
}

/// Fan-out of change notifications to every live subscriber
#[derive(Debug, Default)]
pub struct ChangeHub {
    subscribers: Vec<Sender<StoreChanged>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<StoreChanged> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Notify everyone; subscribers whose receiver was dropped are pruned
    pub fn emit(&mut self) {
        self.subscribers.retain(|tx| tx.send(StoreChanged).is_ok());
        debug!(subscribers = self.subscribers.len(), "Emitted store change notification");
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// In-process store with no persistence
#[derive(Debug, Default)]
pub struct MemoryStore {
    settings: Settings,
    hub: ChangeHub,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            hub: ChangeHub::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl ConfigStore for MemoryStore {
    fn get_bool(&self, key: &str) -> Result<bool> {
        self.settings.get_bool(key)
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<()> {
        if self.settings.set_bool(key, value)? {
            self.hub.emit();
        }
        Ok(())
    }

    fn get_string_list(&self, key: &str) -> Result<Vec<String>> {
        self.settings.get_string_list(key)
    }

    fn set_string_list(&mut self, key: &str, value: &[String]) -> Result<()> {
        if self.settings.set_string_list(key, value)? {
            self.hub.emit();
        }
        Ok(())
    }

    fn subscribe(&mut self) -> Receiver<StoreChanged> {
        self.hub.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::keys;

    #[test]
    fn test_write_notifies_every_subscriber() {
        let mut store = MemoryStore::new();
        let first = store.subscribe();
        let second = store.subscribe();

        store.set_bool(keys::SHOW_INDICATOR, false).unwrap();

        assert_eq!(first.try_recv(), Ok(StoreChanged));
        assert_eq!(second.try_recv(), Ok(StoreChanged));
        assert!(first.try_recv().is_err());
    }

    #[test]
    fn test_unchanged_write_is_silent() {
        let mut store = MemoryStore::new();
        let changes = store.subscribe();

        store.set_bool(keys::SHOW_INDICATOR, true).unwrap();
        store.set_string_list(keys::INHIBIT_APPS, &[]).unwrap();

        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscriber_pruned() {
        let mut hub = ChangeHub::new();
        let kept = hub.subscribe();
        drop(hub.subscribe());

        hub.emit();

        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(kept.try_recv(), Ok(StoreChanged));
    }

    #[test]
    fn test_failed_write_leaves_store_untouched() {
        let mut store = MemoryStore::new();
        let changes = store.subscribe();

        assert!(store.set_string_list(keys::SHOW_INDICATOR, &["x".to_string()]).is_err());
        assert!(changes.try_recv().is_err());
        assert_eq!(store.settings(), &Settings::default());
    }
}
