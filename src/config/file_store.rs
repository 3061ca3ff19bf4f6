//! JSON file-backed settings store
//!
//! Keeps an in-process cache of [`Settings`] and writes the whole file on
//! every changing set. Edits made by other processes are picked up through
//! [`JsonFileStore::reload_from_disk`].

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use tracing::{debug, info};

use super::schema::Settings;
use super::store::{ChangeHub, ConfigStore, StoreChanged};
use crate::constants;

pub struct JsonFileStore {
    path: PathBuf,
    settings: Settings,
    hub: ChangeHub,
}

impl JsonFileStore {
    /// Default settings path: `$LIDSLEEP_SETTINGS`, else `<config dir>/lidsleep/settings.json`
    pub fn default_path() -> PathBuf {
        if let Some(path) = std::env::var_os(constants::config::PATH_ENV)
            && !path.is_empty()
        {
            return PathBuf::from(path);
        }

        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(constants::config::APP_DIR);
        path.push(constants::config::FILENAME);
        path
    }

    /// Open the store at `path`; a missing file yields schema defaults
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = Self::read(&path)?.unwrap_or_else(|| {
            info!(path = %path.display(), "Settings file not found, using defaults");
            Settings::default()
        });

        Ok(Self {
            path,
            settings,
            hub: ChangeHub::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> Result<Option<Settings>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings JSON from {}", path.display()))?;
        Ok(Some(settings))
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings)
            .context("Failed to serialize settings to JSON")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))?;

        debug!(path = %self.path.display(), "Saved settings");
        Ok(())
    }

    /// Apply `update` to a copy of the cache and persist it if it changed.
    /// The cache is only replaced once the file write succeeded.
    fn write_with<F>(&mut self, update: F) -> Result<()>
    where
        F: FnOnce(&mut Settings) -> Result<bool>,
    {
        let previous = self.settings.clone();
        if !update(&mut self.settings)? {
            return Ok(());
        }

        if let Err(err) = self.save() {
            self.settings = previous;
            return Err(err);
        }

        self.hub.emit();
        Ok(())
    }

    /// Re-read the file, emitting one change notification if it differs
    /// from the cache. A deleted file counts as "back to defaults".
    pub fn reload_from_disk(&mut self) -> Result<bool> {
        let on_disk = Self::read(&self.path)?.unwrap_or_default();
        if on_disk == self.settings {
            debug!(path = %self.path.display(), "Settings file unchanged");
            return Ok(false);
        }

        info!(path = %self.path.display(), "Settings file changed externally");
        self.settings = on_disk;
        self.hub.emit();
        Ok(true)
    }
}

impl ConfigStore for JsonFileStore {
    fn get_bool(&self, key: &str) -> Result<bool> {
        self.settings.get_bool(key)
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<()> {
        self.write_with(|settings| settings.set_bool(key, value))
            .with_context(|| format!("Failed to set '{key}'"))
    }

    fn get_string_list(&self, key: &str) -> Result<Vec<String>> {
        self.settings.get_string_list(key)
    }

    fn set_string_list(&mut self, key: &str, value: &[String]) -> Result<()> {
        self.write_with(|settings| settings.set_string_list(key, value))
            .with_context(|| format!("Failed to set '{key}'"))
    }

    fn subscribe(&mut self) -> Receiver<StoreChanged> {
        self.hub.subscribe()
    }
}
