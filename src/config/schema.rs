//! Persisted settings schema
//!
//! Four keys, serialized with their schema names (`inhibit-apps`, ...).
//! Missing keys take the schema default so older or hand-written files
//! load without complaint.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::constants::keys;

/// Snapshot of every persisted key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Application IDs with an active inhibit rule, in insertion order
    #[serde(default)]
    pub inhibit_apps: Vec<String>,

    #[serde(default = "default_show_indicator")]
    pub show_indicator: bool,

    #[serde(default = "default_restore_state")]
    pub restore_state: bool,

    #[serde(default = "default_show_notifications")]
    pub show_notifications: bool,
}

fn default_show_indicator() -> bool {
    true
}

fn default_restore_state() -> bool {
    false
}

fn default_show_notifications() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            inhibit_apps: Vec::new(),
            show_indicator: default_show_indicator(),
            restore_state: default_restore_state(),
            show_notifications: default_show_notifications(),
        }
    }
}

impl Settings {
    fn bool_slot(&self, key: &str) -> Result<&bool> {
        match key {
            keys::SHOW_INDICATOR => Ok(&self.show_indicator),
            keys::RESTORE_STATE => Ok(&self.restore_state),
            keys::SHOW_NOTIFICATIONS => Ok(&self.show_notifications),
            keys::INHIBIT_APPS => bail!("key '{key}' holds a string list, not a boolean"),
            _ => bail!("unknown settings key '{key}'"),
        }
    }

    fn bool_slot_mut(&mut self, key: &str) -> Result<&mut bool> {
        match key {
            keys::SHOW_INDICATOR => Ok(&mut self.show_indicator),
            keys::RESTORE_STATE => Ok(&mut self.restore_state),
            keys::SHOW_NOTIFICATIONS => Ok(&mut self.show_notifications),
            keys::INHIBIT_APPS => bail!("key '{key}' holds a string list, not a boolean"),
            _ => bail!("unknown settings key '{key}'"),
        }
    }

    fn list_slot_mut(&mut self, key: &str) -> Result<&mut Vec<String>> {
        match key {
            keys::INHIBIT_APPS => Ok(&mut self.inhibit_apps),
            keys::SHOW_INDICATOR | keys::RESTORE_STATE | keys::SHOW_NOTIFICATIONS => {
                bail!("key '{key}' holds a boolean, not a string list")
            }
            _ => bail!("unknown settings key '{key}'"),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.bool_slot(key).copied()
    }

    /// Store a boolean, returning whether the value changed
    pub fn set_bool(&mut self, key: &str, value: bool) -> Result<bool> {
        let slot = self.bool_slot_mut(key)?;
        let changed = *slot != value;
        *slot = value;
        Ok(changed)
    }

    pub fn get_string_list(&self, key: &str) -> Result<Vec<String>> {
        match key {
            keys::INHIBIT_APPS => Ok(self.inhibit_apps.clone()),
            keys::SHOW_INDICATOR | keys::RESTORE_STATE | keys::SHOW_NOTIFICATIONS => {
                bail!("key '{key}' holds a boolean, not a string list")
            }
            _ => bail!("unknown settings key '{key}'"),
        }
    }

    /// Store a string list, returning whether the value changed
    pub fn set_string_list(&mut self, key: &str, value: &[String]) -> Result<bool> {
        let slot = self.list_slot_mut(key)?;
        let changed = slot.as_slice() != value;
        if changed {
            *slot = value.to_vec();
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let settings: Settings = serde_json::from_str(r#"{ "restore-state": true }"#).unwrap();

        assert!(settings.inhibit_apps.is_empty());
        assert!(settings.show_indicator);
        assert!(settings.restore_state);
        assert!(settings.show_notifications);
    }

    #[test]
    fn test_serializes_with_schema_key_names() {
        let settings = Settings {
            inhibit_apps: vec!["firefox.desktop".to_string()],
            ..Settings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();

        assert!(json.contains("\"inhibit-apps\":[\"firefox.desktop\"]"));
        assert!(json.contains("\"show-indicator\":true"));
        assert!(json.contains("\"restore-state\":false"));
        assert!(json.contains("\"show-notifications\":true"));
    }

    #[test]
    fn test_set_bool_reports_change() {
        let mut settings = Settings::default();

        assert!(!settings.set_bool(keys::SHOW_INDICATOR, true).unwrap());
        assert!(settings.set_bool(keys::SHOW_INDICATOR, false).unwrap());
        assert!(!settings.get_bool(keys::SHOW_INDICATOR).unwrap());
    }

    #[test]
    fn test_set_string_list_reports_change() {
        let mut settings = Settings::default();
        let apps = vec!["a.desktop".to_string(), "b.desktop".to_string()];

        assert!(settings.set_string_list(keys::INHIBIT_APPS, &apps).unwrap());
        assert!(!settings.set_string_list(keys::INHIBIT_APPS, &apps).unwrap());
        assert_eq!(settings.get_string_list(keys::INHIBIT_APPS).unwrap(), apps);
    }

    #[test]
    fn test_wrong_type_and_unknown_keys_rejected() {
        let mut settings = Settings::default();

        assert!(settings.get_bool(keys::INHIBIT_APPS).is_err());
        assert!(settings.get_string_list(keys::SHOW_INDICATOR).is_err());
        assert!(settings.set_bool("no-such-key", true).is_err());
        assert!(settings.set_string_list("no-such-key", &[]).is_err());
    }
}
