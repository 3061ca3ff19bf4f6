//! Boolean switches mirrored 1:1 from the store
//!
//! Unlike the rule list these need no suppression: a concurrent external
//! change and a local write to the same scalar cannot leave anything
//! structurally inconsistent, the last write simply wins.

use anyhow::Result;
use clap::ValueEnum;
use tracing::info;

use crate::config::ConfigStore;
use crate::constants::keys;
use crate::view::ToggleObserver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ToggleFlag {
    ShowIndicator,
    RestoreState,
    ShowNotifications,
}

impl ToggleFlag {
    pub const ALL: [ToggleFlag; 3] = [
        ToggleFlag::ShowIndicator,
        ToggleFlag::RestoreState,
        ToggleFlag::ShowNotifications,
    ];

    /// Store key backing this switch
    pub fn key(self) -> &'static str {
        match self {
            ToggleFlag::ShowIndicator => keys::SHOW_INDICATOR,
            ToggleFlag::RestoreState => keys::RESTORE_STATE,
            ToggleFlag::ShowNotifications => keys::SHOW_NOTIFICATIONS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ToggleFlag::ShowIndicator => "Show Lidsleep in top panel",
            ToggleFlag::RestoreState => "Restore state across reboots",
            ToggleFlag::ShowNotifications => "Enable notifications",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Last value shown by each switch (`None` until the first refresh)
#[derive(Debug, Default)]
pub struct ToggleFlags {
    displayed: [Option<bool>; 3],
}

impl ToggleFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn displayed(&self, flag: ToggleFlag) -> Option<bool> {
        self.displayed[flag.index()]
    }

    /// Re-read every key and push the values whose display changes.
    /// Returns the flags that were updated.
    pub fn refresh<S, V>(&mut self, store: &S, view: &mut V) -> Result<Vec<ToggleFlag>>
    where
        S: ConfigStore + ?Sized,
        V: ToggleObserver + ?Sized,
    {
        let mut updated = Vec::new();
        for flag in ToggleFlag::ALL {
            let value = store.get_bool(flag.key())?;
            if self.displayed[flag.index()] != Some(value) {
                self.displayed[flag.index()] = Some(value);
                view.on_toggle(flag, value);
                updated.push(flag);
            }
        }
        Ok(updated)
    }

    /// User flipped a switch: write straight through to the store
    pub fn set<S>(&mut self, store: &mut S, flag: ToggleFlag, value: bool) -> Result<()>
    where
        S: ConfigStore + ?Sized,
    {
        store.set_bool(flag.key(), value)?;
        self.displayed[flag.index()] = Some(value);
        info!(key = flag.key(), value, "Updated toggle");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryStore;
    use crate::view::RecordingView;

    #[test]
    fn test_first_refresh_reports_every_flag() {
        let store = MemoryStore::new();
        let mut toggles = ToggleFlags::new();
        let mut view = RecordingView::default();

        let updated = toggles.refresh(&store, &mut view).unwrap();

        assert_eq!(updated, ToggleFlag::ALL.to_vec());
        assert_eq!(
            view.toggle_events,
            vec![
                (ToggleFlag::ShowIndicator, true),
                (ToggleFlag::RestoreState, false),
                (ToggleFlag::ShowNotifications, true),
            ]
        );
    }

    #[test]
    fn test_refresh_touches_only_changed_flag() {
        let mut store = MemoryStore::new();
        let mut toggles = ToggleFlags::new();
        let mut view = RecordingView::default();
        toggles.refresh(&store, &mut view).unwrap();
        view.clear_events();

        store.set_bool(keys::SHOW_INDICATOR, false).unwrap();
        let updated = toggles.refresh(&store, &mut view).unwrap();

        assert_eq!(updated, vec![ToggleFlag::ShowIndicator]);
        assert_eq!(view.toggle_events, vec![(ToggleFlag::ShowIndicator, false)]);
        assert_eq!(toggles.displayed(ToggleFlag::RestoreState), Some(false));
    }

    #[test]
    fn test_set_writes_through() {
        let mut store = MemoryStore::new();
        let changes = store.subscribe();
        let mut toggles = ToggleFlags::new();

        toggles.set(&mut store, ToggleFlag::RestoreState, true).unwrap();

        assert!(store.settings().restore_state);
        assert_eq!(toggles.displayed(ToggleFlag::RestoreState), Some(true));
        assert!(changes.try_recv().is_ok());
    }

    #[test]
    fn test_flag_names_match_schema() {
        assert_eq!(ToggleFlag::ShowIndicator.key(), "show-indicator");
        assert_eq!(ToggleFlag::RestoreState.key(), "restore-state");
        assert_eq!(ToggleFlag::ShowNotifications.key(), "show-notifications");
        assert_eq!(
            ToggleFlag::from_str("restore-state", false),
            Ok(ToggleFlag::RestoreState)
        );
    }
}
