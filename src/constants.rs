//! Application-wide constants
//!
//! Schema key names, file locations and timing values live here so the
//! store, the resolver and the CLI agree on a single source of truth.

/// Persisted settings schema keys
pub mod keys {
    /// Ordered list of desktop-file IDs that inhibit lid-triggered sleep
    pub const INHIBIT_APPS: &str = "inhibit-apps";

    /// Display the status indicator in the top panel
    pub const SHOW_INDICATOR: &str = "show-indicator";

    /// Reapply the inhibit state after a reboot
    pub const RESTORE_STATE: &str = "restore-state";

    /// Emit user notifications on state change
    pub const SHOW_NOTIFICATIONS: &str = "show-notifications";
}

/// Settings file location
pub mod config {
    /// Directory under the user config dir
    pub const APP_DIR: &str = "lidsleep";

    /// Settings file name
    pub const FILENAME: &str = "settings.json";

    /// Environment variable overriding the settings file path
    pub const PATH_ENV: &str = "LIDSLEEP_SETTINGS";
}

/// Freedesktop application lookup
pub mod apps {
    /// Subdirectory of every XDG data dir holding desktop entries
    pub const APPLICATIONS_SUBDIR: &str = "applications";

    /// Used when XDG_DATA_DIRS is unset or empty
    pub const DEFAULT_DATA_DIRS: &str = "/usr/local/share:/usr/share";

    /// Required suffix of a desktop-file ID
    pub const DESKTOP_SUFFIX: &str = ".desktop";

    /// Group holding the keys we care about
    pub const DESKTOP_ENTRY_GROUP: &str = "[Desktop Entry]";
}

/// `watch` command timing
pub mod watch {
    /// How long the main loop blocks before re-checking the shutdown flag
    pub const POLL_INTERVAL_MS: u64 = 250;
}
