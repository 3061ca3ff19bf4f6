//! Installed-application lookup and selection
//!
//! Two collaborators of the panel live here:
//! - an [`AppResolver`] turning a desktop-file ID into display data, or
//!   `None` when the ID no longer denotes an installed application
//! - an [`AppChooser`] asking the user to pick one application ID

pub mod desktop_entry;

pub use desktop_entry::DesktopEntryResolver;

use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::warn;

/// Information about an installed application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    /// Desktop-file ID (e.g., "firefox.desktop")
    pub id: String,
    /// Name shown in the rule list (e.g., "Firefox")
    pub display_name: String,
    /// Icon name or path from the desktop entry, if any
    pub icon: Option<String>,
    /// Desktop entry the information was read from
    pub path: PathBuf,
}

/// Resolves application IDs; must return `None` rather than fail
pub trait AppResolver {
    fn resolve(&self, id: &str) -> Option<AppInfo>;
}

/// Lets the user pick an application; `None` means cancelled
pub trait AppChooser {
    fn choose(&mut self) -> Option<String>;
}

/// Chooser answering with an ID decided up front (e.g., a CLI argument)
#[derive(Debug, Clone, Default)]
pub struct PresetChooser {
    selection: Option<String>,
}

impl PresetChooser {
    pub fn new(selection: Option<String>) -> Self {
        Self { selection }
    }
}

impl AppChooser for PresetChooser {
    fn choose(&mut self) -> Option<String> {
        self.selection.take().filter(|id| !id.trim().is_empty())
    }
}

/// Chooser prompting for one line; an empty line or EOF cancels
pub struct PromptChooser<R, W> {
    input: R,
    output: W,
}

impl PromptChooser<std::io::StdinLock<'static>, std::io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> PromptChooser<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> AppChooser for PromptChooser<R, W> {
    fn choose(&mut self) -> Option<String> {
        let _ = write!(self.output, "Application ID (e.g. firefox.desktop): ");
        let _ = self.output.flush();

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(_) => {
                let id = line.trim();
                (!id.is_empty()).then(|| id.to_string())
            }
            Err(e) => {
                warn!(error = %e, "Failed to read application ID");
                None
            }
        }
    }
}

/// Resolver over a fixed set of applications
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FixedResolver {
    apps: std::collections::HashMap<String, AppInfo>,
}

#[cfg(test)]
impl FixedResolver {
    pub(crate) fn with_apps(ids: &[&str]) -> Self {
        let mut resolver = Self::default();
        for id in ids {
            resolver.install(id);
        }
        resolver
    }

    pub(crate) fn install(&mut self, id: &str) {
        let display_name = id.trim_end_matches(".desktop").to_string();
        self.apps.insert(
            id.to_string(),
            AppInfo {
                id: id.to_string(),
                display_name,
                icon: None,
                path: PathBuf::from("/usr/share/applications").join(id),
            },
        );
    }

    pub(crate) fn uninstall(&mut self, id: &str) {
        self.apps.remove(id);
    }

    pub(crate) fn rename(&mut self, id: &str, display_name: &str) {
        if let Some(app) = self.apps.get_mut(id) {
            app.display_name = display_name.to_string();
        }
    }
}

#[cfg(test)]
impl AppResolver for FixedResolver {
    fn resolve(&self, id: &str) -> Option<AppInfo> {
        self.apps.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_preset_chooser_answers_once() {
        let mut chooser = PresetChooser::new(Some("firefox.desktop".to_string()));

        assert_eq!(chooser.choose(), Some("firefox.desktop".to_string()));
        assert_eq!(chooser.choose(), None);
    }

    #[test]
    fn test_preset_chooser_blank_is_no_selection() {
        let mut chooser = PresetChooser::new(Some("   ".to_string()));

        assert_eq!(chooser.choose(), None);
    }

    #[test]
    fn test_prompt_chooser_reads_trimmed_line() {
        let mut output = Vec::new();
        let mut chooser = PromptChooser::new(Cursor::new("  vlc.desktop \n"), &mut output);

        assert_eq!(chooser.choose(), Some("vlc.desktop".to_string()));
        drop(chooser);
        assert!(String::from_utf8(output).unwrap().contains("Application ID"));
    }

    #[test]
    fn test_prompt_chooser_empty_or_eof_cancels() {
        let mut empty = PromptChooser::new(Cursor::new("\n"), Vec::new());
        let mut eof = PromptChooser::new(Cursor::new(""), Vec::new());

        assert_eq!(empty.choose(), None);
        assert_eq!(eof.choose(), None);
    }
}
