//! Watches the settings file for edits made by other processes
//!
//! The directory is watched rather than the file itself so that editors
//! replacing the file through a rename are still noticed.

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, channel};
use tracing::{error, info};

/// Emitted when the settings file may have changed on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFileEvent {
    Changed,
}

/// Keeps the underlying watcher alive; events stop when dropped
pub struct SettingsWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl SettingsWatcher {
    /// Start watching `path`, returning the watcher and its event receiver
    pub fn start(path: &Path) -> Result<(Self, Receiver<SettingsFileEvent>)> {
        let (tx, rx) = channel();

        let watch_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let file_name = path
            .file_name()
            .map(OsString::from)
            .context("Settings path has no file name")?;

        // The directory has to exist before it can be watched
        std::fs::create_dir_all(&watch_dir).with_context(|| {
            format!("Failed to create settings directory {}", watch_dir.display())
        })?;

        let mut watcher = recommended_watcher(move |res: notify::Result<notify::Event>| {
            forward_event(res, &file_name, &tx);
        })
        .context("Failed to create settings file watcher")?;

        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", watch_dir.display()))?;

        info!(dir = %watch_dir.display(), file = %path.display(), "Settings watcher started");

        Ok((
            Self {
                _watcher: watcher,
                path: path.to_path_buf(),
            },
            rx,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Filter raw watcher events down to changes of the settings file
fn forward_event(
    res: notify::Result<notify::Event>,
    file_name: &OsString,
    tx: &Sender<SettingsFileEvent>,
) {
    match res {
        Ok(event) => {
            if is_relevant(&event, file_name) {
                let _ = tx.send(SettingsFileEvent::Changed);
            }
        }
        Err(e) => error!(error = %e, "Settings watcher error"),
    }
}

fn is_relevant(event: &notify::Event, file_name: &OsString) -> bool {
    let touches_file = event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name.as_os_str()));

    let relevant_kind = matches!(
        event.kind,
        notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
    );

    touches_file && relevant_kind
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, EventKind, ModifyKind};

    fn event(kind: EventKind, path: &str) -> notify::Event {
        notify::Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_relevant_only_for_settings_file() {
        let name = OsString::from("settings.json");
        let settings = "/cfg/lidsleep/settings.json";

        assert!(is_relevant(
            &event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), settings),
            &name
        ));
        assert!(is_relevant(
            &event(EventKind::Create(CreateKind::File), "/cfg/lidsleep/settings.json"),
            &name
        ));
        assert!(!is_relevant(
            &event(EventKind::Modify(ModifyKind::Any), "/cfg/lidsleep/other.json"),
            &name
        ));
        assert!(!is_relevant(&event(EventKind::Access(AccessKind::Any), settings), &name));
    }

    #[test]
    fn test_forward_event_sends_changed() {
        let (tx, rx) = channel();
        let name = OsString::from("settings.json");

        forward_event(
            Ok(event(EventKind::Modify(ModifyKind::Any), "/tmp/settings.json")),
            &name,
            &tx,
        );
        forward_event(Err(notify::Error::generic("boom")), &name, &tx);

        assert_eq!(rx.try_recv(), Ok(SettingsFileEvent::Changed));
        assert!(rx.try_recv().is_err());
    }
}
