//! Freedesktop desktop-entry lookup
//!
//! Resolves desktop-file IDs against the XDG application directories the
//! same way the desktop does: first matching file wins, and a `-` in the ID
//! may stand for a subdirectory (`kde4-foo.desktop` → `kde4/foo.desktop`).

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{AppInfo, AppResolver};
use crate::constants::apps::{
    APPLICATIONS_SUBDIR, DEFAULT_DATA_DIRS, DESKTOP_ENTRY_GROUP, DESKTOP_SUFFIX,
};

/// Keys we read from the `[Desktop Entry]` group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopEntry {
    pub name: String,
    pub icon: Option<String>,
}

/// Parse a desktop entry, returning `None` unless it describes a visible application
pub fn parse_desktop_entry(contents: &str) -> Option<DesktopEntry> {
    let mut in_group = false;
    let mut name = None;
    let mut icon = None;
    let mut entry_type = None;
    let mut hidden = false;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            // Only the first occurrence of the main group counts
            if in_group {
                break;
            }
            in_group = line == DESKTOP_ENTRY_GROUP;
            continue;
        }
        if !in_group {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Name" => name = Some(value.to_string()),
            "Icon" if !value.is_empty() => icon = Some(value.to_string()),
            "Type" => entry_type = Some(value.to_string()),
            "Hidden" => hidden = value == "true",
            _ => {}
        }
    }

    if hidden || entry_type.as_deref() != Some("Application") {
        return None;
    }
    let name = name.filter(|n| !n.is_empty())?;
    Some(DesktopEntry { name, icon })
}

/// Whether `id` is shaped like a desktop-file ID at all
fn is_valid_id(id: &str) -> bool {
    id.len() > DESKTOP_SUFFIX.len()
        && id.ends_with(DESKTOP_SUFFIX)
        && !id.starts_with('.')
        && !id.contains(['/', '\\', '\0'])
}

/// Find the file for `id` under `dir`, honoring the `-` → `/` prefix rule
fn find_in_dir(dir: &Path, id: &str) -> Option<PathBuf> {
    let direct = dir.join(id);
    if direct.is_file() {
        return Some(direct);
    }

    for (idx, _) in id.match_indices('-') {
        let (prefix, rest) = (&id[..idx], &id[idx + 1..]);
        if prefix.is_empty() || rest.is_empty() {
            continue;
        }
        let subdir = dir.join(prefix);
        if subdir.is_dir()
            && let Some(found) = find_in_dir(&subdir, rest)
        {
            return Some(found);
        }
    }
    None
}

/// Resolver over a list of `applications` directories, highest priority first
#[derive(Debug, Clone)]
pub struct DesktopEntryResolver {
    search_dirs: Vec<PathBuf>,
}

impl DesktopEntryResolver {
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    /// XDG data home, then `$XDG_DATA_DIRS`, then `extra_dirs`
    pub fn from_environment(extra_dirs: &[PathBuf]) -> Self {
        let mut search_dirs = Vec::new();

        if let Some(data_home) = dirs::data_dir() {
            search_dirs.push(data_home.join(APPLICATIONS_SUBDIR));
        }

        let data_dirs = std::env::var("XDG_DATA_DIRS")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIRS.to_string());
        search_dirs.extend(
            data_dirs
                .split(':')
                .filter(|d| !d.is_empty())
                .map(|d| PathBuf::from(d).join(APPLICATIONS_SUBDIR)),
        );

        search_dirs.extend(extra_dirs.iter().cloned());

        let mut unique = Vec::with_capacity(search_dirs.len());
        for dir in search_dirs {
            if !unique.contains(&dir) {
                unique.push(dir);
            }
        }
        debug!(dirs = ?unique, "Application search directories");
        Self::new(unique)
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }
}

impl AppResolver for DesktopEntryResolver {
    fn resolve(&self, id: &str) -> Option<AppInfo> {
        if !is_valid_id(id) {
            debug!(id = %id, "Not a desktop-file ID");
            return None;
        }

        let path = self
            .search_dirs
            .iter()
            .find_map(|dir| find_in_dir(dir, id))?;

        // First match shadows lower-priority dirs, even when it is hidden
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read desktop entry");
                return None;
            }
        };

        let Some(entry) = parse_desktop_entry(&contents) else {
            debug!(id = %id, path = %path.display(), "Desktop entry is not a visible application");
            return None;
        };

        Some(AppInfo {
            id: id.to_string(),
            display_name: entry.name,
            icon: entry.icon,
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FIREFOX: &str = "\
# comment
[Desktop Entry]
Type=Application
Name=Firefox
Name[de]=Feuerfuchs
Icon=firefox
Exec=firefox %u

[Desktop Action new-window]
Name=New Window
";

    fn write_entry(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_parse_reads_main_group_only() {
        let entry = parse_desktop_entry(FIREFOX).unwrap();

        assert_eq!(entry.name, "Firefox");
        assert_eq!(entry.icon.as_deref(), Some("firefox"));
    }

    #[test]
    fn test_parse_rejects_hidden_links_and_nameless() {
        let hidden = "[Desktop Entry]\nType=Application\nName=X\nHidden=true\n";
        assert!(parse_desktop_entry(hidden).is_none());
        assert!(parse_desktop_entry("[Desktop Entry]\nType=Link\nName=X\n").is_none());
        assert!(parse_desktop_entry("[Desktop Entry]\nType=Application\n").is_none());
        assert!(parse_desktop_entry("Type=Application\nName=X\n").is_none());
    }

    #[test]
    fn test_resolve_direct_file() {
        let dir = TempDir::new().unwrap();
        write_entry(dir.path(), "firefox.desktop", FIREFOX);
        let resolver = DesktopEntryResolver::new(vec![dir.path().to_path_buf()]);

        let app = resolver.resolve("firefox.desktop").unwrap();

        assert_eq!(app.id, "firefox.desktop");
        assert_eq!(app.display_name, "Firefox");
        assert_eq!(app.path, dir.path().join("firefox.desktop"));
    }

    #[test]
    fn test_resolve_prefix_subdirectory() {
        let dir = TempDir::new().unwrap();
        write_entry(
            dir.path(),
            "kde4/konsole.desktop",
            "[Desktop Entry]\nType=Application\nName=Konsole\n",
        );
        let resolver = DesktopEntryResolver::new(vec![dir.path().to_path_buf()]);

        let app = resolver.resolve("kde4-konsole.desktop").unwrap();

        assert_eq!(app.display_name, "Konsole");
        assert!(app.icon.is_none());
    }

    #[test]
    fn test_first_directory_shadows_later_ones() {
        let user = TempDir::new().unwrap();
        let system = TempDir::new().unwrap();
        write_entry(
            user.path(),
            "firefox.desktop",
            "[Desktop Entry]\nType=Application\nName=Firefox\nHidden=true\n",
        );
        write_entry(system.path(), "firefox.desktop", FIREFOX);
        let resolver = DesktopEntryResolver::new(vec![
            user.path().to_path_buf(),
            system.path().to_path_buf(),
        ]);

        assert!(resolver.resolve("firefox.desktop").is_none());
    }

    #[test]
    fn test_resolve_unknown_or_malformed_ids() {
        let dir = TempDir::new().unwrap();
        write_entry(dir.path(), "firefox.desktop", FIREFOX);
        let resolver = DesktopEntryResolver::new(vec![dir.path().to_path_buf()]);

        assert!(resolver.resolve("missing.desktop").is_none());
        assert!(resolver.resolve("firefox").is_none());
        assert!(resolver.resolve("../firefox.desktop").is_none());
        assert!(resolver.resolve(".desktop").is_none());
        assert!(resolver.resolve("").is_none());
    }

    #[test]
    fn test_from_environment_appends_extra_dirs() {
        let extra = PathBuf::from("/opt/apps");
        let resolver = DesktopEntryResolver::from_environment(std::slice::from_ref(&extra));

        assert_eq!(resolver.search_dirs().last(), Some(&extra));
    }
}
