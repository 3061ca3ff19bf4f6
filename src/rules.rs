//! Ordered, duplicate-free list of inhibit rules
//!
//! The model never touches the store itself; the sync controller decides
//! when its identifiers are persisted. That keeps everything here testable
//! with nothing more than a resolver.

use std::collections::HashSet;
use tracing::debug;

use crate::apps::{AppInfo, AppResolver};
use crate::error::RuleError;

/// One row of the rule list
///
/// Only `id` is persisted; the display fields come from the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleEntry {
    pub id: String,
    pub display_name: String,
    pub icon: Option<String>,
}

impl From<AppInfo> for RuleEntry {
    fn from(app: AppInfo) -> Self {
        Self {
            id: app.id,
            display_name: app.display_name,
            icon: app.icon,
        }
    }
}

/// Change a list view has to apply to stay in sync with the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleListEvent {
    /// Append this entry at the end of the view
    Added(RuleEntry),
    /// Drop the row with this ID
    Removed(String),
}

/// Result of [`RuleListModel::reload`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reload {
    /// Identifiers that survived filtering, in stored order
    pub valid_ids: Vec<String>,
    /// Identifiers that were filtered out (unresolvable or repeated)
    pub pruned: Vec<String>,
    /// View updates relative to the previous contents
    pub events: Vec<RuleListEvent>,
}

impl Reload {
    /// The store still holds identifiers that were filtered out
    pub fn needs_write_back(&self) -> bool {
        !self.pruned.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RuleListModel {
    entries: Vec<RuleEntry>,
}

impl RuleListModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with the resolvable subset of `raw_ids`.
    ///
    /// Unresolvable identifiers and repeats of an identifier already kept
    /// are dropped silently and reported in [`Reload::pruned`].
    pub fn reload<R>(&mut self, raw_ids: &[String], resolver: &R) -> Reload
    where
        R: AppResolver + ?Sized,
    {
        let mut seen = HashSet::with_capacity(raw_ids.len());
        let mut entries = Vec::with_capacity(raw_ids.len());
        let mut pruned = Vec::new();

        for id in raw_ids {
            if !seen.insert(id.as_str()) {
                debug!(id = %id, "Dropping repeated rule");
                pruned.push(id.clone());
                continue;
            }
            match resolver.resolve(id) {
                Some(app) => entries.push(RuleEntry::from(app)),
                None => {
                    debug!(id = %id, "Dropping rule for unresolvable application");
                    pruned.push(id.clone());
                }
            }
        }

        let events = diff(&self.entries, &entries);
        let valid_ids = entries.iter().map(|e| e.id.clone()).collect();
        self.entries = entries;

        Reload {
            valid_ids,
            pruned,
            events,
        }
    }

    /// Append at the end; an identifier already present is rejected
    pub fn append(&mut self, entry: RuleEntry) -> Result<(), RuleError> {
        if self.contains(&entry.id) {
            return Err(RuleError::AlreadyExists(entry.id));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Remove the entry with `id`; absent is a no-op returning `None`
    pub fn remove(&mut self, id: &str) -> Option<RuleEntry> {
        let idx = self.position(id)?;
        Some(self.entries.remove(idx))
    }

    /// Put a removed entry back where it was (rollback of a failed write)
    pub(crate) fn insert_at(&mut self, idx: usize, entry: RuleEntry) {
        debug_assert!(!self.contains(&entry.id));
        let idx = idx.min(self.entries.len());
        self.entries.insert(idx, entry);
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    pub fn entries(&self) -> &[RuleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Add/remove events turning a view showing `old` into one showing `new`.
///
/// A row survives only if its display fields are unchanged too; a renamed
/// application is removed and added again. Views only append, so when the
/// surviving old rows are not a prefix of `new` in the same order the result
/// is a full reset instead.
fn diff(old: &[RuleEntry], new: &[RuleEntry]) -> Vec<RuleListEvent> {
    let old_rows: HashSet<&RuleEntry> = old.iter().collect();
    let new_rows: HashSet<&RuleEntry> = new.iter().collect();

    let kept: Vec<&RuleEntry> = old.iter().filter(|e| new_rows.contains(e)).collect();
    let order_preserved = new.iter().take(kept.len()).eq(kept.iter().copied());

    let mut events = Vec::new();
    if order_preserved {
        events.extend(
            old.iter()
                .filter(|e| !new_rows.contains(e))
                .map(|e| RuleListEvent::Removed(e.id.clone())),
        );
        events.extend(
            new.iter()
                .filter(|e| !old_rows.contains(e))
                .cloned()
                .map(RuleListEvent::Added),
        );
    } else {
        debug!("Rule order changed, resetting view");
        events.extend(old.iter().map(|e| RuleListEvent::Removed(e.id.clone())));
        events.extend(new.iter().cloned().map(RuleListEvent::Added));
    }
    events
}
