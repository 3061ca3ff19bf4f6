//! Mediator between the rule list, the toggles and the settings store
//!
//! The store reports every write through one undifferentiated change
//! stream, including writes made by this controller. A local add/remove
//! therefore runs inside [`SyncState::LocalMutation`]: the model mutation,
//! the store write and the disposal of that write's own echo happen as one
//! unit before the gate returns to [`SyncState::Idle`]. Anything the store
//! reports while the gate is closed is dropped for the list; the toggles
//! are refreshed regardless.

use anyhow::{Context, Result};
use std::sync::mpsc::{Receiver, TryRecvError};
use tracing::{debug, info, warn};

use crate::apps::{AppChooser, AppResolver};
use crate::config::{ConfigStore, StoreChanged};
use crate::constants::keys;
use crate::error::RuleError;
use crate::rules::{RuleEntry, RuleListEvent, RuleListModel};
use crate::toggles::{ToggleFlag, ToggleFlags};
use crate::view::{RuleListObserver, ToggleObserver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Store notifications are processed normally
    Idle,
    /// A local mutation is writing; store notifications only refresh toggles
    LocalMutation,
}

/// Non-reentrant gate around local rule list mutations
#[derive(Debug)]
pub struct SyncGate {
    state: SyncState,
}

impl Default for SyncGate {
    fn default() -> Self {
        Self {
            state: SyncState::Idle,
        }
    }
}

impl SyncGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_suppressed(&self) -> bool {
        self.state == SyncState::LocalMutation
    }

    /// Idle → LocalMutation; a second entry is rejected, never interleaved
    pub fn enter(&mut self) -> Result<(), RuleError> {
        if self.is_suppressed() {
            return Err(RuleError::MutationInProgress);
        }
        self.state = SyncState::LocalMutation;
        Ok(())
    }

    pub fn leave(&mut self) {
        self.state = SyncState::Idle;
    }
}

/// What happened to an add request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(RuleEntry),
    /// Already in the list; nothing was written
    AlreadyExists(String),
    /// The chosen ID is not an installed application; nothing was written
    Unresolved(String),
    /// The chooser was cancelled
    NoSelection,
}

/// Anything able to display both the rule list and the switches
pub trait PanelView: RuleListObserver + ToggleObserver {}

impl<T: RuleListObserver + ToggleObserver + ?Sized> PanelView for T {}

pub struct SyncController<S, R> {
    store: S,
    resolver: R,
    changes: Receiver<StoreChanged>,
    rules: RuleListModel,
    toggles: ToggleFlags,
    gate: SyncGate,
    reloads: u64,
}

impl<S: ConfigStore, R: AppResolver> SyncController<S, R> {
    /// Subscribe to the store; nothing is read until [`Self::start`]
    pub fn new(mut store: S, resolver: R) -> Self {
        let changes = store.subscribe();
        Self {
            store,
            resolver,
            changes,
            rules: RuleListModel::new(),
            toggles: ToggleFlags::new(),
            gate: SyncGate::new(),
            reloads: 0,
        }
    }

    /// Populate the view with the current store contents
    pub fn start<V: PanelView + ?Sized>(&mut self, view: &mut V) -> Result<()> {
        self.toggles.refresh(&self.store, view)?;
        self.refresh_rules(view)
    }

    /// Handle every queued store notification.
    ///
    /// Notifications carry no key, so a burst collapses into one refresh.
    /// Returns how many notifications were consumed.
    pub fn process_pending<V: PanelView + ?Sized>(&mut self, view: &mut V) -> Result<usize> {
        let pending = self.drain_notifications();
        if pending == 0 {
            return Ok(0);
        }
        self.on_store_changed(view)?;
        Ok(pending)
    }

    fn on_store_changed<V: PanelView + ?Sized>(&mut self, view: &mut V) -> Result<()> {
        debug_assert!(!self.gate.is_suppressed());
        self.toggles.refresh(&self.store, view)?;
        self.refresh_rules(view)
    }

    /// Reload the list from the store, pruning stale identifiers for good
    fn refresh_rules<V: PanelView + ?Sized>(&mut self, view: &mut V) -> Result<()> {
        let raw = self
            .store
            .get_string_list(keys::INHIBIT_APPS)
            .context("Failed to read inhibit rules")?;
        let reload = self.rules.reload(&raw, &self.resolver);
        self.reloads += 1;

        for event in &reload.events {
            view.apply(event);
        }

        if reload.needs_write_back() {
            info!(
                pruned = ?reload.pruned,
                kept = reload.valid_ids.len(),
                "Pruning stale inhibit rules"
            );
            self.gate.enter()?;
            let written = self.store.set_string_list(keys::INHIBIT_APPS, &reload.valid_ids);
            self.discard_echo(view);
            self.gate.leave();
            written.context("Failed to write back pruned inhibit rules")?;
        }
        Ok(())
    }

    /// Ask the chooser for an application and append a rule for it
    pub fn add_rule<C, V>(&mut self, chooser: &mut C, view: &mut V) -> Result<AddOutcome>
    where
        C: AppChooser + ?Sized,
        V: PanelView + ?Sized,
    {
        let Some(id) = chooser.choose() else {
            debug!("Application chooser cancelled");
            return Ok(AddOutcome::NoSelection);
        };

        // External changes queued so far must not be mistaken for our echo
        self.process_pending(view)?;

        if self.rules.contains(&id) {
            warn!(id = %id, "Already have an inhibit rule for this application");
            return Ok(AddOutcome::AlreadyExists(id));
        }
        let Some(app) = self.resolver.resolve(&id) else {
            warn!(id = %id, "Refusing to add rule for unknown application");
            return Ok(AddOutcome::Unresolved(id));
        };
        let entry = RuleEntry::from(app);

        self.gate.enter()?;
        if let Err(err) = self.rules.append(entry.clone()) {
            self.gate.leave();
            return match err {
                RuleError::AlreadyExists(id) => Ok(AddOutcome::AlreadyExists(id)),
                other => Err(other.into()),
            };
        }
        if let Err(err) = self.persist_rules(view) {
            self.rules.remove(&entry.id);
            self.gate.leave();
            return Err(err);
        }
        view.apply(&RuleListEvent::Added(entry.clone()));
        self.gate.leave();

        info!(id = %entry.id, name = %entry.display_name, "Added inhibit rule");
        Ok(AddOutcome::Added(entry))
    }

    /// Remove the rule for `id`; returns false (and writes nothing) if absent
    pub fn remove_rule<V>(&mut self, id: &str, view: &mut V) -> Result<bool>
    where
        V: PanelView + ?Sized,
    {
        self.process_pending(view)?;

        let Some(idx) = self.rules.position(id) else {
            debug!(id = %id, "No inhibit rule to remove");
            return Ok(false);
        };

        self.gate.enter()?;
        let Some(removed) = self.rules.remove(id) else {
            self.gate.leave();
            return Ok(false);
        };
        if let Err(err) = self.persist_rules(view) {
            self.rules.insert_at(idx, removed);
            self.gate.leave();
            return Err(err);
        }
        view.apply(&RuleListEvent::Removed(removed.id.clone()));
        self.gate.leave();

        info!(id = %removed.id, "Removed inhibit rule");
        Ok(true)
    }

    /// User flipped a switch; written straight through
    pub fn set_toggle(&mut self, flag: ToggleFlag, value: bool) -> Result<()> {
        self.toggles
            .set(&mut self.store, flag, value)
            .with_context(|| format!("Failed to update '{}'", flag.key()))
    }

    /// Write the model's identifiers and drop the resulting echo.
    /// Must be called with the gate closed.
    fn persist_rules<V: ToggleObserver + ?Sized>(&mut self, view: &mut V) -> Result<()> {
        debug_assert!(self.gate.is_suppressed());
        let ids = self.rules.ids();
        let written = self
            .store
            .set_string_list(keys::INHIBIT_APPS, &ids)
            .context("Failed to persist inhibit rules");
        self.discard_echo(view);
        written
    }

    /// Consume notifications that arrived while the gate is closed.
    /// The list ignores them; the toggles are refreshed regardless.
    fn discard_echo<V: ToggleObserver + ?Sized>(&mut self, view: &mut V) {
        debug_assert!(self.gate.is_suppressed());
        let dropped = self.drain_notifications();
        if dropped == 0 {
            return;
        }
        debug!(dropped, "Suppressed store notifications from local write");
        if let Err(err) = self.toggles.refresh(&self.store, view) {
            warn!(error = %format!("{err:#}"), "Failed to refresh toggles after local write");
        }
    }

    fn drain_notifications(&mut self) -> usize {
        let mut count = 0;
        loop {
            match self.changes.try_recv() {
                Ok(StoreChanged) => count += 1,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("Store change stream closed");
                    break;
                }
            }
        }
        count
    }

    pub fn rules(&self) -> &RuleListModel {
        &self.rules
    }

    pub fn toggles(&self) -> &ToggleFlags {
        &self.toggles
    }

    pub fn state(&self) -> SyncState {
        self.gate.state()
    }

    /// Number of list reloads run so far
    pub fn reload_count(&self) -> u64 {
        self.reloads
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}
