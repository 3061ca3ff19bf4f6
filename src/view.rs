//! Observer seams between the sync core and whatever displays it

use std::fmt;
use std::io::{self, Write};
use tracing::warn;

use crate::rules::{RuleEntry, RuleListEvent};
use crate::toggles::ToggleFlag;

/// List display subscribed to rule additions and removals
pub trait RuleListObserver {
    fn on_add(&mut self, entry: &RuleEntry);
    fn on_remove(&mut self, id: &str);

    fn apply(&mut self, event: &RuleListEvent) {
        match event {
            RuleListEvent::Added(entry) => self.on_add(entry),
            RuleListEvent::Removed(id) => self.on_remove(id),
        }
    }
}

/// Switch display for the boolean settings
pub trait ToggleObserver {
    fn on_toggle(&mut self, flag: ToggleFlag, value: bool);
}

/// Line-oriented view for the command line
///
/// Observer callbacks cannot fail, so the first write error is kept and
/// reported by [`TerminalView::finish`]; later lines are dropped.
pub struct TerminalView<W> {
    out: W,
    show_toggles: bool,
    failed: Option<io::Error>,
}

impl TerminalView<io::Stdout> {
    pub fn stdout(show_toggles: bool) -> Self {
        Self::new(io::stdout(), show_toggles)
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W, show_toggles: bool) -> Self {
        Self {
            out,
            show_toggles,
            failed: None,
        }
    }

    /// Print a free-form status line
    pub fn note(&mut self, message: &str) {
        self.line(format_args!("{message}"));
    }

    /// Flush and hand back the writer, or the first write error
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.failed.take() {
            return Err(err);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        if self.failed.is_some() {
            return;
        }
        if let Err(err) = writeln!(self.out, "{args}") {
            warn!(error = %err, "Failed to write to terminal");
            self.failed = Some(err);
        }
    }
}

impl<W: Write> RuleListObserver for TerminalView<W> {
    fn on_add(&mut self, entry: &RuleEntry) {
        self.line(format_args!("+ {} ({})", entry.display_name, entry.id));
    }

    fn on_remove(&mut self, id: &str) {
        self.line(format_args!("- {id}"));
    }
}

impl<W: Write> ToggleObserver for TerminalView<W> {
    fn on_toggle(&mut self, flag: ToggleFlag, value: bool) {
        if self.show_toggles {
            let state = if value { "on" } else { "off" };
            self.line(format_args!("[{state:>3}] {} ({})", flag.label(), flag.key()));
        }
    }
}

/// View recording every callback, for assertions
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingView {
    pub(crate) rows: Vec<String>,
    pub(crate) list_events: Vec<RuleListEvent>,
    pub(crate) toggle_events: Vec<(ToggleFlag, bool)>,
}

#[cfg(test)]
impl RecordingView {
    pub(crate) fn clear_events(&mut self) {
        self.list_events.clear();
        self.toggle_events.clear();
    }
}

#[cfg(test)]
impl RuleListObserver for RecordingView {
    fn on_add(&mut self, entry: &RuleEntry) {
        self.rows.push(entry.id.clone());
        self.list_events.push(RuleListEvent::Added(entry.clone()));
    }

    fn on_remove(&mut self, id: &str) {
        self.rows.retain(|row| row != id);
        self.list_events.push(RuleListEvent::Removed(id.to_string()));
    }
}

#[cfg(test)]
impl ToggleObserver for RecordingView {
    fn on_toggle(&mut self, flag: ToggleFlag, value: bool) {
        self.toggle_events.push((flag, value));
    }
}
