#![forbid(unsafe_code)]

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;
use tracing::{Level as TraceLevel, info, warn};
use tracing_subscriber::FmtSubscriber;

use lidsleep_prefs::apps::{AppChooser, DesktopEntryResolver, PresetChooser, PromptChooser};
use lidsleep_prefs::constants;
use lidsleep_prefs::view::TerminalView;
use lidsleep_prefs::watcher::{SettingsFileEvent, SettingsWatcher};
use lidsleep_prefs::{AddOutcome, JsonFileStore, SyncController, ToggleFlag};

type Panel = SyncController<JsonFileStore, DesktopEntryResolver>;

/// Manage which applications keep the lid from suspending the machine
#[derive(Debug, Parser)]
#[command(name = "lidsleep-prefs", version)]
struct Cli {
    /// Settings file (default: $LIDSLEEP_SETTINGS, else ~/.config/lidsleep/settings.json)
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Extra directory searched for desktop entries; may be repeated
    #[arg(long = "applications-dir", global = true, value_name = "DIR")]
    applications_dirs: Vec<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the switches and the application list
    Show,
    /// Print the application list
    List,
    /// Add an application (prompts when no ID is given)
    Add {
        /// Desktop-file ID, e.g. firefox.desktop
        app_id: Option<String>,
    },
    /// Remove an application
    Remove {
        app_id: String,
    },
    /// Flip one of the switches
    Set {
        flag: ToggleFlag,
        state: Switch,
    },
    /// Show the panel and follow changes made elsewhere until interrupted
    Watch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl From<Switch> for bool {
    fn from(switch: Switch) -> Self {
        switch == Switch::On
    }
}

fn init_logging() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    // stdout is reserved for command output
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    let path = cli.settings.clone().unwrap_or_else(JsonFileStore::default_path);
    let store = JsonFileStore::open(&path)?;
    let resolver = DesktopEntryResolver::from_environment(&cli.applications_dirs);
    let mut panel = SyncController::new(store, resolver);

    match cli.command {
        Command::Show => show(&mut panel, true),
        Command::List => show(&mut panel, false),
        Command::Add { app_id } => add(&mut panel, app_id),
        Command::Remove { app_id } => remove(&mut panel, &app_id),
        Command::Set { flag, state } => set(&mut panel, flag, state.into()),
        Command::Watch => watch(&mut panel),
    }
}

/// Start without printing the initial list
fn start_quietly(panel: &mut Panel) -> Result<()> {
    panel.start(&mut TerminalView::new(std::io::sink(), false))
}

fn show(panel: &mut Panel, with_toggles: bool) -> Result<()> {
    let mut view = TerminalView::stdout(with_toggles);
    panel.start(&mut view)?;
    if panel.rules().is_empty() {
        view.note("(no applications inhibit lid sleep)");
    }
    view.finish()?;
    Ok(())
}

fn add(panel: &mut Panel, app_id: Option<String>) -> Result<()> {
    start_quietly(panel)?;

    let mut chooser: Box<dyn AppChooser> = match app_id {
        Some(id) => Box::new(PresetChooser::new(Some(id))),
        None => Box::new(PromptChooser::stdio()),
    };
    let mut view = TerminalView::stdout(false);

    match panel.add_rule(chooser.as_mut(), &mut view)? {
        AddOutcome::Added(_) => {}
        AddOutcome::AlreadyExists(id) => view.note(&format!("'{id}' is already in the list")),
        AddOutcome::Unresolved(id) => {
            view.note(&format!("'{id}' is not an installed application"))
        }
        AddOutcome::NoSelection => view.note("No application selected"),
    }
    view.finish()?;
    Ok(())
}

fn remove(panel: &mut Panel, app_id: &str) -> Result<()> {
    start_quietly(panel)?;

    let mut view = TerminalView::stdout(false);
    if !panel.remove_rule(app_id, &mut view)? {
        view.note(&format!("'{app_id}' is not in the list"));
    }
    view.finish()?;
    Ok(())
}

fn set(panel: &mut Panel, flag: ToggleFlag, value: bool) -> Result<()> {
    start_quietly(panel)?;
    panel.set_toggle(flag, value)?;

    let mut view = TerminalView::stdout(false);
    view.note(&format!("{}: {}", flag.label(), if value { "on" } else { "off" }));
    view.finish()?;
    Ok(())
}

fn watch(panel: &mut Panel) -> Result<()> {
    let mut view = TerminalView::stdout(true);
    panel.start(&mut view)?;

    let path = panel.store().path().to_path_buf();
    let (watcher, events) = SettingsWatcher::start(&path)?;
    info!(path = %watcher.path().display(), "Watching settings, press Ctrl+C to stop");

    let shutdown = Arc::new(AtomicBool::new(false));
    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        signal_hook::flag::register(SIGINT, Arc::clone(&shutdown))?;
        signal_hook::flag::register(SIGTERM, Arc::clone(&shutdown))?;
    }

    let poll = Duration::from_millis(constants::watch::POLL_INTERVAL_MS);
    while !shutdown.load(Ordering::Relaxed) {
        match events.recv_timeout(poll) {
            Ok(SettingsFileEvent::Changed) => {
                // Editors tend to produce several events per save
                while events.try_recv().is_ok() {}

                match panel.store_mut().reload_from_disk() {
                    Ok(true) => {
                        panel.process_pending(&mut view)?;
                    }
                    Ok(false) => {}
                    // Possibly caught mid-write; the next event retries
                    Err(e) => {
                        warn!(error = %format!("{e:#}"), "Ignoring unreadable settings file")
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                bail!("Settings watcher stopped unexpectedly")
            }
        }
    }

    info!("Stopped watching settings");
    view.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_set_command() {
        let cli = Cli::try_parse_from(["lidsleep-prefs", "set", "restore-state", "on"]).unwrap();

        match cli.command {
            Command::Set { flag, state } => {
                assert_eq!(flag, ToggleFlag::RestoreState);
                assert!(bool::from(state));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "lidsleep-prefs",
            "add",
            "--settings",
            "/tmp/s.json",
            "--applications-dir",
            "/opt/a",
            "--applications-dir",
            "/opt/b",
        ])
        .unwrap();

        assert_eq!(cli.settings, Some(PathBuf::from("/tmp/s.json")));
        assert_eq!(cli.applications_dirs, vec![PathBuf::from("/opt/a"), PathBuf::from("/opt/b")]);
        assert!(matches!(cli.command, Command::Add { app_id: None }));
    }

    #[test]
    fn test_cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
