use std::io::BufReader;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use crate::action_executor::ProcessLauncher;
use crate::catalog::{DesktopEntrySource, EntrySource};
use crate::config::{self, Config, ConfigError};
use crate::coordinator::{
    CoordinationError, CoordinatorOptions, Election, InstanceCoordinator, LoopbackEndpoint,
};
use crate::history::SelectionHistory;
use crate::session::{
    session_channel, LaunchMode, LaunchOutcome, SessionController, SessionError, SessionEvent,
    SessionOptions,
};
use crate::ui::{present, spawn_input_reader, IconLookup, LauncherView, TerminalView};

const USAGE: &str = "usage: keylaunch [--silent]";

#[derive(Debug)]
pub enum RuntimeError {
    Coordination(CoordinationError),
    AcceptorFailed(String),
    Launch(SessionError),
    Io(std::io::Error),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Coordination(error) => write!(f, "coordination error: {error}"),
            Self::AcceptorFailed(error) => write!(f, "activation listener failed: {error}"),
            Self::Launch(error) => write!(f, "launch error: {error}"),
            Self::Io(error) => write!(f, "io error: {error}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<CoordinationError> for RuntimeError {
    fn from(value: CoordinationError) -> Self {
        Self::Coordination(value)
    }
}

impl From<SessionError> for RuntimeError {
    fn from(value: SessionError) -> Self {
        Self::Launch(value)
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeOptions {
    /// Become leader without showing the launcher.
    pub silent: bool,
}

pub fn parse_cli_args(args: &[String]) -> Result<RuntimeOptions, String> {
    let mut options = RuntimeOptions::default();
    for arg in args {
        match arg.as_str() {
            "--silent" | "--quiet" => options.silent = true,
            other => return Err(format!("unknown argument '{other}'; {USAGE}")),
        }
    }
    Ok(options)
}

pub fn run_with_options(options: RuntimeOptions) -> Result<(), RuntimeError> {
    let (config, config_problem) = load_config();
    if let Err(error) = crate::logging::init(config.log_level_filter()) {
        eprintln!("[keylaunch] file logging unavailable, using stderr: {error}");
    }
    if let Some(problem) = config_problem {
        log::warn!("using default config: {problem}");
    }
    log::info!(
        "startup silent={} port={} config_path={} history_path={}",
        options.silent,
        config.port,
        config.config_path.display(),
        config.history_path.display(),
    );

    let (handle, events) = session_channel();
    let coordinator = InstanceCoordinator::new(
        Box::new(LoopbackEndpoint::new(config.port)),
        CoordinatorOptions {
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
            quiet: options.silent,
        },
        handle.clone(),
    );
    let leader = match coordinator.start()? {
        Election::Follower => return Ok(()),
        Election::Leader(leader) => leader,
    };
    log::info!("leader ready addr={}", leader.local_addr());

    let source = DesktopEntrySource::new(config.application_dirs.clone(), &config.desktop_name);
    let catalog = source.load();
    log::info!(
        "source={} entries={} errors={}",
        source.source_name(),
        catalog.entries.len(),
        catalog.errors.len()
    );
    let history = SelectionHistory::load(&config.history_path);

    let mut session = SessionController::new(
        catalog.entries,
        history,
        Box::new(ProcessLauncher::default()),
        SessionOptions {
            suggestion_limit: config.suggestion_limit as usize,
            launch_mode: config.launch_mode,
        },
    );
    let icons = IconLookup {
        theme_dirs: config.icon_theme_dirs.clone(),
        size: config.icon_size,
    };

    spawn_input_reader(BufReader::new(std::io::stdin()), handle)?;
    let mut view = TerminalView::new(std::io::stdout());
    let result = run_event_loop(&mut session, &events, &icons, &mut view);
    if !leader.is_accepting() {
        log::warn!("acceptor thread is no longer running");
    }
    log::info!("shutdown ok={}", result.is_ok());
    result
}

fn load_config() -> (Config, Option<ConfigError>) {
    match config::load(None) {
        Ok(cfg) => {
            if !cfg.config_path.exists() {
                if let Err(error) = config::save(&cfg) {
                    return (cfg, Some(error));
                }
            }
            (cfg, None)
        }
        Err(error) => (Config::default(), Some(error)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Drains session events on the calling thread, which thereby becomes the UI
/// thread. Each event is applied and rendered before the next is taken.
pub fn run_event_loop(
    session: &mut SessionController,
    events: &Receiver<SessionEvent>,
    icons: &IconLookup,
    view: &mut dyn LauncherView,
) -> Result<(), RuntimeError> {
    present(session, icons, view);
    for event in events.iter() {
        match apply_event(session, event) {
            Ok(Flow::Continue) => present(session, icons, view),
            Ok(Flow::Exit) => return Ok(()),
            Err(error) => {
                present(session, icons, view);
                return Err(error);
            }
        }
    }
    Ok(())
}

pub fn apply_event(
    session: &mut SessionController,
    event: SessionEvent,
) -> Result<Flow, RuntimeError> {
    match event {
        SessionEvent::Activate => session.on_activate(),
        SessionEvent::CoordinatorFailed(error) => return Err(RuntimeError::AcceptorFailed(error)),
        SessionEvent::Quit => return Ok(Flow::Exit),
        input if !session.is_visible() => log::debug!("dropping {input:?} while hidden"),
        SessionEvent::QueryChanged(text) => session.on_query_changed(&text),
        SessionEvent::CursorMove(delta) => session.on_cursor_move(delta),
        SessionEvent::Dismiss => session.on_dismiss(),
        SessionEvent::LaunchRequested => match session.on_launch_requested() {
            Ok(LaunchOutcome::Exit) => return Ok(Flow::Exit),
            Ok(LaunchOutcome::Idle | LaunchOutcome::Hidden) => {}
            Err(error) if session.launch_mode() == LaunchMode::Exit => return Err(error.into()),
            Err(error) => log::warn!("{error}"),
        },
    }
    Ok(Flow::Continue)
}
