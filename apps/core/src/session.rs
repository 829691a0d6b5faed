use std::fmt::{Display, Formatter};
use std::sync::mpsc::{self, Receiver, Sender};

use serde::{Deserialize, Serialize};

use crate::action_executor::SpawnError;
use crate::catalog::order_by_frequency;
use crate::history::SelectionHistory;
use crate::model::Entry;
use crate::search::rank_limited;

/// What the session does with itself after a successful launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchMode {
    /// Stay resident and hide until the next activation.
    #[default]
    Hide,
    /// Exit the process once the command has started.
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    Idle,
    Hidden,
    Exit,
}

#[derive(Debug)]
pub enum SessionError {
    Launch { name: String, error: SpawnError },
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Launch { name, error } => write!(f, "unable to launch {name}: {error}"),
        }
    }
}

impl std::error::Error for SessionError {}

pub trait Launcher {
    fn launch(&mut self, command: &str) -> Result<(), SpawnError>;
}

/// Units of work for the UI thread. Producers on other threads only ever
/// post these; they never touch session state directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    QueryChanged(String),
    CursorMove(i32),
    LaunchRequested,
    Dismiss,
    Activate,
    CoordinatorFailed(String),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClosed;

impl Display for SessionClosed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "session event queue is closed")
    }
}

impl std::error::Error for SessionClosed {}

#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: Sender<SessionEvent>,
}

impl SessionHandle {
    pub fn post(&self, event: SessionEvent) -> Result<(), SessionClosed> {
        self.tx.send(event).map_err(|_| SessionClosed)
    }

    pub fn activate(&self) -> Result<(), SessionClosed> {
        self.post(SessionEvent::Activate)
    }
}

pub fn session_channel() -> (SessionHandle, Receiver<SessionEvent>) {
    let (tx, rx) = mpsc::channel();
    (SessionHandle { tx }, rx)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub suggestion_limit: usize,
    pub launch_mode: LaunchMode,
}

pub struct SessionController {
    catalog: Vec<Entry>,
    history: SelectionHistory,
    launcher: Box<dyn Launcher>,
    options: SessionOptions,
    query: String,
    results: Vec<Entry>,
    cursor: usize,
    visible: bool,
    notice: Option<String>,
}

impl SessionController {
    pub fn new(
        entries: Vec<Entry>,
        history: SelectionHistory,
        launcher: Box<dyn Launcher>,
        options: SessionOptions,
    ) -> Self {
        let catalog = order_by_frequency(entries, &history.snapshot());
        let results = rank_limited(&catalog, "", options.suggestion_limit);
        Self {
            catalog,
            history,
            launcher,
            options,
            query: String::new(),
            results,
            cursor: 0,
            visible: false,
            notice: None,
        }
    }

    pub fn history(&self) -> &SelectionHistory {
        &self.history
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[Entry] {
        &self.results
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selected(&self) -> Option<&Entry> {
        self.results.get(self.cursor)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn launch_mode(&self) -> LaunchMode {
        self.options.launch_mode
    }

    pub fn on_query_changed(&mut self, text: &str) {
        self.query = text.to_string();
        self.refresh_results();
    }

    /// Moves the cursor one row in the direction of `delta`, wrapping at
    /// either end. Larger deltas still move a single row.
    pub fn on_cursor_move(&mut self, delta: i32) {
        let len = self.results.len();
        let step = delta.signum();
        if len == 0 || step == 0 {
            return;
        }

        let next = (self.cursor as i64 + step as i64).rem_euclid(len as i64);
        self.cursor = next as usize;
    }

    pub fn on_launch_requested(&mut self) -> Result<LaunchOutcome, SessionError> {
        let Some(entry) = self.selected().cloned() else {
            return Ok(LaunchOutcome::Idle);
        };
        let Some(command) = entry.command.as_deref() else {
            return Err(self.launch_failed(&entry.name, SpawnError::EmptyCommand));
        };

        let launches = self.history.increment(&entry.name);
        log::info!("launching name={} command={command} launches={launches}", entry.name);

        if let Err(error) = self.launcher.launch(command) {
            return Err(self.launch_failed(&entry.name, error));
        }

        self.notice = None;
        match self.options.launch_mode {
            LaunchMode::Hide => {
                self.visible = false;
                self.reset_query();
                Ok(LaunchOutcome::Hidden)
            }
            LaunchMode::Exit => Ok(LaunchOutcome::Exit),
        }
    }

    /// Brings the session to the foreground in its browse state. Runs on the
    /// UI thread only; other threads reach it through a `SessionHandle`.
    pub fn on_activate(&mut self) {
        let catalog = std::mem::take(&mut self.catalog);
        self.catalog = order_by_frequency(catalog, &self.history.snapshot());
        self.notice = None;
        self.reset_query();
        self.visible = true;
    }

    pub fn on_dismiss(&mut self) {
        self.visible = false;
        self.notice = None;
        self.reset_query();
    }

    fn reset_query(&mut self) {
        self.query.clear();
        self.refresh_results();
    }

    fn refresh_results(&mut self) {
        self.results = rank_limited(&self.catalog, &self.query, self.options.suggestion_limit);
        self.cursor = 0;
    }

    fn launch_failed(&mut self, name: &str, error: SpawnError) -> SessionError {
        log::error!("launch failed name={name}: {error}");
        self.notice = Some(format!("Unable to launch {name}"));
        SessionError::Launch {
            name: name.to_string(),
            error,
        }
    }
}
