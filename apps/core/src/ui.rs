//! Line-oriented terminal front end.
//!
//! Stands in for a graphical window: stdin lines become session events and
//! the visible session state is printed after each one.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use crate::icon::resolve_icon;
use crate::session::{SessionController, SessionEvent, SessionHandle};

const INPUT_THREAD_NAME: &str = "keylaunch-input";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub name: String,
    pub command: String,
    pub description: String,
    pub icon_path: Option<PathBuf>,
    pub selected: bool,
}

pub trait LauncherView {
    fn show(&mut self, query: &str, rows: &[ResultRow], notice: Option<&str>);
    fn hide(&mut self);
}

pub struct IconLookup {
    pub theme_dirs: Vec<PathBuf>,
    pub size: u32,
}

pub fn result_rows(session: &SessionController, icons: &IconLookup) -> Vec<ResultRow> {
    session
        .results()
        .iter()
        .enumerate()
        .map(|(index, entry)| ResultRow {
            name: entry.name.clone(),
            command: entry.command.clone().unwrap_or_default(),
            description: entry.description.clone().unwrap_or_default(),
            icon_path: resolve_icon(entry, &icons.theme_dirs, icons.size),
            selected: index == session.cursor(),
        })
        .collect()
}

/// Pushes the session's current state to `view`.
pub fn present(session: &SessionController, icons: &IconLookup, view: &mut dyn LauncherView) {
    if session.is_visible() {
        let rows = result_rows(session, icons);
        view.show(session.query(), &rows, session.notice());
    } else {
        view.hide();
    }
}

pub struct TerminalView<W: Write> {
    out: W,
    visible: bool,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            visible: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_frame(
        &mut self,
        query: &str,
        rows: &[ResultRow],
        notice: Option<&str>,
    ) -> std::io::Result<()> {
        writeln!(self.out, "> {query}")?;
        for row in rows {
            let marker = if row.selected { '*' } else { ' ' };
            write!(self.out, "{marker} {}", row.name)?;
            if !row.command.is_empty() {
                write!(self.out, "  ({})", row.command)?;
            }
            if !row.description.is_empty() {
                write!(self.out, "  {}", row.description)?;
            }
            if let Some(icon) = row.icon_path.as_deref().and_then(Path::file_name) {
                write!(self.out, "  [{}]", icon.to_string_lossy())?;
            }
            writeln!(self.out)?;
        }
        if let Some(notice) = notice {
            writeln!(self.out, "! {notice}")?;
        }
        self.out.flush()
    }
}

impl<W: Write> LauncherView for TerminalView<W> {
    fn show(&mut self, query: &str, rows: &[ResultRow], notice: Option<&str>) {
        self.visible = true;
        if let Err(error) = self.write_frame(query, rows, notice) {
            log::warn!("terminal view write failed: {error}");
        }
    }

    fn hide(&mut self) {
        if !self.visible {
            return;
        }
        self.visible = false;
        let _ = writeln!(self.out, "[hidden]");
        let _ = self.out.flush();
    }
}

/// Maps one line of terminal input to a session event.
pub fn parse_input_line(line: &str) -> SessionEvent {
    let line = line.trim_end_matches('\r');
    match line {
        "" => SessionEvent::LaunchRequested,
        ":up" => SessionEvent::CursorMove(-1),
        ":down" => SessionEvent::CursorMove(1),
        ":clear" => SessionEvent::QueryChanged(String::new()),
        ":esc" => SessionEvent::Dismiss,
        ":quit" => SessionEvent::Quit,
        text => SessionEvent::QueryChanged(text.to_string()),
    }
}

/// Reads input lines on a helper thread and posts them to the session.
/// End of input only ends the thread; the session keeps serving activations
/// until an explicit `:quit`.
pub fn spawn_input_reader<R>(reader: R, session: SessionHandle) -> std::io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    std::thread::Builder::new()
        .name(INPUT_THREAD_NAME.to_string())
        .spawn(move || {
            for line in reader.lines() {
                let event = match line {
                    Ok(line) => parse_input_line(&line),
                    Err(error) => {
                        log::warn!("input read failed: {error}");
                        break;
                    }
                };
                if session.post(event).is_err() {
                    return;
                }
            }
            log::debug!("input closed; staying resident");
        })
}
