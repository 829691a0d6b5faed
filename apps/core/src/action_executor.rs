use std::fmt::{Display, Formatter};
use std::process::{Child, Command, Stdio};

use crate::session::Launcher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    EmptyCommand,
    Failed { command: String, message: String },
}

impl Display for SpawnError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCommand => write!(f, "empty command"),
            Self::Failed { command, message } => {
                write!(f, "failed to start '{command}': {message}")
            }
        }
    }
}

impl std::error::Error for SpawnError {}

pub fn launch(command: &str) -> Result<Child, SpawnError> {
    let argv = command_argv(command);
    let Some((program, args)) = argv.split_first() else {
        return Err(SpawnError::EmptyCommand);
    };

    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|error| SpawnError::Failed {
            command: command.to_string(),
            message: error.to_string(),
        })
}

/// Splits an `Exec` value into argv, dropping field codes.
pub fn command_argv(command: &str) -> Vec<String> {
    split_arguments(command)
        .into_iter()
        .filter_map(|argument| expand_field_codes(&argument))
        .collect()
}

/// Removes desktop-entry field codes (`%f`, `%U`, ...) and unescapes `%%`.
/// An argument that consisted only of a field code disappears.
fn expand_field_codes(argument: &str) -> Option<String> {
    let mut out = String::with_capacity(argument.len());
    let mut had_code = false;
    let mut chars = argument.chars();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some(_) | None => had_code = true,
        }
    }

    if had_code && out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn split_arguments(command: &str) -> Vec<String> {
    let mut arguments = Vec::new();
    let mut current = String::new();
    let mut in_argument = false;
    let mut quoted = false;
    let mut chars = command.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_argument = true;
            }
            '\\' if quoted => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ch if ch.is_whitespace() && !quoted => {
                if in_argument {
                    arguments.push(std::mem::take(&mut current));
                    in_argument = false;
                }
            }
            ch => {
                current.push(ch);
                in_argument = true;
            }
        }
    }
    if in_argument {
        arguments.push(current);
    }
    arguments
}

/// Spawns commands as detached children and reaps the ones that have exited
/// on each later launch.
#[derive(Default)]
pub struct ProcessLauncher {
    children: Vec<Child>,
}

impl ProcessLauncher {
    pub fn running_children(&self) -> usize {
        self.children.len()
    }

    fn reap_finished(&mut self) {
        self.children
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&mut self, command: &str) -> Result<(), SpawnError> {
        self.reap_finished();
        let child = launch(command)?;
        log::debug!("spawned pid={} command={command}", child.id());
        self.children.push(child);
        Ok(())
    }
}
