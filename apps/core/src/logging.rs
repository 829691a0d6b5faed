use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::UNIX_EPOCH;

use log::{LevelFilter, Log, Metadata, Record};

const LOG_FILE_NAME: &str = "keylaunch.log";
const ARCHIVE_PREFIX: &str = "keylaunch-";
const MAX_LOG_BYTES: u64 = 1_000_000;
const MAX_ARCHIVES: usize = 5;

static PANIC_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

enum Sink {
    File(Mutex<File>),
    Stderr,
}

struct FileLogger {
    sink: Sink,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_line(now_secs(), record);
        match &self.sink {
            Sink::File(file) => {
                let Ok(mut file) = file.lock() else {
                    return;
                };
                let _ = file.write_all(line.as_bytes());
            }
            Sink::Stderr => {
                let _ = std::io::stderr().write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        if let Sink::File(file) = &self.sink {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

pub fn logs_dir() -> PathBuf {
    crate::config::stable_app_data_dir().join("logs")
}

/// Installs the process logger. When the log file cannot be opened the
/// logger writes to stderr instead, and the open error is returned so the
/// caller can report it.
pub fn init(level: LevelFilter) -> Result<(), std::io::Error> {
    let (sink, outcome) = match open_log_file(&logs_dir()) {
        Ok(file) => (Sink::File(Mutex::new(file)), Ok(())),
        Err(error) => (Sink::Stderr, Err(error)),
    };

    if log::set_boxed_logger(Box::new(FileLogger { sink })).is_ok() {
        log::set_max_level(level);
    }
    install_panic_hook();
    outcome
}

fn open_log_file(log_dir: &Path) -> Result<File, std::io::Error> {
    fs::create_dir_all(log_dir)?;
    let active = log_dir.join(LOG_FILE_NAME);
    if archive_if_oversized(&active, log_dir)? {
        prune_archives(log_dir)?;
    }

    OpenOptions::new().create(true).append(true).open(&active)
}

fn format_line(ts: u64, record: &Record<'_>) -> String {
    format!(
        "[{ts}] [{}] {}: {}\n",
        record.level(),
        record.target(),
        record.args()
    )
}

fn now_secs() -> u64 {
    UNIX_EPOCH
        .elapsed()
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Moves the active log aside once it reaches `MAX_LOG_BYTES`. Returns
/// whether an archive was written.
fn archive_if_oversized(active: &Path, log_dir: &Path) -> Result<bool, std::io::Error> {
    let size = match fs::metadata(active) {
        Ok(meta) => meta.len(),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(error) => return Err(error),
    };
    if size < MAX_LOG_BYTES {
        return Ok(false);
    }

    fs::rename(active, log_dir.join(format!("{ARCHIVE_PREFIX}{}.log", now_secs())))?;
    Ok(true)
}

fn is_archive(name: &str) -> bool {
    name.starts_with(ARCHIVE_PREFIX) && name.ends_with(".log")
}

/// Archive names embed the rotation time, so name order is age order.
fn prune_archives(log_dir: &Path) -> Result<(), std::io::Error> {
    let mut archives = Vec::new();
    for dir_entry in fs::read_dir(log_dir)? {
        let path = dir_entry?.path();
        if path.file_name().and_then(|name| name.to_str()).is_some_and(is_archive) {
            archives.push(path);
        }
    }

    archives.sort();
    let excess = archives.len().saturating_sub(MAX_ARCHIVES);
    for stale in archives.drain(..excess) {
        if let Err(error) = fs::remove_file(&stale) {
            eprintln!("[keylaunch] cannot remove old log {}: {error}", stale.display());
        }
    }
    Ok(())
}

fn panic_payload(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map_or_else(|| "<unknown>".to_string(), ToString::to_string);
            log::error!("panic at {location}: {}", panic_payload(info.payload()));
            log::logger().flush();
            previous(info);
        }));
    });
}
