use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::model::Entry;

const DESKTOP_ENTRY_GROUP: &str = "[Desktop Entry]";
const DESKTOP_FILE_EXTENSION: &str = "desktop";
const MAX_SCAN_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    UnreadableRoot { root: PathBuf, message: String },
    UnreadableEntry { path: PathBuf, message: String },
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnreadableRoot { root, message } => {
                write!(f, "cannot read application dir {}: {message}", root.display())
            }
            Self::UnreadableEntry { path, message } => {
                write!(f, "cannot read desktop entry {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Entries gathered from every readable root, plus whatever was skipped.
#[derive(Debug, Default)]
pub struct CatalogLoad {
    pub entries: Vec<Entry>,
    pub errors: Vec<CatalogError>,
}

pub trait EntrySource {
    fn source_name(&self) -> &'static str;
    fn load(&self) -> CatalogLoad;
}

pub struct DesktopEntrySource {
    roots: Vec<PathBuf>,
    desktop_name: String,
}

impl DesktopEntrySource {
    pub fn new(roots: Vec<PathBuf>, desktop_name: &str) -> Self {
        Self {
            roots,
            desktop_name: desktop_name.to_string(),
        }
    }
}

impl EntrySource for DesktopEntrySource {
    fn source_name(&self) -> &'static str {
        "desktop-entries"
    }

    fn load(&self) -> CatalogLoad {
        load_entries(&self.roots, &self.desktop_name)
    }
}

pub struct StaticEntrySource {
    entries: Vec<Entry>,
}

impl StaticEntrySource {
    pub fn from_entries(entries: Vec<Entry>) -> Self {
        Self { entries }
    }
}

impl EntrySource for StaticEntrySource {
    fn source_name(&self) -> &'static str {
        "static"
    }

    fn load(&self) -> CatalogLoad {
        CatalogLoad {
            entries: self.entries.clone(),
            errors: Vec::new(),
        }
    }
}

/// Loads every `*.desktop` file under `roots`, in root order and then file
/// name order. Unreadable roots and files are skipped and reported.
pub fn load_entries(roots: &[PathBuf], desktop_name: &str) -> CatalogLoad {
    let mut load = CatalogLoad::default();

    for root in roots {
        if !root.exists() {
            log::debug!("application dir {} does not exist; skipping", root.display());
            continue;
        }
        load_root(root, desktop_name, &mut load);
    }

    log::info!(
        "catalog loaded entries={} skipped={}",
        load.entries.len(),
        load.errors.len()
    );
    load
}

fn load_root(root: &Path, desktop_name: &str, load: &mut CatalogLoad) {
    let walker = WalkDir::new(root)
        .follow_links(true)
        .max_depth(MAX_SCAN_DEPTH)
        .sort_by_file_name();

    for item in walker {
        let dir_entry = match item {
            Ok(dir_entry) => dir_entry,
            Err(error) => {
                let failed = error.path().unwrap_or(root).to_path_buf();
                let catalog_error = if failed.as_path() == root {
                    CatalogError::UnreadableRoot {
                        root: root.to_path_buf(),
                        message: error.to_string(),
                    }
                } else {
                    CatalogError::UnreadableEntry {
                        path: failed,
                        message: error.to_string(),
                    }
                };
                log::warn!("{catalog_error}");
                load.errors.push(catalog_error);
                continue;
            }
        };

        let path = dir_entry.path();
        if !dir_entry.file_type().is_file() || !is_desktop_file(path) {
            continue;
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match parse_desktop_entry(&contents, desktop_name) {
                Some(entry) => load.entries.push(entry),
                None => log::debug!("{} is not a launchable entry", path.display()),
            },
            Err(error) => {
                let catalog_error = CatalogError::UnreadableEntry {
                    path: path.to_path_buf(),
                    message: error.to_string(),
                };
                log::warn!("{catalog_error}");
                load.errors.push(catalog_error);
            }
        }
    }
}

fn is_desktop_file(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension == DESKTOP_FILE_EXTENSION)
}

/// Parses the `[Desktop Entry]` group of a desktop file.
///
/// Returns `None` for files without a `Name` or whose `Type` is something
/// other than `Application`.
pub fn parse_desktop_entry(contents: &str, desktop_name: &str) -> Option<Entry> {
    let mut in_entry_group = false;
    let mut kind = None;
    let mut name = None;
    let mut comment = None;
    let mut exec = None;
    let mut icon = None;
    let mut no_display = false;
    let mut hidden = false;
    let mut only_show_in: Vec<String> = Vec::new();

    for raw_line in contents.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            in_entry_group = line == DESKTOP_ENTRY_GROUP;
            continue;
        }
        if !in_entry_group {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        let value = value.trim();
        match key.trim() {
            "Type" => kind = Some(value.to_string()),
            "Name" => name = Some(value.to_string()),
            "Comment" => comment = Some(value.to_string()),
            "Exec" => exec = Some(value.to_string()),
            "Icon" => icon = Some(value.to_string()),
            "NoDisplay" => no_display = value.eq_ignore_ascii_case("true"),
            "Hidden" => hidden = value.eq_ignore_ascii_case("true"),
            "OnlyShowIn" => {
                only_show_in = value
                    .split(';')
                    .map(str::trim)
                    .filter(|identifier| !identifier.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => {}
        }
    }

    if kind.as_deref().is_some_and(|kind| kind != "Application") {
        return None;
    }
    let name = name.filter(|name| !name.is_empty())?;
    let visible = !no_display
        && !hidden
        && (only_show_in.is_empty() || only_show_in.iter().any(|id| id == desktop_name));

    Some(Entry::from_owned(
        name,
        exec.filter(|exec| !exec.is_empty()),
        comment.filter(|comment| !comment.is_empty()),
        icon.filter(|icon| !icon.is_empty()),
        visible,
    ))
}

/// Stable reorder by descending launch count; unknown names count as zero.
pub fn order_by_frequency(entries: Vec<Entry>, history: &BTreeMap<String, u32>) -> Vec<Entry> {
    let mut ordered = entries;
    ordered.sort_by_key(|entry| std::cmp::Reverse(history.get(&entry.name).copied().unwrap_or(0)));
    ordered
}
