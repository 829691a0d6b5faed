use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum HistoryError {
    Io(std::io::Error),
    Parse { line: usize, content: String },
}

impl Display for HistoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(error) => write!(f, "io error: {error}"),
            Self::Parse { line, content } => {
                write!(f, "malformed history record at line {line}: {content:?}")
            }
        }
    }
}

impl std::error::Error for HistoryError {}

impl From<std::io::Error> for HistoryError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Launch counts keyed by entry name, written through to a `<count>:<name>`
/// line file on every change.
///
/// Names are stored unescaped. Two entries sharing a display name share a
/// count.
#[derive(Debug)]
pub struct SelectionHistory {
    path: PathBuf,
    counts: BTreeMap<String, u32>,
}

impl SelectionHistory {
    /// Reads the store at `path`. History is advisory: a missing file is a
    /// first run and any read or parse failure is logged and ignored.
    pub fn load(path: &Path) -> Self {
        let counts = match read_counts(path) {
            Ok(counts) => counts,
            Err(HistoryError::Io(error)) if error.kind() == std::io::ErrorKind::NotFound => {
                BTreeMap::new()
            }
            Err(error) => {
                log::warn!("ignoring history at {}: {error}", path.display());
                BTreeMap::new()
            }
        };

        Self {
            path: path.to_path_buf(),
            counts,
        }
    }

    pub fn count(&self, name: &str) -> u32 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> BTreeMap<String, u32> {
        self.counts.clone()
    }

    pub fn increment(&mut self, name: &str) -> u32 {
        let count = self.counts.entry(name.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        let updated = *count;

        if let Err(error) = self.persist() {
            log::warn!("failed to persist history to {}: {error}", self.path.display());
        }
        updated
    }

    pub fn persist(&self) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, encode_counts(&self.counts))?;
        Ok(())
    }
}

fn read_counts(path: &Path) -> Result<BTreeMap<String, u32>, HistoryError> {
    let raw = std::fs::read_to_string(path)?;
    decode_counts(&raw)
}

pub fn decode_counts(raw: &str) -> Result<BTreeMap<String, u32>, HistoryError> {
    let mut counts = BTreeMap::new();
    for (index, line) in raw.lines().enumerate() {
        let Some((count, name)) = line.split_once(':') else {
            continue;
        };
        let count = count.trim().parse::<u32>().map_err(|_| HistoryError::Parse {
            line: index + 1,
            content: line.to_string(),
        })?;
        counts.insert(name.to_string(), count);
    }
    Ok(counts)
}

pub fn encode_counts(counts: &BTreeMap<String, u32>) -> String {
    let mut out = String::new();
    for (name, count) in counts {
        out.push_str(&format!("{count}:{name}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{decode_counts, encode_counts, HistoryError};

    #[test]
    fn splits_at_first_colon() {
        let counts = decode_counts("2:Foo: The Game\n").unwrap();
        assert_eq!(counts.get("Foo: The Game"), Some(&2));
    }

    #[test]
    fn skips_lines_without_separator() {
        let counts = decode_counts("garbage\n4:Terminal\n\n").unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get("Terminal"), Some(&4));
    }

    #[test]
    fn rejects_non_numeric_count() {
        let error = decode_counts("1:Files\nmany:Firefox\n").unwrap_err();
        assert!(matches!(error, HistoryError::Parse { line: 2, .. }));
    }

    #[test]
    fn encodes_sorted_by_name() {
        let counts = decode_counts("1:Terminal\n3:Firefox\n").unwrap();
        assert_eq!(encode_counts(&counts), "3:Firefox\n1:Terminal\n");
    }
}
