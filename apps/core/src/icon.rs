use std::path::{Path, PathBuf};

use crate::model::Entry;

const DEFAULT_ICON_EXTENSION: &str = "png";

/// Finds an icon file for `entry` in the given hicolor-style theme roots.
///
/// Theme roots are tried in order. Within a root the smallest size at or above
/// `target_size` wins; failing that, the largest size below it.
pub fn resolve_icon(entry: &Entry, theme_roots: &[PathBuf], target_size: u32) -> Option<PathBuf> {
    let icon = entry.icon.as_deref()?.trim();
    if icon.is_empty() {
        return None;
    }

    let direct = Path::new(icon);
    if direct.is_absolute() {
        return direct.is_file().then(|| direct.to_path_buf());
    }

    let file_name = if Path::new(icon).extension().is_some() {
        icon.to_string()
    } else {
        format!("{icon}.{DEFAULT_ICON_EXTENSION}")
    };

    theme_roots
        .iter()
        .find_map(|root| best_in_theme(root, &file_name, target_size))
}

fn best_in_theme(root: &Path, file_name: &str, target_size: u32) -> Option<PathBuf> {
    let dirs = std::fs::read_dir(root).ok()?;
    let mut candidates: Vec<(u32, PathBuf)> = dirs
        .filter_map(|dir| dir.ok())
        .filter_map(|dir| {
            let size = parse_size_dir(dir.file_name().to_str()?)?;
            let candidate = dir.path().join("apps").join(file_name);
            candidate.is_file().then_some((size, candidate))
        })
        .collect();

    candidates.sort_by_key(|(size, _)| *size);
    let at_or_above = candidates
        .iter()
        .position(|(size, _)| *size >= target_size);
    let pick = match at_or_above {
        Some(index) => index,
        None => candidates.len().checked_sub(1)?,
    };
    Some(candidates.swap_remove(pick).1)
}

/// Parses size directory names such as `48x48` or `48x48@2`.
fn parse_size_dir(name: &str) -> Option<u32> {
    let (width, rest) = name.split_once('x')?;
    let height = rest.split('@').next()?;
    height.parse::<u32>().ok()?;
    width.parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::parse_size_dir;

    #[test]
    fn size_dirs_parse_width() {
        assert_eq!(parse_size_dir("48x48"), Some(48));
        assert_eq!(parse_size_dir("256x256@2"), Some(256));
        assert_eq!(parse_size_dir("scalable"), None);
        assert_eq!(parse_size_dir("symbolic"), None);
    }
}
