use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

static INVALID_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).unwrap());

pub const MAX_STEM_CHARS: usize = 50;
pub const PLACEHOLDER_STEM: &str = "untitled-recipe";
const EXTENSION: &str = "md";

#[derive(Debug)]
pub enum PersistOutcome {
    Saved(PathBuf),
    /// File already present and overwriting was not requested.
    Skipped(PathBuf),
    Failed { path: PathBuf, error: io::Error },
}

/// Filename stem for a title: path-illegal characters removed, capped at
/// `MAX_STEM_CHARS`, placeholder when nothing is left.
pub fn safe_file_stem(title: &str) -> String {
    let cleaned = INVALID_CHARS_RE.replace_all(title, "");
    let capped: String = cleaned.trim().chars().take(MAX_STEM_CHARS).collect();
    // Windows rejects names ending in a dot or space
    let capped = capped.trim_end_matches(['.', ' ']).trim_start();
    if capped.is_empty() {
        PLACEHOLDER_STEM.to_string()
    } else {
        capped.to_string()
    }
}

pub fn document_path(target_dir: &Path, title: &str) -> PathBuf {
    target_dir.join(format!("{}.{}", safe_file_stem(title), EXTENSION))
}

/// Write `content` as `<target_dir>/<safe title>.md`.
pub fn persist(title: &str, content: &str, target_dir: &Path, overwrite: bool) -> PersistOutcome {
    let path = document_path(target_dir, title);

    if let Err(error) = fs::create_dir_all(target_dir) {
        return PersistOutcome::Failed { path, error };
    }

    if !overwrite && path.is_file() {
        debug!(stage = "persist", path = %path.display(), "exists, skipping");
        return PersistOutcome::Skipped(path);
    }

    match fs::write(&path, content) {
        Ok(()) => {
            info!(stage = "persist", path = %path.display(), "saved");
            PersistOutcome::Saved(path)
        }
        Err(error) => {
            warn!(stage = "persist", path = %path.display(), %error, "could not write file");
            PersistOutcome::Failed { path, error }
        }
    }
}

// ── Tests ──
