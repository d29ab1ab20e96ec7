use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::RecipeEntry;

// " 143", " 64,65" or " 102-111" at the very end
static PAGE_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s(\d{1,3}(?:-\d{1,3})?|\d{1,3},\d{1,3})$").unwrap());

/// A recipe entry ready for rendering: trimmed, page suffix removed, name never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub name: String,
    pub page_ref: String,
    pub section: String,
}

/// Remove a trailing page suffix from a title. Keeps the whole title when
/// stripping would leave nothing.
pub fn strip_page_number(title: &str) -> String {
    let title = title.trim();
    let cleaned = PAGE_SUFFIX_RE.replace(title, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        title.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Clean an entry's name. Entries whose name is blank are dropped. Titles only
/// lose a page suffix when the entry has no page yet; the suffix becomes its page.
pub fn normalize(entry: RecipeEntry) -> Option<NormalizedRecord> {
    let raw = entry.name.trim();
    if raw.is_empty() {
        return None;
    }

    let existing = entry.page_ref.trim();
    let (name, page_ref) = if existing.is_empty() {
        let name = strip_page_number(raw);
        // stripped titles are always a prefix of the trimmed original
        let pages = raw[name.len()..].trim().to_string();
        if !pages.is_empty() {
            debug!(stage = "normalize", name = %name, pages = %pages, "page taken from title");
        }
        (name, pages)
    } else {
        (raw.to_string(), existing.to_string())
    };

    Some(NormalizedRecord {
        name,
        page_ref,
        section: entry.section,
    })
}

// ── Tests ──
