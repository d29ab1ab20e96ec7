use std::sync::LazyLock;

use regex::Regex;

static TRAILING_PAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{1,3}$").unwrap());

/// Merge lines into title candidates, closing a group whenever a line ends in a
/// page number. A trailing group with no page number is still emitted.
pub fn group_by_page_number(raw: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        pending.push(line);
        if TRAILING_PAGE_RE.is_match(line) {
            candidates.push(pending.join(" "));
            pending.clear();
        }
    }

    if !pending.is_empty() {
        candidates.push(pending.join(" "));
    }

    candidates
}

// ── Tests ──
