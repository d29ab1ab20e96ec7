use std::sync::LazyLock;

use regex::Regex;

pub const SECTION_MARKER: &str = "SECTION:";

// <name><separator><pages>[)] where the separator is whitespace, a hyphen/en-dash/em-dash
// with optional spaces, or "(page ", and pages are digit groups, ranged and/or comma-joined.
static NAME_PAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>.+?)(?:\s*[-–—]\s*|\s*\(page\s+|\s+)+(?P<page>\d+(?:\s*[-–]\s*\d+)?(?:\s*,\s*\d+(?:\s*[-–]\s*\d+)?)*)\)?$",
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    SectionMarker(String),
    PipeEntry { name: String, page_ref: String },
    PatternEntry { name: String, page_ref: String },
    /// Nothing matched; the whole line is kept as a name without a page.
    RawLine(String),
}

/// Classify one non-blank line. First matching rule wins:
/// section marker, then pipe split, then the name/page pattern.
pub fn classify_line(line: &str) -> Line {
    let line = line.trim();

    if let Some(section) = line.strip_prefix(SECTION_MARKER) {
        return Line::SectionMarker(section.trim().to_string());
    }

    if let Some((name, page)) = line.split_once('|') {
        return Line::PipeEntry {
            name: name.trim().to_string(),
            page_ref: page.trim().to_string(),
        };
    }

    if let Some(caps) = NAME_PAGE_RE.captures(line) {
        return Line::PatternEntry {
            name: caps["name"].trim().to_string(),
            page_ref: caps["page"].trim().to_string(),
        };
    }

    Line::RawLine(line.to_string())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(line: &str) -> (String, String) {
        match classify_line(line) {
            Line::PipeEntry { name, page_ref } | Line::PatternEntry { name, page_ref } => {
                (name, page_ref)
            }
            other => panic!("expected an entry for {:?}, got {:?}", line, other),
        }
    }

    #[test]
    fn section_marker() {
        assert_eq!(
            classify_line("SECTION: Desserts"),
            Line::SectionMarker("Desserts".to_string())
        );
        assert_eq!(classify_line("SECTION:"), Line::SectionMarker(String::new()));
    }

    #[test]
    fn marker_is_case_sensitive() {
        assert!(matches!(classify_line("Section: Desserts"), Line::RawLine(_)));
    }

    #[test]
    fn pipe_split() {
        assert_eq!(
            classify_line("Jollof Rice | 120"),
            Line::PipeEntry {
                name: "Jollof Rice".to_string(),
                page_ref: "120".to_string()
            }
        );
    }

    #[test]
    fn pipe_splits_on_first_only() {
        assert_eq!(entry("Fish | Chips | 12"), ("Fish".into(), "Chips | 12".into()));
    }

    #[test]
    fn pipe_wins_over_pattern() {
        assert!(matches!(classify_line("Cake 55 | 56"), Line::PipeEntry { .. }));
    }

    #[test]
    fn whitespace_separator() {
        assert!(matches!(classify_line("Cake 55"), Line::PatternEntry { .. }));
        assert_eq!(entry("Cake 55"), ("Cake".into(), "55".into()));
    }

    #[test]
    fn dash_separators() {
        assert_eq!(entry("Chicken Korma - 95"), ("Chicken Korma".into(), "95".into()));
        assert_eq!(entry("Chicken Korma – 95"), ("Chicken Korma".into(), "95".into()));
        assert_eq!(entry("Chicken Korma—95"), ("Chicken Korma".into(), "95".into()));
    }

    #[test]
    fn page_prefix_and_closing_paren() {
        assert_eq!(entry("Dal Makhani (page 92)"), ("Dal Makhani".into(), "92".into()));
    }

    #[test]
    fn ranges_and_lists() {
        assert_eq!(entry("Lamb Biryani 102-111"), ("Lamb Biryani".into(), "102-111".into()));
        assert_eq!(entry("Coconut Rice 64,65"), ("Coconut Rice".into(), "64,65".into()));
        assert_eq!(
            entry("Rice Pudding 212, 214"),
            ("Rice Pudding".into(), "212, 214".into())
        );
    }

    #[test]
    fn leading_digits_stay_in_name() {
        assert_eq!(entry("7-Up Cake 33"), ("7-Up Cake".into(), "33".into()));
    }

    #[test]
    fn no_page_is_raw() {
        assert_eq!(
            classify_line("  Paneer Butter Masala "),
            Line::RawLine("Paneer Butter Masala".to_string())
        );
    }

    #[test]
    fn embedded_digits_are_not_pages() {
        assert!(matches!(classify_line("5 Spice Chicken"), Line::RawLine(_)));
    }
}
