use tracing::debug;

use super::lines::Line;
use super::{RecipeEntry, UNCATEGORIZED};

/// Carries the active category across the lines of one recognized blob.
#[derive(Debug)]
pub struct SectionTracker {
    current: String,
}

impl Default for SectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionTracker {
    pub fn new() -> Self {
        SectionTracker {
            current: UNCATEGORIZED.to_string(),
        }
    }

    /// Feed one classified line. Section markers update the context and yield
    /// nothing; every other line yields an entry tagged with the active section,
    /// unless its name is empty.
    pub fn observe(&mut self, line: Line) -> Option<RecipeEntry> {
        let (name, page_ref) = match line {
            Line::SectionMarker(section) => {
                self.current = if section.is_empty() {
                    UNCATEGORIZED.to_string()
                } else {
                    section
                };
                debug!(stage = "parse", section = %self.current, "section changed");
                return None;
            }
            Line::PipeEntry { name, page_ref } | Line::PatternEntry { name, page_ref } => {
                (name, page_ref)
            }
            Line::RawLine(text) => (text, String::new()),
        };

        let name = name.trim();
        if name.is_empty() {
            debug!(stage = "parse", page_ref = %page_ref, "dropped entry without a name");
            return None;
        }

        Some(RecipeEntry {
            name: name.to_string(),
            page_ref: page_ref.trim().to_string(),
            section: self.current.clone(),
        })
    }
}

// ── Tests ──
