pub mod lines;
pub mod normalize;
pub mod sections;
pub mod segment;

use serde::Deserialize;

use lines::Line;
use sections::SectionTracker;

/// Category attached to entries seen before any section marker.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// One recipe reference pulled out of an index page, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeEntry {
    pub name: String,
    /// Empty, a single page, a comma-joined list or a dash range.
    pub page_ref: String,
    pub section: String,
}

/// How a recognized text blob is split into entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Merge lines until one ends in a page number; the number stays in the title.
    PageBoundary,
    /// One entry per line, `SECTION:` markers and `name | page` pairs.
    #[default]
    Structured,
}

impl Strategy {
    /// Instruction sent to the recognizer alongside each image.
    pub fn instruction(self) -> &'static str {
        match self {
            Strategy::PageBoundary => {
                "Extract all the recipe titles from this cookbook index image accurately. \
                 Write one title per line, keeping the page number printed after it."
            }
            Strategy::Structured => {
                "Extract every recipe listed in this cookbook index image. \
                 When the page starts a new category, write a line `SECTION: <category>`. \
                 Write each recipe on its own line as `<recipe name> | <page>`, where page \
                 is a number, a comma-separated list or a range like 102-111. \
                 Output nothing else."
            }
        }
    }
}

/// Split a recognized blob into entries tagged with their section.
/// Section context starts over for every blob.
pub fn extract_entries(raw: &str, strategy: Strategy) -> Vec<RecipeEntry> {
    let mut tracker = SectionTracker::new();
    match strategy {
        Strategy::PageBoundary => segment::group_by_page_number(raw)
            .into_iter()
            .filter_map(|candidate| tracker.observe(Line::RawLine(candidate)))
            .collect(),
        Strategy::Structured => raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter_map(|l| tracker.observe(lines::classify_line(l)))
            .collect(),
    }
}

// ── Tests ──
