use chrono::{Local, NaiveDate};

use crate::parser::normalize::NormalizedRecord;
use crate::parser::UNCATEGORIZED;
use crate::web::WebRecipe;

const BASE_TAG: &str = "cookbook";
const WEB_TAGS: &[&str] = &["recipe", "saved"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Quoted(String),
    Plain(String),
    List(Vec<String>),
}

/// A recipe note: frontmatter fields in fixed order plus a markdown body.
#[derive(Debug, Clone)]
pub struct Document {
    pub front_matter: Vec<(&'static str, FieldValue)>,
    pub body: String,
}

impl Document {
    #[cfg(test)]
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.front_matter
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::from("---\n");
        for (key, value) in &self.front_matter {
            let rendered = match value {
                FieldValue::Quoted(s) => quote(s),
                FieldValue::Plain(s) => s.clone(),
                FieldValue::List(items) => format!(
                    "[{}]",
                    items.iter().map(|i| quote(i)).collect::<Vec<_>>().join(", ")
                ),
            };
            out.push_str(&format!("{}: {}\n", key, rendered));
        }
        out.push_str("---\n\n");
        out.push_str(&self.body);
        out
    }
}

/// Render a record as of today's local date.
pub fn render(record: &NormalizedRecord, source: &str, status: &str) -> Document {
    render_on(record, source, status, Local::now().date_naive())
}

pub fn render_on(
    record: &NormalizedRecord,
    source: &str,
    status: &str,
    date: NaiveDate,
) -> Document {
    let front_matter = vec![
        ("title", FieldValue::Quoted(record.name.clone())),
        ("source", FieldValue::Quoted(source.to_string())),
        ("page", FieldValue::Quoted(record.page_ref.clone())),
        ("category", FieldValue::Quoted(record.section.clone())),
        ("tags", FieldValue::List(derive_tags(source, &record.section))),
        ("date", FieldValue::Plain(date.format("%Y-%m-%d").to_string())),
        ("status", FieldValue::Quoted(status.to_string())),
    ];

    let mut body = format!("# {}\n\n**Source:** {}\n", record.name, source);
    if !record.page_ref.is_empty() {
        body.push_str(&format!("**Page:** {}\n", record.page_ref));
    }
    body.push_str(&format!("**Category:** {}\n", record.section));
    push_list(&mut body, "Ingredients", &[], false, "- ");
    push_list(&mut body, "Instructions", &[], true, "1. ");
    body.push_str("\n## Notes\n\n");

    Document { front_matter, body }
}

/// Render a recipe captured from a web page, lists filled in.
pub fn render_web(recipe: &WebRecipe, status: &str) -> Document {
    render_web_on(recipe, status, Local::now().date_naive())
}

pub fn render_web_on(recipe: &WebRecipe, status: &str, date: NaiveDate) -> Document {
    let front_matter = vec![
        ("title", FieldValue::Quoted(recipe.title.clone())),
        ("source", FieldValue::Quoted(recipe.url.clone())),
        ("tags", FieldValue::List(WEB_TAGS.iter().map(|t| t.to_string()).collect())),
        ("date", FieldValue::Plain(date.format("%Y-%m-%d").to_string())),
        ("status", FieldValue::Quoted(status.to_string())),
    ];

    let mut body = format!("# {}\n\n**Source:** {}\n", recipe.title, recipe.url);
    push_list(&mut body, "Ingredients", &recipe.ingredients, false, "*No ingredients found*");
    push_list(&mut body, "Instructions", &recipe.instructions, true, "*No instructions found*");
    body.push_str("\n## Notes\n\n");

    Document { front_matter, body }
}

fn push_list(body: &mut String, heading: &str, items: &[String], numbered: bool, empty: &str) {
    body.push_str(&format!("\n## {}\n", heading));
    if items.is_empty() {
        body.push_str(empty);
        body.push('\n');
        return;
    }
    for (i, item) in items.iter().enumerate() {
        if numbered {
            body.push_str(&format!("{}. {}\n", i + 1, item));
        } else {
            body.push_str(&format!("- {}\n", item));
        }
    }
}

/// `cookbook`, then the source, then the section unless it is the
/// uncategorized sentinel. Empty and repeated tags are left out.
pub fn derive_tags(source: &str, section: &str) -> Vec<String> {
    let mut tags = vec![BASE_TAG.to_string()];
    let mut candidates = vec![tag_slug(source)];
    if section != UNCATEGORIZED {
        candidates.push(tag_slug(section));
    }
    for tag in candidates {
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn tag_slug(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect()
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

// ── Tests ──
