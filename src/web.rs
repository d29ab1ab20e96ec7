//! Capture a single recipe from a web page into a note.

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::render;
use crate::store::{self, PersistOutcome};

pub const UNTITLED: &str = "Untitled Recipe";

const INGREDIENT_SELECTORS: &[&str] = &[
    ".ingredient",
    ".ingredients-item",
    ".recipe-ingredients li",
    "ul[class*=ingredient]",
    "li[class*=ingredient]",
    "span[class*=ingredient]",
    "div[class*=ingredient]",
    ".tasty-recipes-ingredients-body li",
    ".ingredients",
    "section.ingredients",
    "ol.ingredients li",
    ".recipe__ingredients li",
];

const INSTRUCTION_SELECTORS: &[&str] = &[
    ".instruction",
    ".instructions-step",
    ".recipe-instructions li",
    "p[class*=instruction]",
    "div[class*=step]",
    "div[class*=directions]",
    "section[class*=directions]",
    ".tasty-recipes-instructions-body li",
    ".instructions",
    "section.instructions",
    ".recipe__instructions li",
    "div.recipe-method li",
    "section.recipe-method li",
];

static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static LI: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebRecipe {
    pub title: String,
    pub url: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
}

pub async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("cannot fetch {}", url))?
        .error_for_status()
        .with_context(|| format!("bad response from {}", url))?;
    Ok(resp.text().await?)
}

/// Pull title, ingredients and instructions out of a recipe page.
pub fn extract_recipe(html: &str, url: &str) -> WebRecipe {
    let document = Html::parse_document(html);

    let title = document
        .select(&H1)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let ingredients = collect_items(&document, INGREDIENT_SELECTORS);
    let instructions = collect_items(&document, INSTRUCTION_SELECTORS);
    if ingredients.is_empty() {
        warn!(stage = "parse", source = %url, "no ingredients found");
    }
    if instructions.is_empty() {
        warn!(stage = "parse", source = %url, "no instructions found");
    }

    WebRecipe {
        title,
        url: url.to_string(),
        ingredients,
        instructions,
    }
}

/// Texts matched by any selector, first occurrence wins. A container holding
/// list items contributes its items rather than its whole text.
fn collect_items(document: &Html, selectors: &[&str]) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for selector_str in selectors {
        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(_) => {
                debug!(stage = "parse", selector = %selector_str, "invalid selector");
                continue;
            }
        };
        for element in document.select(&selector) {
            let mut texts: Vec<String> = element.select(&LI).map(element_text).collect();
            if texts.is_empty() {
                texts.push(element_text(element));
            }
            for text in texts {
                if !text.is_empty() && !items.contains(&text) {
                    items.push(text);
                }
            }
        }
    }
    items
}

fn element_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `Pilau Rice` -> `pilau_rice`, then made filesystem safe.
pub fn file_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Fetch, extract and save one page. Existing notes are replaced.
pub async fn capture(
    url: &str,
    target_dir: &Path,
    status: &str,
    timeout: Duration,
) -> Result<(WebRecipe, PersistOutcome)> {
    let client = Client::builder().timeout(timeout).build()?;
    let html = fetch_page(&client, url).await?;
    let recipe = extract_recipe(&html, url);
    info!(
        stage = "parse",
        source = %url,
        title = %recipe.title,
        ingredients = recipe.ingredients.len(),
        instructions = recipe.instructions.len(),
        "recipe extracted"
    );

    let doc = render::render_web(&recipe, status);
    let outcome = store::persist(&file_title(&recipe.title), &doc.to_markdown(), target_dir, true);
    Ok((recipe, outcome))
}

// ── Tests ──
