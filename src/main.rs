mod batch;
mod images;
mod parser;
mod recognizer;
mod render;
mod settings;
mod store;
mod web;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use batch::{BatchOptions, BatchReport};
use parser::Strategy;
use recognizer::VisionClient;
use settings::Settings;
use store::PersistOutcome;

#[derive(Parser)]
#[command(
    name = "cookbook_indexer",
    about = "Turn photographed cookbook index pages into one markdown note per recipe"
)]
struct Cli {
    #[command(flatten)]
    input: Input,
    /// Cookbook name written into every note
    #[arg(short, long)]
    source: Option<String>,
    /// Directory the notes are written to
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Recognition API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// How recognized text is split into recipes
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,
    /// Value of the `status` field in new notes
    #[arg(long)]
    status: Option<String>,
    /// Milliseconds to wait between recognition calls
    #[arg(long)]
    delay_ms: Option<u64>,
    /// List what would be written without touching the output directory
    #[arg(long)]
    preview: bool,
    /// Replace notes that already exist
    #[arg(long)]
    overwrite: bool,
    /// Write diagnostics to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Input {
    /// A single index page photo
    #[arg(short, long)]
    image: Option<PathBuf>,
    /// A directory of index page photos
    #[arg(short, long)]
    dir: Option<PathBuf>,
    /// A recipe web page to save as a single note
    #[arg(short, long)]
    url: Option<String>,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(source) = &self.source {
            settings.source = source.clone();
        }
        if let Some(output) = &self.output {
            settings.output_dir = output.clone();
        }
        if let Some(key) = &self.api_key {
            settings.api_key = Some(key.clone());
        }
        if let Some(strategy) = self.strategy {
            settings.strategy = strategy;
        }
        if let Some(status) = &self.status {
            settings.status = status.clone();
        }
        if let Some(delay) = self.delay_ms {
            settings.request_delay_ms = delay;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    let t0 = Instant::now();

    let mut settings = Settings::load()?;
    cli.apply(&mut settings);
    settings.validate()?;

    if let Some(url) = &cli.input.url {
        capture_page(url, &settings, cli.preview).await?;
        report_elapsed(t0.elapsed());
        return Ok(());
    }

    let client = VisionClient::new(settings.vision_config()?)?;
    info!(
        model = %client.config().model,
        endpoint = %client.config().endpoint,
        strategy = ?settings.strategy,
        "recognizer ready"
    );

    let images = match (&cli.input.image, &cli.input.dir) {
        (Some(image), _) => vec![image.clone()],
        (None, Some(dir)) => images::collect_images(dir)?,
        (None, None) => anyhow::bail!("pass --image, --dir or --url"),
    };
    if images.is_empty() {
        println!("No images found.");
        return Ok(());
    }

    let opts = BatchOptions {
        source: settings.source.clone(),
        target_dir: settings.output_dir.clone(),
        strategy: settings.strategy,
        status: settings.status.clone(),
        preview: cli.preview,
        overwrite: cli.overwrite,
        delay: settings.request_delay(),
    };

    if opts.preview {
        println!("Preview: reading {} image(s), nothing will be written...", images.len());
    } else {
        println!(
            "Reading {} image(s) into {}...",
            images.len(),
            opts.target_dir.display()
        );
    }

    let report = batch::process_batch(&client, &images, &opts).await?;
    print_report(&report, opts.preview);

    report_elapsed(t0.elapsed());
    Ok(())
}

async fn capture_page(url: &str, settings: &Settings, preview: bool) -> Result<()> {
    let timeout = Duration::from_secs(settings.request_timeout_secs);

    if preview {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let html = web::fetch_page(&client, url).await?;
        let recipe = web::extract_recipe(&html, url);
        println!("{}", recipe.title);
        println!("\n--- Ingredients ({}) ---", recipe.ingredients.len());
        for item in &recipe.ingredients {
            println!("  - {}", item);
        }
        println!("\n--- Instructions ({}) ---", recipe.instructions.len());
        for (i, step) in recipe.instructions.iter().enumerate() {
            println!("  {}. {}", i + 1, step);
        }
        return Ok(());
    }

    let (recipe, outcome) =
        web::capture(url, &settings.output_dir, &settings.status, timeout).await?;
    match outcome {
        PersistOutcome::Saved(path) => println!(
            "Saved \"{}\" ({} ingredients, {} steps) to {}",
            recipe.title,
            recipe.ingredients.len(),
            recipe.instructions.len(),
            path.display()
        ),
        PersistOutcome::Skipped(path) => println!("Kept existing {}", path.display()),
        PersistOutcome::Failed { path, error } => {
            anyhow::bail!("could not write {}: {}", path.display(), error)
        }
    }
    Ok(())
}

fn report_elapsed(elapsed: Duration) {
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_elapsed(elapsed));
    }
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn print_report(report: &BatchReport, preview: bool) {
    if preview {
        println!(
            "{:>3} | {:<40} | {:<10} | {:<20}",
            "#", "Recipe", "Page", "Category"
        );
        println!("{}", "-".repeat(82));
        for (i, r) in report.records.iter().enumerate() {
            println!(
                "{:>3} | {:<40} | {:<10} | {:<20}",
                i + 1,
                fit(&r.name, 40),
                fit(&r.page_ref, 10),
                fit(&r.section, 20)
            );
        }
        println!(
            "\n{} images | {} entries | {} unique names",
            report.images,
            report.records.len(),
            report.processed.len()
        );
        return;
    }

    println!(
        "Done: {} images, {} saved, {} skipped (already present), {} failed.",
        report.images, report.saved, report.skipped, report.failed
    );
    if !report.processed.is_empty() {
        println!("\n--- Saved ---");
        for name in &report.processed {
            println!("  {}", name);
        }
    }
}

/// Fit `s` into a column of `width` chars, marking cut text with "...".
fn fit(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let keep = width.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(&".".repeat(width - keep));
    out
}

fn format_elapsed(d: Duration) -> String {
    match d.as_secs() {
        s if s < 60 => format!("{:.1}s", d.as_secs_f64()),
        s => format!("{}m {:02}s", s / 60, s % 60),
    }
}

// ── Tests ──
