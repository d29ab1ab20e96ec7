use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::parser::normalize::{normalize, NormalizedRecord};
use crate::parser::{self, Strategy};
use crate::recognizer::Recognizer;
use crate::render;
use crate::store::{self, PersistOutcome};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub source: String,
    pub target_dir: PathBuf,
    pub strategy: Strategy,
    pub status: String,
    /// Extract and report only, write nothing.
    pub preview: bool,
    pub overwrite: bool,
    /// Pause between recognition calls (not before the first).
    pub delay: Duration,
}

#[derive(Debug, Default)]
pub struct ImageReport {
    pub records: Vec<NormalizedRecord>,
    pub saved: Vec<String>,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub images: usize,
    /// Names saved (or, in preview, extracted), deduplicated across the batch.
    pub processed: BTreeSet<String>,
    /// Every extracted record in input order, duplicates included.
    pub records: Vec<NormalizedRecord>,
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Run every image through recognition, parsing, rendering and persistence, one at a time.
pub async fn process_batch(
    recognizer: &dyn Recognizer,
    images: &[PathBuf],
    opts: &BatchOptions,
) -> Result<BatchReport> {
    if !opts.preview {
        fs::create_dir_all(&opts.target_dir).with_context(|| {
            format!("cannot create target directory {}", opts.target_dir.display())
        })?;
    }

    let pb = ProgressBar::new(images.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let mut report = BatchReport::default();

    for (i, image) in images.iter().enumerate() {
        if i > 0 && !opts.delay.is_zero() {
            debug!(stage = "batch", delay_ms = opts.delay.as_millis() as u64, "waiting before next request");
            tokio::time::sleep(opts.delay).await;
        }
        pb.set_message(display_name(image));

        let single = process_single(recognizer, image, opts).await;
        report.images += 1;
        report.saved += single.saved.len();
        report.skipped += single.skipped;
        report.failed += single.failed;

        let names: Vec<String> = if opts.preview {
            single.records.iter().map(|r| r.name.clone()).collect()
        } else {
            single.saved
        };
        for name in names {
            if !report.processed.insert(name.clone()) {
                debug!(stage = "batch", source = %image.display(), name = %name, "duplicate name in batch");
            }
        }
        report.records.extend(single.records);
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        stage = "batch",
        images = report.images,
        saved = report.saved,
        skipped = report.skipped,
        failed = report.failed,
        "batch finished"
    );
    Ok(report)
}

/// Process one image. Never fails: acquisition and write errors are logged and
/// show up as missing entries in the report.
pub async fn process_single(
    recognizer: &dyn Recognizer,
    image: &Path,
    opts: &BatchOptions,
) -> ImageReport {
    let mut report = ImageReport::default();

    let raw = match recognizer.recognize(image, opts.strategy.instruction()).await {
        Ok(text) => text,
        Err(e) => {
            warn!(stage = "acquire", source = %image.display(), error = %e, "no text extracted, skipping image");
            return report;
        }
    };

    let entries = parser::extract_entries(&raw, opts.strategy);
    if entries.is_empty() {
        warn!(stage = "parse", source = %image.display(), "no recipe entries found");
        return report;
    }
    debug!(stage = "parse", source = %image.display(), entries = entries.len(), "entries extracted");

    report.records = entries.into_iter().filter_map(normalize).collect();
    if opts.preview {
        return report;
    }

    for record in &report.records {
        let doc = render::render(record, &opts.source, &opts.status);
        match store::persist(&record.name, &doc.to_markdown(), &opts.target_dir, opts.overwrite) {
            PersistOutcome::Saved(path) => {
                debug!(stage = "persist", source = %image.display(), path = %path.display(), "recipe saved");
                report.saved.push(record.name.clone());
            }
            PersistOutcome::Skipped(path) => {
                info!(stage = "persist", source = %image.display(), path = %path.display(), "already exists, skipped");
                report.skipped += 1;
            }
            PersistOutcome::Failed { path, error } => {
                warn!(
                    stage = "persist",
                    source = %image.display(),
                    path = %path.display(),
                    error = %error,
                    "failed to save recipe"
                );
                report.failed += 1;
            }
        }
    }

    report
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::RecognitionError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Instant;
    use tempfile::TempDir;

    /// Returns canned text per image; images without text fail as not found.
    struct FakeRecognizer {
        pages: HashMap<PathBuf, String>,
        calls: Mutex<Vec<(PathBuf, String)>>,
    }

    impl FakeRecognizer {
        fn new(pages: &[(&str, &str)]) -> Self {
            FakeRecognizer {
                pages: pages
                    .iter()
                    .map(|(p, t)| (PathBuf::from(p), t.to_string()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(PathBuf, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Recognizer for FakeRecognizer {
        async fn recognize(&self, image: &Path, instruction: &str) -> Result<String, RecognitionError> {
            self.calls
                .lock()
                .unwrap()
                .push((image.to_path_buf(), instruction.to_string()));
            self.pages
                .get(image)
                .cloned()
                .ok_or_else(|| RecognitionError::NotFound(image.to_path_buf()))
        }
    }

    fn options(target_dir: &Path, strategy: Strategy) -> BatchOptions {
        BatchOptions {
            source: "East Cookbook".into(),
            target_dir: target_dir.to_path_buf(),
            strategy,
            status: "to-try".into(),
            preview: false,
            overwrite: false,
            delay: Duration::ZERO,
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[tokio::test]
    async fn saves_structured_entries() {
        let tmp = TempDir::new().unwrap();
        let fake = FakeRecognizer::new(&[(
            "p1.jpg",
            "Jollof Rice | 120\nSECTION: Desserts\nCake 55",
        )]);
        let report = process_batch(&fake, &paths(&["p1.jpg"]), &options(tmp.path(), Strategy::Structured))
            .await
            .unwrap();

        assert_eq!(report.saved, 2);
        assert!(report.processed.contains("Jollof Rice"));
        assert!(report.processed.contains("Cake"));

        let cake = fs::read_to_string(tmp.path().join("Cake.md")).unwrap();
        assert!(cake.contains("title: \"Cake\""));
        assert!(cake.contains("page: \"55\""));
        assert!(cake.contains("category: \"Desserts\""));
        assert!(cake.contains("tags: [\"cookbook\", \"east-cookbook\", \"desserts\"]"));
        assert_eq!(fake.calls()[0].1, Strategy::Structured.instruction());
    }

    #[tokio::test]
    async fn sections_reset_per_image() {
        let tmp = TempDir::new().unwrap();
        let fake = FakeRecognizer::new(&[
            ("p1.jpg", "SECTION: Soups\nLentil Soup 12"),
            ("p2.jpg", "Flatbread 40"),
        ]);
        let report = process_batch(
            &fake,
            &paths(&["p1.jpg", "p2.jpg"]),
            &options(tmp.path(), Strategy::Structured),
        )
        .await
        .unwrap();

        let bread = report.records.iter().find(|r| r.name == "Flatbread").unwrap();
        assert_eq!(bread.section, crate::parser::UNCATEGORIZED);
    }

    #[tokio::test]
    async fn failed_image_does_not_stop_batch() {
        let tmp = TempDir::new().unwrap();
        let fake = FakeRecognizer::new(&[("p2.jpg", "Cake | 55")]);
        let report = process_batch(
            &fake,
            &paths(&["missing.jpg", "p2.jpg"]),
            &options(tmp.path(), Strategy::Structured),
        )
        .await
        .unwrap();

        assert_eq!(report.images, 2);
        assert_eq!(fake.calls().len(), 2);
        assert_eq!(report.processed.len(), 1);
        assert!(tmp.path().join("Cake.md").exists());
    }

    #[tokio::test]
    async fn duplicates_counted_once() {
        let tmp = TempDir::new().unwrap();
        let fake = FakeRecognizer::new(&[("p1.jpg", "Cake | 55"), ("p2.jpg", "Cake | 57")]);
        let mut opts = options(tmp.path(), Strategy::Structured);
        opts.overwrite = true;
        let report = process_batch(&fake, &paths(&["p1.jpg", "p2.jpg"]), &opts)
            .await
            .unwrap();

        assert_eq!(report.saved, 2);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.processed.len(), 1);
        let cake = fs::read_to_string(tmp.path().join("Cake.md")).unwrap();
        assert!(cake.contains("page: \"57\""));
    }

    #[tokio::test]
    async fn existing_files_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("Cake.md"), "hand written").unwrap();
        let fake = FakeRecognizer::new(&[("p1.jpg", "Cake | 55\nTrifle | 56")]);
        let report = process_batch(&fake, &paths(&["p1.jpg"]), &options(tmp.path(), Strategy::Structured))
            .await
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.saved, 1);
        assert!(!report.processed.contains("Cake"));
        assert_eq!(fs::read_to_string(tmp.path().join("Cake.md")).unwrap(), "hand written");
    }

    #[tokio::test]
    async fn write_failure_does_not_stop_batch() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("Cake.md")).unwrap();
        let fake = FakeRecognizer::new(&[("p1.jpg", "Cake | 55\nChicken 65 | 120\nTrifle | 56")]);
        let report = process_batch(&fake, &paths(&["p1.jpg"]), &options(tmp.path(), Strategy::Structured))
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.saved, 2);
        assert!(!report.processed.contains("Cake"));
        assert!(report.processed.contains("Chicken 65"));
        assert!(report.processed.contains("Trifle"));
        assert!(tmp.path().join("Chicken 65.md").is_file());
        assert!(tmp.path().join("Trifle.md").is_file());
    }

    #[tokio::test]
    async fn page_boundary_strips_titles() {
        let tmp = TempDir::new().unwrap();
        let fake = FakeRecognizer::new(&[("p1.jpg", "Pilau Rice\n143\nJollof Rice 64,65")]);
        let report = process_batch(&fake, &paths(&["p1.jpg"]), &options(tmp.path(), Strategy::PageBoundary))
            .await
            .unwrap();

        assert_eq!(
            report.processed.iter().cloned().collect::<Vec<_>>(),
            vec!["Jollof Rice", "Pilau Rice"]
        );
        let pilau = fs::read_to_string(tmp.path().join("Pilau Rice.md")).unwrap();
        assert!(pilau.contains("page: \"143\""));
        assert!(pilau.contains("category: \"Uncategorized\""));
        assert!(pilau.contains("tags: [\"cookbook\", \"east-cookbook\"]"));
        assert_eq!(fake.calls()[0].1, Strategy::PageBoundary.instruction());
    }

    #[tokio::test]
    async fn preview_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("vault");
        let fake = FakeRecognizer::new(&[("p1.jpg", "Cake | 55\nTrifle | 56")]);
        let mut opts = options(&target, Strategy::Structured);
        opts.preview = true;
        let report = process_batch(&fake, &paths(&["p1.jpg"]), &opts).await.unwrap();

        assert_eq!(report.processed.len(), 2);
        assert_eq!(report.saved, 0);
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn unusable_target_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("vault");
        fs::write(&file, "x").unwrap();
        let fake = FakeRecognizer::new(&[("p1.jpg", "Cake | 55")]);
        let result = process_batch(&fake, &paths(&["p1.jpg"]), &options(&file, Strategy::Structured)).await;

        assert!(result.is_err());
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn no_delay_before_first_image() {
        let tmp = TempDir::new().unwrap();
        let fake = FakeRecognizer::new(&[("p1.jpg", "Cake | 55")]);
        let mut opts = options(tmp.path(), Strategy::Structured);
        opts.delay = Duration::from_secs(30);

        let start = Instant::now();
        process_batch(&fake, &paths(&["p1.jpg"]), &opts).await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn delay_between_images() {
        let tmp = TempDir::new().unwrap();
        let fake = FakeRecognizer::new(&[("p1.jpg", "Cake | 55"), ("p2.jpg", "Trifle | 56")]);
        let mut opts = options(tmp.path(), Strategy::Structured);
        opts.delay = Duration::from_millis(150);

        let start = Instant::now();
        process_batch(&fake, &paths(&["p1.jpg", "p2.jpg"]), &opts).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(150));
    }
}
