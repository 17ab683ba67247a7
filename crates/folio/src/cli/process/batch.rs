//! Batch processing: one pipeline run per document, with per-page progress.

use std::sync::Arc;
use std::time::{Duration, Instant};

use folio_core::{
    DiscoveredDocument, DocumentOutcome, DocumentSource, JsonDirectorySink, PipelineError,
    ResultSink, StreamSink,
};

use super::{OutputTarget, ProcessContext};

/// Counters shown after a batch.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct BatchSummary {
    pub documents_ok: u64,
    pub documents_failed: u64,
    pub pages: u64,
    pub pages_failed: u64,
    pub elapsed: Duration,
}

impl BatchSummary {
    fn record(&mut self, outcome: &DocumentOutcome) {
        self.documents_ok += 1;
        self.pages += outcome.stats.page_count as u64;
        self.pages_failed += outcome.stats.failed as u64;
    }

    /// Pages per second across the whole batch.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.pages as f64 / secs
        } else {
            0.0
        }
    }
}

/// Run every document through the pipeline in turn and store the records.
pub async fn process_batch(
    ctx: ProcessContext,
    documents: Vec<DiscoveredDocument>,
) -> anyhow::Result<()> {
    let mut sink = create_sink(&ctx.output);
    let summary = run_documents(&ctx, &documents, sink.as_mut()).await?;

    if let OutputTarget::Directory { dir, .. } = &ctx.output {
        if summary.documents_ok > 0 {
            tracing::info!("Output written to {:?}", dir);
        }
    }
    print_summary(&summary);

    if summary.documents_failed > 0 {
        anyhow::bail!(
            "{} of {} document(s) failed",
            summary.documents_failed,
            documents.len()
        );
    }
    Ok(())
}

fn create_sink(target: &OutputTarget) -> Box<dyn ResultSink> {
    match target {
        OutputTarget::Stdout { format, pretty } => {
            Box::new(StreamSink::new(std::io::stdout(), *format, *pretty))
        }
        OutputTarget::Directory { dir, pretty } => Box::new(JsonDirectorySink::new(dir, *pretty)),
    }
}

/// Process documents sequentially. A failing document is logged and skipped;
/// a missing engine stops the batch.
pub(crate) async fn run_documents(
    ctx: &ProcessContext,
    documents: &[DiscoveredDocument],
    sink: &mut dyn ResultSink,
) -> anyhow::Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    let start = Instant::now();

    for (position, document) in documents.iter().enumerate() {
        let title = document.title();
        let source: Arc<dyn DocumentSource> = match ctx.discovery.open(document) {
            Ok(source) => Arc::from(source),
            Err(e) => {
                summary.documents_failed += 1;
                tracing::error!("Failed: {:?} - {}", document.path, e);
                continue;
            }
        };

        let progress = create_progress_bar(title, position + 1, documents.len());
        let result = ctx
            .pipeline
            .run_and_store(source, sink, |event| {
                if progress.length() != Some(event.page_count as u64) {
                    progress.set_length(event.page_count as u64);
                }
                progress.inc(1);
            })
            .await;
        progress.finish_and_clear();

        match result {
            Ok(outcome) => {
                for failure in &outcome.failures {
                    tracing::warn!(
                        "{title}: page {} failed at {}: {}",
                        failure.page_index + 1,
                        failure.stage,
                        failure.message
                    );
                }
                tracing::info!(
                    "{title}: {}/{} pages recognized in {:.1}s ({:.2} pages/sec)",
                    outcome.stats.succeeded,
                    outcome.stats.page_count,
                    outcome.stats.total_seconds,
                    outcome.stats.pages_per_second()
                );
                summary.record(&outcome);
            }
            Err(e @ PipelineError::EngineUnavailable(_)) => return Err(e.into()),
            Err(e) => {
                summary.documents_failed += 1;
                tracing::error!("Failed: {:?} - {}", document.path, e);
            }
        }
    }

    summary.elapsed = start.elapsed();
    Ok(summary)
}

/// Create a per-document page progress bar. The length is set on the first page event.
fn create_progress_bar(title: &str, position: usize, total: usize) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(0);
    match ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages {msg}",
    ) {
        Ok(style) => pb.set_style(style.progress_chars("##-")),
        Err(e) => tracing::debug!("Progress template rejected: {e}"),
    }
    pb.set_message(format!("({position}/{total}) {title}"));
    pb
}

/// Print a formatted summary table after batch processing.
fn print_summary(summary: &BatchSummary) {
    let documents = summary.documents_ok + summary.documents_failed;

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Documents:    {:>8}", documents);
    if summary.documents_failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.documents_failed);
    }
    eprintln!("    Pages:        {:>8}", summary.pages);
    if summary.pages_failed > 0 {
        eprintln!("    Unreadable:   {:>8}", summary.pages_failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Duration:     {:>7.1}s", summary.elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} pages/sec", summary.rate());
    eprintln!("  ====================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{
        Config, DocumentDiscovery, Pipeline, RecognitionError, RecognitionRequest,
        RecognitionResult, Recognizer,
    };
    use std::path::Path;

    /// Reports each page's width, which the test images encode.
    struct WidthEngine {
        available: bool,
    }

    impl Recognizer for WidthEngine {
        fn name(&self) -> &str {
            "width"
        }

        fn check_available(&self) -> bool {
            self.available
        }

        fn recognize(
            &self,
            request: RecognitionRequest,
        ) -> Result<RecognitionResult, RecognitionError> {
            Ok(RecognitionResult {
                text: format!("w{}", request.image.width()),
                token: request.token,
            })
        }
    }

    fn write_page(path: &Path, width: u32) {
        image::GrayImage::from_pixel(width, 4, image::Luma([255]))
            .save(path)
            .unwrap();
    }

    fn context(engine: WidthEngine, out: &Path) -> ProcessContext {
        let mut config = Config::default();
        config.render.scale = 1.0;
        config.processing.parallel_workers = 2;
        ProcessContext {
            pipeline: Pipeline::new(&config, Arc::new(engine)),
            discovery: DocumentDiscovery::new(config.processing.clone()),
            output: OutputTarget::Directory {
                dir: out.to_path_buf(),
                pretty: true,
            },
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn image_folder_becomes_one_ordered_record() {
        let dir = tempfile::tempdir().unwrap();
        let scans = dir.path().join("letters");
        std::fs::create_dir(&scans).unwrap();
        write_page(&scans.join("page10.png"), 10);
        write_page(&scans.join("page2.png"), 2);
        write_page(&scans.join("page1.png"), 1);

        let out = dir.path().join("out");
        let ctx = context(WidthEngine { available: true }, &out);
        let documents = ctx.discovery.discover(&scans);
        assert_eq!(documents.len(), 1);

        let mut sink = JsonDirectorySink::new(&out, true);
        let summary = run_documents(&ctx, &documents, &mut sink).await.unwrap();

        assert_eq!(summary.documents_ok, 1);
        assert_eq!(summary.pages, 3);
        assert_eq!(summary.pages_failed, 0);

        let stored: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.join("letters.json")).unwrap())
                .unwrap();
        assert_eq!(stored["title"], "letters");
        assert_eq!(stored["content"], serde_json::json!(["w1", "w2", "w10"]));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_engine_stops_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("single.png");
        write_page(&page, 3);

        let out = dir.path().join("out");
        let ctx = context(WidthEngine { available: false }, &out);
        let documents = ctx.discovery.discover(&page);

        let mut sink = JsonDirectorySink::new(&out, true);
        let err = run_documents(&ctx, &documents, &mut sink).await.unwrap_err();

        assert!(err.to_string().contains("width"));
        assert!(!out.exists());
    }

    #[test]
    fn summary_rate() {
        let summary = BatchSummary {
            pages: 30,
            elapsed: Duration::from_secs(10),
            ..BatchSummary::default()
        };
        assert!((summary.rate() - 3.0).abs() < 1e-9);
        assert_eq!(BatchSummary::default().rate(), 0.0);
    }
}
