//! Pipeline coordination: fan pages out to a bounded worker pool, collect
//! results as they finish, and reassemble them in page order.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::collect::{assemble_pages, PageOutcome};
use crate::config::{Config, EmptyDocumentPolicy, LimitsConfig, RenderConfig};
use crate::error::{PipelineError, PipelineResult, RecognitionError};
use crate::raster::{ColorMode, Image};
use crate::recognition::{CorrelationToken, LanguageCode, RecognitionRequest, Recognizer};
use crate::sink::ResultSink;
use crate::source::{DocumentSource, PageWorkUnit};
use crate::types::{DocumentOutcome, DocumentRecord, PageStage, RunStats};

/// Lifecycle of one document run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Enumerating,
    Dispatching,
    Collecting,
    Reordering,
    Complete,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Whether `next` may follow `self`.
    pub fn can_advance_to(self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            // An empty document completes straight from enumeration.
            (Enumerating, Dispatching | Complete) => true,
            (Dispatching, Collecting) => true,
            (Collecting, Reordering) => true,
            (Reordering, Complete) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enumerating => "enumerating",
            Self::Dispatching => "dispatching",
            Self::Collecting => "collecting",
            Self::Reordering => "reordering",
            Self::Complete => "complete",
            Self::Failed => "failed",
        })
    }
}

/// Per-document stage tracker that logs each transition.
struct StageLog<'a> {
    title: &'a str,
    current: PipelineStage,
}

impl<'a> StageLog<'a> {
    fn start(title: &'a str) -> Self {
        tracing::debug!(document = title, "Stage: {}", PipelineStage::Enumerating);
        Self {
            title,
            current: PipelineStage::Enumerating,
        }
    }

    fn advance(&mut self, next: PipelineStage) {
        debug_assert!(
            self.current.can_advance_to(next),
            "invalid stage transition {} -> {}",
            self.current,
            next
        );
        tracing::debug!(document = self.title, "Stage: {} -> {}", self.current, next);
        self.current = next;
    }

    fn fail(&mut self, error: PipelineError) -> PipelineError {
        tracing::error!(document = self.title, stage = %self.current, "Document aborted: {error}");
        self.advance(PipelineStage::Failed);
        error
    }
}

/// Progress notification for one finished page, in completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEvent {
    pub page_index: usize,
    /// Pages in the document
    pub page_count: usize,
    pub ok: bool,
}

/// Everything a worker needs to turn a page into text.
struct PageWorker {
    recognizer: Arc<dyn Recognizer>,
    render: RenderConfig,
    languages: Vec<LanguageCode>,
    max_page_dimension: u32,
}

impl PageWorker {
    /// Render, convert, preprocess and recognize one page. Blocking.
    fn process(&self, unit: PageWorkUnit) -> PageOutcome {
        let index = unit.page_index;
        let start = Instant::now();

        let pixmap = match unit.handle.render(self.render.scale) {
            Ok(pixmap) => pixmap,
            Err(e) => return PageOutcome::failed(index, PageStage::Render, e.to_string()),
        };
        if pixmap.width > self.max_page_dimension || pixmap.height > self.max_page_dimension {
            return PageOutcome::failed(
                index,
                PageStage::Render,
                format!(
                    "rendered page is {}x{}, limit is {}",
                    pixmap.width, pixmap.height, self.max_page_dimension
                ),
            );
        }
        let render_time = start.elapsed();

        let mut image = match Image::from_pixmap(pixmap) {
            Ok(image) => image,
            Err(e) => return PageOutcome::failed(index, PageStage::Convert, e.to_string()),
        };
        if self.render.grayscale {
            image = image.convert_color_mode(ColorMode::L);
        }
        if self.render.invert {
            image = image.invert();
        }

        let token = CorrelationToken::for_page(index);
        let request = RecognitionRequest::new(image, self.languages.clone(), token);
        let recognize_start = Instant::now();
        let outcome = match self.recognizer.recognize(request) {
            Ok(result) if result.token == token => PageOutcome::recognized(index, result.text),
            Ok(result) => PageOutcome::failed(
                index,
                PageStage::Recognize,
                format!(
                    "engine answered for token {} instead of {}",
                    result.token.value(),
                    token.value()
                ),
            ),
            Err(RecognitionError::EngineUnavailable(message)) => {
                PageOutcome::engine_unavailable(index, message)
            }
            Err(e) => PageOutcome::failed(index, PageStage::Recognize, e.to_string()),
        };
        tracing::trace!(
            page = index,
            "  Render: {:?}, recognize: {:?}",
            render_time,
            recognize_start.elapsed()
        );
        outcome
    }
}

/// Runs documents through render, recognition and ordered reassembly.
///
/// Pages are processed concurrently on at most `processing.parallel_workers`
/// blocking threads. A page that fails is logged, recorded in the outcome and
/// given the failure sentinel as its text; it never aborts its siblings.
pub struct Pipeline {
    worker: Arc<PageWorker>,
    parallel_workers: usize,
    empty_document: EmptyDocumentPolicy,
    failure_sentinel: String,
    limits: LimitsConfig,
}

impl Pipeline {
    pub fn new(config: &Config, recognizer: Arc<dyn Recognizer>) -> Self {
        Self {
            worker: Arc::new(PageWorker {
                recognizer,
                render: config.render.clone(),
                languages: config.recognition.languages.clone(),
                max_page_dimension: config.limits.max_page_dimension,
            }),
            parallel_workers: config.processing.parallel_workers.max(1),
            empty_document: config.processing.empty_document,
            failure_sentinel: config.processing.failure_sentinel.clone(),
            limits: config.limits.clone(),
        }
    }

    pub fn recognizer(&self) -> &Arc<dyn Recognizer> {
        &self.worker.recognizer
    }

    pub fn parallel_workers(&self) -> usize {
        self.parallel_workers
    }

    /// Process one document.
    pub async fn run(&self, source: Arc<dyn DocumentSource>) -> PipelineResult<DocumentOutcome> {
        self.run_with_progress(source, |_| {}).await
    }

    /// Process one document and hand the record to `sink`.
    ///
    /// Nothing is stored when the run aborts.
    pub async fn run_and_store<F>(
        &self,
        source: Arc<dyn DocumentSource>,
        sink: &mut dyn ResultSink,
        on_page: F,
    ) -> PipelineResult<DocumentOutcome>
    where
        F: FnMut(PageEvent),
    {
        let outcome = self.run_with_progress(source, on_page).await?;
        sink.store(&outcome.record)?;
        Ok(outcome)
    }

    /// Process one document, calling `on_page` as each page finishes.
    ///
    /// Dropping the returned future aborts pages that have not started;
    /// blocking work already running finishes and its result is discarded.
    pub async fn run_with_progress<F>(
        &self,
        source: Arc<dyn DocumentSource>,
        mut on_page: F,
    ) -> PipelineResult<DocumentOutcome>
    where
        F: FnMut(PageEvent),
    {
        let start = Instant::now();
        let title = source.title().to_string();
        let mut stage = StageLog::start(&title);

        // Enumerating
        if !self.worker.recognizer.check_available() {
            let name = self.worker.recognizer.name().to_string();
            return Err(stage.fail(PipelineError::EngineUnavailable(format!(
                "{name} is not installed or not configured"
            ))));
        }
        if self.worker.languages.is_empty() {
            return Err(stage.fail(PipelineError::NoLanguages));
        }

        let enumerate = {
            let source = source.clone();
            tokio::task::spawn_blocking(move || source.pages())
        };
        let handles = match enumerate.await {
            Ok(Ok(handles)) => handles,
            Ok(Err(e)) => return Err(stage.fail(e.into())),
            Err(e) => return Err(stage.fail(PipelineError::Worker(e.to_string()))),
        };
        let units = PageWorkUnit::from_handles(handles);
        let page_count = units.len();
        tracing::debug!(document = %title, "Enumerated {} pages", page_count);

        if page_count == 0 {
            return match self.empty_document {
                EmptyDocumentPolicy::Fail => {
                    Err(stage.fail(PipelineError::EmptyDocument { title: title.clone() }))
                }
                EmptyDocumentPolicy::Empty => {
                    stage.advance(PipelineStage::Complete);
                    Ok(DocumentOutcome {
                        record: DocumentRecord::new(title.clone(), Vec::new()),
                        failures: Vec::new(),
                        stats: RunStats {
                            total_seconds: start.elapsed().as_secs_f64(),
                            ..RunStats::default()
                        },
                    })
                }
            };
        }

        // Dispatching
        stage.advance(PipelineStage::Dispatching);
        let semaphore = Arc::new(Semaphore::new(self.parallel_workers));
        let page_timeout = Duration::from_millis(self.limits.page_timeout_ms);
        let mut tasks = JoinSet::new();

        for unit in units {
            let semaphore = semaphore.clone();
            let worker = self.worker.clone();
            let timeout_ms = self.limits.page_timeout_ms;

            tasks.spawn(async move {
                let index = unit.page_index;
                let permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return PageOutcome::failed(index, PageStage::Worker, "worker pool closed")
                    }
                };
                // Held until the blocking work ends, even past a timeout.
                let work = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    worker.process(unit)
                });
                match tokio::time::timeout(page_timeout, work).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(e)) => PageOutcome::failed(index, PageStage::Worker, e.to_string()),
                    Err(_) => PageOutcome::failed(
                        index,
                        PageStage::Timeout,
                        format!("Timeout after {timeout_ms}ms"),
                    ),
                }
            });
        }

        // Collecting
        stage.advance(PipelineStage::Collecting);
        let mut outcomes = Vec::with_capacity(page_count);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) if outcome.engine_unavailable => {
                    tasks.abort_all();
                    let message = match outcome.result {
                        Err(failure) => failure.message,
                        Ok(_) => String::new(),
                    };
                    return Err(stage.fail(PipelineError::EngineUnavailable(message)));
                }
                Ok(outcome) => {
                    if let Err(failure) = &outcome.result {
                        tracing::warn!(
                            document = %title,
                            page = failure.page_index,
                            stage = %failure.stage,
                            error = %failure.message,
                            "Page failed, using failure sentinel"
                        );
                    }
                    on_page(PageEvent {
                        page_index: outcome.page_index,
                        page_count,
                        ok: outcome.is_ok(),
                    });
                    outcomes.push(outcome);
                }
                Err(e) => tracing::error!(document = %title, "Page task failed: {e}"),
            }
        }

        // Reordering
        stage.advance(PipelineStage::Reordering);
        let (pages, failures) = assemble_pages(outcomes, page_count, &self.failure_sentinel);

        // Complete
        let stats = RunStats {
            page_count,
            succeeded: page_count - failures.len(),
            failed: failures.len(),
            total_seconds: start.elapsed().as_secs_f64(),
        };
        stage.advance(PipelineStage::Complete);
        tracing::debug!(
            document = %title,
            "Processed {} pages in {:.2}s ({} failed)",
            page_count,
            stats.total_seconds,
            stats.failed
        );

        Ok(DocumentOutcome {
            record: DocumentRecord::new(title, pages),
            failures,
            stats,
        })
    }
}
