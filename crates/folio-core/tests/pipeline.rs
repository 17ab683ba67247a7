//! End-to-end pipeline runs against in-memory sources and engines.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use folio_core::{
    ColorMode, Config, CorrelationToken, DocumentSource, EmptyDocumentPolicy, JsonDirectorySink,
    PageEvent, PageHandle, PageStage, Pipeline, PipelineError, RawPixmap, RecognitionError,
    RecognitionRequest, RecognitionResult, Recognizer, SourceError,
};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// A page whose first sample encodes its index so the engine can tell pages apart.
struct FakePage {
    index: usize,
    channels: u8,
    side: u32,
    fail_render: bool,
    renders: Arc<AtomicUsize>,
}

impl PageHandle for FakePage {
    fn render(&self, _scale: f32) -> Result<RawPixmap, SourceError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if self.fail_render {
            return Err(SourceError::Render {
                page: self.index,
                message: "corrupt page stream".to_string(),
            });
        }
        let len = (self.side * self.side) as usize * self.channels as usize;
        let mut samples = vec![0u8; len];
        samples[0] = self.index as u8;
        Ok(RawPixmap {
            width: self.side,
            height: self.side,
            channels: self.channels,
            samples,
        })
    }
}

struct FakeSource {
    title: String,
    page_count: usize,
    channels: u8,
    side: u32,
    failing_renders: HashSet<usize>,
    renders: Arc<AtomicUsize>,
}

impl FakeSource {
    fn new(title: &str, page_count: usize) -> Self {
        Self {
            title: title.to_string(),
            page_count,
            channels: 1,
            side: 4,
            failing_renders: HashSet::new(),
            renders: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl DocumentSource for FakeSource {
    fn title(&self) -> &str {
        &self.title
    }

    fn pages(&self) -> Result<Vec<Box<dyn PageHandle>>, SourceError> {
        Ok((0..self.page_count)
            .map(|index| {
                Box::new(FakePage {
                    index,
                    channels: self.channels,
                    side: self.side,
                    fail_render: self.failing_renders.contains(&index),
                    renders: self.renders.clone(),
                }) as Box<dyn PageHandle>
            })
            .collect())
    }
}

type Respond = dyn Fn(&RecognitionRequest) -> Result<String, RecognitionError> + Send + Sync;

/// Engine that answers "page N" after an optional per-page delay and tracks
/// how many calls overlap.
struct FakeEngine {
    available: bool,
    delay: Box<dyn Fn(usize) -> Duration + Send + Sync>,
    respond: Box<Respond>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl FakeEngine {
    fn new() -> Self {
        Self {
            available: true,
            delay: Box::new(|_| Duration::ZERO),
            respond: Box::new(|req| Ok(format!("page {}", req.image.data()[0]))),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing_on(page: u8) -> Self {
        Self {
            respond: Box::new(move |req| {
                let marker = req.image.data()[0];
                if marker == page {
                    Err(RecognitionError::Failure("engine crashed".to_string()))
                } else {
                    Ok(format!("page {marker}"))
                }
            }),
            ..Self::new()
        }
    }

    fn with_delay(mut self, delay: impl Fn(usize) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Box::new(delay);
        self
    }
}

impl Recognizer for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn check_available(&self) -> bool {
        self.available
    }

    fn recognize(&self, request: RecognitionRequest) -> Result<RecognitionResult, RecognitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        std::thread::sleep((self.delay)(request.token.page_index()));
        let result = (self.respond)(&request).map(|text| RecognitionResult {
            text,
            token: request.token,
        });

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn config(workers: usize) -> Config {
    let mut config = Config::default();
    config.processing.parallel_workers = workers;
    config
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_page_gets_sentinel_without_aborting() {
    let engine = Arc::new(FakeEngine::failing_on(1));
    let pipeline = Pipeline::new(&config(4), engine);

    let outcome = pipeline
        .run(Arc::new(FakeSource::new("three", 3)))
        .await
        .unwrap();

    assert_eq!(outcome.record.title(), "three");
    assert_eq!(outcome.record.pages(), &["page 0", "", "page 2"]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].page_index, 1);
    assert_eq!(outcome.failures[0].stage, PageStage::Recognize);
    assert!(outcome.failures[0].message.contains("engine crashed"));
    assert_eq!(outcome.stats.page_count, 3);
    assert_eq!(outcome.stats.succeeded, 2);
    assert_eq!(outcome.stats.failed, 1);
    assert!(!outcome.is_complete());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_engine_unavailable_aborts_before_rendering() {
    let engine = Arc::new(FakeEngine {
        available: false,
        ..FakeEngine::new()
    });
    let pipeline = Pipeline::new(&config(4), engine.clone());
    let source = Arc::new(FakeSource::new("book", 5));
    let renders = source.renders.clone();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut sink = JsonDirectorySink::new(&out, true);

    let err = pipeline
        .run_and_store(source, &mut sink, |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::EngineUnavailable(_)));
    assert_eq!(renders.load(Ordering::SeqCst), 0);
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    assert!(!out.exists());
    assert!(sink.written().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_engine_lost_mid_run_aborts_document() {
    // Passes the availability check, then cannot start for any page.
    let engine = Arc::new(FakeEngine {
        respond: Box::new(|_| {
            Err(RecognitionError::EngineUnavailable(
                "executable vanished".to_string(),
            ))
        }),
        ..FakeEngine::new()
    });
    let pipeline = Pipeline::new(&config(2), engine);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut sink = JsonDirectorySink::new(&out, true);

    let err = pipeline
        .run_and_store(Arc::new(FakeSource::new("book", 3)), &mut sink, |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::EngineUnavailable(ref m) if m.contains("vanished")));
    assert!(sink.written().is_empty());
    assert!(!out.join("book.json").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_languages_is_a_document_error() {
    let mut config = config(2);
    config.recognition.languages.clear();
    let engine = Arc::new(FakeEngine::new());
    let pipeline = Pipeline::new(&config, engine.clone());

    let err = pipeline
        .run(Arc::new(FakeSource::new("mute", 2)))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::NoLanguages));
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_document_fails_by_default() {
    let pipeline = Pipeline::new(&config(2), Arc::new(FakeEngine::new()));
    let err = pipeline
        .run(Arc::new(FakeSource::new("blank", 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::EmptyDocument { ref title } if title == "blank"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_document_policy_produces_empty_record() {
    let mut config = config(2);
    config.processing.empty_document = EmptyDocumentPolicy::Empty;
    let pipeline = Pipeline::new(&config, Arc::new(FakeEngine::new()));

    let dir = tempfile::tempdir().unwrap();
    let mut sink = JsonDirectorySink::new(dir.path(), true);
    let outcome = pipeline
        .run_and_store(Arc::new(FakeSource::new("blank", 0)), &mut sink, |_| {})
        .await
        .unwrap();

    assert_eq!(outcome.record.page_count(), 0);
    assert!(outcome.failures.is_empty());
    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("blank.json")).unwrap())
            .unwrap();
    assert_eq!(stored["content"], serde_json::json!([]));
    assert_eq!(stored["chapters"], serde_json::json!([]));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_out_of_order_completion_is_reordered() {
    let pages = 6;
    // Page 0 finishes last, page 5 first.
    let engine = FakeEngine::new()
        .with_delay(move |page| Duration::from_millis(((pages - page) * 40) as u64));
    let pipeline = Pipeline::new(&config(pages), Arc::new(engine));

    let events: Arc<Mutex<Vec<PageEvent>>> = Arc::default();
    let seen = events.clone();
    let outcome = pipeline
        .run_with_progress(Arc::new(FakeSource::new("slow", pages)), move |event| {
            seen.lock().unwrap().push(event)
        })
        .await
        .unwrap();

    let expected: Vec<String> = (0..pages).map(|i| format!("page {i}")).collect();
    assert_eq!(outcome.record.pages(), expected.as_slice());

    let events = events.lock().unwrap();
    assert_eq!(events.len(), pages);
    assert!(events.iter().all(|e| e.ok && e.page_count == pages));
    assert_eq!(events.last().map(|e| e.page_index), Some(0));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_worker_pool_bounds_concurrency() {
    let engine = Arc::new(FakeEngine::new().with_delay(|_| Duration::from_millis(30)));
    let pipeline = Pipeline::new(&config(2), engine.clone());

    let outcome = pipeline
        .run(Arc::new(FakeSource::new("bounded", 8)))
        .await
        .unwrap();

    assert_eq!(outcome.record.page_count(), 8);
    assert_eq!(engine.calls.load(Ordering::SeqCst), 8);
    let max = engine.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 2, "max concurrent was {max}, expected <= 2");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_render_failure_uses_configured_sentinel() {
    let mut config = config(3);
    config.processing.failure_sentinel = "[unreadable]".to_string();
    let pipeline = Pipeline::new(&config, Arc::new(FakeEngine::new()));

    let mut source = FakeSource::new("torn", 3);
    source.failing_renders.insert(2);
    let outcome = pipeline.run(Arc::new(source)).await.unwrap();

    assert_eq!(outcome.record.pages(), &["page 0", "page 1", "[unreadable]"]);
    assert_eq!(outcome.failures[0].stage, PageStage::Render);
    assert!(outcome.failures[0].message.contains("corrupt page stream"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_slow_page_times_out() {
    let mut config = config(3);
    config.limits.page_timeout_ms = 50;
    let engine = FakeEngine::new().with_delay(|page| {
        if page == 1 {
            Duration::from_millis(400)
        } else {
            Duration::ZERO
        }
    });
    let pipeline = Pipeline::new(&config, Arc::new(engine));

    let outcome = pipeline
        .run(Arc::new(FakeSource::new("stuck", 3)))
        .await
        .unwrap();

    assert_eq!(outcome.record.pages(), &["page 0", "", "page 2"]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].stage, PageStage::Timeout);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_oversized_page_is_rejected() {
    let mut config = config(1);
    config.limits.max_page_dimension = 2;
    let engine = Arc::new(FakeEngine::new());
    let pipeline = Pipeline::new(&config, engine.clone());

    let outcome = pipeline
        .run(Arc::new(FakeSource::new("huge", 1)))
        .await
        .unwrap();

    assert_eq!(outcome.failures[0].stage, PageStage::Render);
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mismatched_token_is_a_page_failure() {
    struct WrongToken;

    impl Recognizer for WrongToken {
        fn name(&self) -> &str {
            "wrong-token"
        }

        fn check_available(&self) -> bool {
            true
        }

        fn recognize(
            &self,
            request: RecognitionRequest,
        ) -> Result<RecognitionResult, RecognitionError> {
            Ok(RecognitionResult {
                text: "misrouted".to_string(),
                token: CorrelationToken::new(request.token.value() + 100),
            })
        }
    }

    let pipeline = Pipeline::new(&config(2), Arc::new(WrongToken));
    let outcome = pipeline
        .run(Arc::new(FakeSource::new("misrouted", 2)))
        .await
        .unwrap();

    assert_eq!(outcome.record.pages(), &["", ""]);
    assert!(outcome.failures.iter().all(|f| f.stage == PageStage::Recognize));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_preprocessing_reaches_the_engine() {
    let mut config = config(1);
    config.render.grayscale = true;
    config.render.invert = true;
    let engine = FakeEngine {
        respond: Box::new(|req| {
            Ok(format!(
                "{} {} {:?}",
                req.image.mode(),
                req.image.data()[1],
                req.languages.iter().map(|l| l.as_str()).collect::<Vec<_>>()
            ))
        }),
        ..FakeEngine::new()
    };
    let pipeline = Pipeline::new(&config, Arc::new(engine));

    let mut source = FakeSource::new("rgb", 1);
    source.channels = 3;
    let outcome = pipeline.run(Arc::new(source)).await.unwrap();

    // Black RGB pixel -> luma 0 -> inverted to 255.
    assert_eq!(outcome.record.pages(), &["L 255 [\"eng\"]"]);
    assert_eq!(ColorMode::L.to_string(), "L");
}
