use std::{
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use lectern_core::{
    Intake, JobQueue, JobReason, LectureError, LectureJob, LectureRecord, LectureStatus,
    LectureStore, MemoryQueue, MemoryStore, PipelineExecutor, RawSources, Stages,
    StoreError, Submission, Worker,
    fetch::{PlatformFetcher, RemoteFetcher},
    resolver::InputResolver,
    stages::{
        DualQuizGenerator, DualSummarizer, ExtractionRunner, Producer, ProducerError,
        TranscriptionRunner,
    },
};
use tempfile::TempDir;
use tokio::sync::broadcast;
use uuid::Uuid;

const TRANSCRIPT: &str = r#"[
    {"start": 0.0, "end": 5.0, "text": "Welcome to graphs."},
    {"start": 5.0, "end": 11.0, "text": "A graph has nodes."},
    {"start": 11.0, "end": 16.0, "text": "Edges connect them."}
]"#;
const FRAMES: &str = r#"[
    {"time": 0.0, "text": "Title slide", "imageUrl": "/frames/0.png"},
    {"time": 8.0, "text": "Definitions"}
]"#;

enum Reply {
    Text(String),
    Fail,
    Skip,
}

struct Scripted {
    reply: Mutex<Reply>,
    inputs: Mutex<Vec<String>>,
}

impl Scripted {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(reply),
            inputs: Mutex::new(Vec::new()),
        })
    }

    fn ok(text: &str) -> Arc<Self> {
        Self::new(Reply::Text(text.to_string()))
    }

    fn set(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    fn calls(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }

    fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Producer for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(&self, input: &str) -> Result<String, ProducerError> {
        self.inputs.lock().unwrap().push(input.to_string());
        match &*self.reply.lock().unwrap() {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail => Err(ProducerError::Exit {
                status: "exit status: 1".to_string(),
                stderr: "model crashed".to_string(),
            }),
            Reply::Skip => Err(ProducerError::Skipped {
                reason: "no API key".to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct FakeFetcher {
    downloads: AtomicUsize,
}

impl FakeFetcher {
    fn count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlatformFetcher for FakeFetcher {
    fn validate(&self, url: &str) -> bool {
        url.starts_with("https://www.youtube.com/watch?v=")
    }

    async fn download(&self, _url: &str, dest_dir: &Path) -> lectern_core::Result<PathBuf> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let path = dest_dir.join(format!("youtube_{}.mp4", self.count()));
        tokio::fs::write(&path, b"video").await?;
        Ok(path)
    }
}

#[async_trait]
impl RemoteFetcher for FakeFetcher {
    async fn download(
        &self,
        _url: &str,
        dest_dir: &Path,
        prefix: &str,
    ) -> lectern_core::Result<PathBuf> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let path = dest_dir.join(format!("{prefix}_{}.mp3", self.count()));
        tokio::fs::write(&path, b"audio").await?;
        Ok(path)
    }
}

/// Memory store that remembers every saved version of every record and can
/// be switched into failing every call.
#[derive(Default)]
struct RecordingStore {
    inner: MemoryStore,
    saves: Mutex<Vec<LectureRecord>>,
    broken: AtomicBool,
}

impl RecordingStore {
    fn break_down(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                path: PathBuf::from("/lectures"),
                source: std::io::Error::other("disk unavailable"),
            });
        }
        Ok(())
    }

    fn history(&self, id: Uuid) -> Vec<LectureRecord> {
        self.saves
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.id == id)
            .cloned()
            .collect()
    }

    fn statuses(&self, id: Uuid) -> Vec<LectureStatus> {
        let mut statuses: Vec<LectureStatus> =
            self.history(id).into_iter().map(|r| r.status).collect();
        statuses.dedup();
        statuses
    }
}

#[async_trait]
impl LectureStore for RecordingStore {
    async fn find(&self, id: Uuid) -> Result<Option<LectureRecord>, StoreError> {
        self.check()?;
        self.inner.find(id).await
    }

    async fn save(&self, record: &LectureRecord) -> Result<(), StoreError> {
        self.check()?;
        self.saves.lock().unwrap().push(record.clone());
        self.inner.save(record).await
    }
}

struct Harness {
    scratch: TempDir,
    store: Arc<RecordingStore>,
    fetcher: Arc<FakeFetcher>,
    transcriber: Arc<Scripted>,
    extractor: Arc<Scripted>,
    local_summary: Arc<Scripted>,
    hosted_summary: Arc<Scripted>,
    local_quiz: Arc<Scripted>,
    hosted_quiz: Arc<Scripted>,
    executor: Arc<PipelineExecutor>,
}

impl Harness {
    fn new() -> Self {
        let scratch = TempDir::new().unwrap();
        let store = Arc::new(RecordingStore::default());
        let fetcher = Arc::new(FakeFetcher::default());
        let transcriber = Scripted::ok(TRANSCRIPT);
        let extractor = Scripted::ok(FRAMES);
        let local_summary = Scripted::ok("A");
        let hosted_summary = Scripted::ok("B");
        let local_quiz = Scripted::ok("Q1?\nQ2?");
        let hosted_quiz = Scripted::ok("Q3?");

        let timeout = Duration::from_secs(5);
        let stages = Stages {
            transcription: TranscriptionRunner::new(transcriber.clone(), timeout),
            extraction: ExtractionRunner::new(extractor.clone(), timeout),
            summarization: DualSummarizer::new(
                local_summary.clone(),
                hosted_summary.clone(),
                timeout,
            ),
            quiz: DualQuizGenerator::new(local_quiz.clone(), hosted_quiz.clone(), timeout),
        };
        let resolver = InputResolver::new(fetcher.clone(), fetcher.clone());
        let executor = Arc::new(PipelineExecutor::new(
            store.clone(),
            resolver,
            stages,
            scratch.path(),
        ));

        Self {
            scratch,
            store,
            fetcher,
            transcriber,
            extractor,
            local_summary,
            hosted_summary,
            local_quiz,
            hosted_quiz,
            executor,
        }
    }

    fn media(&self, name: &str) -> String {
        let path = self.scratch.path().join(name);
        std::fs::write(&path, b"media").unwrap();
        path.to_string_lossy().to_string()
    }

    async fn queued(&self, sources: RawSources) -> LectureRecord {
        let mut record = LectureRecord::new("Graphs 101", sources);
        record.status = LectureStatus::Queued;
        self.store.save(&record).await.unwrap();
        record
    }

    async fn get(&self, id: Uuid) -> LectureRecord {
        self.store.find(id).await.unwrap().unwrap()
    }

    fn stage_calls(&self) -> usize {
        [
            &self.transcriber,
            &self.extractor,
            &self.local_summary,
            &self.hosted_summary,
            &self.local_quiz,
            &self.hosted_quiz,
        ]
        .iter()
        .map(|p| p.calls())
        .sum()
    }
}

#[tokio::test]
async fn test_local_video_full_run() {
    let h = Harness::new();
    let video = h.media("lec.mp4");
    let record = h
        .queued(RawSources {
            video: Some(video.clone()),
            ..Default::default()
        })
        .await;

    let status = h.executor.process(record.id).await.unwrap();
    assert_eq!(status, LectureStatus::Completed);

    let done = h.get(record.id).await;
    assert_eq!(done.status, LectureStatus::Completed);
    assert_eq!(done.transcript.len(), 3);
    assert_eq!(done.frames.len(), 2);
    assert_eq!(done.summary.local.as_deref(), Some("A"));
    assert_eq!(done.summary.external.as_deref(), Some("B"));
    let merged = done.summary.merged.unwrap();
    assert!(merged.contains('A') && merged.contains('B') && merged.contains("---"));
    assert_eq!(
        done.quiz.merged.unwrap(),
        vec!["Q1?", "Q2?", "---", "Q3?"]
    );

    assert_eq!(h.fetcher.count(), 0);
    assert_eq!(h.transcriber.inputs(), vec![video.clone()]);
    assert_eq!(h.extractor.inputs(), vec![video]);
    assert_eq!(
        h.local_summary.inputs(),
        vec!["Welcome to graphs. A graph has nodes. Edges connect them."]
    );
    assert_eq!(
        h.store.statuses(record.id),
        vec![
            LectureStatus::Queued,
            LectureStatus::Processing,
            LectureStatus::Completed
        ]
    );
}

#[tokio::test]
async fn test_persists_after_each_stage() {
    let h = Harness::new();
    let record = h
        .queued(RawSources {
            video: Some(h.media("lec.mp4")),
            ..Default::default()
        })
        .await;
    h.executor.process(record.id).await.unwrap();

    let processing: Vec<LectureRecord> = h
        .store
        .history(record.id)
        .into_iter()
        .filter(|r| r.status == LectureStatus::Processing)
        .collect();
    // transition, transcript, frames, summary, quiz
    assert_eq!(processing.len(), 5);
    assert!(processing[1].frames.is_empty() && !processing[1].transcript.is_empty());
    assert!(processing[2].summary.merged.is_none() && !processing[2].frames.is_empty());
    assert!(processing[3].quiz.merged.is_none() && processing[3].summary.merged.is_some());
}

#[tokio::test]
async fn test_no_sources_fails_without_running_stages() {
    let h = Harness::new();
    let record = h.queued(RawSources::default()).await;

    let status = h.executor.process(record.id).await.unwrap();
    assert_eq!(status, LectureStatus::Failed);

    let failed = h.get(record.id).await;
    assert!(failed.transcript.is_empty());
    assert!(failed.frames.is_empty());
    assert!(failed.summary.merged.is_none());
    assert!(failed.quiz.merged.is_none());
    assert_eq!(h.stage_calls(), 0);
}

#[tokio::test]
async fn test_unusable_sources_fail_before_stages() {
    let h = Harness::new();
    let record = h
        .queued(RawSources {
            video: Some("/gone/lec.mp4".to_string()),
            platform_url: Some("https://vimeo.com/42".to_string()),
            ..Default::default()
        })
        .await;

    assert_eq!(
        h.executor.process(record.id).await.unwrap(),
        LectureStatus::Failed
    );
    assert_eq!(h.stage_calls(), 0);
    assert_eq!(h.fetcher.count(), 0);
}

#[tokio::test]
async fn test_invalid_platform_url_fails_despite_local_audio() {
    let h = Harness::new();
    let record = h
        .queued(RawSources {
            audio: Some(h.media("lec.mp3")),
            platform_url: Some("https://vimeo.com/42".to_string()),
            ..Default::default()
        })
        .await;

    assert_eq!(
        h.executor.process(record.id).await.unwrap(),
        LectureStatus::Failed
    );
    assert_eq!(h.stage_calls(), 0);
    assert_eq!(h.fetcher.count(), 0);
    assert_eq!(
        h.store.statuses(record.id),
        vec![
            LectureStatus::Queued,
            LectureStatus::Processing,
            LectureStatus::Failed
        ]
    );
}

#[tokio::test]
async fn test_platform_url_is_downloaded_once_and_reused() {
    let h = Harness::new();
    let record = h
        .queued(RawSources {
            platform_url: Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string()),
            audio: Some(h.media("lec.mp3")),
            ..Default::default()
        })
        .await;

    h.executor.process(record.id).await.unwrap();

    assert_eq!(h.fetcher.count(), 1);
    let downloaded = h.scratch.path().join("youtube_1.mp4");
    let expected = downloaded.to_string_lossy().to_string();
    assert_eq!(h.transcriber.inputs(), vec![expected.clone()]);
    assert_eq!(h.extractor.inputs(), vec![expected]);
    assert!(!downloaded.exists(), "fetched input is removed after the run");
}

#[tokio::test]
async fn test_best_effort_failures_do_not_abort() {
    let h = Harness::new();
    h.transcriber.set(Reply::Fail);
    h.extractor.set(Reply::Text("not json".to_string()));
    let record = h
        .queued(RawSources {
            slides: Some(h.media("deck.pdf")),
            ..Default::default()
        })
        .await;

    let status = h.executor.process(record.id).await.unwrap();
    assert_eq!(status, LectureStatus::Completed);

    let done = h.get(record.id).await;
    assert!(done.transcript.is_empty());
    assert!(done.frames.is_empty());
    assert!(done.summary.merged.is_some());
    assert!(done.quiz.merged.is_some());
    assert_eq!(h.local_summary.inputs(), vec![String::new()]);
}

#[tokio::test]
async fn test_local_summary_only() {
    let h = Harness::new();
    h.hosted_summary.set(Reply::Skip);
    let record = h
        .queued(RawSources {
            video: Some(h.media("lec.mp4")),
            ..Default::default()
        })
        .await;

    h.executor.process(record.id).await.unwrap();

    let done = h.get(record.id).await;
    assert_eq!(done.status, LectureStatus::Completed);
    assert_eq!(done.summary.merged, done.summary.local);
    assert!(done.summary.external.is_none());
}

#[tokio::test]
async fn test_both_summaries_failing_fails_the_run() {
    let h = Harness::new();
    h.local_summary.set(Reply::Fail);
    h.hosted_summary.set(Reply::Skip);
    let record = h
        .queued(RawSources {
            video: Some(h.media("lec.mp4")),
            ..Default::default()
        })
        .await;

    let status = h.executor.process(record.id).await.unwrap();
    assert_eq!(status, LectureStatus::Failed);

    let failed = h.get(record.id).await;
    assert_eq!(failed.status, LectureStatus::Failed);
    assert!(failed.summary.merged.is_none());
    assert!(failed.summary.local.is_none());
    assert_eq!(failed.transcript.len(), 3, "partial results are kept");
    assert_eq!(failed.frames.len(), 2);
    assert_eq!(h.local_quiz.calls(), 0);
}

#[tokio::test]
async fn test_quiz_failure_keeps_summary() {
    let h = Harness::new();
    h.local_quiz.set(Reply::Fail);
    h.hosted_quiz.set(Reply::Fail);
    let record = h
        .queued(RawSources {
            video: Some(h.media("lec.mp4")),
            ..Default::default()
        })
        .await;

    assert_eq!(
        h.executor.process(record.id).await.unwrap(),
        LectureStatus::Failed
    );
    let failed = h.get(record.id).await;
    assert!(failed.summary.merged.is_some());
    assert!(failed.quiz.merged.is_none());
}

#[tokio::test]
async fn test_reprocess_overwrites_without_clearing_first() {
    let h = Harness::new();
    let queue = Arc::new(MemoryQueue::new(8));
    let intake = Intake::new(queue.clone(), h.executor.clone());
    let worker = Worker::new(queue.clone(), h.executor.clone());

    let record = h
        .queued(RawSources {
            video: Some(h.media("lec.mp4")),
            ..Default::default()
        })
        .await;
    h.executor.process(record.id).await.unwrap();

    h.local_summary.set(Reply::Text("A2".to_string()));
    h.hosted_summary.set(Reply::Text("B2".to_string()));
    h.transcriber
        .set(Reply::Text(r#"[{"start": 0, "end": 1, "text": "New take."}]"#.to_string()));

    let job = intake.reprocess(record.id).await.unwrap();
    assert_eq!(job.reason, JobReason::Reprocess);
    assert_eq!(h.get(record.id).await.status, LectureStatus::Queued);

    let status = worker.run_once().await.unwrap();
    assert_eq!(status, Some(LectureStatus::Completed));

    let done = h.get(record.id).await;
    assert_eq!(done.summary.merged.as_deref(), Some("A2\n\n---\n\nB2"));
    assert_eq!(done.transcript.len(), 1);

    let history = h.store.history(record.id);
    let first_processing = history
        .iter()
        .rposition(|r| r.status == LectureStatus::Queued)
        .map(|i| &history[i + 1])
        .unwrap();
    assert_eq!(first_processing.status, LectureStatus::Processing);
    assert_eq!(first_processing.transcript.len(), 3);
    assert_eq!(first_processing.summary.local.as_deref(), Some("A"));
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_reprocess_preconditions() {
    let h = Harness::new();
    let queue = Arc::new(MemoryQueue::new(8));
    let intake = Intake::new(queue.clone(), h.executor.clone());

    let empty = h.queued(RawSources::default()).await;
    assert!(matches!(
        intake.reprocess(empty.id).await,
        Err(LectureError::NoRawSource { .. })
    ));

    let queued = h
        .queued(RawSources {
            video: Some(h.media("lec.mp4")),
            ..Default::default()
        })
        .await;
    assert!(matches!(
        intake.reprocess(queued.id).await,
        Err(LectureError::InvalidTransition {
            from: LectureStatus::Queued,
            to: LectureStatus::Queued
        })
    ));

    assert!(matches!(
        intake.reprocess(Uuid::new_v4()).await,
        Err(LectureError::NotFound { .. })
    ));
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_rejected_enqueue_runs_inline_fallback() {
    let h = Harness::new();
    let queue = Arc::new(MemoryQueue::new(1));
    queue.close();
    let intake = Intake::new(queue, h.executor.clone());

    let record = LectureRecord::new("Graphs 101", RawSources {
        video: Some(h.media("lec.mp4")),
        ..Default::default()
    })
    .with_description("Nodes and edges");
    let id = record.id;

    let submission = intake.submit(record).await.unwrap();
    assert_eq!(submission, Submission::Inline(LectureStatus::Completed));

    assert_eq!(
        h.store.statuses(id),
        vec![
            LectureStatus::Uploaded,
            LectureStatus::Processing,
            LectureStatus::Completed
        ]
    );
    let done = h.get(id).await;
    assert!(done.summary.merged.is_some());
    assert!(done.transcript.is_empty());
    assert!(done.frames.is_empty());
    assert!(done.quiz.merged.is_none());
    assert_eq!(h.transcriber.calls(), 0);
    assert_eq!(h.local_quiz.calls(), 0);
    assert_eq!(
        h.local_summary.inputs(),
        vec!["Graphs 101\n\nNodes and edges"]
    );
}

#[tokio::test]
async fn test_inline_fallback_failure_marks_failed() {
    let h = Harness::new();
    h.local_summary.set(Reply::Fail);
    h.hosted_summary.set(Reply::Fail);
    let queue = Arc::new(MemoryQueue::new(1));
    queue.enqueue(LectureJob::new(Uuid::new_v4(), JobReason::Upload))
        .await
        .unwrap();
    let intake = Intake::new(queue, h.executor.clone());

    let record = LectureRecord::new("Graphs 101", RawSources::default());
    let id = record.id;
    let submission = intake.submit(record).await.unwrap();

    assert_eq!(submission, Submission::Inline(LectureStatus::Failed));
    assert!(!h.store.statuses(id).contains(&LectureStatus::Queued));
}

#[tokio::test]
async fn test_submit_then_worker_completes() {
    let h = Harness::new();
    let queue = Arc::new(MemoryQueue::new(8));
    let intake = Intake::new(queue.clone(), h.executor.clone());
    let worker = Worker::new(queue.clone(), h.executor.clone());

    let record = LectureRecord::new("Graphs 101", RawSources {
        video: Some(h.media("lec.mp4")),
        ..Default::default()
    });
    let id = record.id;

    let submission = intake.submit(record).await.unwrap();
    assert!(matches!(submission, Submission::Queued(ref job) if job.lecture_id == id));
    assert_eq!(h.get(id).await.status, LectureStatus::Queued);

    assert_eq!(
        worker.run_once().await.unwrap(),
        Some(LectureStatus::Completed)
    );
    assert_eq!(
        h.store.statuses(id),
        vec![
            LectureStatus::Uploaded,
            LectureStatus::Queued,
            LectureStatus::Processing,
            LectureStatus::Completed
        ]
    );
}

#[tokio::test]
async fn test_queued_write_skipped_when_worker_was_first() {
    let h = Harness::new();
    let record = LectureRecord::new("Graphs 101", RawSources {
        video: Some(h.media("lec.mp4")),
        ..Default::default()
    });
    h.store.save(&record).await.unwrap();

    // Worker wins the race against the submitter's queued write.
    assert_eq!(
        h.executor.process(record.id).await.unwrap(),
        LectureStatus::Completed
    );
    assert!(!h.executor.mark_queued(&record).await.unwrap());
    assert_eq!(h.get(record.id).await.status, LectureStatus::Completed);
}

#[tokio::test]
async fn test_redelivery_to_processing_record_overwrites() {
    let h = Harness::new();
    let mut record = LectureRecord::new("Graphs 101", RawSources {
        video: Some(h.media("lec.mp4")),
        ..Default::default()
    });
    record.status = LectureStatus::Processing;
    h.store.save(&record).await.unwrap();

    assert_eq!(
        h.executor.process(record.id).await.unwrap(),
        LectureStatus::Completed
    );
    assert_eq!(
        h.store.statuses(record.id),
        vec![LectureStatus::Processing, LectureStatus::Completed]
    );
}

#[tokio::test]
async fn test_duplicate_delivery_is_idempotent_in_effect() {
    let h = Harness::new();
    let record = h
        .queued(RawSources {
            video: Some(h.media("lec.mp4")),
            ..Default::default()
        })
        .await;

    h.executor.process(record.id).await.unwrap();
    let first = h.get(record.id).await;
    h.executor.process(record.id).await.unwrap();
    let second = h.get(record.id).await;

    assert_eq!(second.status, LectureStatus::Completed);
    assert_eq!(first.transcript, second.transcript);
    assert_eq!(first.frames, second.frames);
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.quiz, second.quiz);
}

#[tokio::test]
async fn test_worker_drops_job_for_missing_lecture() {
    let h = Harness::new();
    let queue = Arc::new(MemoryQueue::new(8));
    let worker = Worker::new(queue.clone(), h.executor.clone());
    queue
        .enqueue(LectureJob::new(Uuid::new_v4(), JobReason::Upload))
        .await
        .unwrap();

    assert_eq!(worker.run_once().await.unwrap(), None);
    assert!(queue.is_empty());
    assert_eq!(h.stage_calls(), 0);
}

#[tokio::test]
async fn test_worker_loop_stops_on_shutdown() {
    let h = Harness::new();
    let queue = Arc::new(MemoryQueue::new(8));
    let intake = Intake::new(queue.clone(), h.executor.clone());
    let worker = Worker::new(queue.clone(), h.executor.clone());
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let record = LectureRecord::new("Graphs 101", RawSources {
        video: Some(h.media("lec.mp4")),
        ..Default::default()
    });
    let id = record.id;
    intake.submit(record).await.unwrap();

    let handle = tokio::spawn(worker.run(shutdown_rx));
    for _ in 0..100 {
        if h.get(id).await.status == LectureStatus::Completed {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.get(id).await.status, LectureStatus::Completed);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_store_failure_hands_job_back_for_redelivery() {
    let h = Harness::new();
    let queue = Arc::new(MemoryQueue::new(8));
    let intake = Intake::new(queue.clone(), h.executor.clone());
    let worker = Worker::new(queue.clone(), h.executor.clone());

    let record = LectureRecord::new("Graphs 101", RawSources {
        video: Some(h.media("lec.mp4")),
        ..Default::default()
    });
    let id = record.id;
    let Submission::Queued(job) = intake.submit(record).await.unwrap() else {
        panic!("expected the job to be queued");
    };

    h.store.break_down();
    let err = worker.run_once().await.unwrap_err();
    assert!(matches!(err, LectureError::Store(_)));
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.in_flight(), 0);

    h.store.broken.store(false, Ordering::SeqCst);
    assert_eq!(
        worker.run_once().await.unwrap(),
        Some(LectureStatus::Completed)
    );
    assert_eq!(h.get(id).await.status, LectureStatus::Completed);
    assert!(queue.is_empty());
    assert_eq!(queue.in_flight(), 0);
    assert_eq!(job.lecture_id, id);
}
