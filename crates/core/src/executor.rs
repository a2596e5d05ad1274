//! Drives one lecture through resolve, the four stages and the terminal
//! status. Every status write in the crate goes through this module.

use std::{path::PathBuf, sync::Arc};

use tokio::fs;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    config::PipelineConfig,
    error::{LectureError, Result},
    fetch::{HttpFetcher, YtDlpFetcher},
    lecture::LectureRecord,
    resolver::InputResolver,
    stages::{
        DualQuizGenerator, DualSummarizer, ExtractionRunner, HostedChat, LocalScript,
        QUIZ_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT, TranscriptionRunner,
    },
    store::LectureStore,
    types::{LectureStatus, ResolvedInput, Stage, full_text},
};

/// Summarized by the inline fallback when a lecture has no text at all.
pub const FALLBACK_PLACEHOLDER: &str = "Temporary fallback text";

/// The four stage runners, in pipeline order.
pub struct Stages {
    pub transcription: TranscriptionRunner,
    pub extraction: ExtractionRunner,
    pub summarization: DualSummarizer,
    pub quiz: DualQuizGenerator,
}

impl Stages {
    /// Local scripts under `config.scripts_dir` plus the configured hosted
    /// provider for the dual stages.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let script = |name: &str, file: &str| {
            Arc::new(LocalScript::new(
                name,
                &config.interpreter,
                config.script(file),
            ))
        };

        Self {
            transcription: TranscriptionRunner::new(
                script("transcriber", "transcriber.py"),
                config.stage_timeout,
            ),
            extraction: ExtractionRunner::new(
                script("extractor", "extractor.py"),
                config.stage_timeout,
            ),
            summarization: DualSummarizer::new(
                script("summarizer", "summarize.py"),
                Arc::new(HostedChat::new(
                    "hosted-summary",
                    config.provider,
                    SUMMARY_SYSTEM_PROMPT,
                )),
                config.stage_timeout,
            )
            .with_cleaner(script("cleaner", "cleaner.py"))
            .with_external_input_chars(config.summary_input_chars),
            quiz: DualQuizGenerator::new(
                script("quiz", "quiz_generator.py"),
                Arc::new(HostedChat::new(
                    "hosted-quiz",
                    config.provider,
                    QUIZ_SYSTEM_PROMPT,
                )),
                config.stage_timeout,
            )
            .with_external_input_chars(config.quiz_input_chars)
            .with_questions(config.quiz_questions),
        }
    }
}

pub struct PipelineExecutor {
    store: Arc<dyn LectureStore>,
    resolver: InputResolver,
    stages: Stages,
    scratch_dir: PathBuf,
}

impl PipelineExecutor {
    pub fn new(
        store: Arc<dyn LectureStore>,
        resolver: InputResolver,
        stages: Stages,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            resolver,
            stages,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Production wiring: `yt-dlp` for platform URLs, HTTP for remote audio,
    /// local scripts and the hosted provider for the stages.
    pub fn from_config(store: Arc<dyn LectureStore>, config: &PipelineConfig) -> Result<Self> {
        let resolver = InputResolver::new(
            Arc::new(YtDlpFetcher::new(config.platform_timeout)),
            Arc::new(HttpFetcher::new(config.download_timeout)?),
        )
        .with_media_root(config.media_root.clone());

        Ok(Self::new(
            store,
            resolver,
            Stages::from_config(config),
            &config.scratch_dir,
        ))
    }

    pub fn store(&self) -> &Arc<dyn LectureStore> {
        &self.store
    }

    pub async fn load(&self, id: Uuid) -> Result<LectureRecord> {
        self.store
            .find(id)
            .await?
            .ok_or(LectureError::NotFound { id })
    }

    async fn transition(&self, record: &mut LectureRecord, next: LectureStatus) -> Result<()> {
        let from = record.status;
        record.transition(next)?;
        self.store.save(record).await?;
        info!(lecture_id = %record.id, %from, to = %next, "Status changed");
        Ok(())
    }

    async fn persist(&self, record: &mut LectureRecord, stage: Stage) -> Result<()> {
        record.touch();
        self.store.save(record).await?;
        debug!(lecture_id = %record.id, %stage, "Stage output persisted");
        Ok(())
    }

    /// `uploaded -> queued` after the job was accepted. Skipped when the
    /// stored record moved on since `submitted` was read, which happens when
    /// a worker picked the job up first.
    pub async fn mark_queued(&self, submitted: &LectureRecord) -> Result<bool> {
        // Read then write, not atomic. A whole run finishing between the two
        // is overwritten with this stale `queued` copy; the lecture then needs
        // a reprocess request. Accepted race.
        let mut current = self.load(submitted.id).await?;
        if current.status != submitted.status || current.updated_at != submitted.updated_at {
            info!(
                lecture_id = %current.id,
                status = %current.status,
                "Lecture already picked up, leaving status as is"
            );
            return Ok(false);
        }
        self.transition(&mut current, LectureStatus::Queued).await?;
        Ok(true)
    }

    /// Takes the record into `processing` from whatever state a delivered
    /// job can find it in.
    async fn begin(&self, record: &mut LectureRecord) -> Result<()> {
        match record.status {
            LectureStatus::Queued => self.transition(record, LectureStatus::Processing).await,
            LectureStatus::Processing => {
                warn!(lecture_id = %record.id, "Redelivered job, lecture already processing");
                Ok(())
            }
            LectureStatus::Uploaded => {
                info!(lecture_id = %record.id, "Job arrived before the queued write");
                self.transition(record, LectureStatus::Queued).await?;
                self.transition(record, LectureStatus::Processing).await
            }
            LectureStatus::Completed | LectureStatus::Failed => {
                warn!(
                    lecture_id = %record.id,
                    status = %record.status,
                    "Redelivered job for a finished lecture, processing again"
                );
                self.transition(record, LectureStatus::Queued).await?;
                self.transition(record, LectureStatus::Processing).await
            }
        }
    }

    /// Full run for a dequeued job. Pipeline failures end in `failed` and
    /// are returned as `Ok`; only store failures and a missing record are
    /// errors.
    pub async fn process(&self, id: Uuid) -> Result<LectureStatus> {
        let mut record = self.load(id).await?;
        self.begin(&mut record).await?;
        info!(lecture_id = %id, title = %record.title, "Processing lecture");

        let mut fetched = None;
        let outcome = self.run_stages(&mut record, &mut fetched).await;
        if let Some(input) = fetched {
            discard_fetched(&input).await;
        }

        self.finish(&mut record, outcome).await
    }

    async fn finish(
        &self,
        record: &mut LectureRecord,
        outcome: Result<()>,
    ) -> Result<LectureStatus> {
        match outcome {
            Ok(()) => {
                self.transition(record, LectureStatus::Completed).await?;
                info!(lecture_id = %record.id, "Lecture processed");
            }
            Err(e) => {
                error!(
                    lecture_id = %record.id,
                    stage = %e.stage(),
                    error = %e,
                    "Lecture processing failed"
                );
                self.transition(record, LectureStatus::Failed).await?;
            }
        }
        Ok(record.status)
    }

    async fn run_stages(
        &self,
        record: &mut LectureRecord,
        fetched: &mut Option<ResolvedInput>,
    ) -> Result<()> {
        if !record.has_raw_source() {
            return Err(LectureError::NoRawSource { id: record.id });
        }

        let input = self
            .resolver
            .resolve(&record.sources, &self.scratch_dir)
            .await
            .ok_or(LectureError::NoUsableInput { id: record.id })?;
        info!(
            lecture_id = %record.id,
            kind = ?input.kind,
            path = %input.path.display(),
            "Input resolved"
        );
        if input.fetched {
            *fetched = Some(input.clone());
        }

        let transcript = self.stages.transcription.run(&input).await;
        record.transcript = transcript.value;
        self.persist(record, Stage::Transcription).await?;

        let frames = self.stages.extraction.run(&input).await;
        record.frames = frames.value;
        self.persist(record, Stage::Extraction).await?;

        let text = full_text(&record.transcript);

        record.summary = self.stages.summarization.run(&text).await?;
        self.persist(record, Stage::Summarization).await?;

        record.quiz = self.stages.quiz.run(&text).await?;
        self.persist(record, Stage::Quiz).await?;

        Ok(())
    }

    /// Reduced inline run for a lecture whose job could not be queued:
    /// `uploaded -> processing`, summarize whatever text is at hand, then
    /// `completed` or `failed`. Only the summary is written.
    pub async fn run_fallback(&self, id: Uuid) -> Result<LectureStatus> {
        let mut record = self.load(id).await?;
        self.transition(&mut record, LectureStatus::Processing).await?;

        let text = fallback_text(&record);
        warn!(lecture_id = %id, chars = text.chars().count(), "Running inline fallback summary");

        let outcome = match self.stages.summarization.run(&text).await {
            Ok(summary) => {
                record.summary = summary;
                self.persist(&mut record, Stage::Summarization).await
            }
            Err(e) => Err(e),
        };

        self.finish(&mut record, outcome).await
    }
}

/// Best text available without running any stage: the transcript, then the
/// title and description, then [`FALLBACK_PLACEHOLDER`].
pub fn fallback_text(record: &LectureRecord) -> String {
    let transcript = full_text(&record.transcript);
    if !transcript.is_empty() {
        return transcript;
    }

    let about = [record.title.trim(), record.description.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    if !about.is_empty() {
        return about;
    }

    FALLBACK_PLACEHOLDER.to_string()
}

async fn discard_fetched(input: &ResolvedInput) {
    if let Err(e) = fs::remove_file(&input.path).await {
        debug!(path = %input.path.display(), error = %e, "Could not remove fetched input");
    }
}
