use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{LectureError, Result},
    executor::PipelineExecutor,
    lecture::LectureRecord,
    queue::{JobQueue, JobReason, LectureJob},
    types::LectureStatus,
};

/// What happened to a submitted lecture.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Accepted by the queue; a worker will run the full pipeline.
    Queued(LectureJob),
    /// The queue rejected the job and the inline fallback ran to this
    /// terminal status.
    Inline(LectureStatus),
}

/// Submission side of the job queue: stores new lectures, enqueues them and
/// falls back to inline processing when the queue will not take the job.
pub struct Intake {
    queue: Arc<dyn JobQueue>,
    executor: Arc<PipelineExecutor>,
}

impl Intake {
    pub fn new(queue: Arc<dyn JobQueue>, executor: Arc<PipelineExecutor>) -> Self {
        Self { queue, executor }
    }

    pub async fn submit(&self, record: LectureRecord) -> Result<Submission> {
        if record.status != LectureStatus::Uploaded {
            return Err(LectureError::InvalidTransition {
                from: record.status,
                to: LectureStatus::Queued,
            });
        }
        self.executor.store().save(&record).await?;
        info!(lecture_id = %record.id, title = %record.title, "Lecture uploaded");

        let job = LectureJob::new(record.id, JobReason::Upload);
        match self.queue.enqueue(job.clone()).await {
            Ok(()) => {
                info!(lecture_id = %record.id, job_id = %job.job_id, "Job queued");
                self.executor.mark_queued(&record).await?;
                Ok(Submission::Queued(job))
            }
            Err(e) => {
                warn!(
                    lecture_id = %record.id,
                    error = %e,
                    "Queue rejected job, falling back to inline processing"
                );
                let status = self.executor.run_fallback(record.id).await?;
                Ok(Submission::Inline(status))
            }
        }
    }

    /// Explicit reprocess request for a finished lecture. A rejected enqueue
    /// is returned as an error; reprocessing has no inline path.
    pub async fn reprocess(&self, id: Uuid) -> Result<LectureJob> {
        let record = self.executor.load(id).await?;
        if !record.has_raw_source() {
            return Err(LectureError::NoRawSource { id });
        }
        if !record.status.is_terminal() {
            return Err(LectureError::InvalidTransition {
                from: record.status,
                to: LectureStatus::Queued,
            });
        }

        let job = LectureJob::new(id, JobReason::Reprocess);
        self.queue.enqueue(job.clone()).await?;
        info!(lecture_id = %id, job_id = %job.job_id, "Reprocess queued");
        self.executor.mark_queued(&record).await?;
        Ok(job)
    }
}
