pub mod memory;
pub mod spool;

pub use memory::*;
pub use spool::*;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobReason {
    Upload,
    Reprocess,
}

/// Payload handed from the submitting side to a worker. Sources are read
/// from the lecture record at run time, not carried here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LectureJob {
    pub job_id: Uuid,
    pub lecture_id: Uuid,
    pub reason: JobReason,
    pub enqueued_at: DateTime<Utc>,
}

impl LectureJob {
    pub fn new(lecture_id: Uuid, reason: JobReason) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            lecture_id,
            reason,
            enqueued_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue is full ({capacity} jobs)")]
    Full { capacity: usize },

    #[error("Queue is closed")]
    Closed,

    #[error("Queue IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode job {job_id}: {source}")]
    Encode {
        job_id: Uuid,
        source: serde_json::Error,
    },
}

/// Boundary between job submission and job execution. An `Err` from
/// `enqueue` means the job was rejected and nothing was queued.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: LectureJob) -> Result<(), QueueError>;

    /// Waits until a job is available. Delivery is at-least-once: a job
    /// that is never acknowledged may be handed out again.
    async fn dequeue(&self) -> Result<LectureJob, QueueError>;

    async fn ack(&self, _job: &LectureJob) -> Result<(), QueueError> {
        Ok(())
    }

    /// Hands a dequeued, unacknowledged job back so it is delivered again.
    async fn nack(&self, job: &LectureJob) -> Result<(), QueueError>;
}
