use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::{
    error::LectureError,
    executor::PipelineExecutor,
    queue::{JobQueue, LectureJob, QueueError},
    types::LectureStatus,
};

/// Receive loop of one worker process. Jobs are handled strictly one at a
/// time; concurrency comes from running more workers.
pub struct Worker {
    queue: Arc<dyn JobQueue>,
    executor: Arc<PipelineExecutor>,
    retry_delay: Duration,
}

impl Worker {
    pub fn new(queue: Arc<dyn JobQueue>, executor: Arc<PipelineExecutor>) -> Self {
        Self {
            queue,
            executor,
            retry_delay: Duration::from_secs(5),
        }
    }

    /// Pause after a job was handed back, before asking for the next one.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Runs the pipeline for a delivered job and acknowledges it. Returns
    /// `None` for a job whose lecture no longer exists. When the store fails
    /// the job is handed back to the queue and the error returned.
    pub async fn handle(&self, job: &LectureJob) -> crate::Result<Option<LectureStatus>> {
        info!(
            job_id = %job.job_id,
            lecture_id = %job.lecture_id,
            reason = ?job.reason,
            "Job received"
        );

        let status = match self.executor.process(job.lecture_id).await {
            Ok(status) => Some(status),
            Err(LectureError::NotFound { id }) => {
                warn!(job_id = %job.job_id, lecture_id = %id, "Lecture not found, dropping job");
                None
            }
            Err(e) => {
                if let Err(nack) = self.queue.nack(job).await {
                    error!(job_id = %job.job_id, error = %nack, "Could not hand job back");
                }
                return Err(e);
            }
        };

        self.queue.ack(job).await?;
        Ok(status)
    }

    /// Waits for one job and handles it.
    pub async fn run_once(&self) -> crate::Result<Option<LectureStatus>> {
        let job = self.queue.dequeue().await?;
        self.handle(&job).await
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        info!("Worker started");
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Worker shutting down");
                    return Ok(());
                }
                job = self.queue.dequeue() => match job {
                    Ok(job) => {
                        if let Err(e) = self.handle(&job).await {
                            error!(job_id = %job.job_id, error = %e, "Job handed back for redelivery");
                            tokio::select! {
                                _ = shutdown.recv() => return Ok(()),
                                _ = tokio::time::sleep(self.retry_delay) => {}
                            }
                        }
                    }
                    Err(QueueError::Closed) => {
                        info!("Queue closed, worker stopping");
                        return Ok(());
                    }
                    Err(e) => return Err(e.into()),
                },
            }
        }
    }
}
