use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::queue::{JobQueue, LectureJob, QueueError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Directory-backed queue shared by separate submitter and worker
/// processes.
///
/// Jobs live as JSON files in `pending/`. A worker claims one by renaming it
/// into `claimed/`, which only one process can win, and removes it on
/// [`JobQueue::ack`]. Claimed files left behind by a crashed worker go back
/// to `pending/` through [`SpoolQueue::recover`].
pub struct SpoolQueue {
    pending: PathBuf,
    claimed: PathBuf,
    poll_interval: Duration,
}

impl SpoolQueue {
    pub async fn open(dir: impl AsRef<Path>, poll_interval: Duration) -> Result<Self, QueueError> {
        let dir = dir.as_ref();
        let pending = dir.join("pending");
        let claimed = dir.join("claimed");
        for path in [&pending, &claimed] {
            fs::create_dir_all(path).await.map_err(|source| QueueError::Io {
                path: path.clone(),
                source,
            })?;
        }

        Ok(Self {
            pending,
            claimed,
            poll_interval,
        })
    }

    fn file_name(job: &LectureJob) -> String {
        format!(
            "{:013}_{}.json",
            job.enqueued_at.timestamp_millis().max(0),
            job.job_id
        )
    }

    /// Moves every claimed-but-unacknowledged job back to `pending/`.
    pub async fn recover(&self) -> Result<usize, QueueError> {
        let mut recovered = 0;
        for name in list_json(&self.claimed).await? {
            let from = self.claimed.join(&name);
            let to = self.pending.join(&name);
            match fs::rename(&from, &to).await {
                Ok(()) => recovered += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => return Err(QueueError::Io { path: from, source }),
            }
        }
        Ok(recovered)
    }

    pub async fn pending_len(&self) -> Result<usize, QueueError> {
        Ok(list_json(&self.pending).await?.len())
    }

    async fn try_claim(&self) -> Result<Option<LectureJob>, QueueError> {
        for name in list_json(&self.pending).await? {
            let from = self.pending.join(&name);
            let to = self.claimed.join(&name);
            match fs::rename(&from, &to).await {
                Ok(()) => {}
                // another worker won the race
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(source) => return Err(QueueError::Io { path: from, source }),
            }

            match read_job(&to).await {
                Ok(job) => {
                    debug!(job_id = %job.job_id, lecture_id = %job.lecture_id, "Claimed spooled job");
                    return Ok(Some(job));
                }
                Err(reason) => {
                    warn!(path = %to.display(), %reason, "Dropping unreadable spooled job");
                    let _ = fs::remove_file(&to).await;
                }
            }
        }
        Ok(None)
    }
}

async fn list_json(dir: &Path) -> Result<Vec<String>, QueueError> {
    let io_err = |source: std::io::Error| QueueError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(dir).await.map_err(io_err)?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(".json") && !name.starts_with('.') {
            names.push(name);
        }
    }
    // zero-padded timestamps make lexical order the enqueue order
    names.sort();
    Ok(names)
}

async fn read_job(path: &Path) -> Result<LectureJob, String> {
    let json = fs::read_to_string(path).await.map_err(|e| e.to_string())?;
    serde_json::from_str(&json).map_err(|e| e.to_string())
}

#[async_trait]
impl JobQueue for SpoolQueue {
    async fn enqueue(&self, job: LectureJob) -> Result<(), QueueError> {
        let json = serde_json::to_string_pretty(&job).map_err(|source| QueueError::Encode {
            job_id: job.job_id,
            source,
        })?;
        let tmp_path = self.pending.join(format!(".{}.{}.tmp", job.job_id, Uuid::new_v4()));
        let path = self.pending.join(Self::file_name(&job));

        fs::write(&tmp_path, json)
            .await
            .map_err(|source| QueueError::Io {
                path: tmp_path.clone(),
                source,
            })?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|source| QueueError::Io {
                path: path.clone(),
                source,
            })
    }

    async fn dequeue(&self) -> Result<LectureJob, QueueError> {
        loop {
            if let Some(job) = self.try_claim().await? {
                return Ok(job);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn ack(&self, job: &LectureJob) -> Result<(), QueueError> {
        let path = self.claimed.join(Self::file_name(job));
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(QueueError::Io { path, source }),
        }
    }

    /// Moves the claimed file back to `pending/` under its original name,
    /// so it keeps its place in line.
    async fn nack(&self, job: &LectureJob) -> Result<(), QueueError> {
        let name = Self::file_name(job);
        let from = self.claimed.join(&name);
        match fs::rename(&from, self.pending.join(&name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(QueueError::Io { path: from, source }),
        }
    }
}
