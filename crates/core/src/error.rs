use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::{
    queue::QueueError,
    store::StoreError,
    types::{LectureStatus, Stage},
};

#[derive(Error, Debug)]
pub enum LectureError {
    #[error("Lecture {id} not found")]
    NotFound { id: Uuid },

    #[error("Invalid status transition {from} -> {to}")]
    InvalidTransition {
        from: LectureStatus,
        to: LectureStatus,
    },

    #[error("Lecture {id} has no raw source to process")]
    NoRawSource { id: Uuid },

    #[error("No usable input found for lecture {id}")]
    NoUsableInput { id: Uuid },

    #[error("Stage {stage} failed on every source: {reason}")]
    StageFailed { stage: Stage, reason: String },

    #[error("Download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Invalid video platform URL: {url}")]
    InvalidPlatformUrl { url: String },

    #[error("Scratch directory {path} is unusable: {source}")]
    Scratch {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl LectureError {
    /// Stage the failure is attributed to, for diagnostics.
    pub fn stage(&self) -> Stage {
        match self {
            LectureError::NoRawSource { .. }
            | LectureError::NoUsableInput { .. }
            | LectureError::DownloadFailed { .. }
            | LectureError::InvalidPlatformUrl { .. }
            | LectureError::Scratch { .. } => Stage::Resolve,
            LectureError::StageFailed { stage, .. } => *stage,
            _ => Stage::Persist,
        }
    }
}

pub type Result<T> = std::result::Result<T, LectureError>;
