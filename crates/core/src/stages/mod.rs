//! Stage runners and the producers they fan out to.
//!
//! Transcription and extraction are best-effort: they always return a value
//! and flag degradation through [`StageOutput::ok`]. Summarization and quiz
//! generation are dual-source and only fail when neither source produced
//! anything.

pub mod extraction;
pub mod hosted;
pub mod process;
pub mod quiz;
pub mod summarization;
pub mod transcription;

pub use extraction::*;
pub use hosted::*;
pub use process::*;
pub use quiz::*;
pub use summarization::*;
pub use transcription::*;

use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    error::{LectureError, Result},
    types::Stage,
};

#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("Process exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("Producer returned no output")]
    EmptyOutput,

    #[error("Producer output could not be parsed: {0}")]
    Garbled(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("Timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Skipped: {reason}")]
    Skipped { reason: String },
}

impl ProducerError {
    pub fn is_skip(&self) -> bool {
        matches!(self, ProducerError::Skipped { .. })
    }
}

/// One independent source of stage output, e.g. a local model process or a
/// hosted generative service.
#[async_trait]
pub trait Producer: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self, input: &str) -> std::result::Result<String, ProducerError>;
}

pub async fn run_bounded(
    producer: &dyn Producer,
    input: &str,
    timeout: Duration,
) -> std::result::Result<String, ProducerError> {
    tokio::time::timeout(timeout, producer.run(input))
        .await
        .map_err(|_| ProducerError::Timeout(timeout))?
}

/// Result of a best-effort stage. `ok == false` means the value is the
/// empty substitute for a failed run.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput<T> {
    pub value: T,
    pub ok: bool,
}

/// At most `max_chars` characters, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Reduces the two source results of a dual stage. Fails only when neither
/// source produced a value; a skipped source counts as no value.
pub(crate) fn settle<T>(
    stage: Stage,
    local: std::result::Result<T, ProducerError>,
    external: std::result::Result<T, ProducerError>,
) -> Result<(Option<T>, Option<T>)> {
    let local = keep(stage, "local", local);
    let external = keep(stage, "external", external);

    match (local, external) {
        (Err(l), Err(e)) => Err(LectureError::StageFailed {
            stage,
            reason: format!("local: {l}; external: {e}"),
        }),
        (l, e) => Ok((l.ok(), e.ok())),
    }
}

fn keep<T>(
    stage: Stage,
    source: &'static str,
    result: std::result::Result<T, ProducerError>,
) -> std::result::Result<T, ProducerError> {
    match &result {
        Ok(_) => info!(%stage, source, "Source produced output"),
        Err(e) if e.is_skip() => info!(%stage, source, reason = %e, "Source skipped"),
        Err(e) => warn!(%stage, source, error = %e, "Source failed"),
    }
    result
}

/// Runs a best-effort stage over its producers. The local result wins when
/// it is non-empty, otherwise the external one; total failure yields an
/// empty, non-ok output rather than an error.
pub(crate) async fn best_effort<T>(
    stage: Stage,
    local: &dyn Producer,
    external: Option<&dyn Producer>,
    input: &str,
    timeout: Duration,
    parse: fn(&str) -> std::result::Result<Vec<T>, ProducerError>,
) -> StageOutput<Vec<T>> {
    let (local, external) = tokio::join!(
        attempt(stage, "local", Some(local), input, timeout, parse),
        attempt(stage, "external", external, input, timeout, parse),
    );

    for result in [local, external].into_iter().flatten() {
        if let Ok(items) = result
            && !items.is_empty()
        {
            return StageOutput {
                value: items,
                ok: true,
            };
        }
    }

    warn!(%stage, "Stage produced nothing, continuing with an empty result");
    StageOutput {
        value: Vec::new(),
        ok: false,
    }
}

async fn attempt<T>(
    stage: Stage,
    source: &'static str,
    producer: Option<&dyn Producer>,
    input: &str,
    timeout: Duration,
    parse: fn(&str) -> std::result::Result<Vec<T>, ProducerError>,
) -> Option<std::result::Result<Vec<T>, ProducerError>> {
    let producer = producer?;
    let result = run_bounded(producer, input, timeout)
        .await
        .and_then(|raw| parse(&raw));
    Some(keep(stage, source, result))
}
