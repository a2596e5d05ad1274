use std::{sync::Arc, time::Duration};

use serde::Deserialize;
use tracing::info;

use crate::{
    stages::{Producer, ProducerError, StageOutput, best_effort},
    types::{ResolvedInput, Segment, Stage},
};

#[derive(Deserialize)]
#[serde(untagged)]
enum TranscriptPayload {
    Segments(Vec<Segment>),
    Wrapped { segments: Vec<Segment> },
}

/// Parses producer output into segments. Scripts that log before printing
/// their result are tolerated by retrying on the last line.
pub fn parse_transcript(raw: &str) -> Result<Vec<Segment>, ProducerError> {
    let payload = serde_json::from_str::<TranscriptPayload>(raw.trim()).or_else(|first| {
        raw.lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .and_then(|last| serde_json::from_str(last.trim()).ok())
            .ok_or_else(|| ProducerError::Garbled(first.to_string()))
    })?;

    Ok(match payload {
        TranscriptPayload::Segments(segments) | TranscriptPayload::Wrapped { segments } => {
            segments
        }
    })
}

/// Best-effort transcription of the resolved media file.
pub struct TranscriptionRunner {
    local: Arc<dyn Producer>,
    external: Option<Arc<dyn Producer>>,
    timeout: Duration,
}

impl TranscriptionRunner {
    pub fn new(local: Arc<dyn Producer>, timeout: Duration) -> Self {
        Self {
            local,
            external: None,
            timeout,
        }
    }

    pub fn with_external(mut self, external: Arc<dyn Producer>) -> Self {
        self.external = Some(external);
        self
    }

    pub async fn run(&self, input: &ResolvedInput) -> StageOutput<Vec<Segment>> {
        let path = input.path.to_string_lossy();
        let output = best_effort(
            Stage::Transcription,
            self.local.as_ref(),
            self.external.as_deref(),
            &path,
            self.timeout,
            parse_transcript,
        )
        .await;

        info!(segments = output.value.len(), ok = output.ok, "Transcription finished");
        output
    }
}
