use std::{sync::Arc, time::Duration};

use serde::Deserialize;
use tracing::info;

use crate::{
    stages::{Producer, ProducerError, StageOutput, best_effort},
    types::{Frame, ResolvedInput, Stage},
};

#[derive(Deserialize)]
#[serde(untagged)]
enum FramesPayload {
    Frames(Vec<Frame>),
    Wrapped { frames: Vec<Frame> },
}

/// Parses extractor output, either a bare array or `{"frames": [...]}`.
/// Frames come back ordered by timestamp.
pub fn parse_frames(raw: &str) -> Result<Vec<Frame>, ProducerError> {
    let payload: FramesPayload =
        serde_json::from_str(raw.trim()).map_err(|e| ProducerError::Garbled(e.to_string()))?;

    let mut frames = match payload {
        FramesPayload::Frames(frames) | FramesPayload::Wrapped { frames } => frames,
    };
    frames.sort_by(|a, b| a.time.total_cmp(&b.time));
    Ok(frames)
}

/// Best-effort frame and slide extraction.
pub struct ExtractionRunner {
    local: Arc<dyn Producer>,
    external: Option<Arc<dyn Producer>>,
    timeout: Duration,
}

impl ExtractionRunner {
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

    pub async fn run(&self, input: &ResolvedInput) -> StageOutput<Vec<Frame>> {
        let path = input.path.to_string_lossy();
        let output = best_effort(
            Stage::Extraction,
            self.local.as_ref(),
            self.external.as_deref(),
            &path,
            self.timeout,
            parse_frames,
        )
        .await;

        info!(frames = output.value.len(), ok = output.ok, "Extraction finished");
        output
    }
}
