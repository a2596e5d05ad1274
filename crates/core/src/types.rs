use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// A visual anchor pulled out of a video or slide deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub time: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default, alias = "imageUrl", alias = "image_url")]
    pub image: Option<String>,
}

/// Output of a dual-source stage. `merged` is only ever written together
/// with `local` and `external`, see [`crate::aggregate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dual<T> {
    pub local: Option<T>,
    pub external: Option<T>,
    pub merged: Option<T>,
}

impl<T> Default for Dual<T> {
    fn default() -> Self {
        Self {
            local: None,
            external: None,
            merged: None,
        }
    }
}

pub type Summary = Dual<String>;
pub type Quiz = Dual<Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LectureStatus {
    Uploaded,
    Queued,
    Processing,
    Completed,
    Failed,
}

impl LectureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LectureStatus::Uploaded => "uploaded",
            LectureStatus::Queued => "queued",
            LectureStatus::Processing => "processing",
            LectureStatus::Completed => "completed",
            LectureStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LectureStatus::Completed | LectureStatus::Failed)
    }

    /// Edges of the lecture lifecycle. `uploaded -> processing` is the
    /// degraded inline path; `completed|failed -> queued` is reprocessing.
    pub fn can_transition_to(&self, next: LectureStatus) -> bool {
        use LectureStatus::*;
        matches!(
            (self, next),
            (Uploaded, Queued)
                | (Uploaded, Processing)
                | (Queued, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Completed, Queued)
                | (Failed, Queued)
        )
    }
}

impl fmt::Display for LectureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Resolve,
    Transcription,
    Extraction,
    Summarization,
    Quiz,
    Persist,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Resolve => "resolve",
            Stage::Transcription => "transcription",
            Stage::Extraction => "extraction",
            Stage::Summarization => "summarization",
            Stage::Quiz => "quiz",
            Stage::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw inputs attached to a lecture at upload time. Local entries are
/// filesystem paths or upload-relative web paths such as `/uploads/a.mp4`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSources {
    pub video: Option<String>,
    pub audio: Option<String>,
    pub slides: Option<String>,
    pub platform_url: Option<String>,
    pub audio_url: Option<String>,
}

impl RawSources {
    pub fn is_empty(&self) -> bool {
        [
            &self.video,
            &self.audio,
            &self.slides,
            &self.platform_url,
            &self.audio_url,
        ]
        .iter()
        .all(|s| s.as_deref().is_none_or(|s| s.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Video,
    Audio,
    Slides,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub kind: InputKind,
    pub path: PathBuf,
    /// Whether the file was fetched into the scratch directory.
    pub fetched: bool,
}

/// Transcript text as fed to summarization and quiz generation.
pub fn full_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
