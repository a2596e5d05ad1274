use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{LectureError, Result},
    types::{Frame, LectureStatus, Quiz, RawSources, Segment, Summary},
};

/// Durable state of one uploaded lecture and everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LectureRecord {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sources: RawSources,
    pub status: LectureStatus,
    #[serde(default)]
    pub transcript: Vec<Segment>,
    #[serde(default)]
    pub frames: Vec<Frame>,
    #[serde(default)]
    pub summary: Summary,
    #[serde(default)]
    pub quiz: Quiz,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LectureRecord {
    pub fn new(title: impl Into<String>, sources: RawSources) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            sources,
            status: LectureStatus::Uploaded,
            transcript: Vec::new(),
            frames: Vec::new(),
            summary: Summary::default(),
            quiz: Quiz::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Move along one lifecycle edge. Only the pipeline calls this.
    pub(crate) fn transition(&mut self, next: LectureStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(LectureError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.touch();
        Ok(())
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn has_raw_source(&self) -> bool {
        !self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_uploaded_and_empty() {
        let record = LectureRecord::new("Graphs 101", RawSources::default());
        assert_eq!(record.status, LectureStatus::Uploaded);
        assert!(record.transcript.is_empty());
        assert!(record.frames.is_empty());
        assert!(record.summary.merged.is_none());
        assert!(record.quiz.merged.is_none());
        assert!(!record.has_raw_source());
    }

    #[test]
    fn test_transition_rejects_skipping_processing() {
        let mut record = LectureRecord::new("Graphs 101", RawSources::default());
        record.transition(LectureStatus::Queued).unwrap();

        let err = record.transition(LectureStatus::Completed).unwrap_err();
        assert!(matches!(
            err,
            LectureError::InvalidTransition {
                from: LectureStatus::Queued,
                to: LectureStatus::Completed
            }
        ));
        assert_eq!(record.status, LectureStatus::Queued);
    }

    #[test]
    fn test_transition_bumps_updated_at() {
        let mut record = LectureRecord::new("Graphs 101", RawSources::default());
        let before = record.updated_at;
        record.transition(LectureStatus::Processing).unwrap();
        assert!(record.updated_at >= before);
    }

    #[test]
    fn test_record_json_defaults_missing_artifacts() {
        let json = r#"{
            "id": "6f1c1a7e-7a8e-4b8e-9a55-1f0f6d1c2b3a",
            "title": "Legacy",
            "status": "completed",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let record: LectureRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, LectureStatus::Completed);
        assert!(record.transcript.is_empty());
        assert!(record.quiz.local.is_none());
    }
}
