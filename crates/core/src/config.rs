use std::{path::PathBuf, time::Duration};

use crate::{cache::get_scratch_dir, provider::Provider};

/// Knobs shared by the resolver, the stage runners and the executor.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub scratch_dir: PathBuf,
    /// Upload-relative local sources (`/uploads/a.mp4`) resolve against this.
    pub media_root: Option<PathBuf>,
    pub stage_timeout: Duration,
    /// Connect and idle-read bound for remote audio downloads.
    pub download_timeout: Duration,
    /// Bound on a whole `yt-dlp` run.
    pub platform_timeout: Duration,
    pub provider: Provider,
    /// Hosted services only ever see this many characters of text.
    pub summary_input_chars: usize,
    pub quiz_input_chars: usize,
    pub quiz_questions: usize,
    pub interpreter: PathBuf,
    pub scripts_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scratch_dir: get_scratch_dir(),
            media_root: None,
            stage_timeout: Duration::from_secs(600),
            download_timeout: Duration::from_secs(60),
            platform_timeout: Duration::from_secs(3600),
            provider: Provider::default(),
            summary_input_chars: 8000,
            quiz_input_chars: 5000,
            quiz_questions: 7,
            interpreter: PathBuf::from("python"),
            scripts_dir: PathBuf::from("ai_models"),
        }
    }
}

impl PipelineConfig {
    pub fn script(&self, name: &str) -> PathBuf {
        self.scripts_dir.join(name)
    }
}
