use std::{sync::Arc, time::Duration};

use tracing::{info, warn};

use crate::{
    error::Result,
    stages::{Producer, ProducerError, run_bounded, settle, truncate_chars},
    types::{Dual, Stage, Summary},
};

fn summary_text(raw: String) -> std::result::Result<String, ProducerError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ProducerError::EmptyOutput);
    }
    Ok(trimmed.to_string())
}

/// Summarizes lecture text with a local model and a hosted service in
/// parallel. Fails only when neither produced a summary.
pub struct DualSummarizer {
    cleaner: Option<Arc<dyn Producer>>,
    local: Arc<dyn Producer>,
    external: Arc<dyn Producer>,
    timeout: Duration,
    external_input_chars: usize,
}

impl DualSummarizer {
    pub fn new(local: Arc<dyn Producer>, external: Arc<dyn Producer>, timeout: Duration) -> Self {
        Self {
            cleaner: None,
            local,
            external,
            timeout,
            external_input_chars: 8000,
        }
    }

    pub fn with_cleaner(mut self, cleaner: Arc<dyn Producer>) -> Self {
        self.cleaner = Some(cleaner);
        self
    }

    pub fn with_external_input_chars(mut self, chars: usize) -> Self {
        self.external_input_chars = chars;
        self
    }

    async fn clean(&self, text: &str) -> String {
        let Some(cleaner) = &self.cleaner else {
            return text.to_string();
        };
        match run_bounded(cleaner.as_ref(), text, self.timeout).await {
            Ok(cleaned) => cleaned,
            Err(e) => {
                warn!(error = %e, "Cleaner failed, summarizing raw text");
                text.to_string()
            }
        }
    }

    pub async fn run(&self, text: &str) -> Result<Summary> {
        let cleaned = self.clean(text).await;
        let bounded = truncate_chars(&cleaned, self.external_input_chars);

        let (local, external) = tokio::join!(
            run_bounded(self.local.as_ref(), &cleaned, self.timeout),
            run_bounded(self.external.as_ref(), bounded, self.timeout),
        );

        let (local, external) = settle(
            Stage::Summarization,
            local.and_then(summary_text),
            external.and_then(summary_text),
        )?;
        info!(
            local = local.is_some(),
            external = external.is_some(),
            "Summaries ready"
        );
        Ok(Dual::from_sources(local, external))
    }
}
