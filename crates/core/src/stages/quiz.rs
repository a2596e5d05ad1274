use std::{sync::Arc, time::Duration};

use tracing::info;

use crate::{
    error::Result,
    stages::{Producer, ProducerError, run_bounded, settle, truncate_chars},
    types::{Dual, Quiz, Stage},
};

/// One question per non-empty output line.
pub fn parse_questions(raw: &str) -> std::result::Result<Vec<String>, ProducerError> {
    let questions: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if questions.is_empty() {
        return Err(ProducerError::EmptyOutput);
    }
    Ok(questions)
}

pub fn quiz_prompt(questions: usize, text: &str) -> String {
    format!("Create {questions} multiple-choice questions from this lecture:\n{text}")
}

/// Generates quiz questions from a local model and a hosted service in
/// parallel. Fails only when neither produced a question.
pub struct DualQuizGenerator {
    local: Arc<dyn Producer>,
    external: Arc<dyn Producer>,
    timeout: Duration,
    external_input_chars: usize,
    questions: usize,
}

impl DualQuizGenerator {
    pub fn new(local: Arc<dyn Producer>, external: Arc<dyn Producer>, timeout: Duration) -> Self {
        Self {
            local,
            external,
            timeout,
            external_input_chars: 5000,
            questions: 7,
        }
    }

    pub fn with_external_input_chars(mut self, chars: usize) -> Self {
        self.external_input_chars = chars;
        self
    }

    pub fn with_questions(mut self, questions: usize) -> Self {
        self.questions = questions;
        self
    }

    pub async fn run(&self, text: &str) -> Result<Quiz> {
        let prompt = quiz_prompt(
            self.questions,
            truncate_chars(text, self.external_input_chars),
        );

        let (local, external) = tokio::join!(
            run_bounded(self.local.as_ref(), text, self.timeout),
            run_bounded(self.external.as_ref(), &prompt, self.timeout),
        );

        let (local, external) = settle(
            Stage::Quiz,
            local.and_then(|raw| parse_questions(&raw)),
            external.and_then(|raw| parse_questions(&raw)),
        )?;
        info!(
            local = local.as_ref().map_or(0, Vec::len),
            external = external.as_ref().map_or(0, Vec::len),
            "Quiz ready"
        );
        Ok(Dual::from_sources(local, external))
    }
}
