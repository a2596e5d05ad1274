use async_trait::async_trait;

use crate::{
    provider::Provider,
    stages::{Producer, ProducerError, truncate_chars},
};

pub static SUMMARY_SYSTEM_PROMPT: &str =
    "You are a helpful summarization assistant for lecture notes.";

pub static QUIZ_SYSTEM_PROMPT: &str = "You are an educational AI that generates quizzes. \
Write one question per line with its options inline, and no commentary.";

/// OpenAI-compatible chat completion against the configured provider.
/// A missing API key skips the source instead of failing it.
pub struct HostedChat {
    name: String,
    client: reqwest::Client,
    provider: Provider,
    system_prompt: &'static str,
}

impl HostedChat {
    pub fn new(name: impl Into<String>, provider: Provider, system_prompt: &'static str) -> Self {
        Self {
            name: name.into(),
            client: reqwest::Client::new(),
            provider,
            system_prompt,
        }
    }
}

/// Pulls the assistant message out of a chat-completions response.
pub fn completion_content(response: &serde_json::Value) -> Result<String, ProducerError> {
    let content = response["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| {
            let raw = response.to_string();
            ProducerError::InvalidResponse(truncate_chars(&raw, 200).to_string())
        })?
        .trim();

    if content.is_empty() {
        return Err(ProducerError::EmptyOutput);
    }
    Ok(content.to_string())
}

#[async_trait]
impl Producer for HostedChat {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: &str) -> Result<String, ProducerError> {
        let api_key = self
            .provider
            .validate_api_key()
            .map_err(|e| ProducerError::Skipped {
                reason: e.to_string(),
            })?;
        let config = self.provider.config();

        let response = self
            .client
            .post(config.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&serde_json::json!({
                "model": config.model,
                "messages": [
                    {
                        "role": "system",
                        "content": self.system_prompt,
                    },
                    {
                        "role": "user",
                        "content": input,
                    },
                ],
                "temperature": 0.3,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        completion_content(&response)
    }
}
