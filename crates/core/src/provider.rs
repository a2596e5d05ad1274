use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Missing API key for {provider_name}: {env_var} is not set")]
    MissingApiKey {
        provider_name: String,
        env_var: String,
    },
}

/// Hosted generative service used as the "external" source of dual stages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Openai,
    Grok,
    Gemini,
}

pub struct ProviderConfig {
    pub api_url: &'static str,
    pub model: &'static str,
    pub env_var: &'static str,
}

impl Provider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            Provider::Openai => ProviderConfig {
                api_url: "https://api.openai.com/v1/chat/completions",
                model: "gpt-4o-mini",
                env_var: "OPENAI_API_KEY",
            },
            Provider::Grok => ProviderConfig {
                api_url: "https://api.x.ai/v1/chat/completions",
                model: "grok-4-fast",
                env_var: "XAI_API_KEY",
            },
            Provider::Gemini => ProviderConfig {
                api_url: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                model: "gemini-2.5-flash",
                env_var: "GEMINI_API_KEY",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Openai => "OpenAI",
            Provider::Grok => "Grok",
            Provider::Gemini => "Gemini",
        }
    }

    /// API key for this provider, read from its environment variable. An
    /// unset or blank key is an error; hosted sources treat it as a reason
    /// to skip, never as a failure of the stage.
    pub fn validate_api_key(&self) -> Result<String, ProviderError> {
        self.api_key_from(std::env::var(self.config().env_var).ok())
    }

    fn api_key_from(&self, value: Option<String>) -> Result<String, ProviderError> {
        value
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingApiKey {
                provider_name: self.name().to_string(),
                env_var: self.config().env_var.to_string(),
            })
    }
}
