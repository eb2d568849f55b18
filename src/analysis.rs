//! Analysis of token snapshots via a chat-completion model

use crate::{
    constants::{OPENAI_API_KEY_ENV, OPENAI_API_URL, OPENAI_MODEL, REQUEST_TIMEOUT_SECS, USER_AGENT},
    error::ProviderError,
    evolution::Evolution,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trait for snapshot analysts
///
/// `analyze` is total by contract: every failure comes back as
/// human-readable warning text, never as an error, so a misconfigured or
/// unreachable analyst can never stall a tracking pass.
#[async_trait]
pub trait Analyst: Send + Sync {
    /// Produces analysis text for a snapshot summary
    ///
    /// # Arguments
    /// * `summary` - Human-readable summary of the current snapshot
    /// * `evolution` - Changes since the previous analysis, when one exists
    async fn analyze(&self, summary: &str, evolution: Option<&Evolution>) -> String;

    /// Returns the name of this analyst
    fn analyst_name(&self) -> &'static str;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// GPT-backed analyst
///
/// The API key is read from `OPENAI_API_KEY`. Without one, every analysis
/// is a fixed warning string; the tracker keeps recording snapshots and
/// evolutions regardless.
pub struct GptAnalyst {
    client: Client,
    api_key: Option<String>,
}

impl GptAnalyst {
    /// Creates a new GPT analyst with the key from the environment
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_api_key(std::env::var(OPENAI_API_KEY_ENV).ok())
    }

    /// Creates a new GPT analyst with an explicit key (or none)
    pub fn with_api_key(api_key: Option<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::NetworkError)?;

        Ok(Self { client, api_key })
    }

    async fn request_completion(
        &self,
        api_key: &str,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: OPENAI_MODEL,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a cryptocurrency analyst expert. \
                              Provide clear, actionable analysis.",
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: 500,
            temperature: 0.7,
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::NetworkError)?;

        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimitExceeded);
        }

        if !response.status().is_success() {
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let response_text = response.text().await.map_err(ProviderError::NetworkError)?;

        let completion: ChatResponse = serde_json::from_str(&response_text).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse completion response: {}", e))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("Completion contained no choices".to_string())
            })
    }
}

#[async_trait]
impl Analyst for GptAnalyst {
    async fn analyze(&self, summary: &str, evolution: Option<&Evolution>) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return format!(
                "⚠️ OpenAI API key not configured. Please set {} environment variable.",
                OPENAI_API_KEY_ENV
            );
        };

        let prompt = build_prompt(summary, evolution);

        match self.request_completion(api_key, &prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Token analysis request failed");
                format!("⚠️ Error analyzing token with GPT: {}", e)
            }
        }
    }

    fn analyst_name(&self) -> &'static str {
        "gpt"
    }
}

/// Builds the analysis prompt, appending the evolution lines when changes
/// since the previous analysis are known
fn build_prompt(summary: &str, evolution: Option<&Evolution>) -> String {
    let mut prompt = format!(
        "Analyze this cryptocurrency token based on the following data:\n\n{}\n",
        summary
    );

    if let Some(evolution) = evolution.filter(|e| !e.is_empty()) {
        prompt.push_str("\nEVOLUTION DATA (Changes since last analysis):\n");
        for (label, text) in evolution.describe() {
            prompt.push_str(&format!("- {}: {}\n", label, text));
        }
    }

    prompt.push_str(
        "\nPlease provide a comprehensive analysis including:\n\
         1. Current market sentiment and outlook\n\
         2. Risk assessment based on the data\n\
         3. Key metrics analysis (market cap, holders, rugscore, etc.)\n\
         4. Evolution trends if provided\n\
         5. Investment recommendation (high risk, medium risk, low risk)\n\n\
         Keep the analysis concise but informative for Telegram messaging.\n",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::diff;
    use crate::types::TokenSnapshot;
    use serde_json::json;

    #[tokio::test]
    async fn missing_key_returns_a_warning_instead_of_failing() {
        let analyst = GptAnalyst::with_api_key(None).unwrap();
        let text = analyst.analyze("Token: TEST", None).await;
        assert!(text.starts_with("⚠️ OpenAI API key not configured"));
        assert!(text.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn prompt_without_evolution_omits_the_evolution_section() {
        let prompt = build_prompt("Token: TEST", None);
        assert!(prompt.contains("Token: TEST"));
        assert!(!prompt.contains("EVOLUTION DATA"));
        assert!(prompt.contains("Investment recommendation"));
    }

    #[test]
    fn prompt_includes_the_evolution_lines() {
        let previous = TokenSnapshot {
            market_cap: Some(json!(1_000_000)),
            ..TokenSnapshot::new("0xaaa")
        };
        let current = TokenSnapshot {
            market_cap: Some(json!(1_500_000)),
            ..TokenSnapshot::new("0xaaa")
        };
        let evolution = diff(&current, &previous);

        let prompt = build_prompt("Token: TEST", Some(&evolution));

        assert!(prompt.contains("EVOLUTION DATA (Changes since last analysis):"));
        assert!(prompt.contains("- Market Cap: $1,000,000 → $1,500,000 (+50.0%)"));
    }

    #[test]
    fn empty_evolution_reads_like_a_first_analysis() {
        let prompt = build_prompt("Token: TEST", Some(&Evolution::default()));
        assert!(!prompt.contains("EVOLUTION DATA"));
    }
}
