//! Answer generation from retrieved context.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::GenerationConfig;
use crate::error::{Result, RetrievalError};

/// Assemble the prompt sent to the generator.
pub fn build_prompt<S: AsRef<str>>(system: &str, matches: &[S], query: &str) -> String {
    let context = matches
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n");
    format!("{system}\nContext:\n{context}\nQuestion: {query}\nAnswer:")
}

/// A hosted language model that completes prompts.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    /// Produce an answer for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// OpenAI chat completions generator.
pub struct OpenAIChatGenerator {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAIChatGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Build from configuration, reading the credential from the environment.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                RetrievalError::Config(format!(
                    "generation enabled but {} is not set",
                    config.api_key_env
                ))
            })?;

        Self::new(api_key, config.model.clone())
            .with_base_url(config.base_url.clone())
            .with_timeout(Duration::from_secs(config.request_timeout_secs))
    }

    /// Bound every completion request.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RetrievalError::Config(format!("http client: {e}")))?;
        Ok(self)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl Generator for OpenAIChatGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Generating answer with model: {}", self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}]
            }))
            .send()
            .await
            .map_err(|e| RetrievalError::Generation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Generation(format!(
                "API error {status}: {body}"
            )));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| RetrievalError::Generation(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| RetrievalError::Generation("no completion in response".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_prompt_format() {
        let prompt = build_prompt("Be brief.", &["a cat sat", "a dog ran"], "who sat?");
        assert_eq!(
            prompt,
            "Be brief.\nContext:\na cat sat\na dog ran\nQuestion: who sat?\nAnswer:"
        );
    }

    #[test]
    fn test_prompt_without_matches() {
        let prompt = build_prompt::<&str>("Sys", &[], "q");
        assert_eq!(prompt, "Sys\nContext:\n\nQuestion: q\nAnswer:");
    }

    #[tokio::test]
    async fn test_openai_generate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": " The cat. "}}]
            })))
            .mount(&server)
            .await;

        let generator = OpenAIChatGenerator::new("sk-test", "gpt-test").with_base_url(server.uri());
        let answer = generator.generate("prompt").await.unwrap();
        assert_eq!(answer, "The cat.");
    }

    #[tokio::test]
    async fn test_openai_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let generator = OpenAIChatGenerator::new("sk-test", "gpt-test").with_base_url(server.uri());
        let err = generator.generate("prompt").await.unwrap_err();
        assert!(matches!(err, RetrievalError::Generation(msg) if msg.contains("boom")));
    }

    #[tokio::test]
    async fn test_openai_request_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"choices": []}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let generator = OpenAIChatGenerator::new("sk-test", "gpt-test")
            .with_base_url(server.uri())
            .with_timeout(Duration::from_millis(100))
            .unwrap();
        let err = generator.generate("prompt").await.unwrap_err();
        assert!(matches!(err, RetrievalError::Generation(_)), "{err}");
    }
}
