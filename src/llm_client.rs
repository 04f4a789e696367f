// src/llm_client.rs

use crate::config::{LlmBackend, LlmSection};
use crate::error::ExtractError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Anything that can answer a system + user prompt pair with one text payload.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ExtractError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Resolved endpoint configuration ready to make API calls.
#[derive(Debug, Clone)]
struct ResolvedEndpoint {
    base_url: String,
    model: String,
    api_key: String,
}

/// Resolve the LLM config section into a concrete endpoint.
fn resolve_endpoint(llm: &LlmSection) -> Result<ResolvedEndpoint, Box<dyn std::error::Error>> {
    let base_url = llm.base_url.trim_end_matches('/').to_string();
    match llm.backend {
        LlmBackend::Ollama => {
            info!(url = %base_url, model = %llm.model, "Using Ollama (local) backend");
            Ok(ResolvedEndpoint {
                base_url,
                model: llm.model.clone(),
                api_key: "ollama".to_string(), // required by API but ignored
            })
        }
        LlmBackend::Openrouter => {
            let api_key = std::env::var(&llm.api_key_env).map_err(|_| {
                format!(
                    "{} not found. Set it in the environment before extracting.",
                    llm.api_key_env
                )
            })?;
            info!(url = %base_url, model = %llm.model, "Using OpenRouter backend");
            Ok(ResolvedEndpoint {
                base_url,
                model: llm.model.clone(),
                api_key,
            })
        }
    }
}

/// OpenAI-compatible `/chat/completions` client.
///
/// Built once at startup and passed by reference to every extraction.
pub struct ChatCompletionsClient {
    client: Client,
    endpoint: ResolvedEndpoint,
    temperature: f64,
    max_tokens: u32,
}

impl ChatCompletionsClient {
    pub async fn connect(llm: &LlmSection) -> Result<Self, Box<dyn std::error::Error>> {
        let endpoint = resolve_endpoint(llm)?;
        let client = Client::new();

        if llm.backend == LlmBackend::Ollama && !check_ollama_health(&client, &endpoint.base_url).await
        {
            return Err(format!(
                "Ollama is not running at {}. Start it with: ollama serve",
                endpoint.base_url
            )
            .into());
        }

        Ok(Self {
            client,
            endpoint,
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.endpoint.model
    }
}

#[async_trait]
impl ChatClient for ChatCompletionsClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ExtractError> {
        let request = ChatRequest {
            model: &self.endpoint.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let url = format!("{}/chat/completions", self.endpoint.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.endpoint.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::Transport(format!("API error {status}: {body}")));
        }

        let chat_response: ChatResponse = response.json().await?;
        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ExtractError::Transport("Empty response from LLM".to_string()))?;

        info!(chars = content.len(), model = %self.endpoint.model, "LLM response received");
        Ok(content)
    }
}

/// Check if the Ollama server is reachable.
async fn check_ollama_health(client: &Client, base_url: &str) -> bool {
    // Ollama's health endpoint is at the root (not under /v1)
    let health_url = base_url.trim_end_matches("/v1");

    match client
        .get(health_url)
        .timeout(std::time::Duration::from_secs(3))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            info!("Ollama server is reachable");
            true
        }
        Ok(resp) => {
            warn!(status = %resp.status(), "Ollama server returned non-OK status");
            false
        }
        Err(e) => {
            warn!(error = %e, "Ollama server not reachable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "openai/gpt-oss-20b:free",
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
            temperature: 0.0,
            max_tokens: 50_000,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "openai/gpt-oss-20b:free");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["max_tokens"], 50_000);
    }

    #[test]
    fn test_response_decodes_first_choice() {
        let body = r#"{"id":"gen-1","choices":[{"index":0,"message":{"role":"assistant","content":"{\"a\":1}"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "{\"a\":1}");
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let llm = LlmSection {
            backend: LlmBackend::Ollama,
            base_url: "http://localhost:11434/v1/".to_string(),
            ..LlmSection::default()
        };
        let endpoint = resolve_endpoint(&llm).unwrap();
        assert_eq!(endpoint.base_url, "http://localhost:11434/v1");
        assert_eq!(endpoint.api_key, "ollama");
    }

    #[test]
    fn test_openrouter_requires_key_env() {
        let llm = LlmSection {
            api_key_env: "EARNINGS_EXTRACT_TEST_UNSET_KEY".to_string(),
            ..LlmSection::default()
        };
        let err = resolve_endpoint(&llm).unwrap_err();
        assert!(err.to_string().contains("EARNINGS_EXTRACT_TEST_UNSET_KEY"));
    }
}
