// src/extractor.rs

use crate::error::ExtractError;
use crate::llm_client::ChatClient;
use crate::prompt::{PromptStyle, render_prompt};
use crate::response::{IdentifierRule, RecoveredDocument, recover_document};
use std::path::{Path, PathBuf};
use tracing::{Instrument, error, info, info_span};

/// Parameters of one extraction call site.
#[derive(Debug, Clone)]
pub struct ExtractorProfile {
    /// Human-readable name used in logs and the missing-prompt message.
    pub label: String,
    /// Prompt file name, resolved against the configured prompt directory.
    pub prompt_file: &'static str,
    pub style: PromptStyle,
    pub system_prompt: &'static str,
    pub identifier: Option<IdentifierRule>,
}

/// The shared extraction pipeline bound to one profile.
pub struct Extractor {
    profile: ExtractorProfile,
    prompt_path: PathBuf,
}

impl Extractor {
    pub fn new(profile: ExtractorProfile, prompt_dir: &Path) -> Self {
        let prompt_path = prompt_dir.join(profile.prompt_file);
        Self {
            profile,
            prompt_path,
        }
    }

    pub fn profile(&self) -> &ExtractorProfile {
        &self.profile
    }

    /// Run the extraction, returning either the recovered document or the
    /// `{"error": <message>}` document. Never fails.
    pub async fn extract(
        &self,
        client: &dyn ChatClient,
        pdf_text: &str,
        company_hint: &str,
    ) -> RecoveredDocument {
        let span = info_span!("extract", extractor = %self.profile.label);

        async {
            match self.try_extract(client, pdf_text, company_hint).await {
                Ok(doc) => {
                    info!(fields = doc.len(), "Extraction succeeded");
                    doc
                }
                Err(e) => {
                    error!(error = %e, detail = ?e, "Extraction failed");
                    e.to_sentinel()
                }
            }
        }
        .instrument(span)
        .await
    }

    /// The `Result`-returning form of [`Extractor::extract`].
    pub async fn try_extract(
        &self,
        client: &dyn ChatClient,
        pdf_text: &str,
        company_hint: &str,
    ) -> Result<RecoveredDocument, ExtractError> {
        let prompt = render_prompt(
            &self.prompt_path,
            self.profile.style,
            self.profile.system_prompt,
            &self.profile.label,
            company_hint,
            pdf_text,
        )?;

        info!(
            prompt_chars = prompt.user.len(),
            pdf_chars = pdf_text.len(),
            "Sending extraction request"
        );
        let raw = client.complete(&prompt.system, &prompt.user).await?;

        let doc = recover_document(&raw, self.profile.identifier.as_ref()).inspect_err(|e| {
            let head: String = raw.chars().take(500).collect();
            error!(error = %e, raw_len = raw.len(), head = %head, "Could not recover JSON from LLM response");
        })?;

        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::INVALID_JSON_ERROR;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    /// Replays canned replies and records the prompts it was given.
    struct ScriptedClient {
        reply: Result<String, String>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedClient {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn complete(&self, system: &str, user: &str) -> Result<String, ExtractError> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            self.reply.clone().map_err(ExtractError::Transport)
        }
    }

    fn grab_profile() -> ExtractorProfile {
        ExtractorProfile {
            label: "Grab".to_string(),
            prompt_file: "grab_com_extraction.md",
            style: PromptStyle::Appended,
            system_prompt: "You extract Grab metrics.",
            identifier: Some(IdentifierRule::new("company_slug", "grab-com")),
        }
    }

    fn prompt_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("grab_com_extraction.md"), "Return the Grab schema.").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_fenced_reply_gets_slug_corrected() {
        let dir = prompt_dir();
        let extractor = Extractor::new(grab_profile(), dir.path());
        let client =
            ScriptedClient::replying("```json\n{\"company_slug\": \"x\", \"revenue\": 100}\n```");

        let doc = extractor.extract(&client, "Q3 report text", "Grab").await;

        assert_eq!(
            Value::Object(doc),
            json!({"company_slug": "grab-com", "revenue": 100})
        );
        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "You extract Grab metrics.");
        assert!(seen[0].1.contains("PDF Text:\nQ3 report text"));
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_sentinel() {
        let dir = prompt_dir();
        let extractor = Extractor::new(grab_profile(), dir.path());
        let client = ScriptedClient::replying("Sorry, I cannot read this report.");

        let doc = extractor.extract(&client, "text", "Grab").await;
        assert_eq!(Value::Object(doc), json!({"error": INVALID_JSON_ERROR}));
    }

    #[tokio::test]
    async fn test_transport_failure_is_sentinel() {
        let dir = prompt_dir();
        let extractor = Extractor::new(grab_profile(), dir.path());
        let client = ScriptedClient::failing("API error 429 Too Many Requests: rate limited");

        let doc = extractor.extract(&client, "text", "Grab").await;
        assert_eq!(
            Value::Object(doc),
            json!({"error": "LLM error: API error 429 Too Many Requests: rate limited"})
        );
    }

    #[tokio::test]
    async fn test_missing_prompt_skips_llm_call() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = Extractor::new(grab_profile(), dir.path());
        let client = ScriptedClient::replying("{}");

        let doc = extractor.extract(&client, "text", "Grab").await;

        assert_eq!(
            Value::Object(doc),
            json!({"error": "Grab prompt template is missing."})
        );
        assert!(client.seen.lock().unwrap().is_empty());
    }
}
