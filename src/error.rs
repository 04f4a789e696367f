// src/error.rs

use crate::response::{ParseError, RecoveredDocument};
use serde_json::Value;
use thiserror::Error;

/// Message used for every document that could not be recovered from the LLM reply.
pub const INVALID_JSON_ERROR: &str = "Invalid JSON response from LLM";

/// Key of the single-entry failure document handed back to callers.
pub const ERROR_KEY: &str = "error";

/// Everything that can go wrong between loading a prompt and returning a document.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("{0} prompt template is missing.")]
    PromptMissing(String),

    #[error("Invalid JSON response from LLM")]
    Parse(#[from] ParseError),

    #[error("LLM error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ExtractError {
    fn from(e: reqwest::Error) -> Self {
        ExtractError::Transport(e.to_string())
    }
}

impl ExtractError {
    /// Convert into the `{"error": <message>}` document.
    pub fn to_sentinel(&self) -> RecoveredDocument {
        error_document(self.to_string())
    }
}

/// Build a document holding only the `error` key.
pub fn error_document(message: impl Into<String>) -> RecoveredDocument {
    let mut doc = RecoveredDocument::new();
    doc.insert(ERROR_KEY.to_string(), Value::String(message.into()));
    doc
}

/// The failure message if `doc` is an error document.
pub fn error_message(doc: &RecoveredDocument) -> Option<&str> {
    if doc.len() != 1 {
        return None;
    }
    doc.get(ERROR_KEY).and_then(Value::as_str)
}

/// Errors from the SGD → USD conversion step.
#[derive(Error, Debug)]
pub enum CurrencyError {
    #[error("Exchange rate JSON file not found")]
    RatesMissing,

    #[error("Exchange rate not found for year {0}")]
    RateNotFound(String),

    #[error("Currency conversion failed: {0}")]
    Failed(String),
}

/// Errors from pushing a reviewed document into the report store.
#[derive(Error, Debug)]
pub enum PushError {
    #[error("cannot push a failed extraction: {0}")]
    FailedExtraction(String),

    #[error("document has no string `date` field")]
    MissingDate,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
