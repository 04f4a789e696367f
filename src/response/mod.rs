// src/response/mod.rs

mod enforce;
mod normalize;
mod recover;

pub use enforce::{Enforcement, IdentifierRule, enforce_identifier};
pub use normalize::normalize;
pub use recover::{ParseError, recover};

use tracing::debug;

/// A recovered LLM reply: always a single JSON object at the top level.
pub type RecoveredDocument = serde_json::Map<String, serde_json::Value>;

/// Turn a raw LLM reply into a document, enforcing the identifier field when
/// a rule is given.
pub fn recover_document(
    raw: &str,
    rule: Option<&IdentifierRule>,
) -> Result<RecoveredDocument, ParseError> {
    let normalized = normalize(raw);
    debug!(
        raw_len = raw.len(),
        normalized_len = normalized.len(),
        "Normalized LLM response"
    );

    let mut doc = recover(&normalized)?;

    if let Some(rule) = rule {
        if enforce_identifier(&mut doc, rule) == Enforcement::Unchanged {
            debug!(field = rule.field, "Identifier already matches");
        }
    }

    Ok(doc)
}
