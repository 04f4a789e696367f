// src/response/enforce.rs

use super::RecoveredDocument;
use serde_json::Value;
use tracing::warn;

/// A field that must hold a fixed value for a given extractor, e.g.
/// `company_slug = "grab-com"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierRule {
    pub field: &'static str,
    pub expected: &'static str,
}

impl IdentifierRule {
    pub const fn new(field: &'static str, expected: &'static str) -> Self {
        Self { field, expected }
    }
}

/// What the enforcer did to a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Enforcement {
    Unchanged,
    /// The field was absent (`None`) or held another value.
    Corrected { found: Option<Value> },
}

/// Overwrite the identifier field with its expected value.
///
/// A mismatch is corrected and logged, never rejected.
pub fn enforce_identifier(doc: &mut RecoveredDocument, rule: &IdentifierRule) -> Enforcement {
    if doc.get(rule.field).and_then(Value::as_str) == Some(rule.expected) {
        return Enforcement::Unchanged;
    }

    let found = doc.insert(
        rule.field.to_string(),
        Value::String(rule.expected.to_string()),
    );

    warn!(
        field = rule.field,
        found = ?found,
        expected = rule.expected,
        "Extracted identifier does not match, correcting"
    );

    Enforcement::Corrected { found }
}
