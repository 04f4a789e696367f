// src/response/recover.rs

use super::RecoveredDocument;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

/// Uppercase `NULL` as a bare token. Also matches inside string values; that is
/// accepted.
static UPPERCASE_NULL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bNULL\b").expect("NULL pattern is valid"));

/// A value token followed by a newline and the next quoted key, with the comma
/// between them missing.
static MISSING_COMMA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(null|true|false|"[^"]*"|\d+\.?\d*)\s*\n\s*""#)
        .expect("missing-comma pattern is valid")
});

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("no JSON object found in response")]
    NoObject,

    #[error("JSON object starting at byte {start} is never closed")]
    Unterminated { start: usize },

    #[error("extracted JSON block is invalid: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Coerce normalized LLM text into a single JSON object.
///
/// Two layers only: a strict parse of the whole text, then a strict parse of
/// the first balanced `{ ... }` block. Both run after the `NULL` and
/// missing-comma substitutions. Text that is already a valid object is
/// accepted before any substitution touches it.
pub fn recover(text: &str) -> Result<RecoveredDocument, ParseError> {
    if let Ok(doc) = serde_json::from_str::<RecoveredDocument>(text) {
        return Ok(doc);
    }

    let patched = insert_missing_commas(&fix_uppercase_null(text));

    match serde_json::from_str::<RecoveredDocument>(&patched) {
        Ok(doc) => {
            debug!("Parsed LLM response after NULL/comma fixes");
            Ok(doc)
        }
        Err(e) => {
            debug!(error = %e, "Strict parse failed, falling back to brace matching");
            let block = first_balanced_object(&patched)?;
            Ok(serde_json::from_str::<RecoveredDocument>(block)?)
        }
    }
}

pub(crate) fn fix_uppercase_null(text: &str) -> String {
    UPPERCASE_NULL.replace_all(text, "null").into_owned()
}

pub(crate) fn insert_missing_commas(text: &str) -> String {
    MISSING_COMMA.replace_all(text, "${1},\n\"").into_owned()
}

/// The substring from the first `{` to its matching `}`, inclusive.
///
/// Braces inside quoted strings do not count towards the depth.
fn first_balanced_object(text: &str) -> Result<&str, ParseError> {
    let start = text.find('{').ok_or(ParseError::NoObject)?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    Err(ParseError::Unterminated { start })
}
