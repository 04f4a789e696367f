// src/response/normalize.rs

/// Leading phrases models put in front of the JSON despite instructions.
const BOILERPLATE_PREFIXES: &[&str] = &[
    "Here's the JSON:",
    "Here is the JSON:",
    "JSON:",
    "Output:",
    "Result:",
];

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Strip markdown fences and known preambles from a raw LLM reply.
///
/// Opening and closing fences are removed independently, so a reply that was
/// cut off before its closing fence still loses the opener. Never fails; the
/// worst case is the trimmed input.
pub fn normalize(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(rest) = text
        .strip_prefix(JSON_FENCE)
        .or_else(|| text.strip_prefix(FENCE))
    {
        text = rest.trim();
    }

    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest.trim();
    }

    for prefix in BOILERPLATE_PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.trim();
        }
    }

    text.to_string()
}
