// src/prompt.rs

use crate::error::ExtractError;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::error;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a financial data extraction expert.";
pub const DEFAULT_COMPANY_HINT: &str = "Not provided";

/// How a prompt file becomes a system/user prompt pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    /// Markdown with `## System` and `## Template` sections; the template
    /// carries `{company_hint}` and `{pdf_text}` placeholders.
    Sections,
    /// The whole file is appended after the company name and PDF text.
    Appended,
}

/// The two messages sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

/// Split markdown into `## heading` sections keyed by the lowercased heading.
/// Text before the first heading is dropped.
pub fn parse_prompt_sections(markdown: &str) -> HashMap<String, String> {
    let mut sections = HashMap::new();
    let mut current: Option<String> = None;
    let mut buffer: Vec<&str> = Vec::new();

    for line in markdown.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            if let Some(name) = current.take() {
                sections.insert(name, buffer.join("\n").trim().to_string());
            }
            current = Some(heading.trim().to_lowercase());
            buffer.clear();
        } else if current.is_some() {
            buffer.push(line);
        }
    }

    if let Some(name) = current {
        sections.insert(name, buffer.join("\n").trim().to_string());
    }

    sections
}

pub fn load_prompt_file(path: &Path) -> io::Result<String> {
    fs::read_to_string(path)
}

/// Load `path` and build the prompt pair for one extraction.
///
/// `label` names the extractor in the `PromptMissing` message.
pub fn render_prompt(
    path: &Path,
    style: PromptStyle,
    system_prompt: &str,
    label: &str,
    company_hint: &str,
    pdf_text: &str,
) -> Result<RenderedPrompt, ExtractError> {
    let content = match load_prompt_file(path) {
        Ok(c) => c,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to load prompt file");
            return Err(ExtractError::PromptMissing(label.to_string()));
        }
    };

    let hint = if company_hint.trim().is_empty() {
        DEFAULT_COMPANY_HINT
    } else {
        company_hint.trim()
    };

    match style {
        PromptStyle::Appended => {
            if content.trim().is_empty() {
                error!(path = %path.display(), "Prompt file is empty");
                return Err(ExtractError::PromptMissing(label.to_string()));
            }
            Ok(RenderedPrompt {
                system: system_prompt.to_string(),
                user: format!("Company: {hint}\n\nPDF Text:\n{pdf_text}\n\n{content}"),
            })
        }
        PromptStyle::Sections => {
            let sections = parse_prompt_sections(&content);
            let template = sections
                .get("template")
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    error!(path = %path.display(), "Prompt file is missing the 'template' section");
                    ExtractError::PromptMissing(label.to_string())
                })?;
            let system = sections
                .get("system")
                .filter(|s| !s.is_empty())
                .map(String::as_str)
                .unwrap_or(system_prompt);

            Ok(RenderedPrompt {
                system: system.to_string(),
                user: fill_template(template, hint, pdf_text),
            })
        }
    }
}

/// Substitute the two placeholders. The PDF text goes in last so braces in
/// it are never treated as placeholders.
fn fill_template(template: &str, company_hint: &str, pdf_text: &str) -> String {
    template
        .replace("{company_hint}", company_hint)
        .replace("{pdf_text}", pdf_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_PROMPT: &str = "# Private company prompt\n\nintro text\n\n## System\nYou extract two fiscal years.\n\n## Template\nCompany: {company_hint}\n\n{pdf_text}\n\nReturn JSON only.\n";

    fn write_prompt(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_parse_sections() {
        let sections = parse_prompt_sections(PRIVATE_PROMPT);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections["system"], "You extract two fiscal years.");
        assert!(sections["template"].starts_with("Company: {company_hint}"));
        assert!(sections["template"].ends_with("Return JSON only."));
    }

    #[test]
    fn test_sections_style_fills_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_prompt(&dir, "extract_data_prompt.md", PRIVATE_PROMPT);

        let rendered = render_prompt(
            &path,
            PromptStyle::Sections,
            DEFAULT_SYSTEM_PROMPT,
            "Private company",
            "",
            "Revenue {2023} 1,200",
        )
        .unwrap();

        assert_eq!(rendered.system, "You extract two fiscal years.");
        assert_eq!(
            rendered.user,
            "Company: Not provided\n\nRevenue {2023} 1,200\n\nReturn JSON only."
        );
    }

    #[test]
    fn test_sections_style_requires_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_prompt(&dir, "broken.md", "## System\nonly a system prompt\n");

        let err = render_prompt(&path, PromptStyle::Sections, DEFAULT_SYSTEM_PROMPT, "Private company", "", "")
            .unwrap_err();
        assert_eq!(err.to_string(), "Private company prompt template is missing.");
    }

    #[test]
    fn test_appended_style() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_prompt(&dir, "grab_com_extraction.md", "Return the Grab schema.");

        let rendered = render_prompt(
            &path,
            PromptStyle::Appended,
            "You extract Grab metrics.",
            "Grab",
            "Grab",
            "Q2 revenue 819",
        )
        .unwrap();

        assert_eq!(rendered.system, "You extract Grab metrics.");
        assert_eq!(
            rendered.user,
            "Company: Grab\n\nPDF Text:\nQ2 revenue 819\n\nReturn the Grab schema."
        );
    }

    #[test]
    fn test_missing_file_is_prompt_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_prompt(
            &dir.path().join("nope.md"),
            PromptStyle::Appended,
            DEFAULT_SYSTEM_PROMPT,
            "Sea Group",
            "",
            "",
        )
        .unwrap_err();
        assert!(matches!(err, ExtractError::PromptMissing(ref l) if l == "Sea Group"));
    }
}
