// src/companies.rs

use crate::extractor::ExtractorProfile;
use crate::prompt::{DEFAULT_SYSTEM_PROMPT, PromptStyle};
use crate::response::IdentifierRule;

pub const IDENTIFIER_FIELD: &str = "company_slug";
pub const DEFAULT_ACTION_LABEL: &str = "Extract Financial Data";
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Financial data extracted successfully.";

const PUBLIC_PROMPT_FILE: &str = "3statement_extraction_prompt.md";
const PUBLIC_SYSTEM_PROMPT: &str = "You are a financial data extraction expert specialized in \
     extracting comprehensive financial statements from earnings reports.";
const PRIVATE_PROMPT_FILE: &str = "extract_data_prompt.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyStatus {
    Implemented,
    ComingSoon,
    Planned,
    Unknown,
}

impl CompanyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyStatus::Implemented => "implemented",
            CompanyStatus::ComingSoon => "coming_soon",
            CompanyStatus::Planned => "planned",
            CompanyStatus::Unknown => "unknown",
        }
    }
}

/// A dedicated extraction workflow for one public company.
#[derive(Debug, Clone, Copy)]
pub struct DedicatedExtractor {
    pub prompt_file: &'static str,
    pub system_prompt: &'static str,
}

/// One public company the tool knows about.
#[derive(Debug, Clone, Copy)]
pub struct CompanyEntry {
    pub slug: &'static str,
    pub name: &'static str,
    pub action_label: &'static str,
    pub status: CompanyStatus,
    pub extractor: Option<DedicatedExtractor>,
    pub success_message: Option<&'static str>,
    pub has_database_push: bool,
}

pub static COMPANIES: &[CompanyEntry] = &[
    CompanyEntry {
        slug: "grab-com",
        name: "Grab",
        action_label: "Extract Grab's metrics",
        status: CompanyStatus::Implemented,
        extractor: Some(DedicatedExtractor {
            prompt_file: "grab_com_extraction.md",
            system_prompt: "You are a precise financial data extraction assistant specialized in \
                 extracting Grab Holdings Limited financial metrics from earnings reports.",
        }),
        success_message: Some(
            "Grab metrics extracted successfully. Review and push to database below.",
        ),
        has_database_push: true,
    },
    CompanyEntry {
        slug: "sea-group-garena",
        name: "Sea Group",
        action_label: "Extract Sea Group's metrics",
        status: CompanyStatus::Implemented,
        extractor: Some(DedicatedExtractor {
            prompt_file: "sea_group_extraction.md",
            system_prompt: "You are a precise financial data extraction assistant specialized in \
                 extracting Sea Group Limited financial metrics from earnings reports.",
        }),
        success_message: Some("Sea Group metrics extracted successfully."),
        has_database_push: true,
    },
    CompanyEntry {
        slug: "alibaba-group",
        name: "Alibaba Group",
        action_label: "Extract Alibaba's metrics",
        status: CompanyStatus::Implemented,
        extractor: Some(DedicatedExtractor {
            prompt_file: "alibaba_group_extraction.md",
            system_prompt: "You are a precise financial data extraction assistant specialized in \
                 extracting Alibaba Group Holding Limited financial metrics from earnings reports.",
        }),
        success_message: Some("Alibaba Group metrics extracted successfully."),
        has_database_push: true,
    },
    CompanyEntry {
        slug: "bukalapak",
        name: "Bukalapak",
        action_label: "Extract Bukalapak's metrics",
        status: CompanyStatus::ComingSoon,
        extractor: None,
        success_message: None,
        has_database_push: false,
    },
    CompanyEntry {
        slug: "vng-corp",
        name: "VNG (Vietnam)",
        action_label: "Extract VNG's metrics",
        status: CompanyStatus::ComingSoon,
        extractor: None,
        success_message: None,
        has_database_push: false,
    },
];

pub fn lookup(slug: &str) -> Option<&'static CompanyEntry> {
    COMPANIES.iter().find(|c| c.slug == slug)
}

pub fn status(slug: &str) -> CompanyStatus {
    lookup(slug).map_or(CompanyStatus::Unknown, |c| c.status)
}

pub fn is_implemented(slug: &str) -> bool {
    status(slug) == CompanyStatus::Implemented
}

pub fn action_label(slug: &str) -> &'static str {
    lookup(slug).map_or(DEFAULT_ACTION_LABEL, |c| c.action_label)
}

pub fn success_message(slug: &str) -> &'static str {
    lookup(slug)
        .and_then(|c| c.success_message)
        .unwrap_or(DEFAULT_SUCCESS_MESSAGE)
}

/// Extraction parameters for a registered public company.
///
/// Companies with a dedicated workflow use their own prompt; the rest fall back
/// to the generic three-statement prompt. Either way the slug is enforced.
/// `None` for slugs outside the registry.
pub fn profile_for(slug: &str) -> Option<ExtractorProfile> {
    let entry = lookup(slug)?;
    let identifier = Some(IdentifierRule::new(IDENTIFIER_FIELD, entry.slug));

    let profile = match (entry.status, entry.extractor) {
        (CompanyStatus::Implemented, Some(dedicated)) => ExtractorProfile {
            label: entry.name.to_string(),
            prompt_file: dedicated.prompt_file,
            style: PromptStyle::Appended,
            system_prompt: dedicated.system_prompt,
            identifier,
        },
        _ => ExtractorProfile {
            label: "Public company".to_string(),
            prompt_file: PUBLIC_PROMPT_FILE,
            style: PromptStyle::Appended,
            system_prompt: PUBLIC_SYSTEM_PROMPT,
            identifier,
        },
    };
    Some(profile)
}

/// Two-year extraction for private companies; no identifier to enforce.
pub fn private_profile() -> ExtractorProfile {
    ExtractorProfile {
        label: "Private company".to_string(),
        prompt_file: PRIVATE_PROMPT_FILE,
        style: PromptStyle::Sections,
        system_prompt: DEFAULT_SYSTEM_PROMPT,
        identifier: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugs_are_unique() {
        for (i, a) in COMPANIES.iter().enumerate() {
            for b in &COMPANIES[i + 1..] {
                assert_ne!(a.slug, b.slug);
            }
        }
    }

    #[test]
    fn test_status_lookups() {
        assert!(is_implemented("grab-com"));
        assert_eq!(status("bukalapak"), CompanyStatus::ComingSoon);
        assert_eq!(status("shopback"), CompanyStatus::Unknown);
        assert!(!is_implemented("shopback"));
    }

    #[test]
    fn test_action_label_fallback() {
        assert_eq!(action_label("grab-com"), "Extract Grab's metrics");
        assert_eq!(action_label("unknown-co"), DEFAULT_ACTION_LABEL);
        assert_eq!(success_message("vng-corp"), DEFAULT_SUCCESS_MESSAGE);
    }

    #[test]
    fn test_dedicated_profile() {
        let profile = profile_for("sea-group-garena").unwrap();
        assert_eq!(profile.prompt_file, "sea_group_extraction.md");
        assert_eq!(
            profile.identifier,
            Some(IdentifierRule::new("company_slug", "sea-group-garena"))
        );
    }

    #[test]
    fn test_coming_soon_uses_generic_prompt_with_slug() {
        let profile = profile_for("vng-corp").unwrap();
        assert_eq!(profile.prompt_file, PUBLIC_PROMPT_FILE);
        assert_eq!(profile.identifier.unwrap().expected, "vng-corp");
        assert!(profile_for("not-listed").is_none());
    }

    #[test]
    fn test_private_profile_has_no_identifier() {
        let profile = private_profile();
        assert_eq!(profile.style, PromptStyle::Sections);
        assert!(profile.identifier.is_none());
    }
}
