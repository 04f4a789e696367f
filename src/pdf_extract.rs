// src/pdf_extract.rs

use lopdf::Document;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

/// Text layer of an uploaded earnings report.
#[derive(Debug)]
pub enum PdfContent {
    Text(String),
    /// Pages are images only; there is nothing to send to the model.
    ScannedImage,
    /// lopdf could not parse the file.
    Error(String),
}

/// Basic facts about an uploaded report, shown before extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInfo {
    pub page_count: usize,
    /// Whether the first page yields any text.
    pub has_text: bool,
}

/// Reports yielding fewer non-whitespace characters than this are
/// treated as scanned.
const MIN_TEXT_CHARS: usize = 30;

/// Share of image-only pages at which the whole report counts as scanned.
const SCANNED_PAGE_RATIO: f64 = 0.8;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Full text of a report, or why there is none.
pub fn extract_text_from_pdf(pdf_bytes: &[u8]) -> PdfContent {
    let doc = match Document::load_mem(pdf_bytes) {
        Ok(d) => d,
        Err(e) => return PdfContent::Error(format!("Failed to parse PDF: {e}")),
    };

    if image_only_ratio(&doc) >= SCANNED_PAGE_RATIO {
        info!("Report pages are image-only, skipping text extraction");
        return PdfContent::ScannedImage;
    }

    let text = match ::pdf_extract::extract_text_from_mem(pdf_bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Text extraction failed, treating report as scanned");
            return PdfContent::ScannedImage;
        }
    };

    let meaningful = text.chars().filter(|c| !c.is_whitespace()).count();
    if meaningful < MIN_TEXT_CHARS {
        info!(chars = meaningful, "Report text layer is nearly empty");
        return PdfContent::ScannedImage;
    }

    info!(chars = meaningful, "Report text extracted");
    PdfContent::Text(text.trim().to_string())
}

/// Page count and first-page text presence.
pub fn pdf_info(pdf_bytes: &[u8]) -> Result<PdfInfo, String> {
    let doc = Document::load_mem(pdf_bytes).map_err(|e| format!("{e}"))?;
    let pages = doc.get_pages();

    let has_text = match pages.keys().next() {
        Some(&first) => doc
            .extract_text(&[first])
            .is_ok_and(|text| !text.trim().is_empty()),
        None => false,
    };

    Ok(PdfInfo {
        page_count: pages.len(),
        has_text,
    })
}

/// Whitespace-collapsed text of one page, cut to `max_chars`.
pub fn page_preview(pdf_bytes: &[u8], page_idx: usize, max_chars: usize) -> String {
    let doc = match Document::load_mem(pdf_bytes) {
        Ok(d) => d,
        Err(e) => return format!("Error reading page preview: {e}"),
    };

    let pages = doc.get_pages();
    let Some(&page_num) = pages.keys().nth(page_idx) else {
        return "Page index out of range.".to_string();
    };

    let text = doc.extract_text(&[page_num]).unwrap_or_default();
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return format!("No extractable text on page {}.", page_idx + 1);
    }

    truncate_preview(&cleaned, max_chars)
}

fn truncate_preview(cleaned: &str, max_chars: usize) -> String {
    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let head: String = cleaned.chars().take(max_chars).collect();
        format!("{head}...")
    }
}

/// Reject files that are too large or not PDFs.
pub fn validate_upload(path: &Path, pdf_bytes: &[u8], max_bytes: u64) -> Result<(), String> {
    let size = pdf_bytes.len() as u64;
    if size > max_bytes {
        return Err(format!(
            "File too large: {}. Maximum allowed size is {}.",
            format_file_size(size),
            format_file_size(max_bytes)
        ));
    }

    let has_pdf_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    if !has_pdf_extension || !pdf_bytes.starts_with(PDF_MAGIC) {
        return Err(format!(
            "Invalid file type: {}. Please upload a PDF file.",
            path.display()
        ));
    }

    Ok(())
}

/// Keep a timestamped copy of the report under `tmp_dir`.
pub fn save_temp_copy(tmp_dir: &Path, file_name: &str, pdf_bytes: &[u8]) -> std::io::Result<PathBuf> {
    fs::create_dir_all(tmp_dir)?;

    let now = OffsetDateTime::now_utc();
    let stamp = format!(
        "{:04}{:02}{:02}_{:02}{:02}{:02}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    );

    let path = tmp_dir.join(format!("{stamp}_{file_name}"));
    fs::write(&path, pdf_bytes)?;
    info!(path = %path.display(), bytes = pdf_bytes.len(), "Saved temporary copy");
    Ok(path)
}

pub fn format_file_size(size_bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if size_bytes < KB {
        format!("{size_bytes} B")
    } else if size_bytes < MB {
        format!("{:.1} KB", size_bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", size_bytes as f64 / MB as f64)
    }
}

/// Fraction of pages whose resources hold XObjects but no fonts.
/// An empty page tree gives 0.0 so text extraction still runs.
fn image_only_ratio(doc: &Document) -> f64 {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return 0.0;
    }

    let image_only = pages
        .values()
        .filter(|id| {
            let Ok(page) = doc.get_object(**id).and_then(|o| o.as_dict()) else {
                return false;
            };
            let resources = page
                .get(b"Resources")
                .ok()
                .and_then(|r| doc.dereference(r).ok())
                .and_then(|(_, resolved)| resolved.as_dict().ok());

            let has_entries = |key: &[u8]| {
                resources
                    .and_then(|res| res.get(key).ok())
                    .and_then(|x| doc.dereference(x).ok())
                    .and_then(|(_, resolved)| resolved.as_dict().ok())
                    .is_some_and(|d| !d.is_empty())
            };

            has_entries(b"XObject".as_slice()) && !has_entries(b"Font".as_slice())
        })
        .count();

    let ratio = image_only as f64 / pages.len() as f64;
    debug!(pages = pages.len(), image_only, ratio = format!("{ratio:.2}"), "Scanned-page check");
    ratio
}
