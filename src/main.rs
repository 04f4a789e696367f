mod cli;
mod companies;
mod config;
mod currency;
mod error;
mod extractor;
mod llm_client;
mod pdf_extract;
mod prompt;
mod report_db;
mod response;
mod tables;

use clap::Parser;
use cli::{Command, ConvertArgs, ExtractArgs, InfoArgs, PushArgs, RootArgs};
use config::Config;
use currency::RateTable;
use error::{error_document, error_message};
use extractor::Extractor;
use llm_client::ChatCompletionsClient;
use pdf_extract::PdfContent;
use report_db::ReportStore;
use response::RecoveredDocument;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const PREVIEW_CHARS: usize = 300;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = RootArgs::parse();
    let cfg = Config::load_or_default(&args.config)?;

    match args.command {
        Command::Companies => list_companies(),
        Command::Info(info_args) => show_info(&cfg, &info_args)?,
        Command::Extract(extract_args) => run_extract(&cfg, &extract_args).await?,
        Command::Convert(convert_args) => run_convert(&cfg, &convert_args)?,
        Command::Push(push_args) => run_push(&cfg, &push_args)?,
        Command::Stats => {
            let db = ReportStore::new(&cfg.db_path)?;
            let (reports, companies) = db.count_reports()?;
            info!(reports, companies, "Database statistics");
            println!("{reports} stored reports across {companies} companies");
            for entry in companies::COMPANIES.iter().filter(|c| c.has_database_push) {
                let stored = db.reports_for_company(entry.slug)?;
                if let Some(latest) = stored.first() {
                    println!(
                        "  {:<18} {:>3}  latest {} (updated {})",
                        entry.slug,
                        stored.len(),
                        latest.report_date,
                        latest.updated_at
                    );
                }
            }
        }
    }

    Ok(())
}

fn list_companies() {
    for entry in companies::COMPANIES {
        println!(
            "{:<18} {:<16} {:<12} {}",
            entry.slug,
            entry.name,
            entry.status.as_str(),
            entry.action_label
        );
    }
}

fn read_upload(cfg: &Config, path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let bytes = fs::read(path)?;
    pdf_extract::validate_upload(path, &bytes, cfg.max_file_size_bytes())?;
    Ok(bytes)
}

fn show_info(cfg: &Config, args: &InfoArgs) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = read_upload(cfg, &args.pdf)?;
    let pdf = pdf_extract::pdf_info(&bytes)?;

    println!("File: {}", args.pdf.display());
    println!("Size: {}", pdf_extract::format_file_size(bytes.len() as u64));
    println!("Pages: {}", pdf.page_count);
    println!("Text layer: {}", if pdf.has_text { "yes" } else { "no" });
    println!();
    println!("{}", pdf_extract::page_preview(&bytes, 0, PREVIEW_CHARS));
    Ok(())
}

async fn run_extract(cfg: &Config, args: &ExtractArgs) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = read_upload(cfg, &args.pdf)?;
    let file_name = args
        .pdf
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("report.pdf");
    pdf_extract::save_temp_copy(&cfg.tmp_dir, file_name, &bytes)?;

    let pdf_text = match pdf_extract::extract_text_from_pdf(&bytes) {
        PdfContent::Text(text) => text,
        PdfContent::ScannedImage => {
            return Err("PDF appears to be scanned; no extractable text layer".into());
        }
        PdfContent::Error(e) => return Err(e.into()),
    };

    let (profile, default_hint) = match args.company.as_deref() {
        Some(slug) => {
            let profile =
                companies::profile_for(slug).ok_or_else(|| format!("Unknown company: {slug}"))?;
            if !companies::is_implemented(slug) {
                warn!(company = slug, "No dedicated extractor yet, using the generic prompt");
            }
            info!(company = slug, action = companies::action_label(slug), "Starting extraction");
            (profile, companies::lookup(slug).map(|c| c.name))
        }
        None => (companies::private_profile(), None),
    };
    let hint = args
        .hint
        .as_deref()
        .or(default_hint)
        .unwrap_or(prompt::DEFAULT_COMPANY_HINT);

    let client = ChatCompletionsClient::connect(&cfg.llm).await?;
    info!(model = client.model(), "LLM client ready");

    let extractor = Extractor::new(profile, &cfg.prompt_dir);
    info!(
        extractor = %extractor.profile().label,
        prompt = extractor.profile().prompt_file,
        hint,
        "Extractor selected"
    );
    let mut doc = extractor.extract(&client, &pdf_text, hint).await;

    if let Some(message) = error_message(&doc) {
        return Err(message.to_string().into());
    }

    match args.company.as_deref() {
        Some(slug) => println!("{}", companies::success_message(slug)),
        None => println!("{}", companies::DEFAULT_SUCCESS_MESSAGE),
    }

    if args.convert_currency {
        let converted = convert_if_sgd(cfg, &doc);
        match error_message(&converted) {
            Some(message) => {
                warn!(error = message, "Keeping figures in the reported currency");
                println!("{}", serde_json::to_string(&converted)?);
            }
            None => doc = converted,
        }
    }

    println!("{}", serde_json::to_string_pretty(&doc)?);

    if args.company.is_none() {
        for table in [tables::revenue_profit_table(&doc), tables::cash_flow_table(&doc)] {
            if !table.is_empty() {
                println!();
                println!("{}", table.render());
            }
        }
    }

    if let Some(out) = &args.out {
        write_document(out, &doc)?;
    }

    if args.push {
        if let Some(slug) = args.company.as_deref() {
            push_document(cfg, slug, &doc)?;
        }
    }

    Ok(())
}

/// The converted document, the input unchanged when it is not in SGD, or an
/// error document when conversion fails.
fn convert_if_sgd(cfg: &Config, doc: &RecoveredDocument) -> RecoveredDocument {
    if !currency::detect_sgd_currency(doc) {
        info!("No SGD figures detected, skipping conversion");
        return doc.clone();
    }

    let converted = RateTable::load(&cfg.rates_path)
        .and_then(|rates| currency::convert_sgd_to_usd(doc, &rates));
    match converted {
        Ok(converted) => {
            if let Some(note) = currency::conversion_note(&converted) {
                println!("{note}");
            }
            converted
        }
        Err(e) => {
            error!(error = %e, "Currency conversion failed");
            error_document(e.to_string())
        }
    }
}

fn read_document(path: &Path) -> Result<RecoveredDocument, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let doc: RecoveredDocument = serde_json::from_str(&content)?;
    Ok(doc)
}

fn write_document(path: &Path, doc: &RecoveredDocument) -> Result<(), Box<dyn std::error::Error>> {
    fs::write(path, serde_json::to_string_pretty(doc)?)?;
    info!(path = %path.display(), "Wrote extraction");
    Ok(())
}

fn run_convert(cfg: &Config, args: &ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let doc = convert_if_sgd(cfg, &read_document(&args.json)?);
    match &args.out {
        Some(out) => write_document(out, &doc)?,
        None => println!("{}", serde_json::to_string_pretty(&doc)?),
    }
    Ok(())
}

fn run_push(cfg: &Config, args: &PushArgs) -> Result<(), Box<dyn std::error::Error>> {
    let doc = read_document(&args.json)?;
    push_document(cfg, &args.company, &doc)
}

fn push_document(
    cfg: &Config,
    slug: &str,
    doc: &RecoveredDocument,
) -> Result<(), Box<dyn std::error::Error>> {
    match companies::lookup(slug) {
        None => return Err(format!("Unknown company: {slug}").into()),
        Some(entry) if !entry.has_database_push => {
            return Err(format!("Database push is not enabled for {}", entry.name).into());
        }
        Some(_) => {}
    }

    let db = ReportStore::new(&cfg.db_path)?;
    let outcome = db.push_report(slug, doc)?;
    if outcome.updated {
        warn!(record = %outcome.record_id, "Overwrote an existing report for the same date");
    }
    println!("{} (record {})", outcome.message, outcome.record_id);
    Ok(())
}
