// src/cli.rs

use crate::config::DEFAULT_CONFIG_PATH;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "earnings_extract",
    version,
    about = "Extract structured financial metrics from earnings-report PDFs",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Companies,
    Info(InfoArgs),
    Extract(ExtractArgs),
    Convert(ConvertArgs),
    Push(PushArgs),
    Stats,
}

#[derive(Parser, Debug)]
#[command(about = "Show size, page count and a first-page preview of a PDF")]
pub struct InfoArgs {
    #[arg(long, value_name = "FILE")]
    pub pdf: PathBuf,
}

#[derive(Parser, Debug)]
#[command(about = "Run the LLM extraction on a report PDF")]
pub struct ExtractArgs {
    #[arg(long, value_name = "FILE")]
    pub pdf: PathBuf,

    /// Registered public company; omit for a private two-year report
    #[arg(long, value_name = "SLUG")]
    pub company: Option<String>,

    /// Company name passed to the prompt as a hint
    #[arg(long, value_name = "NAME")]
    pub hint: Option<String>,

    /// Convert SGD figures to USD after extraction
    #[arg(long)]
    pub convert_currency: bool,

    /// Store the result (requires --company)
    #[arg(long, requires = "company")]
    pub push: bool,

    /// Write the extracted JSON to this file
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Convert a saved extraction from SGD to USD")]
pub struct ConvertArgs {
    #[arg(long, value_name = "FILE")]
    pub json: PathBuf,

    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Store a reviewed extraction")]
pub struct PushArgs {
    #[arg(long, value_name = "FILE")]
    pub json: PathBuf,

    #[arg(long, value_name = "SLUG")]
    pub company: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_flags() {
        let args = RootArgs::try_parse_from([
            "earnings_extract",
            "extract",
            "--pdf",
            "q2.pdf",
            "--company",
            "grab-com",
            "--push",
        ])
        .unwrap();

        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        let Command::Extract(extract) = args.command else {
            panic!("expected extract command");
        };
        assert_eq!(extract.company.as_deref(), Some("grab-com"));
        assert!(extract.push);
        assert!(!extract.convert_currency);
    }

    #[test]
    fn test_push_requires_company() {
        assert!(
            RootArgs::try_parse_from(["earnings_extract", "extract", "--pdf", "a.pdf", "--push"])
                .is_err()
        );
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let args =
            RootArgs::try_parse_from(["earnings_extract", "stats", "--config", "alt.toml"]).unwrap();
        assert_eq!(args.config, PathBuf::from("alt.toml"));
        assert!(matches!(args.command, Command::Stats));
    }
}
