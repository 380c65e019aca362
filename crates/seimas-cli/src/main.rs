use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use seimas::output::{to_csv_string, to_json_string, to_text_string};
use seimas::types::Schema;
use seimas::{ExistingMembers, WebScraper};

#[derive(Parser)]
#[command(name = "seimas")]
#[command(
    about = "Prints the members table of a Wikipedia legislature page as CSV",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(
        long,
        default_value = seimas::PAGE_URL,
        help = "Wikipedia page with a members table after its 'Members' heading"
    )]
    url: String,

    #[arg(
        long,
        value_name = "CSV",
        default_value = seimas::EXISTING_MEMBERS_CSV,
        help = "Reference name,id CSV used to fill missing Wikidata ids, if it exists"
    )]
    existing: PathBuf,

    #[arg(long, help = "Skip the notes column and omit start_date and end_date")]
    without_tenure: bool,

    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value = "csv",
        help = "Output format"
    )]
    format: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
    Text,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let scraper = WebScraper::new().unwrap_or_else(|e| {
        log::error!("Error creating scraper: {}", e);
        process::exit(1);
    });

    let schema = if cli.without_tenure {
        Schema::Basic
    } else {
        Schema::Tenure
    };

    let mut members = scraper
        .fetch_members(&cli.url, schema)
        .await
        .unwrap_or_else(|e| {
            log::error!("Error fetching members: {}", e);
            process::exit(1);
        });

    if cli.existing.exists() {
        log::info!(
            "Reconciling missing ids against {}...",
            cli.existing.display()
        );
        let existing = ExistingMembers::from_path(&cli.existing).unwrap_or_else(|e| {
            log::error!("Error loading {}: {}", cli.existing.display(), e);
            process::exit(1);
        });
        let filled = existing.fill_missing_ids(&mut members);
        let missing = members.iter().filter(|m| m.id.is_none()).count();
        log::info!(
            "Filled {} ids from {} known names; {} members still without an id",
            filled,
            existing.len(),
            missing
        );
    } else {
        log::debug!(
            "No reference file at {}, skipping reconciliation",
            cli.existing.display()
        );
    }

    let rendered = match cli.format {
        OutputFormat::Csv => to_csv_string(&members),
        OutputFormat::Json => to_json_string(&members).map(|json| json + "\n"),
        OutputFormat::Text => to_text_string(&members),
    };

    match rendered {
        Ok(text) => print!("{}", text),
        Err(e) => {
            log::error!("Error writing output: {}", e);
            process::exit(1);
        }
    }
}
