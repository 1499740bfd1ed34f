use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use pricing_sheet::compute_document_total;
use pricing_sheet::compute_table_totals;
use pricing_sheet::parse_pricing_tables_with_validation;
use pricing_sheet::spreadsheet::criteria::Criteria;
use pricing_sheet::DescriptionOverrides;
use pricing_sheet::MemoryWorkbook;
use pricing_sheet::ParseOptions;
use pricing_sheet::PriceOverrides;
use pricing_sheet::PricingDocument;
use pricing_sheet::RenderedTableTotals;
use serde::Deserialize;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;

/// Exit status of a parse whose validation report failed.
const VALIDATION_FAILED: i32 = 2;

#[derive(Parser, Debug)]
#[command(about = "Parse pricing worksheets and recompute displayed totals")]
struct Args {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a JSON or CSV workbook and print the document with its validation report.
    Parse {
        /// Workbook: `.csv` (one sheet) or JSON `{"sheets":[{"name":..,"rows":[[..]]}]}`.
        file: PathBuf,

        /// Refuse fallbacks and withhold incomplete documents.
        #[arg(long)]
        strict: bool,

        /// Source workbook hash recorded in the report evidence.
        #[arg(long)]
        hash: Option<String>,

        /// Preferred sheet name pattern (repeatable, glob, case-insensitive).
        #[arg(long = "sheet", value_name = "PATTERN")]
        sheets: Vec<String>,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },

    /// Print rendered table totals and the document total of a parsed document.
    Totals {
        /// Document JSON as printed by `parse` (the `document` field) or stored.
        document: PathBuf,

        /// Overrides JSON: `{"prices":{"table:index":n},"descriptions":{"table:index":"s"}}`.
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OverridesFile {
    prices: PriceOverrides,
    descriptions: DescriptionOverrides,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TotalsReport {
    tables: Vec<RenderedTableTotals>,
    document_total: f64,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load_workbook(path: &Path) -> Result<MemoryWorkbook> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let file_name = path.display().to_string();
    let is_csv = path
        .extension()
        .map(|extension| extension.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    let workbook = if is_csv {
        let sheet_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Sheet1".to_owned());
        MemoryWorkbook::from_csv_reader(BufReader::new(file), &sheet_name)?
    } else {
        MemoryWorkbook::from_json_reader(BufReader::new(file), &file_name)?
    };
    Ok(workbook)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}

fn parse(file: &Path, strict: bool, hash: Option<String>, sheets: &[String], pretty: bool) -> Result<i32> {
    let workbook = load_workbook(file)?;
    let mut options = ParseOptions::default().strict(strict);
    if let Some(hash) = hash {
        options = options.source_workbook_hash(hash);
    }
    if !sheets.is_empty() {
        options = options.criteria(Criteria::from_patterns(sheets, false).context("Invalid --sheet pattern")?);
    }
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    let outcome = parse_pricing_tables_with_validation(&workbook, &file_name, &options);
    print_json(&outcome, pretty)?;
    Ok(if outcome.validation.is_pass() { 0 } else { VALIDATION_FAILED })
}

fn totals(document: &Path, overrides: Option<&Path>, pretty: bool) -> Result<i32> {
    let reader = BufReader::new(File::open(document).with_context(|| format!("Failed to open {}", document.display()))?);
    let document: PricingDocument =
        serde_json::from_reader(reader).with_context(|| format!("Invalid document {}", document.display()))?;
    let overrides = match overrides {
        Some(path) => {
            let reader = BufReader::new(File::open(path).with_context(|| format!("Failed to open {}", path.display()))?);
            serde_json::from_reader(reader).with_context(|| format!("Invalid overrides {}", path.display()))?
        }
        None => OverridesFile::default(),
    };
    let report = TotalsReport {
        tables: document
            .tables
            .iter()
            .map(|table| compute_table_totals(table, &overrides.prices, &overrides.descriptions))
            .collect(),
        document_total: compute_document_total(&document, &overrides.prices, &overrides.descriptions),
    };
    print_json(&report, pretty)?;
    Ok(0)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let status = match args.command {
        Command::Parse { file, strict, hash, sheets, pretty } => parse(&file, strict, hash, &sheets, pretty)?,
        Command::Totals { document, overrides, pretty } => totals(&document, overrides.as_deref(), pretty)?,
    };
    if status != 0 {
        std::process::exit(status);
    }
    Ok(())
}
