//! # Pricing Table Parser
//!
//! Turns one worksheet of a loosely structured pricing workbook into a
//! [`PricingDocument`]. The pipeline runs these stages in order, each a pure
//! function over the output of the previous one:
//!
//! 1. [`columns`]: find the header row and the label/cost/sell/margin columns
//! 2. [`classify`]: give every row below the header exactly one [`classify::RowKind`]
//! 3. [`boundary`]: group rows into sections, recovering orphaned summary data
//! 4. [`shift`]: re-align the column map when no section is found
//! 5. [`extract`]: build a pricing table per section
//! 6. [`rollup`]: find the document total and synthesize a roll-up table
//!
//! The fallback cascade (standard, column shift, single table) lives in
//! [`strategy`]. Every decision is recorded in the returned [`ValidationReport`].
use crate::document::DocumentMetadata;
use crate::document::ParseStrategy;
use crate::document::PricingDocument;
use crate::document::PricingTable;
use crate::document::TableKind;
use crate::parser::columns::locate_columns;
use crate::parser::columns::ColumnLocation;
use crate::parser::columns::ColumnMap;
use crate::parser::extract::extract_table;
use crate::parser::matrix::AlternateMatrixLocator;
use crate::parser::matrix::SheetNameMatrixLocator;
use crate::parser::rollup::find_global_total;
use crate::parser::rollup::synthesize_rollup;
use crate::parser::strategy::run_cascade;
use crate::parser::strategy::SheetContext;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::Grid;
use crate::spreadsheet::Workbook;
use crate::validation::inspect_table;
use crate::validation::AnomalyLimits;
use crate::validation::IssueCode;
use crate::validation::ReportBuilder;
use crate::validation::ValidationIssue;
use crate::validation::ValidationReport;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub mod boundary;
pub mod classify;
pub mod columns;
pub mod extract;
pub mod matrix;
pub mod rollup;
pub mod shift;
pub mod strategy;

/// Structural failures that leave no document to publish.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Workbook has no worksheets")]
    NoWorksheet,

    #[error("No worksheet matches the patterns {0}")]
    NoMatchingWorksheet(String),

    #[error("No cost and selling price column headers found in sheets {0}")]
    NoColumnHeaders(String),

    #[error("No header row found: candidate sheets {0} are blank")]
    NoHeaderRow(String),

    #[error("No viable pricing section found in sheet '{0}'")]
    NoBoundaries(String),

    #[error("No pricing data found in sheet '{0}'")]
    NoPricingData(String),
}

impl ParseError {
    pub fn code(&self) -> IssueCode {
        match self {
            Self::NoWorksheet => IssueCode::NoWorksheet,
            Self::NoMatchingWorksheet(_) => IssueCode::NoMatchingWorksheet,
            Self::NoColumnHeaders(_) => IssueCode::NoColumnHeaders,
            Self::NoHeaderRow(_) => IssueCode::NoHeaderRow,
            Self::NoBoundaries(_) => IssueCode::NoBoundaries,
            Self::NoPricingData(_) => IssueCode::NoPricingData,
        }
    }

    /// Converts the failure into a report issue.
    pub fn into_issue(self) -> ValidationIssue {
        ValidationIssue::new(self.code(), self.to_string())
    }
}

/// Options of one parse.
#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Refuse best-effort fallbacks and withhold incomplete documents
    pub strict: bool,
    /// Hash of the source workbook, copied into report evidence
    pub source_workbook_hash: Option<String>,
    /// Which worksheets to consider, and in which order
    pub criteria: Criteria,
    /// Rows scanned for the column header row
    pub header_scan_rows: usize,
    /// Rows looked ahead to confirm a section header
    pub viability_window: usize,
    /// Prices at or above this absolute value are flagged
    pub large_price_threshold: f64,
    /// Tax rates above this fraction are flagged
    pub max_tax_rate: f64,
    /// Finds the alternate responsibility matrix for report evidence
    pub matrix_locator: Arc<dyn AlternateMatrixLocator>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict: false,
            source_workbook_hash: None,
            criteria: Criteria::default(),
            header_scan_rows: 40,
            viability_window: 40,
            large_price_threshold: 10_000_000.0,
            max_tax_rate: 0.25,
            matrix_locator: Arc::new(SheetNameMatrixLocator::default()),
        }
    }
}

impl ParseOptions {
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn source_workbook_hash(mut self, hash: impl Into<String>) -> Self {
        self.source_workbook_hash = Some(hash.into());
        self
    }

    pub fn criteria(mut self, criteria: Criteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn matrix_locator(mut self, locator: Arc<dyn AlternateMatrixLocator>) -> Self {
        self.matrix_locator = locator;
        self
    }

    fn anomaly_limits(&self) -> AnomalyLimits {
        AnomalyLimits {
            large_price: self.large_price_threshold,
            max_tax_rate: self.max_tax_rate,
        }
    }
}

/// Document (withheld on failure) and the report explaining it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOutcome {
    pub document: Option<PricingDocument>,
    pub validation: ValidationReport,
}

/// Worksheet chosen for parsing.
struct SelectedSheet<'a> {
    name: String,
    grid: &'a Grid,
    location: ColumnLocation,
}

/// Parses the pricing worksheet of a workbook with default options.
///
/// Returns `None` when the workbook holds no recognizable pricing data.
pub fn parse_pricing_tables(workbook: &dyn Workbook, file_name: &str) -> Option<PricingDocument> {
    parse_pricing_tables_with_validation(workbook, file_name, &ParseOptions::default()).document
}

/// Parses the pricing worksheet of a workbook and reports on the result.
///
/// The document is withheld whenever the report holds an error. In strict
/// mode that includes every condition lenient mode only warns about.
pub fn parse_pricing_tables_with_validation(
    workbook: &dyn Workbook,
    file_name: &str,
    options: &ParseOptions,
) -> ParseOutcome {
    let mut report = ReportBuilder::new(options.strict, file_name, options.source_workbook_hash.clone());
    let document = match build_document(workbook, file_name, options, &mut report) {
        Ok(document) => Some(document),
        Err(error) => {
            report.error(error.into_issue());
            None
        }
    };
    let warnings = report.warning_messages();
    let validation = report.finish();
    let document = document.filter(|_| validation.is_pass()).map(|mut document| {
        document.metadata.warnings = warnings;
        document.metadata.validation = Some(validation.clone());
        document
    });
    ParseOutcome { document, validation }
}

/// Chooses the worksheet to parse: pattern matches first, then the rest
/// unless a match is required. The first sheet with a column header row wins.
fn select_worksheet<'a>(
    workbook: &'a dyn Workbook,
    options: &ParseOptions,
    report: &mut ReportBuilder,
) -> Result<SelectedSheet<'a>, ParseError> {
    let names = workbook.sheet_names();
    if names.is_empty() {
        return Err(ParseError::NoWorksheet);
    }
    let criteria = options
        .criteria
        .clone()
        .require_match(options.strict || options.criteria.require_match);
    let candidates = criteria.order(&names);
    if candidates.is_empty() {
        return Err(ParseError::NoMatchingWorksheet(options.criteria.describe()));
    }

    let mut all_blank = true;
    for name in &candidates {
        let Some(grid) = workbook.worksheet(name) else {
            continue;
        };
        if grid.is_blank() {
            continue;
        }
        all_blank = false;
        if let Some(location) = locate_columns(grid, options.header_scan_rows) {
            if !options.criteria.accept(name) {
                report.warning(ValidationIssue::new(
                    IssueCode::NoMatchingWorksheet,
                    format!(
                        "Sheet '{}' matches none of {}; used as the first sheet with pricing columns",
                        name,
                        options.criteria.describe()
                    ),
                ));
            }
            return Ok(SelectedSheet { name: name.to_owned(), grid, location });
        }
    }
    let sheets = candidates.join(", ");
    if all_blank {
        Err(ParseError::NoHeaderRow(sheets))
    } else {
        Err(ParseError::NoColumnHeaders(sheets))
    }
}

/// Infers the currency from symbols in the cost and selling-price columns.
pub fn detect_currency(grid: &Grid, map: &ColumnMap, header_row: usize) -> &'static str {
    (header_row + 1..grid.height())
        .flat_map(|row| [grid.cell(row, map.cost), grid.cell(row, map.sell)])
        .filter_map(|cell| cell.as_text())
        .find_map(|text| {
            text.chars().find_map(|character| match character {
                '$' => Some("USD"),
                '€' => Some("EUR"),
                '£' => Some("GBP"),
                _ => None,
            })
        })
        .unwrap_or("USD")
}

/// Records what the alternate matrix locator found. Never fails the parse
/// outright: an unreadable matrix is a warning.
fn probe_alternate_matrix(workbook: &dyn Workbook, sheet_name: &str, options: &ParseOptions, report: &mut ReportBuilder) {
    match options.matrix_locator.probe(workbook, sheet_name) {
        Ok(probe) => {
            if !probe.candidates.is_empty() && probe.categories == 0 {
                report.degradable(ValidationIssue::new(
                    IssueCode::AlternateMatrixEmpty,
                    format!("Alternate matrix candidates {} yielded no categories", probe.candidates.join(", ")),
                ));
            }
            let evidence = report.evidence_mut();
            evidence.alternate_matrix_candidates = probe.candidates;
            evidence.alternate_matrix_sheet = probe.sheet;
            evidence.alternate_matrix_categories = probe.categories;
        }
        Err(error) => report.warning(ValidationIssue::new(IssueCode::AlternateMatrixUnavailable, error.to_string())),
    }
}

fn build_document(
    workbook: &dyn Workbook,
    file_name: &str,
    options: &ParseOptions,
    report: &mut ReportBuilder,
) -> Result<PricingDocument, ParseError> {
    let sheet = select_worksheet(workbook, options, report)?;
    log::debug!(
        "{}: parsing sheet '{}' with column headers at row {}",
        file_name,
        sheet.name,
        sheet.location.header_row + 1
    );
    {
        let evidence = report.evidence_mut();
        evidence.sheet_name = Some(sheet.name.to_owned());
        evidence.header_row = Some(sheet.location.header_row);
        evidence.column_map = Some(sheet.location.map);
    }
    probe_alternate_matrix(workbook, &sheet.name, options, report);

    let context = SheetContext {
        grid: sheet.grid,
        sheet_name: &sheet.name,
        location: sheet.location,
        viability_window: options.viability_window,
    };
    let Some(outcome) = run_cascade(&context, options.strict) else {
        return Err(if options.strict {
            ParseError::NoBoundaries(sheet.name)
        } else {
            ParseError::NoPricingData(sheet.name)
        });
    };
    if outcome.strategy != ParseStrategy::Standard {
        log::warn!("{}: no viable section in '{}', fell back to {}", file_name, sheet.name, outcome.strategy.as_str());
        report.warning(ValidationIssue::new(
            IssueCode::NoBoundaries,
            format!("No viable section header found in sheet '{}'", sheet.name),
        ));
        let (code, message) = match outcome.shift {
            Some(shift) if outcome.strategy == ParseStrategy::ColumnShift => (
                IssueCode::ColumnShiftApplied,
                format!("Column map shifted by {} to align labels and prices", shift.offset),
            ),
            _ => (IssueCode::SingleTableFallback, "Whole sheet parsed as a single table".to_owned()),
        };
        report.warning(ValidationIssue::new(code, message));
    }
    {
        let evidence = report.evidence_mut();
        evidence.column_map = Some(outcome.map);
        evidence.strategy = Some(outcome.strategy);
        evidence.column_shift = outcome.shift;
        evidence.section_count = outcome.boundaries.len();
    }
    log::debug!("{}: {} sections via {}", file_name, outcome.boundaries.len(), outcome.strategy.as_str());

    let limits = options.anomaly_limits();
    let mut tables: Vec<PricingTable> = Vec::with_capacity(outcome.boundaries.len() + 1);
    for (position, boundary) in outcome.boundaries.iter().enumerate() {
        let leading = outcome
            .section_start
            .map_or(false, |start| position == 0 || boundary.start_row < start);
        let extraction = extract_table(boundary, &outcome.rows, position, sheet.grid, &outcome.map, leading);
        let table = extraction.table;
        extraction.issues.into_iter().for_each(|issue| report.warning(issue));
        inspect_table(&table, &limits).into_iter().for_each(|issue| report.warning(issue));
        if table.items.is_empty() && table.alternates.is_empty() {
            report.degradable(
                ValidationIssue::new(IssueCode::EmptyTable, format!("Table '{}' has no items or alternates", table.name))
                    .at_row(table.start_row)
                    .in_table(&table.id),
            );
        }
        if !table.grand_total.is_finite() {
            report.degradable(
                ValidationIssue::new(IssueCode::NonFiniteTotal, format!("Table '{}' total is not finite", table.name))
                    .in_table(&table.id),
            );
        }
        tables.push(table);
    }

    let global = find_global_total(&tables, outcome.section_start, &outcome.rows);
    let document_total = match global {
        Some(global) => global.amount,
        None => tables
            .iter()
            .filter(|table| table.kind == TableKind::Section)
            .map(|table| table.grand_total)
            .sum(),
    };
    if !document_total.is_finite() {
        report.degradable(ValidationIssue::new(IssueCode::NonFiniteTotal, "Document total is not finite"));
    }
    if let Some(rollup) = global.as_ref().and_then(|global| synthesize_rollup(&tables, global)) {
        tables.insert(0, rollup);
    }

    let currency = detect_currency(sheet.grid, &outcome.map, sheet.location.header_row);
    Ok(PricingDocument {
        file_name: file_name.to_owned(),
        sheet_name: sheet.name,
        currency: currency.to_owned(),
        metadata: DocumentMetadata {
            table_count: tables.len(),
            item_count: tables
                .iter()
                .filter(|table| table.kind != TableKind::Rollup)
                .map(|table| table.items.len())
                .sum(),
            alternate_count: tables.iter().map(|table| table.alternates.len()).sum(),
            has_explicit_total: global.is_some(),
            strategy: outcome.strategy,
            warnings: Vec::new(),
            validation: None,
        },
        tables,
        document_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::matrix::MatrixError;
    use crate::parser::matrix::MatrixProbe;
    use crate::spreadsheet::CellValue;
    use crate::spreadsheet::MemoryWorkbook;

    fn pricing_grid() -> Grid {
        Grid::new(vec![
            vec![CellValue::Empty, "Cost".into(), "Selling Price".into()],
            vec!["Video".into()],
            vec!["Display".into(), 100.into(), "$150".into()],
            vec!["Grand Total".into(), 100.into(), 150.into()],
        ])
    }

    #[derive(Debug)]
    struct BrokenLocator;

    impl AlternateMatrixLocator for BrokenLocator {
        fn probe(&self, _workbook: &dyn Workbook, _pricing_sheet: &str) -> Result<MatrixProbe, MatrixError> {
            Err(MatrixError::SheetUnreadable("Matrix".to_owned()))
        }
    }

    #[test]
    fn pattern_sheets_are_preferred() {
        let workbook = MemoryWorkbook::single("Notes", pricing_grid())
            .with_sheet("Budget", pricing_grid())
            .unwrap();
        let document = parse_pricing_tables(&workbook, "bid.xlsx").unwrap();
        assert_eq!(document.sheet_name, "Budget");
        assert_eq!(document.currency, "USD");
        assert_eq!(document.metadata.strategy, ParseStrategy::Standard);
    }

    #[test]
    fn unmatched_sheet_warns_in_lenient_mode_and_fails_strict() {
        let workbook = MemoryWorkbook::single("Sheet1", pricing_grid());
        let outcome = parse_pricing_tables_with_validation(&workbook, "bid.xlsx", &ParseOptions::default());
        assert!(outcome.validation.has_warning(IssueCode::NoMatchingWorksheet));
        assert!(outcome.document.is_some());

        let strict = ParseOptions::default().strict(true);
        let outcome = parse_pricing_tables_with_validation(&workbook, "bid.xlsx", &strict);
        assert!(outcome.validation.has_error(IssueCode::NoMatchingWorksheet));
        assert!(outcome.document.is_none());
    }

    #[test]
    fn structural_failures() {
        let outcome = parse_pricing_tables_with_validation(&MemoryWorkbook::new(), "x.xlsx", &ParseOptions::default());
        assert!(outcome.validation.has_error(IssueCode::NoWorksheet));

        let blank = MemoryWorkbook::single("Pricing", Grid::default());
        let outcome = parse_pricing_tables_with_validation(&blank, "x.xlsx", &ParseOptions::default());
        assert!(outcome.validation.has_error(IssueCode::NoHeaderRow));

        let headerless = MemoryWorkbook::single("Pricing", Grid::new(vec![vec!["Display".into(), 10.into()]]));
        let outcome = parse_pricing_tables_with_validation(&headerless, "x.xlsx", &ParseOptions::default());
        assert!(outcome.validation.has_error(IssueCode::NoColumnHeaders));
        assert!(outcome.document.is_none());
    }

    #[test]
    fn locator_failures_only_warn() {
        let workbook = MemoryWorkbook::single("Pricing", pricing_grid());
        let options = ParseOptions::default().strict(true).matrix_locator(Arc::new(BrokenLocator));
        let outcome = parse_pricing_tables_with_validation(&workbook, "bid.xlsx", &options);
        assert!(outcome.validation.is_pass());
        assert!(outcome.validation.has_warning(IssueCode::AlternateMatrixUnavailable));
    }

    #[test]
    fn empty_matrix_fails_strict_parses() {
        let workbook = MemoryWorkbook::single("Pricing", pricing_grid())
            .with_sheet("Alternates", Grid::new(vec![vec!["Scope".into()]]))
            .unwrap();
        let strict = ParseOptions::default().strict(true).source_workbook_hash("feed");
        let outcome = parse_pricing_tables_with_validation(&workbook, "bid.xlsx", &strict);
        assert!(outcome.validation.has_error(IssueCode::AlternateMatrixEmpty));
        assert_eq!(outcome.validation.evidence.alternate_matrix_sheet.as_deref(), Some("Alternates"));
        assert_eq!(outcome.validation.evidence.source_workbook_hash.as_deref(), Some("feed"));
        assert!(outcome.document.is_none());
    }

    #[test]
    fn currency_symbols() {
        let map = ColumnMap { label: 0, cost: 1, sell: 2, margin: 3, margin_pct: 4 };
        let grid = Grid::new(vec![
            vec![CellValue::Empty, "Cost".into(), "Selling Price".into()],
            vec!["Display".into(), 100.into(), "€150".into()],
        ]);
        assert_eq!(detect_currency(&grid, &map, 0), "EUR");
        assert_eq!(detect_currency(&pricing_grid(), &map, 0), "USD");
    }

    #[test]
    fn metadata_carries_report() {
        let workbook = MemoryWorkbook::single("Pricing", pricing_grid());
        let document = parse_pricing_tables(&workbook, "bid.xlsx").unwrap();
        assert_eq!(document.metadata.table_count, 1);
        assert_eq!(document.metadata.item_count, 1);
        assert!(!document.metadata.has_explicit_total);
        assert_eq!(document.document_total, 150.0);
        let validation = document.metadata.validation.unwrap();
        assert_eq!(validation.evidence.header_row, Some(0));
        assert_eq!(validation.evidence.section_count, 1);
    }
}
