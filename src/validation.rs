//! # Validation Report
//!
//! Structured pass/fail report compiled alongside every parse. Each decision the
//! parser takes that a reviewer might dispute (chosen sheet, header row, fallback
//! strategy, suspicious rows) is recorded here as an issue or as evidence, so
//! callers and tests can inspect it without scraping logs.
use crate::document::PricingTable;
use crate::document::ParseStrategy;
use crate::parser::columns::ColumnMap;
use crate::parser::shift::ColumnShift;
use crate::spreadsheet::cell::cell_reference;
use serde::Deserialize;
use serde::Serialize;

/// Overall verdict of a parse.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Pass,
    Fail,
}

/// Machine-readable classification of a report issue.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    // Structural failures
    NoWorksheet,
    NoMatchingWorksheet,
    NoColumnHeaders,
    NoHeaderRow,
    NoBoundaries,
    NoPricingData,

    // Table-level conditions
    EmptyTable,
    NonFiniteTotal,
    AlternateMatrixEmpty,
    AlternateMatrixUnavailable,

    // Row-level anomalies and fallbacks
    NegativePrice,
    LargePrice,
    IncludedWithPrice,
    TaxRateOutOfRange,
    MislabeledGrandTotal,
    ItemAfterGrandTotal,
    ColumnShiftApplied,
    SingleTableFallback,
}

impl IssueCode {
    /// Returns the code as serialized in reports.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoWorksheet => "no_worksheet",
            Self::NoMatchingWorksheet => "no_matching_worksheet",
            Self::NoColumnHeaders => "no_column_headers",
            Self::NoHeaderRow => "no_header_row",
            Self::NoBoundaries => "no_boundaries",
            Self::NoPricingData => "no_pricing_data",
            Self::EmptyTable => "empty_table",
            Self::NonFiniteTotal => "non_finite_total",
            Self::AlternateMatrixEmpty => "alternate_matrix_empty",
            Self::AlternateMatrixUnavailable => "alternate_matrix_unavailable",
            Self::NegativePrice => "negative_price",
            Self::LargePrice => "large_price",
            Self::IncludedWithPrice => "included_with_price",
            Self::TaxRateOutOfRange => "tax_rate_out_of_range",
            Self::MislabeledGrandTotal => "mislabeled_grand_total",
            Self::ItemAfterGrandTotal => "item_after_grand_total",
            Self::ColumnShiftApplied => "column_shift_applied",
            Self::SingleTableFallback => "single_table_fallback",
        }
    }
}

/// One error or warning of a report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub message: String,
    /// 0-based worksheet row the issue refers to
    pub row: Option<usize>,
    /// Identifier of the table the issue refers to
    pub table: Option<String>,
}

impl ValidationIssue {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            row: None,
            table: None,
        }
    }

    /// Attaches a worksheet row.
    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    /// Attaches a table identifier.
    pub fn in_table(mut self, table_id: &str) -> Self {
        self.table = Some(table_id.to_owned());
        self
    }

    /// Renders the issue as a one-line warning string.
    pub fn describe(&self) -> String {
        match (self.row, &self.table) {
            (Some(row), Some(table)) => format!("[{}] {} ({} row {})", self.code.as_str(), self.message, table, row + 1),
            (Some(row), None) => format!("[{}] {} (row {})", self.code.as_str(), self.message, row + 1),
            (None, Some(table)) => format!("[{}] {} ({})", self.code.as_str(), self.message, table),
            (None, None) => format!("[{}] {}", self.code.as_str(), self.message),
        }
    }
}

/// What the parser used, for auditing a disputed extraction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub file_name: String,
    pub sheet_name: Option<String>,
    /// 0-based row holding the column titles
    pub header_row: Option<usize>,
    pub column_map: Option<ColumnMap>,
    pub section_count: usize,
    pub strategy: Option<ParseStrategy>,
    pub column_shift: Option<ColumnShift>,
    /// Alternate responsibility matrix sheet that was read
    pub alternate_matrix_sheet: Option<String>,
    /// Sheets that looked like an alternate responsibility matrix
    pub alternate_matrix_candidates: Vec<String>,
    /// Categories parsed from the matrix sheet
    pub alternate_matrix_categories: usize,
    pub source_workbook_hash: Option<String>,
}

/// Pass/fail report with evidence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub status: ValidationStatus,
    pub strict: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub evidence: Evidence,
}

impl ValidationReport {
    pub fn is_pass(&self) -> bool {
        self.status == ValidationStatus::Pass
    }

    pub fn has_error(&self, code: IssueCode) -> bool {
        self.errors.iter().any(|issue| issue.code == code)
    }

    pub fn has_warning(&self, code: IssueCode) -> bool {
        self.warnings.iter().any(|issue| issue.code == code)
    }
}

/// Accumulates issues and evidence while a parse runs.
#[derive(Clone, Debug)]
pub struct ReportBuilder {
    strict: bool,
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
    evidence: Evidence,
}

impl ReportBuilder {
    pub fn new(strict: bool, file_name: &str, source_workbook_hash: Option<String>) -> Self {
        Self {
            strict,
            errors: Vec::new(),
            warnings: Vec::new(),
            evidence: Evidence {
                file_name: file_name.to_owned(),
                source_workbook_hash,
                ..Evidence::default()
            },
        }
    }

    /// Records a failure in every mode.
    pub fn error(&mut self, issue: ValidationIssue) {
        log::warn!("{}", issue.describe());
        self.errors.push(issue);
    }

    pub fn warning(&mut self, issue: ValidationIssue) {
        log::debug!("{}", issue.describe());
        self.warnings.push(issue);
    }

    /// Records a condition that fails strict parses and only warns otherwise.
    pub fn degradable(&mut self, issue: ValidationIssue) {
        if self.strict {
            self.error(issue);
        } else {
            self.warning(issue);
        }
    }

    pub fn evidence_mut(&mut self) -> &mut Evidence {
        &mut self.evidence
    }

    /// Warning messages in report order.
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ValidationIssue::describe).collect()
    }

    pub fn finish(self) -> ValidationReport {
        let status = if self.errors.is_empty() {
            ValidationStatus::Pass
        } else {
            ValidationStatus::Fail
        };
        ValidationReport {
            status,
            strict: self.strict,
            errors: self.errors,
            warnings: self.warnings,
            evidence: self.evidence,
        }
    }
}

/// Thresholds for row-level anomaly checks.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AnomalyLimits {
    /// Prices at or above this absolute value are flagged
    pub large_price: f64,
    /// Tax rates above this fraction are flagged
    pub max_tax_rate: f64,
}

/// Flags suspicious values in one extracted table.
///
/// These never abort parsing: a flagged section is kept and left for human review.
pub fn inspect_table(table: &PricingTable, limits: &AnomalyLimits) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for item in &table.items {
        let location = cell_reference(item.source_row, 0);
        if item.selling_price < 0.0 && !item.is_excluded {
            issues.push(
                ValidationIssue::new(
                    IssueCode::NegativePrice,
                    format!("'{}' has a negative price {} near {}", item.description, item.selling_price, location),
                )
                .at_row(item.source_row)
                .in_table(&table.id),
            );
        }
        if item.selling_price.abs() >= limits.large_price {
            issues.push(
                ValidationIssue::new(
                    IssueCode::LargePrice,
                    format!("'{}' has an unusually large price {}", item.description, item.selling_price),
                )
                .at_row(item.source_row)
                .in_table(&table.id),
            );
        }
        if item.is_included && item.selling_price != 0.0 {
            issues.push(
                ValidationIssue::new(
                    IssueCode::IncludedWithPrice,
                    format!("'{}' is marked Included but priced {}", item.description, item.selling_price),
                )
                .at_row(item.source_row)
                .in_table(&table.id),
            );
        }
    }
    if let Some(tax) = &table.tax {
        if !(0.0..=limits.max_tax_rate).contains(&tax.rate) {
            issues.push(
                ValidationIssue::new(
                    IssueCode::TaxRateOutOfRange,
                    format!("Tax rate {:.4} of '{}' is outside 0..{}", tax.rate, table.name, limits.max_tax_rate),
                )
                .in_table(&table.id),
            );
        }
    }
    issues
}
