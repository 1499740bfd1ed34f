//! # Pricing Document Model
//!
//! The normalized output of the parser. Field names and nesting form the persisted
//! JSON shape read back by rendering and reconciliation, so they are serialized in
//! `camelCase` and must stay stable.
use crate::validation::ValidationReport;
use serde::Deserialize;
use serde::Serialize;

pub mod table;

pub use table::AlternateItem;
pub use table::PricingLineItem;
pub use table::PricingTable;
pub use table::TableKind;
pub use table::TaxInfo;

/// Strategy that produced the table boundaries of a document.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategy {
    /// Header-driven section detection with the located column map
    Standard,
    /// Section detection after re-aligning the column map
    ColumnShift,
    /// Whole sheet treated as one table
    SingleTable,
}

impl ParseStrategy {
    /// Returns the strategy name used in reports.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::ColumnShift => "column_shift",
            Self::SingleTable => "single_table",
        }
    }
}

/// Counts and diagnostics attached to a document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Number of tables, including a synthesized roll-up
    pub table_count: usize,
    /// Number of line items, excluding the roll-up table
    pub item_count: usize,
    /// Number of alternates over all tables
    pub alternate_count: usize,
    /// Whether `document_total` was read from the workbook rather than summed
    pub has_explicit_total: bool,
    /// Strategy that produced the boundaries
    pub strategy: ParseStrategy,
    /// Warning messages, in report order
    pub warnings: Vec<String>,
    /// Full validation report of the parse that built the document
    pub validation: Option<ValidationReport>,
}

/// Top-level parser output: ordered pricing tables of one worksheet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingDocument {
    /// Source file name as given by the caller
    pub file_name: String,
    /// Worksheet the tables were read from
    pub sheet_name: String,
    /// ISO currency code
    pub currency: String,
    /// Tables in sheet order, a synthesized roll-up first
    pub tables: Vec<PricingTable>,
    /// Document-level total
    pub document_total: f64,
    /// Counts and diagnostics
    pub metadata: DocumentMetadata,
}

impl PricingDocument {
    /// Looks up a table by its identifier.
    pub fn table(&self, id: &str) -> Option<&PricingTable> {
        self.tables.iter().find(|table| table.id == id)
    }

    /// Tables holding real priced sections (no summaries or roll-ups).
    pub fn sections(&self) -> impl Iterator<Item = &PricingTable> {
        self.tables.iter().filter(|table| table.kind == TableKind::Section)
    }
}
