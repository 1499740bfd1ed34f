//! # Pricing Sheet Parser
//!
//! Converts loosely structured pricing worksheets into a normalized,
//! arithmetic-consistent document model, and recomputes the totals a rendered
//! document displays.
//!
//! ## Features
//!
//! - **Schema-free input**: Column headers are located by vocabulary, not position
//! - **Row classification**: Every row gets exactly one kind (header, item, subtotal,
//!   tax, bond, grand total, alternate header, alternate line, empty)
//! - **Section detection**: Viable section headers, orphaned summary rows and
//!   alternates sub-ranges
//! - **Fallback cascade**: Standard scan, column-shift correction, then single table
//! - **Validation report**: Pass/fail verdict with evidence, and a strict mode that
//!   withholds incomplete extractions
//! - **Round-then-sum totals**: Displayed grand totals always equal the sum of their
//!   displayed parts, under arbitrary price and description overrides
//!
//! ## Entry Points
//!
//! - [`parse_pricing_tables`]: Parse the pricing worksheet of a workbook
//! - [`parse_pricing_tables_with_validation`]: Parse and report, optionally in strict mode
//! - [`compute_table_totals`] / [`compute_document_total`]: Displayed totals
pub mod document;
pub mod error;
pub mod math;
pub mod parser;
pub mod spreadsheet;
pub mod validation;

pub use document::PricingDocument;
pub use document::PricingTable;
pub use error::PricingSheetError;
pub use math::compute_document_total;
pub use math::compute_table_totals;
pub use math::compute_tables_total;
pub use math::DescriptionOverrides;
pub use math::PriceOverrides;
pub use math::RenderedTableTotals;
pub use parser::parse_pricing_tables;
pub use parser::parse_pricing_tables_with_validation;
pub use parser::ParseOptions;
pub use parser::ParseOutcome;
pub use spreadsheet::MemoryWorkbook;
pub use spreadsheet::Workbook;
pub use validation::ValidationReport;
