//! # Spreadsheet Input Module
//!
//! In-memory workbook abstraction consumed by the pricing parser. Reading binary
//! spreadsheet formats is left to the caller; this module only models named
//! worksheets as rectangular grids of cell values, plus loaders for the JSON and
//! CSV interchange forms used by the command-line tool.
use crate::error::PricingSheetError;
use crate::error::ResultMessage;
use serde::Deserialize;
use serde::Serialize;
use std::io::Read;
use thiserror::Error;

pub mod cell;
pub mod criteria;
pub mod grid;

pub use cell::CellValue;
pub use grid::Grid;

/// Errors raised while assembling a workbook.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// Two worksheets share one name
    #[error("Duplicate sheet name '{0}'")]
    DuplicateSheet(String),

    /// Requested sheet does not exist
    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),
}

/// Named worksheets, each readable as a grid of cell values.
pub trait Workbook {
    /// Returns the sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Returns the grid of the named worksheet.
    fn worksheet(&self, name: &str) -> Option<&Grid>;
}

/// A single named worksheet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Worksheet {
    /// Sheet name
    pub name: String,
    /// Cell values
    #[serde(rename = "rows")]
    pub grid: Grid,
}

/// Workbook held entirely in memory.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryWorkbook {
    sheets: Vec<Worksheet>,
}

impl MemoryWorkbook {
    /// Creates an empty workbook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a workbook holding one worksheet.
    pub fn single(name: &str, grid: Grid) -> Self {
        Self {
            sheets: vec![Worksheet { name: name.to_owned(), grid }],
        }
    }

    /// Appends a worksheet, rejecting duplicate names.
    pub fn push_sheet(&mut self, name: &str, grid: Grid) -> Result<(), SpreadsheetError> {
        if self.sheets.iter().any(|sheet| sheet.name == name) {
            return Err(SpreadsheetError::DuplicateSheet(name.to_owned()));
        }
        self.sheets.push(Worksheet { name: name.to_owned(), grid });
        Ok(())
    }

    /// Builder form of `push_sheet`.
    pub fn with_sheet(mut self, name: &str, grid: Grid) -> Result<Self, SpreadsheetError> {
        self.push_sheet(name, grid)?;
        Ok(self)
    }

    /// Returns the named worksheet or an error.
    pub fn sheet(&self, name: &str) -> Result<&Worksheet, SpreadsheetError> {
        self.sheets
            .iter()
            .find(|sheet| sheet.name == name)
            .ok_or_else(|| SpreadsheetError::SheetNotFound(name.to_owned()))
    }

    /// Loads a workbook from JSON: `{"sheets":[{"name":"..","rows":[[..]]}]}`.
    pub fn from_json_reader<R: Read>(reader: R, file_name: &str) -> Result<Self, PricingSheetError> {
        let workbook: MemoryWorkbook = serde_json::from_reader(reader)
            .map_err(PricingSheetError::from)
            .with_prefix(file_name)?;
        let mut checked = MemoryWorkbook::new();
        for sheet in workbook.sheets {
            checked
                .push_sheet(&sheet.name, sheet.grid)
                .map_err(PricingSheetError::from)
                .with_prefix(file_name)?;
        }
        Ok(checked)
    }

    /// Loads a single-sheet workbook from headerless CSV.
    pub fn from_csv_reader<R: Read>(reader: R, sheet_name: &str) -> Result<Self, PricingSheetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(PricingSheetError::from).with_prefix(sheet_name)?;
            rows.push(record.iter().map(CellValue::from_raw_text).collect());
        }
        Ok(Self::single(sheet_name, Grid::new(rows)))
    }
}

impl Workbook for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|sheet| sheet.name.to_owned()).collect()
    }

    fn worksheet(&self, name: &str) -> Option<&Grid> {
        self.sheet(name).ok().map(|sheet| &sheet.grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workbook_rejects_duplicate_sheets() {
        let mut workbook = MemoryWorkbook::single("Pricing", Grid::default());
        assert!(workbook.push_sheet("Notes", Grid::default()).is_ok());
        assert!(matches!(
            workbook.push_sheet("Pricing", Grid::default()),
            Err(SpreadsheetError::DuplicateSheet(_))
        ));
        assert_eq!(workbook.sheet_names(), vec!["Pricing".to_owned(), "Notes".to_owned()]);
        assert!(workbook.sheet("Missing").is_err());
    }

    #[test]
    fn workbook_from_json() {
        let json = r#"{"sheets":[{"name":"Pricing","rows":[["", "Cost", "Selling Price"],["Display", 100, 150]]}]}"#;
        let workbook = MemoryWorkbook::from_json_reader(json.as_bytes(), "test.json").unwrap();
        let grid = workbook.worksheet("Pricing").unwrap();
        assert_eq!(grid.cell(1, 2), &CellValue::Number(150.0));
    }

    #[test]
    fn workbook_from_json_reports_file_name() {
        let json = r#"{"sheets":[{"name":"A","rows":[]},{"name":"A","rows":[]}]}"#;
        let error = MemoryWorkbook::from_json_reader(json.as_bytes(), "dup.json").unwrap_err();
        assert_eq!(error.to_string(), "dup.json: Duplicate sheet name 'A'");
    }

    #[test]
    fn workbook_from_csv() {
        let csv = ",Cost,Selling Price\nDisplay,100,\"$1,500\"\n";
        let workbook = MemoryWorkbook::from_csv_reader(csv.as_bytes(), "bid").unwrap();
        let grid = workbook.worksheet("bid").unwrap();
        assert_eq!(grid.cell(0, 0), &CellValue::Empty);
        assert_eq!(grid.cell(1, 1), &CellValue::Number(100.0));
        assert_eq!(grid.cell(1, 2), &CellValue::Text("$1,500".to_owned()));
    }
}
