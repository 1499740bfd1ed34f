use crate::spreadsheet::cell::normalize_label;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::Workbook;
use std::collections::BTreeSet;
use std::fmt::Debug;
use thiserror::Error;

/// Sheet names that look like an alternate responsibility matrix.
const DEFAULT_MATRIX_PATTERNS: [&str; 3] = ["*alternate*", "*responsibility*", "*matrix*"];

/// Errors raised while probing for the alternate responsibility matrix.
#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("Alternate matrix sheet '{0}' is unreadable")]
    SheetUnreadable(String),
}

/// What the locator found, copied into report evidence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatrixProbe {
    /// Sheets that look like a matrix
    pub candidates: Vec<String>,
    /// Sheet that was read
    pub sheet: Option<String>,
    /// Distinct categories parsed from it
    pub categories: usize,
}

/// Finds the alternate responsibility matrix next to the pricing worksheet.
///
/// Only feeds report evidence; a failure never blocks pricing extraction.
pub trait AlternateMatrixLocator: Send + Sync + Debug {
    fn probe(&self, workbook: &dyn Workbook, pricing_sheet: &str) -> Result<MatrixProbe, MatrixError>;
}

/// Locates the matrix by sheet name and counts the labels of its first column.
#[derive(Clone, Debug)]
pub struct SheetNameMatrixLocator {
    pub criteria: Criteria,
}

impl Default for SheetNameMatrixLocator {
    fn default() -> Self {
        let criteria = Criteria::from_patterns(&DEFAULT_MATRIX_PATTERNS, true).unwrap_or_else(|_| Criteria {
            sheet_name_patterns: Vec::new(),
            require_match: true,
        });
        Self { criteria }
    }
}

impl AlternateMatrixLocator for SheetNameMatrixLocator {
    fn probe(&self, workbook: &dyn Workbook, pricing_sheet: &str) -> Result<MatrixProbe, MatrixError> {
        let candidates: Vec<String> = workbook
            .sheet_names()
            .into_iter()
            .filter(|name| name != pricing_sheet && self.criteria.accept(name))
            .collect();
        let Some(sheet) = candidates.first().cloned() else {
            return Ok(MatrixProbe::default());
        };
        let grid = workbook
            .worksheet(&sheet)
            .ok_or_else(|| MatrixError::SheetUnreadable(sheet.to_owned()))?;
        let categories: BTreeSet<String> = (1..grid.height())
            .filter(|row| grid.cell(*row, 0).is_free_text())
            .map(|row| normalize_label(&grid.cell(row, 0).to_string()))
            .collect();
        Ok(MatrixProbe {
            candidates,
            sheet: Some(sheet),
            categories: categories.len(),
        })
    }
}
