use thiserror::Error;

/// Main error type for the pricing sheet crate.
/// Aggregates errors from the standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum PricingSheetError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    // Third-party library errors
    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    CsvError(#[from] csv::Error),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    // Parser module errors
    #[error("{0}")]
    ParseError(#[from] crate::parser::ParseError),

    #[error("{0}")]
    MatrixError(#[from] crate::parser::matrix::MatrixError),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, PricingSheetError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| PricingSheetError::WithContextError(format!("{}: {}", message, e)))
    }
}
