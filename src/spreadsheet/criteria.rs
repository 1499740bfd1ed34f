use crate::error::PricingSheetError;
use glob::MatchOptions;
use glob::Pattern;

/// Sheet names tried first when choosing the pricing worksheet.
const DEFAULT_SHEET_NAME_PATTERNS: [&str; 7] = [
    "*pricing*",
    "*margin*",
    "*budget*",
    "*estimate*",
    "*bid*",
    "*proposal*",
    "*quote*",
];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Criteria for selecting the pricing worksheet from a workbook.
#[derive(Clone, Debug)]
pub struct Criteria {
    /// Sheet name patterns (case-insensitive globs) tried before other sheets.
    pub sheet_name_patterns: Vec<Pattern>,

    /// Only consider sheets matching a pattern.
    pub require_match: bool,
}

impl Criteria {
    /// Builds criteria from glob strings.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S], require_match: bool) -> Result<Self, PricingSheetError> {
        let sheet_name_patterns = patterns
            .iter()
            .map(|pattern| Pattern::new(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { sheet_name_patterns, require_match })
    }

    /// Checks if a sheet name matches any of the patterns.
    pub fn accept(&self, sheet_name: &str) -> bool {
        self.sheet_name_patterns
            .iter()
            .any(|pattern| pattern.matches_with(sheet_name, MATCH_OPTIONS))
    }

    /// Requires a pattern match (builder form).
    pub fn require_match(mut self, require_match: bool) -> Self {
        self.require_match = require_match;
        self
    }

    /// Orders sheet names for selection: matching sheets first (workbook order),
    /// then the rest unless `require_match` is set.
    pub fn order(&self, sheet_names: &[String]) -> Vec<String> {
        let (matched, rest): (Vec<String>, Vec<String>) = sheet_names
            .iter()
            .cloned()
            .partition(|name| self.accept(name));
        if self.require_match {
            matched
        } else {
            matched.into_iter().chain(rest).collect()
        }
    }

    /// Pattern list for report messages.
    pub(crate) fn describe(&self) -> String {
        self.sheet_name_patterns
            .iter()
            .map(Pattern::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for Criteria {
    fn default() -> Self {
        Self {
            sheet_name_patterns: DEFAULT_SHEET_NAME_PATTERNS
                .iter()
                .filter_map(|pattern| Pattern::new(pattern).ok())
                .collect(),
            require_match: false,
        }
    }
}
