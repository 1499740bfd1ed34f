use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;

/// Raw value of a single worksheet cell.
///
/// Serialized untagged so a worksheet row reads naturally as JSON:
/// `[null, "Cost", 12000, true]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Bool(bool),
    /// Numeric values
    Number(f64),
    /// String values, including numbers typed as text ("$1,200")
    Text(String),
}

/// Literal textual marker found in a price cell in place of a number.
#[derive(Clone, Debug, PartialEq)]
pub enum TextOverride {
    Included,
    Excluded,
    Text(String),
}

/// Cell texts that mean "nothing given" rather than a textual override.
const ABSENT_MARKERS: [&str; 3] = ["n/a", "na", "n.a."];

const CURRENCY_SYMBOLS: [char; 3] = ['$', '€', '£'];

impl TextOverride {
    /// Returns the text shown in place of a price.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Included => "Included",
            Self::Excluded => "Excluded",
            Self::Text(text) => text.as_str(),
        }
    }

    /// Recognizes the literal Included/Excluded markers only.
    pub(crate) fn parse_marker(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "included" | "incl" | "incl." => Some(Self::Included),
            "excluded" | "not included" | "excl" | "excl." => Some(Self::Excluded),
            _ => None,
        }
    }
}

impl CellValue {
    /// Builds a cell from untyped text such as a CSV field.
    /// Plain numbers become `Number`, blanks become `Empty`.
    pub fn from_raw_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Self::Empty
        } else if let Ok(value) = trimmed.parse::<f64>() {
            if value.is_finite() {
                Self::Number(value)
            } else {
                Self::Text(text.to_owned())
            }
        } else {
            Self::Text(text.to_owned())
        }
    }

    /// Returns true for empty cells and whitespace-only strings.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Returns the trimmed string content of a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.trim()),
            _ => None,
        }
    }

    /// Returns true when the cell holds text that is not a number.
    pub fn is_free_text(&self) -> bool {
        match self {
            Self::Text(text) => {
                parse_number_str(text).is_none() && text.chars().any(char::is_alphabetic)
            }
            _ => false,
        }
    }

    /// Reads the cell as a textual price override.
    pub fn text_override(&self) -> Option<TextOverride> {
        let text = self.as_text()?;
        let bare: String = text
            .chars()
            .filter(|character| !CURRENCY_SYMBOLS.contains(character) && !character.is_whitespace())
            .collect();
        let absent = bare.chars().all(|character| character == '-') || ABSENT_MARKERS.contains(&bare.to_ascii_lowercase().as_str());
        if absent || parse_number_str(text).is_some() {
            None
        } else {
            TextOverride::parse_marker(text).or_else(|| Some(TextOverride::Text(text.to_owned())))
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Bool(value) => write!(f, "{}", value),
            Self::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => write!(f, "{}", *value as i64),
            Self::Number(value) => write!(f, "{}", value),
            Self::Text(value) => write!(f, "{}", value.trim()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value.to_owned())
        }
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Parses a cell as a monetary number.
///
/// Never fails: sentinels such as `N/A`, `TBD`, `Included`, blanks and booleans
/// yield `None`, which callers treat as "no price given" (distinct from zero).
pub fn parse_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(value) if value.is_finite() => Some(*value),
        CellValue::Text(text) => parse_number_str(text),
        _ => None,
    }
}

/// Parses a string as a monetary number.
///
/// Strips currency symbols, thousands separators and whitespace; a value wrapped in
/// parentheses is negative. Percentages are not prices and yield `None`.
/// Accounting-format zeros (`$ -`, `€-`) read as 0.
pub fn parse_number_str(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let (negative, body) = match trimmed.strip_prefix('(').and_then(|inner| inner.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = body
        .chars()
        .filter(|character| !CURRENCY_SYMBOLS.contains(character) && *character != ',' && !character.is_whitespace())
        .collect();
    if !cleaned.chars().any(|character| character.is_ascii_digit()) {
        let accounting_zero = body.contains(&CURRENCY_SYMBOLS[..]) && !cleaned.is_empty() && cleaned.chars().all(|character| character == '-');
        return accounting_zero.then_some(0.0);
    }
    let value = cleaned.parse::<f64>().ok().filter(|value| value.is_finite())?;
    Some(if negative { -value.abs() } else { value })
}

/// Normalizes a row label for pattern matching: lowercase, collapsed whitespace,
/// trailing colons removed.
pub fn normalize_label(text: &str) -> String {
    let collapsed = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed.trim_end_matches(|character: char| character == ':' || character.is_whitespace()).to_owned()
}

/// Convert 0-based row & column indexes to an Excel-style cell reference ("B7").
pub fn cell_reference(row: usize, col: usize) -> String {
    let mut column = col as u32 + 1;
    let mut reference = String::new();
    while column > 0 {
        column -= 1;
        if let Some(letter) = char::from_u32('A' as u32 + column % 26) {
            reference.insert(0, letter);
        }
        column /= 26;
    }
    reference.push_str(&(row + 1).to_string());
    reference
}
