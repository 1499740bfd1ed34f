use crate::spreadsheet::CellValue;
use crate::spreadsheet::Grid;
use serde::Deserialize;
use serde::Serialize;

/// Zero-based positions of the pricing columns of a worksheet.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMap {
    pub label: usize,
    pub cost: usize,
    pub sell: usize,
    pub margin: usize,
    pub margin_pct: usize,
}

/// Header row and the column map read from it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ColumnLocation {
    /// 0-based row holding the column titles
    pub header_row: usize,
    pub map: ColumnMap,
}

/// Role a header cell announces for its column.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum HeaderRole {
    MarginPct,
    Margin,
    Sell,
    Cost,
    Label,
}

const MARGIN_PCT_TOKENS: [&str; 6] = ["margin %", "margin pct", "margin percent", "gm %", "profit %", "%"];
const MARGIN_TOKENS: [&str; 4] = ["margin", "margin $", "gross margin", "profit"];
const SELL_TOKENS: [&str; 8] = [
    "selling price",
    "sell price",
    "sell",
    "revenue",
    "amount",
    "price",
    "total price",
    "bid price",
];
const COST_TOKENS: [&str; 6] = [
    "cost",
    "budgeted cost",
    "budget cost",
    "total cost",
    "est cost",
    "estimated cost",
];
const LABEL_TOKENS: [&str; 5] = ["description", "item", "scope", "line item", "total"];

impl ColumnMap {
    /// Returns the map with every index moved by `offset`, or `None` if any
    /// index would become negative.
    pub fn shifted(&self, offset: isize) -> Option<ColumnMap> {
        let shift = |index: usize| index.checked_add_signed(offset);
        Some(ColumnMap {
            label: shift(self.label)?,
            cost: shift(self.cost)?,
            sell: shift(self.sell)?,
            margin: shift(self.margin)?,
            margin_pct: shift(self.margin_pct)?,
        })
    }
}

/// Normalizes header text: lowercase, punctuation other than `%` and `$`
/// becomes a space, whitespace collapsed.
fn normalize_header(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|character| {
            if character.is_alphanumeric() || character == '%' || character == '$' {
                character
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn matches_token(normalized: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|token| {
        normalized == *token
            || normalized
                .strip_prefix(token)
                .map(|rest| rest.starts_with(' '))
                .unwrap_or(false)
    })
}

/// Reads the role a header cell announces, if any.
pub(crate) fn header_role(cell: &CellValue) -> Option<HeaderRole> {
    let normalized = normalize_header(cell.as_text()?);
    if normalized.is_empty() {
        None
    } else if matches_token(&normalized, &MARGIN_PCT_TOKENS) {
        Some(HeaderRole::MarginPct)
    } else if matches_token(&normalized, &MARGIN_TOKENS) {
        Some(HeaderRole::Margin)
    } else if matches_token(&normalized, &SELL_TOKENS) {
        Some(HeaderRole::Sell)
    } else if matches_token(&normalized, &COST_TOKENS) {
        Some(HeaderRole::Cost)
    } else if matches_token(&normalized, &LABEL_TOKENS) {
        Some(HeaderRole::Label)
    } else {
        None
    }
}

/// Returns true when a row repeats the cost and selling-price column titles.
pub(crate) fn is_column_header_row(cells: &[CellValue]) -> bool {
    let roles: Vec<HeaderRole> = cells.iter().filter_map(header_role).collect();
    roles.contains(&HeaderRole::Cost) && roles.contains(&HeaderRole::Sell)
}

/// Builds a column map from one candidate header row.
fn map_from_row(cells: &[CellValue]) -> Option<ColumnMap> {
    let position = |role: HeaderRole| cells.iter().position(|cell| header_role(cell) == Some(role));
    let cost = position(HeaderRole::Cost)?;
    let sell = position(HeaderRole::Sell)?;
    let leftmost = cost.min(sell);
    let label = position(HeaderRole::Label)
        .filter(|label| *label < leftmost)
        .unwrap_or(leftmost.saturating_sub(1));
    Some(ColumnMap {
        label,
        cost,
        sell,
        margin: position(HeaderRole::Margin).unwrap_or(sell + 1),
        margin_pct: position(HeaderRole::MarginPct).unwrap_or(sell + 2),
    })
}

/// Finds the header row and column map of a worksheet.
///
/// Scans the first `scan_rows` rows for one holding both a cost and a
/// selling-price title. Returns `None` when no row qualifies.
pub fn locate_columns(grid: &Grid, scan_rows: usize) -> Option<ColumnLocation> {
    (0..grid.height().min(scan_rows)).find_map(|row| {
        map_from_row(grid.row(row)).map(|map| ColumnLocation { header_row: row, map })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|cell| CellValue::from(*cell)).collect()
    }

    #[test]
    fn locate_basic_header() {
        let grid = Grid::new(vec![
            row(&["Acme Arena", "", ""]),
            row(&["", "Cost", "Selling Price"]),
        ]);
        let location = locate_columns(&grid, 40).unwrap();
        assert_eq!(location.header_row, 1);
        assert_eq!(
            location.map,
            ColumnMap { label: 0, cost: 1, sell: 2, margin: 3, margin_pct: 4 }
        );
    }

    #[test]
    fn locate_synonyms_and_margins() {
        let grid = Grid::new(vec![row(&[
            "Description",
            "Qty",
            "Budgeted Cost",
            "Revenue",
            "Margin %",
            "Margin $",
        ])]);
        let map = locate_columns(&grid, 40).unwrap().map;
        assert_eq!(map, ColumnMap { label: 0, cost: 2, sell: 3, margin: 5, margin_pct: 4 });
    }

    #[test]
    fn label_defaults_left_of_cost() {
        let grid = Grid::new(vec![row(&["", "", "  COST ", "Amount"])]);
        assert_eq!(locate_columns(&grid, 40).unwrap().map.label, 1);
        let grid = Grid::new(vec![row(&["Cost", "Selling Price"])]);
        assert_eq!(locate_columns(&grid, 40).unwrap().map.label, 0);
    }

    #[test]
    fn total_label_doubles_as_header() {
        let grid = Grid::new(vec![row(&["TOTAL:", "Cost", "Selling Price"])]);
        let map = locate_columns(&grid, 40).unwrap().map;
        assert_eq!(map.label, 0);
    }

    #[test]
    fn missing_sell_is_not_a_header() {
        let grid = Grid::new(vec![row(&["Item", "Cost", "Notes"])]);
        assert_eq!(locate_columns(&grid, 40), None);
    }

    #[test]
    fn scan_window_is_respected() {
        let mut rows = vec![row(&["filler"]); 5];
        rows.push(row(&["", "Cost", "Price"]));
        let grid = Grid::new(rows);
        assert_eq!(locate_columns(&grid, 5), None);
        assert_eq!(locate_columns(&grid, 40).unwrap().header_row, 5);
    }

    #[test]
    fn shifted_maps() {
        let map = ColumnMap { label: 0, cost: 1, sell: 2, margin: 3, margin_pct: 4 };
        assert_eq!(map.shifted(-1), None);
        assert_eq!(map.shifted(2).unwrap().sell, 4);
    }

    #[test]
    fn header_repeat_rows() {
        assert!(is_column_header_row(&row(&["Audio", "Cost", "Selling Price"])));
        assert!(!is_column_header_row(&row(&["Audio", "Cost", ""])));
    }
}
