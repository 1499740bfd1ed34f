use crate::parser::columns::is_column_header_row;
use crate::parser::columns::ColumnMap;
use crate::spreadsheet::cell::normalize_label;
use crate::spreadsheet::cell::parse_number;
use crate::spreadsheet::cell::TextOverride;
use crate::spreadsheet::Grid;
use once_cell::sync::Lazy;
use regex::Regex;

/// Semantic kind of a worksheet row. Exactly one kind per row.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RowKind {
    /// Section start candidate: a label without numbers
    Header,
    Subtotal,
    Tax,
    Bond,
    GrandTotal,
    AlternateHeader,
    AlternateLine,
    /// Regular line item: a label with a price or a textual override
    Item,
    Empty,
}

/// Read-only view of one worksheet row below the header row.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifiedRow {
    /// 0-based worksheet row
    pub row_index: usize,
    pub label: String,
    pub label_norm: String,
    pub cost: Option<f64>,
    pub sell: Option<f64>,
    pub text_override: Option<TextOverride>,
    pub kind: RowKind,
}

static SUBTOTAL_PHRASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bsub[\s-]?total\b").expect("Hardcode regex pattern"));
static BID_FORM_TOTAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bsub[\s-]?total\s*\(bid form\)").expect("Hardcode regex pattern"));
static YEAR_TOTAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+\s*-?\s*(yr|year)s?\.?\s+total\b").expect("Hardcode regex pattern"));
static EXTENDED_WARRANTY_TOTAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bextended warranty\b.*\btotal\b").expect("Hardcode regex pattern"));
static ALTERNATE_SECTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^alternates?\s*[-–:]\s*(add to cost|deduct)").expect("Hardcode regex pattern"));
static ALTERNATE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^alt(\s|-|#|\.)").expect("Hardcode regex pattern"));

impl ClassifiedRow {
    /// Returns true if the cost or selling price is a number.
    pub fn has_numeric(&self) -> bool {
        self.cost.is_some() || self.sell.is_some()
    }

    /// Selling price, falling back to cost.
    pub fn amount(&self) -> Option<f64> {
        self.sell.or(self.cost)
    }

    pub fn has_text_override(&self) -> bool {
        self.text_override.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.kind == RowKind::Empty
    }

    pub fn is_header(&self) -> bool {
        self.kind == RowKind::Header
    }

    pub fn is_subtotal(&self) -> bool {
        self.kind == RowKind::Subtotal
    }

    pub fn is_tax(&self) -> bool {
        self.kind == RowKind::Tax
    }

    pub fn is_bond(&self) -> bool {
        self.kind == RowKind::Bond
    }

    pub fn is_grand_total(&self) -> bool {
        self.kind == RowKind::GrandTotal
    }

    pub fn is_alternate_header(&self) -> bool {
        self.kind == RowKind::AlternateHeader
    }

    pub fn is_alternate_line(&self) -> bool {
        self.kind == RowKind::AlternateLine
    }

    /// Rows that carry pricing data of any kind.
    pub fn is_data(&self) -> bool {
        matches!(
            self.kind,
            RowKind::Item
                | RowKind::AlternateLine
                | RowKind::Subtotal
                | RowKind::Tax
                | RowKind::Bond
                | RowKind::GrandTotal
        )
    }

    /// Item or alternate line with both a label and a number.
    pub(crate) fn is_priced_line(&self) -> bool {
        matches!(self.kind, RowKind::Item | RowKind::AlternateLine)
            && !self.label.is_empty()
            && self.has_numeric()
    }
}

/// Label matches an explicit sub-total phrase ("Subtotal", "Sub-Total").
pub(crate) fn is_explicit_subtotal(label_norm: &str) -> bool {
    SUBTOTAL_PHRASE.is_match(label_norm) && !BID_FORM_TOTAL.is_match(label_norm)
}

fn is_subtotal_label(label_norm: &str) -> bool {
    is_explicit_subtotal(label_norm)
        || YEAR_TOTAL.is_match(label_norm)
        || EXTENDED_WARRANTY_TOTAL.is_match(label_norm)
        || (label_norm.ends_with("total")
            && !matches!(label_norm, "total" | "grand total" | "project total")
            && !label_norm.contains("grand total"))
}

fn is_tax_label(label_norm: &str) -> bool {
    matches!(label_norm, "tax" | "sales tax")
        || label_norm.starts_with("tax ")
        || label_norm.starts_with("sales tax ")
}

fn is_grand_total_label(label_norm: &str) -> bool {
    label_norm.contains("grand total")
        || BID_FORM_TOTAL.is_match(label_norm)
        || matches!(label_norm, "total" | "project total")
}

fn is_alternate_label(label_norm: &str) -> bool {
    ALTERNATE_PREFIX.is_match(label_norm) || label_norm.contains("alternate")
}

/// Derives the kind of a row from its normalized label and data.
///
/// Priority order matters: a row is never both a subtotal and an item.
pub fn row_kind(label_norm: &str, has_numeric: bool, has_override: bool, is_header_repeat: bool) -> RowKind {
    if label_norm.is_empty() {
        if has_numeric {
            RowKind::Subtotal
        } else {
            RowKind::Empty
        }
    } else if BID_FORM_TOTAL.is_match(label_norm) {
        RowKind::GrandTotal
    } else if is_subtotal_label(label_norm) {
        RowKind::Subtotal
    } else if is_tax_label(label_norm) {
        RowKind::Tax
    } else if label_norm == "bond" {
        RowKind::Bond
    } else if is_grand_total_label(label_norm) {
        RowKind::GrandTotal
    } else if ALTERNATE_SECTION.is_match(label_norm)
        || (label_norm.contains("alternate") && !has_numeric && !is_header_repeat)
    {
        RowKind::AlternateHeader
    } else if is_alternate_label(label_norm) && has_numeric {
        RowKind::AlternateLine
    } else if !has_numeric && !has_override {
        RowKind::Header
    } else {
        RowKind::Item
    }
}

/// Classifies one worksheet row against a column map.
pub fn classify_row(grid: &Grid, map: &ColumnMap, row: usize) -> ClassifiedRow {
    let label = grid.cell(row, map.label).to_string();
    let label_norm = normalize_label(&label);
    let cost = parse_number(grid.cell(row, map.cost));
    let sell = parse_number(grid.cell(row, map.sell));
    let is_header_repeat = is_column_header_row(grid.row(row));
    let text_override = if is_header_repeat {
        None
    } else {
        grid.cell(row, map.sell).text_override().or_else(|| {
            grid.row(row)
                .iter()
                .enumerate()
                .filter(|(col, _)| *col != map.label)
                .find_map(|(_, cell)| cell.as_text().and_then(TextOverride::parse_marker))
        })
    };
    let kind = if is_header_repeat && label_norm.is_empty() {
        RowKind::Empty
    } else {
        row_kind(&label_norm, cost.is_some() || sell.is_some(), text_override.is_some(), is_header_repeat)
    };
    ClassifiedRow {
        row_index: row,
        label: label.trim().to_owned(),
        label_norm,
        cost,
        sell,
        text_override,
        kind,
    }
}

/// Classifies every row below the header row.
pub fn classify_rows(grid: &Grid, map: &ColumnMap, header_row: usize) -> Vec<ClassifiedRow> {
    (header_row + 1..grid.height())
        .map(|row| classify_row(grid, map, row))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::CellValue;

    const MAP: ColumnMap = ColumnMap { label: 0, cost: 1, sell: 2, margin: 3, margin_pct: 4 };

    fn classify(cells: Vec<CellValue>) -> ClassifiedRow {
        classify_row(&Grid::new(vec![cells]), &MAP, 0)
    }

    #[test]
    fn blank_label_with_numbers_is_subtotal() {
        let row = classify(vec!["".into(), 12000.into(), 18000.into()]);
        assert_eq!(row.kind, RowKind::Subtotal);
        assert_eq!(row.sell, Some(18000.0));
    }

    #[test]
    fn bid_form_total_is_grand_total() {
        assert_eq!(row_kind("sub total (bid form)", true, false, false), RowKind::GrandTotal);
        assert_eq!(row_kind("sub-total (bid form)", true, false, false), RowKind::GrandTotal);
    }

    #[test]
    fn subtotal_labels() {
        for label in ["subtotal", "sub total", "sub-total", "3 yr total", "5 year total", "extended warranty - 2 years total", "equipment total"] {
            assert_eq!(row_kind(label, true, false, false), RowKind::Subtotal, "{label}");
        }
    }

    #[test]
    fn grand_total_labels() {
        for label in ["grand total", "total", "project total", "project grand total"] {
            assert_eq!(row_kind(label, true, false, false), RowKind::GrandTotal, "{label}");
        }
    }

    #[test]
    fn tax_and_bond() {
        assert_eq!(row_kind("tax", true, false, false), RowKind::Tax);
        assert_eq!(row_kind("tax 8.25%", true, false, false), RowKind::Tax);
        assert_eq!(row_kind("sales tax", true, false, false), RowKind::Tax);
        assert_eq!(row_kind("taxonomy", true, false, false), RowKind::Item);
        assert_eq!(row_kind("bond", true, false, false), RowKind::Bond);
        assert_eq!(row_kind("bondage", true, false, false), RowKind::Item);
    }

    #[test]
    fn alternates() {
        assert_eq!(row_kind("alternates - add to cost", false, false, false), RowKind::AlternateHeader);
        assert_eq!(row_kind("alternate - deduct", true, false, false), RowKind::AlternateHeader);
        assert_eq!(row_kind("alternates", false, false, false), RowKind::AlternateHeader);
        assert_eq!(row_kind("alternates", false, false, true), RowKind::Header);
        assert_eq!(row_kind("alt 1 - upgraded processor", true, false, false), RowKind::AlternateLine);
        assert_eq!(row_kind("alt-2 remove rigging", true, false, false), RowKind::AlternateLine);
        assert_eq!(row_kind("add alternate: spare parts", true, false, false), RowKind::AlternateLine);
        assert_eq!(row_kind("altitude kit", true, false, false), RowKind::Item);
    }

    #[test]
    fn headers_items_and_empty() {
        assert_eq!(row_kind("control system", false, false, false), RowKind::Header);
        assert_eq!(row_kind("installation", false, true, false), RowKind::Item);
        assert_eq!(row_kind("led display", true, false, false), RowKind::Item);
        assert_eq!(row_kind("", false, true, false), RowKind::Empty);
        assert_eq!(row_kind("", false, false, false), RowKind::Empty);
    }

    #[test]
    fn warranty_with_zero_price_is_item() {
        let row = classify(vec!["Warranty".into(), "N/A".into(), 0.into()]);
        assert_eq!(row.kind, RowKind::Item);
        assert_eq!(row.cost, None);
        assert_eq!(row.sell, Some(0.0));
        assert!(!row.has_text_override());
    }

    #[test]
    fn text_override_from_sell_or_marker_cell() {
        let row = classify(vec!["Installation".into(), "".into(), "Included".into()]);
        assert_eq!(row.kind, RowKind::Item);
        assert_eq!(row.text_override, Some(TextOverride::Included));

        let row = classify(vec!["Spare parts".into(), 10.into(), 25.into(), "".into(), "".into(), "Excluded".into()]);
        assert_eq!(row.text_override, Some(TextOverride::Excluded));
    }

    #[test]
    fn repeated_column_titles() {
        let row = classify(vec!["Audio System".into(), "Cost".into(), "Selling Price".into()]);
        assert_eq!(row.kind, RowKind::Header);
        let row = classify(vec!["".into(), "Cost".into(), "Selling Price".into()]);
        assert_eq!(row.kind, RowKind::Empty);
    }

    #[test]
    fn classify_rows_starts_below_header() {
        let grid = Grid::new(vec![
            vec!["".into(), "Cost".into(), "Selling Price".into()],
            vec!["Display".into(), 100.into(), 150.into()],
            vec![],
        ]);
        let rows = classify_rows(&grid, &MAP, 0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_index, 1);
        assert!(rows[0].is_priced_line());
        assert!(rows[1].is_empty());
    }
}
