use crate::document::PricingLineItem;
use crate::document::PricingTable;
use crate::document::TableKind;
use crate::parser::classify::ClassifiedRow;
use once_cell::sync::Lazy;
use regex::Regex;

/// Name of the synthesized roll-up table.
pub const ROLLUP_TABLE_NAME: &str = "Project Grand Total";

/// Identifier of the synthesized roll-up table.
pub const ROLLUP_TABLE_ID: &str = "project-grand-total";

static ROLLUP_VOCABULARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(summary|roll-?up|recap|project total|grand total|overview)\b").expect("Hardcode regex pattern")
});

/// Returns true if a section name reads like a summary or roll-up.
pub fn is_summary_name(name: &str) -> bool {
    ROLLUP_VOCABULARY.is_match(name)
}

/// Document-level total found in the worksheet.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GlobalTotal {
    pub amount: f64,
    /// 0-based worksheet row the total was read from
    pub row: usize,
}

/// Searches for the authoritative document total.
///
/// Tried in order: the grand total (or subtotal) row of a leading summary
/// table, then the first grand-total row above `first_section_row`.
///
/// # Arguments
///
/// * `tables` - Extracted tables in sheet order
/// * `first_section_row` - Start row of the first section found by the standard scan
/// * `rows` - Classified rows of the worksheet
pub fn find_global_total(
    tables: &[PricingTable],
    first_section_row: Option<usize>,
    rows: &[ClassifiedRow],
) -> Option<GlobalTotal> {
    let from_summary = tables
        .first()
        .filter(|table| table.kind == TableKind::Summary)
        .and_then(|table| match (table.grand_total_row, table.subtotal_row) {
            (Some(row), _) => Some(GlobalTotal { amount: table.grand_total, row }),
            (None, Some(row)) => Some(GlobalTotal { amount: table.subtotal, row }),
            (None, None) => None,
        });
    from_summary.or_else(|| {
        let first_section_row = first_section_row?;
        rows.iter()
            .take_while(|row| row.row_index < first_section_row)
            .filter(|row| row.is_grand_total())
            .find_map(|row| row.amount().map(|amount| GlobalTotal { amount, row: row.row_index }))
    })
}

/// Builds the navigation table listing every section's grand total.
///
/// Returns `None` when the worksheet already has a summary or roll-up table.
pub fn synthesize_rollup(tables: &[PricingTable], global: &GlobalTotal) -> Option<PricingTable> {
    if tables.iter().any(|table| table.kind != TableKind::Section) {
        return None;
    }
    let items: Vec<PricingLineItem> = tables
        .iter()
        .map(|table| PricingLineItem {
            description: table.name.clone(),
            selling_price: table.grand_total,
            is_included: false,
            is_excluded: false,
            text_value: None,
            source_row: table.grand_total_row.unwrap_or(table.end_row),
        })
        .collect();
    Some(PricingTable {
        id: ROLLUP_TABLE_ID.to_owned(),
        name: ROLLUP_TABLE_NAME.to_owned(),
        kind: TableKind::Rollup,
        subtotal: items.iter().map(|item| item.selling_price).sum(),
        items,
        alternates: Vec::new(),
        tax: None,
        bond: 0.0,
        grand_total: global.amount,
        subtotal_row: None,
        grand_total_row: Some(global.row),
        start_row: global.row,
        end_row: global.row,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::classify::classify_rows;
    use crate::parser::columns::ColumnMap;
    use crate::spreadsheet::CellValue;
    use crate::spreadsheet::Grid;

    fn table(name: &str, kind: TableKind, grand_total: f64, grand_total_row: Option<usize>) -> PricingTable {
        PricingTable {
            id: name.to_lowercase(),
            name: name.to_owned(),
            kind,
            items: Vec::new(),
            alternates: Vec::new(),
            tax: None,
            bond: 0.0,
            subtotal: grand_total,
            grand_total,
            subtotal_row: None,
            grand_total_row,
            start_row: 5,
            end_row: 9,
        }
    }

    #[test]
    fn summary_vocabulary() {
        for name in ["Project Summary", "ROLLUP", "Roll-up", "Budget Recap", "Overview of costs", "Grand Total"] {
            assert!(is_summary_name(name), "{name}");
        }
        for name in ["LED Display", "Summaryless", "Recapture"] {
            assert!(!is_summary_name(name), "{name}");
        }
    }

    #[test]
    fn leading_summary_table_wins() {
        let tables = vec![
            table("Project Summary", TableKind::Summary, 500.0, Some(3)),
            table("Video", TableKind::Section, 200.0, Some(8)),
        ];
        assert_eq!(find_global_total(&tables, Some(5), &[]), Some(GlobalTotal { amount: 500.0, row: 3 }));
        let tables = vec![table("Project Summary", TableKind::Summary, 500.0, None)];
        assert_eq!(find_global_total(&tables, Some(5), &[]), None);
    }

    #[test]
    fn first_grand_total_above_sections() {
        let map = ColumnMap { label: 0, cost: 1, sell: 2, margin: 3, margin_pct: 4 };
        let grid = Grid::new(vec![
            vec![CellValue::Empty, "Cost".into(), "Selling Price".into()],
            vec!["Grand Total".into(), 700.into(), 1000.into()],
            vec!["Grand Total".into(), 70.into(), 100.into()],
            vec!["Video".into()],
            vec!["Grand Total".into(), 1.into(), 2.into()],
        ]);
        let rows = classify_rows(&grid, &map, 0);
        let tables = vec![table("Video", TableKind::Section, 2.0, Some(4))];
        assert_eq!(find_global_total(&tables, Some(3), &rows), Some(GlobalTotal { amount: 1000.0, row: 1 }));
        assert_eq!(find_global_total(&tables, None, &rows), None);
    }

    #[test]
    fn rollup_lists_section_totals() {
        let tables = vec![
            table("Video", TableKind::Section, 200.0, Some(8)),
            table("Audio", TableKind::Section, 300.0, None),
        ];
        let rollup = synthesize_rollup(&tables, &GlobalTotal { amount: 525.0, row: 1 }).unwrap();
        assert_eq!(rollup.id, ROLLUP_TABLE_ID);
        assert_eq!(rollup.kind, TableKind::Rollup);
        assert_eq!(rollup.items.len(), 2);
        assert_eq!(rollup.items[1].source_row, 9);
        assert_eq!(rollup.subtotal, 500.0);
        assert_eq!(rollup.grand_total, 525.0);

        let with_summary = vec![table("Recap", TableKind::Summary, 1.0, None)];
        assert_eq!(synthesize_rollup(&with_summary, &GlobalTotal { amount: 1.0, row: 1 }), None);
    }
}
