use crate::document::table::table_id;
use crate::document::AlternateItem;
use crate::document::PricingLineItem;
use crate::document::PricingTable;
use crate::document::TableKind;
use crate::document::TaxInfo;
use crate::parser::boundary::TableBoundary;
use crate::parser::classify::is_explicit_subtotal;
use crate::parser::classify::ClassifiedRow;
use crate::parser::classify::RowKind;
use crate::parser::columns::ColumnMap;
use crate::parser::rollup::is_summary_name;
use crate::spreadsheet::cell::TextOverride;
use crate::spreadsheet::Grid;
use crate::validation::IssueCode;
use crate::validation::ValidationIssue;
use once_cell::sync::Lazy;
use regex::Regex;

/// Two amounts closer than this are the same displayed value.
const CENT_TOLERANCE: f64 = 0.005;

static PERCENT_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("Hardcode regex pattern"));
static FRACTION_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|[\s@(])(0\.\d+)\b").expect("Hardcode regex pattern"));

/// A table extracted from one boundary, with the issues met on the way.
#[derive(Clone, Debug, PartialEq)]
pub struct Extraction {
    pub table: PricingTable,
    pub issues: Vec<ValidationIssue>,
}

/// Tax line being accumulated; label and rate come from the first tax row.
#[derive(Clone, Debug)]
struct TaxAccumulator {
    label: String,
    rate: Option<f64>,
    amount: f64,
}

#[derive(Default)]
struct TableAccumulator {
    items: Vec<PricingLineItem>,
    alternates: Vec<AlternateItem>,
    subtotal: Option<(f64, usize)>,
    tax: Option<TaxAccumulator>,
    bond: f64,
    grand_total: Option<(f64, usize)>,
    issues: Vec<ValidationIssue>,
}

/// Reads a tax rate from a literal `%` or `0.` token in any cell of the row
/// other than the cost and selling-price cells.
fn tax_rate_token(grid: &Grid, map: &ColumnMap, row: usize) -> Option<f64> {
    grid.row(row)
        .iter()
        .enumerate()
        .filter(|(col, _)| *col != map.cost && *col != map.sell)
        .find_map(|(_, cell)| {
            let text = cell.to_string();
            if let Some(captures) = PERCENT_TOKEN.captures(&text) {
                return captures[1].parse::<f64>().ok().map(|value| value / 100.0);
            }
            FRACTION_TOKEN
                .captures(&text)
                .and_then(|captures| captures[1].parse::<f64>().ok())
        })
        .map(|rate| if rate > 1.0 { rate / 100.0 } else { rate })
}

fn line_item(row: &ClassifiedRow) -> PricingLineItem {
    let selling_price = row.sell.unwrap_or(0.0);
    let (is_included, is_excluded, text_value) = match &row.text_override {
        Some(TextOverride::Included) => (true, false, Some(TextOverride::Included.as_text().to_owned())),
        Some(TextOverride::Excluded) => (false, true, Some(TextOverride::Excluded.as_text().to_owned())),
        Some(TextOverride::Text(text)) => (false, false, Some(text.to_owned())),
        None => (selling_price == 0.0, false, None),
    };
    PricingLineItem {
        description: row.label.clone(),
        selling_price,
        is_included,
        is_excluded,
        text_value,
        source_row: row.row_index,
    }
}

fn descriptive_item(row: &ClassifiedRow) -> PricingLineItem {
    PricingLineItem {
        description: row.label.clone(),
        selling_price: 0.0,
        is_included: false,
        is_excluded: false,
        text_value: None,
        source_row: row.row_index,
    }
}

fn alternate_item(row: &ClassifiedRow) -> AlternateItem {
    AlternateItem {
        description: row.label.clone(),
        price_difference: row.sell.unwrap_or(0.0),
        source_row: row.row_index,
    }
}

/// Converts one boundary into a fully populated pricing table.
///
/// # Arguments
///
/// * `boundary` - Row range of the section
/// * `rows` - Classified rows of the worksheet
/// * `position` - Index of the table among the real tables, used in its id
/// * `grid` - Worksheet cells, read for tax rate tokens
/// * `map` - Column map the rows were classified with
/// * `leading` - Whether the boundary opens the sheet or sits above the first
///   section header. Only such a boundary may be a summary.
pub fn extract_table(
    boundary: &TableBoundary,
    rows: &[ClassifiedRow],
    position: usize,
    grid: &Grid,
    map: &ColumnMap,
    leading: bool,
) -> Extraction {
    let id = table_id(&boundary.name, position);
    let in_main_range = |row: usize| boundary.main_end_row.map_or(true, |end| row <= end);

    let mut acc = TableAccumulator::default();
    for row in rows
        .iter()
        .filter(|row| boundary.contains(row.row_index) && Some(row.row_index) != boundary.header_row)
    {
        let index = row.row_index;
        let in_alternates = boundary.in_alternates(index);
        match row.kind {
            RowKind::Empty | RowKind::AlternateHeader => {}
            // Sub-headings below the alternates header belong to the alternates
            RowKind::Header if boundary.alternates_start_row.map_or(false, |start| index > start) => {}
            RowKind::Header => acc.items.push(descriptive_item(row)),
            RowKind::Subtotal => {
                let seeds = row.label_norm.is_empty() || is_explicit_subtotal(&row.label_norm);
                if seeds && !in_alternates && in_main_range(index) {
                    // Last seed wins
                    acc.subtotal = row.amount().map(|amount| (amount, index)).or(acc.subtotal);
                }
            }
            RowKind::Tax => {
                let amount = row.amount().unwrap_or(0.0);
                match acc.tax.as_mut() {
                    Some(tax) => tax.amount += amount,
                    None => {
                        acc.tax = Some(TaxAccumulator {
                            label: row.label.clone(),
                            rate: tax_rate_token(grid, map, index),
                            amount,
                        })
                    }
                }
            }
            RowKind::Bond => acc.bond += row.amount().unwrap_or(0.0),
            RowKind::GrandTotal => {
                if !in_alternates {
                    acc.grand_total = row.amount().map(|amount| (amount, index)).or(acc.grand_total);
                }
            }
            RowKind::AlternateLine => acc.alternates.push(alternate_item(row)),
            RowKind::Item if in_alternates => acc.alternates.push(alternate_item(row)),
            RowKind::Item => {
                if !in_main_range(index) {
                    acc.issues.push(
                        ValidationIssue::new(
                            IssueCode::ItemAfterGrandTotal,
                            format!("'{}' follows the grand total of '{}'", row.label, boundary.name),
                        )
                        .at_row(index)
                        .in_table(&id),
                    );
                }
                acc.items.push(line_item(row));
            }
        }
    }

    let (subtotal, subtotal_row) = match acc.subtotal {
        Some((amount, row)) => (amount, Some(row)),
        None => (
            acc.items
                .iter()
                .filter(|item| !item.is_included && !item.is_excluded)
                .map(|item| item.selling_price)
                .sum(),
            None,
        ),
    };
    let tax = acc.tax.map(|tax| TaxInfo {
        rate: tax.rate.unwrap_or(if subtotal != 0.0 { tax.amount / subtotal } else { 0.0 }),
        label: tax.label,
        amount: tax.amount,
    });
    let tax_amount = tax.as_ref().map(|tax| tax.amount).unwrap_or(0.0);
    let bond = acc.bond;
    let computed_total = subtotal + tax_amount + bond;
    let (grand_total, grand_total_row) = match acc.grand_total {
        Some((amount, row)) if (amount - subtotal).abs() < CENT_TOLERANCE && (tax_amount != 0.0 || bond != 0.0) => {
            acc.issues.push(
                ValidationIssue::new(
                    IssueCode::MislabeledGrandTotal,
                    format!("Grand total {} of '{}' equals its subtotal; recomputed as {}", amount, boundary.name, computed_total),
                )
                .at_row(row)
                .in_table(&id),
            );
            (computed_total, None)
        }
        Some((amount, row)) => (amount, Some(row)),
        None => (computed_total, None),
    };

    let kind = if leading && is_summary_name(&boundary.name) {
        TableKind::Summary
    } else {
        TableKind::Section
    };
    Extraction {
        table: PricingTable {
            id,
            name: boundary.name.clone(),
            kind,
            items: acc.items,
            alternates: acc.alternates,
            tax,
            bond,
            subtotal,
            grand_total,
            subtotal_row,
            grand_total_row,
            start_row: boundary.start_row,
            end_row: boundary.end_row,
        },
        issues: acc.issues,
    }
}
