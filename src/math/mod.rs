//! # Pricing Math Engine
//!
//! Recomputes the totals a rendered document displays, independently of the
//! parser. Every value is rounded to display precision before it is summed, so
//! a displayed grand total always equals the sum of its displayed parts.
//!
//! Overrides are keyed `"{table_id}:{item_index}"` where `item_index` indexes
//! [`PricingTable::items`]. Input tables are never mutated, so the same
//! document can be rendered concurrently with different override maps.
use crate::document::PricingDocument;
use crate::document::PricingTable;
use crate::document::TableKind;
use serde::Serialize;
use std::collections::HashMap;

/// Price overrides keyed by [`override_key`].
pub type PriceOverrides = HashMap<String, f64>;

/// Description overrides keyed by [`override_key`].
pub type DescriptionOverrides = HashMap<String, String>;

/// Absorbs binary representation error before rounding (1.005 is stored as
/// 1.00499999999999989...).
const ROUNDING_NUDGE: f64 = 1e-9;

/// Builds the override key of an item.
pub fn override_key(table_id: &str, item_index: usize) -> String {
    format!("{}:{}", table_id, item_index)
}

/// Rounds to cents, halves away from zero.
pub fn round_display(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scaled = value * 100.0;
    (scaled + scaled.signum() * ROUNDING_NUDGE).round() / 100.0
}

/// One line as displayed.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedItem {
    /// Index into the source table's items
    pub index: usize,
    pub description: String,
    /// Rounded price
    pub price: f64,
    pub text_value: Option<String>,
    pub is_included: bool,
    pub is_excluded: bool,
}

/// Displayed lines and totals of one table.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedTableTotals {
    pub table_id: String,
    pub items: Vec<RenderedItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub bond: f64,
    pub grand_total: f64,
}

/// Recomputes the displayed lines and totals of a table.
///
/// The grand total is the plain sum of the already rounded subtotal, tax and
/// bond. Items whose rounded price is zero are dropped unless they carry a text
/// value or are excluded. Tax is re-derived from the original tax-to-subtotal
/// ratio so tax-exempt lines baked into the original amount stay exempt.
pub fn compute_table_totals(
    table: &PricingTable,
    price_overrides: &PriceOverrides,
    description_overrides: &DescriptionOverrides,
) -> RenderedTableTotals {
    let items: Vec<RenderedItem> = table
        .items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let key = override_key(&table.id, index);
            let description = description_overrides
                .get(&key)
                .cloned()
                .unwrap_or_else(|| item.description.clone());
            let mut rendered = RenderedItem {
                index,
                description,
                price: round_display(item.selling_price),
                text_value: item.text_value.clone(),
                is_included: item.is_included,
                is_excluded: item.is_excluded,
            };
            if let Some(price) = price_overrides.get(&key) {
                rendered.price = round_display(*price);
                // A real price replaces an Included/free-text marker.
                if rendered.price != 0.0 && !rendered.is_excluded {
                    rendered.is_included = false;
                    rendered.text_value = None;
                }
            }
            rendered
        })
        .filter(|item| item.price != 0.0 || item.text_value.is_some() || item.is_excluded)
        .collect();

    let subtotal = round_display(
        items
            .iter()
            .filter(|item| !item.is_included && !item.is_excluded)
            .map(|item| item.price)
            .sum(),
    );
    let tax = match table.tax_amount() {
        amount if table.subtotal != 0.0 => round_display(subtotal * amount / table.subtotal),
        amount => round_display(amount),
    };
    let bond = round_display(table.bond);
    RenderedTableTotals {
        table_id: table.id.clone(),
        items,
        subtotal,
        tax,
        bond,
        grand_total: subtotal + tax + bond,
    }
}

/// Sums the rendered grand totals of the priced sections of a table list.
/// Summary and roll-up tables repeat section totals and are skipped.
pub fn compute_tables_total(
    tables: &[PricingTable],
    price_overrides: &PriceOverrides,
    description_overrides: &DescriptionOverrides,
) -> f64 {
    round_display(
        tables
            .iter()
            .filter(|table| table.kind == TableKind::Section)
            .map(|table| compute_table_totals(table, price_overrides, description_overrides).grand_total)
            .sum(),
    )
}

/// Document-level total as displayed.
///
/// An explicit total read from the workbook is trusted verbatim over the sum
/// of table totals; reviewers compare against the original spreadsheet.
pub fn compute_document_total(
    document: &PricingDocument,
    price_overrides: &PriceOverrides,
    description_overrides: &DescriptionOverrides,
) -> f64 {
    if document.metadata.has_explicit_total {
        round_display(document.document_total)
    } else {
        compute_tables_total(&document.tables, price_overrides, description_overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentMetadata;
    use crate::document::ParseStrategy;
    use crate::document::PricingLineItem;
    use crate::document::TaxInfo;
    use pretty_assertions::assert_eq;

    fn item(description: &str, price: f64, text: Option<&str>) -> PricingLineItem {
        PricingLineItem {
            description: description.to_owned(),
            selling_price: price,
            is_included: text == Some("Included") || (text.is_none() && price == 0.0),
            is_excluded: text == Some("Excluded"),
            text_value: text.map(str::to_owned),
            source_row: 0,
        }
    }

    fn table(id: &str, kind: TableKind, items: Vec<PricingLineItem>, tax: f64, bond: f64) -> PricingTable {
        let subtotal = items.iter().filter(|item| !item.is_included && !item.is_excluded).map(|item| item.selling_price).sum();
        PricingTable {
            id: id.to_owned(),
            name: id.to_owned(),
            kind,
            items,
            alternates: Vec::new(),
            tax: (tax != 0.0).then(|| TaxInfo { label: "Tax".to_owned(), rate: 0.0, amount: tax }),
            bond,
            subtotal,
            grand_total: subtotal + tax + bond,
            subtotal_row: None,
            grand_total_row: None,
            start_row: 0,
            end_row: 0,
        }
    }

    fn document(tables: Vec<PricingTable>, total: f64, explicit: bool) -> PricingDocument {
        PricingDocument {
            file_name: "bid.xlsx".to_owned(),
            sheet_name: "Pricing".to_owned(),
            currency: "USD".to_owned(),
            metadata: DocumentMetadata {
                table_count: tables.len(),
                item_count: 0,
                alternate_count: 0,
                has_explicit_total: explicit,
                strategy: ParseStrategy::Standard,
                warnings: Vec::new(),
                validation: None,
            },
            tables,
            document_total: total,
        }
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_display(1.005), 1.01);
        assert_eq!(round_display(2.675), 2.68);
        assert_eq!(round_display(-1.005), -1.01);
        assert_eq!(round_display(10.0), 10.0);
        assert_eq!(round_display(0.004), 0.0);
    }

    #[test]
    fn rounds_each_item_before_summing() {
        let table = table("video-0", TableKind::Section, vec![item("A", 0.005, None), item("B", 0.005, None)], 0.0, 0.0);
        let totals = compute_table_totals(&table, &PriceOverrides::new(), &DescriptionOverrides::new());
        assert_eq!(totals.subtotal, 0.02);
        assert_eq!(totals.grand_total, 0.02);
    }

    #[test]
    fn zero_rows_are_dropped_unless_marked() {
        let table = table(
            "video-0",
            TableKind::Section,
            vec![
                item("Display", 100.0, None),
                item("Warranty", 0.0, None),
                item("Training", 0.0, Some("Included")),
                item("Permits", 0.0, Some("Excluded")),
                item("Electrical", 0.0, Some("By Owner")),
            ],
            0.0,
            0.0,
        );
        let totals = compute_table_totals(&table, &PriceOverrides::new(), &DescriptionOverrides::new());
        let shown: Vec<&str> = totals.items.iter().map(|item| item.description.as_str()).collect();
        assert_eq!(shown, vec!["Display", "Training", "Permits", "Electrical"]);
        assert_eq!(totals.subtotal, 100.0);
    }

    #[test]
    fn tax_follows_original_ratio() {
        let table = table("audio-1", TableKind::Section, vec![item("Speakers", 1000.0, None)], 82.5, 10.0);
        let overrides = PriceOverrides::from([(override_key("audio-1", 0), 2000.0)]);
        let totals = compute_table_totals(&table, &overrides, &DescriptionOverrides::new());
        assert_eq!(totals.subtotal, 2000.0);
        assert_eq!(totals.tax, 165.0);
        assert_eq!(totals.bond, 10.0);
        assert_eq!(totals.grand_total, 2175.0);
    }

    #[test]
    fn ten_million_totals_add_up_exactly() {
        let table = table("stadium-0", TableKind::Section, vec![item("Scoreboard", 12_345_678.01, None)], 1_018_518.51, 37.04);
        for cents in 0..100 {
            let price = 12_345_678.0 + cents as f64 / 100.0;
            let overrides = PriceOverrides::from([(override_key("stadium-0", 0), price)]);
            let totals = compute_table_totals(&table, &overrides, &DescriptionOverrides::new());
            let parts = totals.subtotal + totals.tax + totals.bond;
            assert!((totals.grand_total - parts).abs() < 1e-9, "{} vs {}", totals.grand_total, parts);
        }
    }

    #[test]
    fn tax_without_subtotal_is_kept() {
        let table = table("fees-0", TableKind::Section, Vec::new(), 12.345, 0.0);
        let totals = compute_table_totals(&table, &PriceOverrides::new(), &DescriptionOverrides::new());
        assert_eq!(totals.tax, 12.35);
        assert_eq!(totals.grand_total, 12.35);
    }

    #[test]
    fn overrides_replace_prices_and_descriptions() {
        let table = table("video-0", TableKind::Section, vec![item("Training", 0.0, Some("Included"))], 0.0, 0.0);
        let prices = PriceOverrides::from([(override_key("video-0", 0), 250.0)]);
        let descriptions = DescriptionOverrides::from([(override_key("video-0", 0), "On-site training".to_owned())]);
        let totals = compute_table_totals(&table, &prices, &descriptions);
        assert_eq!(totals.items[0].description, "On-site training");
        assert_eq!(totals.items[0].text_value, None);
        assert!(!totals.items[0].is_included);
        assert_eq!(totals.grand_total, 250.0);
    }

    #[test]
    fn explicit_document_total_is_trusted() {
        let tables = vec![
            table("summary-0", TableKind::Summary, vec![item("Video", 100.0, None)], 0.0, 0.0),
            table("video-1", TableKind::Section, vec![item("Display", 100.0, None)], 0.0, 0.0),
            table("audio-2", TableKind::Section, vec![item("Speakers", 50.0, None)], 0.0, 0.0),
        ];
        let no_overrides = (PriceOverrides::new(), DescriptionOverrides::new());
        assert_eq!(compute_document_total(&document(tables.clone(), 999.999, true), &no_overrides.0, &no_overrides.1), 1000.0);
        assert_eq!(compute_document_total(&document(tables.clone(), 999.999, false), &no_overrides.0, &no_overrides.1), 150.0);
        assert_eq!(compute_tables_total(&tables, &no_overrides.0, &no_overrides.1), 150.0);
    }
}
