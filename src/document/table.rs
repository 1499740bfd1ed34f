use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

/// One priced (or explicitly unpriced) line of a pricing table.
///
/// `is_included` means the line counts as zero toward the subtotal, whatever
/// `selling_price` holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingLineItem {
    pub description: String,
    pub selling_price: f64,
    pub is_included: bool,
    pub is_excluded: bool,
    /// Literal text shown instead of a price ("Included", "By Owner")
    pub text_value: Option<String>,
    /// 0-based worksheet row
    pub source_row: usize,
}

/// Optional cost addition (positive) or deduction (negative).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternateItem {
    pub description: String,
    pub price_difference: f64,
    pub source_row: usize,
}

/// Tax line of a table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxInfo {
    pub label: String,
    /// Fraction in 0..1, whatever form the sheet used
    pub rate: f64,
    pub amount: f64,
}

/// Role of a table within the document.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// A priced section of the worksheet
    Section,
    /// A summary section detected in the worksheet
    Summary,
    /// A summary synthesized from section totals
    Rollup,
}

/// A pricing section with its computed totals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingTable {
    /// Stable identifier, `slug(name)-position`
    pub id: String,
    pub name: String,
    pub kind: TableKind,
    pub items: Vec<PricingLineItem>,
    pub alternates: Vec<AlternateItem>,
    pub tax: Option<TaxInfo>,
    pub bond: f64,
    pub subtotal: f64,
    pub grand_total: f64,
    /// Row the subtotal was read from, if not computed
    pub subtotal_row: Option<usize>,
    /// Row the grand total was read from, if not computed
    pub grand_total_row: Option<usize>,
    pub start_row: usize,
    pub end_row: usize,
}

impl PricingTable {
    /// Tax amount, zero when the table has no tax line.
    pub fn tax_amount(&self) -> f64 {
        self.tax.as_ref().map(|tax| tax.amount).unwrap_or(0.0)
    }
}

/// Builds the stable identifier of a table from its name and position.
pub fn table_id(name: &str, position: usize) -> String {
    static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("Hardcode regex pattern"));
    let lowered = name.to_lowercase();
    let slug = NON_ALPHANUMERIC.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        format!("table-{}", position)
    } else {
        format!("{}-{}", slug, position)
    }
}
