use crate::parser::columns::ColumnMap;
use crate::spreadsheet::cell::parse_number;
use crate::spreadsheet::Grid;
use serde::Deserialize;
use serde::Serialize;

/// Offsets tried against the baseline map, in tie-break order.
pub const SHIFT_OFFSETS: [isize; 5] = [0, -1, 1, -2, 2];

const TEXT_LABEL_SCORE: i64 = 5;
const NUMERIC_PRICE_SCORE: i64 = 1;
const NUMERIC_LABEL_PENALTY: i64 = -2;

/// Column map correction chosen by the resolver.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnShift {
    /// Columns moved relative to the located map
    pub offset: isize,
    pub map: ColumnMap,
    pub score: i64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct ShiftScore {
    score: i64,
    /// At least one row has a text label and a numeric price
    has_priced_text: bool,
}

fn score_shift(grid: &Grid, map: &ColumnMap, header_row: usize) -> ShiftScore {
    (header_row + 1..grid.height()).fold(
        ShiftScore { score: 0, has_priced_text: false },
        |mut total, row| {
            let label = grid.cell(row, map.label);
            let text_label = label.is_free_text();
            let priced = parse_number(grid.cell(row, map.cost)).is_some()
                || parse_number(grid.cell(row, map.sell)).is_some();
            if text_label {
                total.score += TEXT_LABEL_SCORE;
            }
            if priced {
                total.score += NUMERIC_PRICE_SCORE;
            }
            if parse_number(label).is_some() {
                total.score += NUMERIC_LABEL_PENALTY;
            }
            total.has_priced_text |= text_label && priced;
            total
        },
    )
}

/// Label, cost and selling price must fall inside the grid; margin columns
/// are optional and may not exist.
fn within_grid(map: &ColumnMap, grid: &Grid) -> bool {
    map.label.max(map.cost).max(map.sell) < grid.width()
}

/// Re-scores column alignment around `baseline`.
///
/// Returns the best non-degenerate shift, or `None` when no candidate has a
/// text-labelled priced row or when the baseline itself scores best.
pub fn resolve_column_shift(grid: &Grid, baseline: &ColumnMap, header_row: usize) -> Option<ColumnShift> {
    let mut best: Option<ColumnShift> = None;
    for offset in SHIFT_OFFSETS {
        let Some(map) = baseline.shifted(offset).filter(|map| within_grid(map, grid)) else {
            continue;
        };
        let candidate = score_shift(grid, &map, header_row);
        if !candidate.has_priced_text {
            continue;
        }
        if best.map_or(true, |best| candidate.score > best.score) {
            best = Some(ColumnShift { offset, map, score: candidate.score });
        }
    }
    log::debug!("Column shift scores resolved to {:?}", best);
    best.filter(|shift| shift.offset != 0)
}
