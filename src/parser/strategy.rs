use crate::document::ParseStrategy;
use crate::parser::boundary::detect_boundaries;
use crate::parser::boundary::first_viable_header;
use crate::parser::boundary::scan_single;
use crate::parser::boundary::TableBoundary;
use crate::parser::classify::classify_rows;
use crate::parser::classify::ClassifiedRow;
use crate::parser::columns::ColumnLocation;
use crate::parser::columns::ColumnMap;
use crate::parser::shift::resolve_column_shift;
use crate::parser::shift::ColumnShift;
use crate::spreadsheet::Grid;

/// Strategies tried in lenient mode, in order.
const LENIENT_CASCADE: [ParseStrategy; 3] = [
    ParseStrategy::Standard,
    ParseStrategy::ColumnShift,
    ParseStrategy::SingleTable,
];

/// Strict mode refuses best-effort fallbacks.
const STRICT_CASCADE: [ParseStrategy; 1] = [ParseStrategy::Standard];

/// Worksheet a strategy runs against.
#[derive(Copy, Clone, Debug)]
pub struct SheetContext<'a> {
    pub grid: &'a Grid,
    pub sheet_name: &'a str,
    pub location: ColumnLocation,
    pub viability_window: usize,
}

/// Boundaries produced by the first successful strategy.
#[derive(Clone, Debug)]
pub struct StrategyOutcome {
    pub strategy: ParseStrategy,
    /// Column map the rows were classified with
    pub map: ColumnMap,
    pub rows: Vec<ClassifiedRow>,
    pub boundaries: Vec<TableBoundary>,
    pub shift: Option<ColumnShift>,
    /// Start row of the first section found by header scanning
    pub section_start: Option<usize>,
}

impl ParseStrategy {
    /// Runs this strategy, returning `None` if it finds no section.
    pub fn attempt(&self, context: &SheetContext) -> Option<StrategyOutcome> {
        let header_row = context.location.header_row;
        let baseline = context.location.map;
        match self {
            Self::Standard => sectioned(context, baseline, None, *self),
            Self::ColumnShift => {
                let shift = resolve_column_shift(context.grid, &baseline, header_row)?;
                sectioned(context, shift.map, Some(shift), *self)
            }
            Self::SingleTable => {
                let shift = resolve_column_shift(context.grid, &baseline, header_row);
                let map = shift.map(|shift| shift.map).unwrap_or(baseline);
                let rows = classify_rows(context.grid, &map, header_row);
                if !rows.iter().any(ClassifiedRow::is_data) {
                    return None;
                }
                let boundary = scan_single(&rows, context.sheet_name)?;
                Some(StrategyOutcome {
                    strategy: *self,
                    map,
                    rows,
                    boundaries: vec![boundary],
                    shift,
                    section_start: None,
                })
            }
        }
    }
}

/// Header-driven section detection with the given column map.
fn sectioned(
    context: &SheetContext,
    map: ColumnMap,
    shift: Option<ColumnShift>,
    strategy: ParseStrategy,
) -> Option<StrategyOutcome> {
    let rows = classify_rows(context.grid, &map, context.location.header_row);
    let boundaries = detect_boundaries(&rows, context.viability_window);
    if boundaries.is_empty() {
        return None;
    }
    let section_start = first_viable_header(&rows, context.viability_window).map(|position| rows[position].row_index);
    Some(StrategyOutcome {
        strategy,
        map,
        rows,
        boundaries,
        shift,
        section_start,
    })
}

/// Tries each strategy in order and returns the first that finds sections.
pub fn run_cascade(context: &SheetContext, strict: bool) -> Option<StrategyOutcome> {
    let cascade: &[ParseStrategy] = if strict { &STRICT_CASCADE } else { &LENIENT_CASCADE };
    cascade.iter().find_map(|strategy| {
        let outcome = strategy.attempt(context);
        log::debug!("Strategy {} {}", strategy.as_str(), if outcome.is_some() { "succeeded" } else { "found no sections" });
        outcome
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::columns::locate_columns;
    use crate::spreadsheet::CellValue;

    fn context(grid: &Grid) -> SheetContext<'_> {
        SheetContext {
            grid,
            sheet_name: "Pricing",
            location: locate_columns(grid, 40).unwrap(),
            viability_window: 40,
        }
    }

    #[test]
    fn standard_strategy_wins_when_sections_exist() {
        let grid = Grid::new(vec![
            vec![CellValue::Empty, "Cost".into(), "Selling Price".into()],
            vec!["Video".into()],
            vec!["Display".into(), 1.into(), 2.into()],
        ]);
        let outcome = run_cascade(&context(&grid), false).unwrap();
        assert_eq!(outcome.strategy, ParseStrategy::Standard);
        assert_eq!(outcome.section_start, Some(1));
    }

    #[test]
    fn headerless_sheet_falls_back_to_single_table() {
        let grid = Grid::new(vec![
            vec![CellValue::Empty, "Cost".into(), "Selling Price".into()],
            vec!["Display".into(), 1.into(), 2.into()],
            vec!["Total".into(), 1.into(), 2.into()],
        ]);
        assert!(run_cascade(&context(&grid), true).is_none());
        let outcome = run_cascade(&context(&grid), false).unwrap();
        assert_eq!(outcome.strategy, ParseStrategy::SingleTable);
        assert_eq!(outcome.boundaries[0].name, "Pricing");
        assert_eq!(outcome.section_start, None);
    }

    #[test]
    fn shifted_columns_are_realigned() {
        // Titles sit one column left of the data they describe.
        let grid = Grid::new(vec![
            vec!["Cost".into(), "Selling Price".into(), CellValue::Empty, CellValue::Empty, CellValue::Empty],
            vec![CellValue::Empty, "Video".into(), CellValue::Empty, CellValue::Empty, CellValue::Empty],
            vec![1.into(), "Display".into(), 10.into(), 20.into(), CellValue::Empty],
            vec![2.into(), "Mount".into(), 5.into(), 8.into(), CellValue::Empty],
        ]);
        let outcome = run_cascade(&context(&grid), false).unwrap();
        assert_eq!(outcome.strategy, ParseStrategy::ColumnShift);
        assert_eq!(outcome.shift.map(|shift| shift.offset), Some(1));
        assert_eq!(outcome.boundaries[0].name, "Video");
    }

    #[test]
    fn blank_data_finds_nothing() {
        let grid = Grid::new(vec![vec![CellValue::Empty, "Cost".into(), "Selling Price".into()], vec![]]);
        assert!(run_cascade(&context(&grid), false).is_none());
    }
}
