use crate::spreadsheet::cell::CellValue;
use serde::Deserialize;
use serde::Serialize;

static EMPTY_CELL: CellValue = CellValue::Empty;

/// Rectangular, immutable array of cell values representing one worksheet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Vec<CellValue>>", into = "Vec<Vec<CellValue>>")]
pub struct Grid {
    /// Rows padded with `CellValue::Empty` to `width`
    rows: Vec<Vec<CellValue>>,
    /// Number of columns of the widest row
    width: usize,
}

impl Grid {
    /// Creates a grid, padding short rows so every row has the same width.
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { rows, width }
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the cell at (row, col); positions outside the grid read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Returns the cells of one row, or an empty slice past the last row.
    pub fn row(&self, row: usize) -> &[CellValue] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns true if every cell is empty.
    pub fn is_blank(&self) -> bool {
        (0..self.height()).all(|row| self.is_blank_row(row))
    }

    /// Returns true if every cell of the row is empty.
    pub fn is_blank_row(&self, row: usize) -> bool {
        self.row(row).iter().all(CellValue::is_empty)
    }
}

impl From<Vec<Vec<CellValue>>> for Grid {
    fn from(rows: Vec<Vec<CellValue>>) -> Self {
        Self::new(rows)
    }
}

impl From<Grid> for Vec<Vec<CellValue>> {
    fn from(grid: Grid) -> Self {
        grid.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_pads_ragged_rows() {
        let grid = Grid::new(vec![
            vec!["a".into()],
            vec!["b".into(), 1.into(), 2.into()],
        ]);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.row(0).len(), 3);
        assert_eq!(grid.cell(0, 2), &CellValue::Empty);
    }

    #[test]
    fn grid_out_of_range_is_empty() {
        let grid = Grid::new(vec![vec![1.into()]]);
        assert_eq!(grid.cell(5, 5), &CellValue::Empty);
        assert!(grid.row(9).is_empty());
        assert!(!grid.is_blank());
        assert!(Grid::default().is_blank());
    }

    #[test]
    fn grid_from_json() {
        let grid: Grid = serde_json::from_str(r#"[["Item", 10], [null, "x", true]]"#).unwrap();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.cell(0, 1), &CellValue::Number(10.0));
        assert_eq!(grid.cell(1, 0), &CellValue::Empty);
        assert_eq!(grid.cell(1, 2), &CellValue::Bool(true));
        assert!(grid.is_blank_row(2));
    }
}
