use crate::parser::classify::ClassifiedRow;
use crate::parser::classify::RowKind;
use serde::Deserialize;
use serde::Serialize;

/// Name of the boundary holding data found above the first section header.
pub const ORPHAN_SECTION_NAME: &str = "Project Summary";

/// Contiguous row range identified as one pricing section.
///
/// All rows are 0-based worksheet rows and `end_row` is inclusive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableBoundary {
    pub name: String,
    pub start_row: usize,
    pub end_row: usize,
    /// Leading section header row, skipped during extraction
    pub header_row: Option<usize>,
    /// Grand-total row closing the main item range
    pub main_end_row: Option<usize>,
    pub alternates_start_row: Option<usize>,
    pub alternates_end_row: Option<usize>,
}

impl TableBoundary {
    /// Returns true if the row lies inside the alternates sub-range.
    pub fn in_alternates(&self, row: usize) -> bool {
        match self.alternates_start_row {
            Some(start) => row >= start && row <= self.alternates_end_row.unwrap_or(start).max(start),
            None => false,
        }
    }

    /// Returns true if the row lies inside the boundary.
    pub fn contains(&self, row: usize) -> bool {
        row >= self.start_row && row <= self.end_row
    }
}

/// Fold state: the boundary currently being grown.
#[derive(Clone, Debug)]
struct OpenBoundary {
    name: String,
    start_row: Option<usize>,
    end_row: usize,
    header_row: Option<usize>,
    main_end_row: Option<usize>,
    alternates_start_row: Option<usize>,
    alternates_end_row: Option<usize>,
}

impl OpenBoundary {
    /// Opens a boundary at a section header row.
    fn at_header(row: &ClassifiedRow) -> Self {
        Self {
            name: row.label.clone(),
            start_row: Some(row.row_index),
            end_row: row.row_index,
            header_row: Some(row.row_index),
            main_end_row: None,
            alternates_start_row: None,
            alternates_end_row: None,
        }
    }

    /// Opens a boundary that starts at the first row it absorbs.
    fn unanchored(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            start_row: None,
            end_row: 0,
            header_row: None,
            main_end_row: None,
            alternates_start_row: None,
            alternates_end_row: None,
        }
    }

    fn with_header_row(mut self, header_row: Option<usize>) -> Self {
        self.header_row = header_row;
        self
    }

    /// Grows the boundary by one row. Empty rows never extend it.
    fn absorb(mut self, row: &ClassifiedRow) -> Self {
        if row.is_empty() {
            return self;
        }
        let index = row.row_index;
        self.start_row.get_or_insert(index);
        self.end_row = index;
        let in_alternates = self.alternates_start_row.is_some();
        match row.kind {
            RowKind::AlternateHeader => {
                self.alternates_start_row.get_or_insert(index);
                self.alternates_end_row = Some(index);
            }
            RowKind::Item | RowKind::AlternateLine | RowKind::GrandTotal if in_alternates => {
                self.alternates_end_row = Some(index);
            }
            RowKind::GrandTotal => self.main_end_row = Some(index),
            _ => {}
        }
        self
    }

    fn close(self) -> Option<TableBoundary> {
        let start_row = self.start_row?;
        Some(TableBoundary {
            name: self.name,
            start_row,
            end_row: self.end_row,
            header_row: self.header_row,
            main_end_row: self.main_end_row,
            alternates_start_row: self.alternates_start_row,
            alternates_end_row: self.alternates_end_row,
        })
    }
}

/// Checks that the header at `position` really starts a section.
///
/// Within `window` worksheet rows after the header, a labelled line with a
/// numeric value must appear before any other header or grand-total row.
/// Rejects banner rows that merely look like section titles.
pub fn is_viable_section_start(rows: &[ClassifiedRow], position: usize, window: usize) -> bool {
    let Some(header) = rows.get(position) else {
        return false;
    };
    let limit = header.row_index.saturating_add(window);
    for row in rows[position + 1..].iter().take_while(|row| row.row_index <= limit) {
        if row.is_priced_line() {
            return true;
        }
        if row.is_header() || row.is_grand_total() {
            return false;
        }
    }
    false
}

/// Position (in `rows`) of the first viable section header.
pub fn first_viable_header(rows: &[ClassifiedRow], window: usize) -> Option<usize> {
    (0..rows.len()).find(|position| rows[*position].is_header() && is_viable_section_start(rows, *position, window))
}

/// Groups the data rows found above the first section header.
///
/// More than one grand total means the range holds several sub-sections: it
/// is split after each grand total so later totals cannot overwrite earlier
/// ones.
fn recover_orphans(orphans: &[ClassifiedRow]) -> Vec<TableBoundary> {
    let grand_totals = orphans.iter().filter(|row| row.is_grand_total()).count();
    if grand_totals <= 1 {
        if !orphans.iter().any(ClassifiedRow::is_data) {
            return Vec::new();
        }
        return orphans
            .iter()
            .fold(OpenBoundary::unanchored(ORPHAN_SECTION_NAME), OpenBoundary::absorb)
            .close()
            .into_iter()
            .collect();
    }

    orphans
        .split_inclusive(|row| row.is_grand_total())
        .filter(|segment| segment.iter().any(ClassifiedRow::is_data))
        .enumerate()
        .filter_map(|(index, segment)| {
            let title = segment
                .iter()
                .rev()
                .find(|row| row.is_header() || row.is_alternate_header());
            let name = match (title, index) {
                (Some(row), _) => row.label.clone(),
                (None, 0) => ORPHAN_SECTION_NAME.to_owned(),
                (None, _) => format!("{} {}", ORPHAN_SECTION_NAME, index + 1),
            };
            let header_row = title.filter(|row| row.is_header()).map(|row| row.row_index);
            segment
                .iter()
                .fold(OpenBoundary::unanchored(&name).with_header_row(header_row), OpenBoundary::absorb)
                .close()
        })
        .collect()
}

#[derive(Default)]
struct ScanState {
    closed: Vec<TableBoundary>,
    open: Option<OpenBoundary>,
}

/// Standard scan: viable headers open sections, everything else grows the
/// open one.
fn scan_sections(rows: &[ClassifiedRow], first: usize, window: usize) -> Vec<TableBoundary> {
    let state = rows
        .iter()
        .enumerate()
        .skip(first)
        .fold(ScanState::default(), |mut state, (position, row)| {
            if row.is_header() && is_viable_section_start(rows, position, window) {
                state.closed.extend(state.open.take().and_then(OpenBoundary::close));
                state.open = Some(OpenBoundary::at_header(row));
            } else if let Some(open) = state.open.take() {
                state.open = Some(open.absorb(row));
            }
            state
        });
    let mut boundaries = state.closed;
    boundaries.extend(state.open.and_then(OpenBoundary::close));
    boundaries
}

/// Groups classified rows into ordered, non-overlapping table boundaries.
///
/// Returns an empty list when no viable section header exists, which tells
/// the caller to try a corrected column map or the single-table fallback.
pub fn detect_boundaries(rows: &[ClassifiedRow], window: usize) -> Vec<TableBoundary> {
    let Some(first) = first_viable_header(rows, window) else {
        return Vec::new();
    };
    let mut boundaries = recover_orphans(&rows[..first]);
    boundaries.extend(scan_sections(rows, first, window));
    boundaries
}

/// Folds every row into one boundary named `name`.
///
/// Returns `None` if all rows are empty.
pub fn scan_single(rows: &[ClassifiedRow], name: &str) -> Option<TableBoundary> {
    rows.iter()
        .fold(OpenBoundary::unanchored(name), OpenBoundary::absorb)
        .close()
}
