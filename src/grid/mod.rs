//! Read-only view over the first sheet of a workbook.
//!
//! Rows may be shorter than their neighbours and may be empty altogether, so
//! every accessor here is bounds checked and returns `Option`.

pub mod xlsx;

pub use xlsx::{read_workbook, read_workbook_from_reader};

/// A single cell: its displayed text and the opaque identifier of its fill.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub value: String,
    /// Empty when the cell has no fill.
    pub fill_color: String,
}

impl Cell {
    pub fn new(value: impl Into<String>, fill_color: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            fill_color: fill_color.into(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(value, "")
    }

    pub fn is_filled(&self) -> bool {
        !self.fill_color.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn cell(&self, column: usize) -> Option<&Cell> {
        self.cells.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Text of the first cell, `None` for a row without cells.
    pub fn label(&self) -> Option<&str> {
        self.cells.first().map(|cell| cell.value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Row>,
    /// Numeric dates are counted from 1904-01-01 instead of 1899-12-30.
    date1904: bool,
}

impl Grid {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            date1904: false,
        }
    }

    pub fn with_date1904(mut self, date1904: bool) -> Self {
        self.date1904 = date1904;
        self
    }

    pub fn date1904(&self) -> bool {
        self.date1904
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.row(row).and_then(|r| r.cell(column))
    }

    /// First-cell text of `row`; `None` when the row is missing or has no cells.
    pub fn label(&self, row: usize) -> Option<&str> {
        self.row(row).and_then(Row::label)
    }

    /// Fill colour of a cell, empty when the cell is missing or unfilled.
    pub fn fill_color(&self, row: usize, column: usize) -> &str {
        self.cell(row, column)
            .map(|cell| cell.fill_color.as_str())
            .unwrap_or("")
    }
}
