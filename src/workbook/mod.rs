//! In-memory workbook model consumed by the import engine.
//!
//! The engine never talks to a file format directly. It reads a [`Workbook`] of [`Sheet`]s, each a
//! sparse list of [`Row`]s of typed [`Cell`]s, and resolves formula cells through a
//! [`FormulaEvaluator`]. With the `excel` feature, [`excel`] builds a `Workbook` from real files.
//!
//! Workbooks can also be assembled by hand, which is how most tests drive the engine:
//!
//! ```rust
//! use sheet_import::workbook::{Cell, Sheet, Workbook};
//!
//! let wb = Workbook::new(vec![
//!     Sheet::new("People")
//!         .with_row(vec![Cell::from("id"), Cell::from("name")])
//!         .with_row(vec![Cell::from(1.0), Cell::from("Ada")]),
//! ]);
//! assert_eq!(wb.sheet_count(), 1);
//! assert_eq!(wb.sheet(0).unwrap().rows()[1].row_no, 1);
//! ```

#[cfg(feature = "excel")]
pub mod excel;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use thiserror::Error;

/// Result of evaluating a formula.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluatedValue {
    Blank,
    Numeric(f64),
    String(String),
    Boolean(bool),
    /// A spreadsheet error value such as `#DIV/0!`.
    Error(String),
}

impl EvaluatedValue {
    /// Display projection of the value.
    pub fn formatted(&self) -> String {
        match self {
            Self::Blank => String::new(),
            Self::Numeric(n) => format_number(*n),
            Self::String(s) => s.clone(),
            Self::Boolean(b) => format_bool(*b),
            Self::Error(e) => e.clone(),
        }
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Blank,
    /// A number. `date` is set when the reader knows the cell is formatted as a date/time.
    Numeric { value: f64, date: bool },
    String(String),
    Boolean(bool),
    /// A formula together with the value the reader cached for it (if any).
    Formula { formula: String, cached: EvaluatedValue },
}

impl Cell {
    /// A plain number.
    pub fn number(value: f64) -> Self {
        Self::Numeric { value, date: false }
    }

    /// A spreadsheet date serial (days since 1899-12-30, fraction = time of day).
    pub fn date_serial(value: f64) -> Self {
        Self::Numeric { value, date: true }
    }

    /// A date/time value, stored as its serial.
    pub fn date_time(value: NaiveDateTime) -> Self {
        Self::date_serial(date_time_to_serial(value))
    }

    pub fn formula(formula: impl Into<String>, cached: EvaluatedValue) -> Self {
        Self::Formula {
            formula: formula.into(),
            cached,
        }
    }

    /// Display projection of the cell, without evaluating formulas.
    ///
    /// Whole numbers print without a fractional part, booleans as `TRUE`/`FALSE`, date cells in
    /// ISO-8601 and formula cells as their cached value.
    pub fn formatted(&self) -> String {
        match self {
            Self::Blank => String::new(),
            Self::Numeric { value, date: true } => {
                serial_to_date_time(*value).map_or_else(|| format_number(*value), format_date_time)
            }
            Self::Numeric { value, date: false } => format_number(*value),
            Self::String(s) => s.clone(),
            Self::Boolean(b) => format_bool(*b),
            Self::Formula { cached, .. } => cached.formatted(),
        }
    }

    /// `true` for blank cells and cells whose text is empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Blank => true,
            Self::String(s) => s.is_empty(),
            Self::Formula { formula, .. } => formula.is_empty(),
            Self::Numeric { .. } | Self::Boolean(_) => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Self::number(value as f64)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// A physical row. Cells are indexed by zero-based column; missing trailing cells are absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Zero-based row index inside the sheet.
    pub row_no: usize,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(row_no: usize, cells: Vec<Cell>) -> Self {
        Self { row_no, cells }
    }

    /// The cell at `column`, or `None` when the row does not reach that column.
    pub fn cell(&self, column: usize) -> Option<&Cell> {
        self.cells.get(column)
    }

    /// `true` when every cell is blank or empty.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }
}

/// A named sheet with its rows in ascending `row_no` order.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    index: usize,
    rows: Vec<Row>,
}

impl Sheet {
    /// Create an empty sheet. Its index is assigned when it is added to a [`Workbook`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: 0,
            rows: Vec::new(),
        }
    }

    /// Append a row directly below the last one.
    pub fn with_row(mut self, cells: Vec<Cell>) -> Self {
        let row_no = self.rows.last().map_or(0, |r| r.row_no + 1);
        self.rows.push(Row::new(row_no, cells));
        self
    }

    /// Append a row at an explicit row index, leaving a gap of physically absent rows.
    ///
    /// # Panics
    ///
    /// Panics if `row_no` does not come after the current last row.
    pub fn with_row_at(mut self, row_no: usize, cells: Vec<Cell>) -> Self {
        if let Some(last) = self.rows.last() {
            assert!(row_no > last.row_no, "rows must be added in ascending order");
        }
        self.rows.push(Row::new(row_no, cells));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zero-based position of the sheet in its workbook.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}

/// An ordered collection of sheets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    /// Build a workbook; sheet indices follow the given order.
    pub fn new(sheets: Vec<Sheet>) -> Self {
        let mut wb = Self::default();
        for sheet in sheets {
            wb.push_sheet(sheet);
        }
        wb
    }

    pub fn push_sheet(&mut self, mut sheet: Sheet) {
        sheet.index = self.sheets.len();
        self.sheets.push(sheet);
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }
}

/// Location and content of a formula cell handed to a [`FormulaEvaluator`].
#[derive(Debug, Clone, Copy)]
pub struct FormulaCell<'a> {
    pub sheet: &'a Sheet,
    pub row_no: usize,
    pub column: usize,
    pub formula: &'a str,
    pub cached: &'a EvaluatedValue,
}

/// Failure to evaluate a formula.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("formula '{formula}' could not be evaluated: {message}")]
pub struct EvaluationError {
    pub formula: String,
    pub message: String,
}

/// Resolves formula cells to values.
pub trait FormulaEvaluator: Send + Sync {
    fn evaluate(&self, cell: FormulaCell<'_>) -> Result<EvaluatedValue, EvaluationError>;
}

/// Uses the value the spreadsheet application cached when the file was saved.
///
/// Cached error values (e.g. `#DIV/0!`) are reported as evaluation errors.
#[derive(Debug, Default, Clone, Copy)]
pub struct CachedValueEvaluator;

impl FormulaEvaluator for CachedValueEvaluator {
    fn evaluate(&self, cell: FormulaCell<'_>) -> Result<EvaluatedValue, EvaluationError> {
        match cell.cached {
            EvaluatedValue::Error(e) => Err(EvaluationError {
                formula: cell.formula.to_string(),
                message: e.clone(),
            }),
            other => Ok(other.clone()),
        }
    }
}

const MILLIS_PER_DAY: f64 = 86_400_000.0;

fn serial_epoch(serial: f64) -> Option<NaiveDateTime> {
    // Serials below 61 predate the phantom 1900-02-29, so they count from one day later.
    let epoch = if serial < 61.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)
    };
    epoch.and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Convert a spreadsheet date serial (1900 date system) to a calendar value.
///
/// Returns `None` for negative or non-finite serials.
pub fn serial_to_date_time(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let millis = (serial * MILLIS_PER_DAY).round();
    if millis > i64::MAX as f64 {
        return None;
    }
    let delta = TimeDelta::try_milliseconds(millis as i64)?;
    serial_epoch(serial)?.checked_add_signed(delta)
}

/// Inverse of [`serial_to_date_time`].
pub fn date_time_to_serial(value: NaiveDateTime) -> f64 {
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0)) else {
        return 0.0;
    };
    let mut serial = (value - epoch).num_milliseconds() as f64 / MILLIS_PER_DAY;
    if serial < 61.0 {
        serial -= 1.0;
    }
    serial
}

fn format_date_time(dt: NaiveDateTime) -> String {
    let midnight = dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0;
    if midnight {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}

fn format_bool(b: bool) -> String {
    if b { "TRUE" } else { "FALSE" }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn numbers_format_like_general_format() {
        assert_eq!(Cell::number(42.0).formatted(), "42");
        assert_eq!(Cell::number(-3.25).formatted(), "-3.25");
        assert_eq!(Cell::Boolean(true).formatted(), "TRUE");
        assert_eq!(Cell::Blank.formatted(), "");
    }

    #[test]
    fn serials_convert_to_calendar_values() {
        let dt = serial_to_date_time(44211.5).unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2021, 1, 15).unwrap());
        assert_eq!(dt.time(), NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert!(serial_to_date_time(-1.0).is_none());
        assert!(serial_to_date_time(f64::NAN).is_none());
    }

    #[test]
    fn date_cells_format_as_iso() {
        let day = NaiveDate::from_ymd_opt(2021, 1, 15).unwrap();
        assert_eq!(Cell::date_time(day.and_hms_opt(0, 0, 0).unwrap()).formatted(), "2021-01-15");
        assert_eq!(
            Cell::date_time(day.and_hms_opt(9, 30, 0).unwrap()).formatted(),
            "2021-01-15T09:30:00"
        );
    }

    #[test]
    fn blank_rows_ignore_empty_strings() {
        assert!(Row::new(0, vec![Cell::Blank, Cell::from("")]).is_blank());
        assert!(Row::new(0, vec![]).is_blank());
        assert!(!Row::new(0, vec![Cell::Blank, Cell::number(0.0)]).is_blank());
        assert!(!Row::new(0, vec![Cell::formula("A1", EvaluatedValue::Blank)]).is_blank());
    }

    #[test]
    fn cached_evaluator_reports_error_values() {
        let sheet = Sheet::new("S");
        let cached = EvaluatedValue::Error("#DIV/0!".to_string());
        let cell = FormulaCell {
            sheet: &sheet,
            row_no: 0,
            column: 0,
            formula: "1/0",
            cached: &cached,
        };
        assert!(CachedValueEvaluator.evaluate(cell).is_err());
    }

    #[test]
    fn sheets_are_indexed_in_workbook_order() {
        let wb = Workbook::new(vec![Sheet::new("a"), Sheet::new("b")]);
        assert_eq!(wb.sheet(1).unwrap().index(), 1);
        assert_eq!(wb.sheet(1).unwrap().name(), "b");
        assert!(wb.sheet(2).is_none());
    }
}
