//! Per-row state.

use crate::problems::{RowProblem, RowProblemDetail};

/// Where a row comes from. Handed to validators and record self-validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLocation<'a> {
    pub sheet_name: &'a str,
    pub sheet_index: usize,
    /// Zero-based row index inside the sheet.
    pub row_no: usize,
    /// One-based position of the row across the whole import.
    pub import_index: usize,
}

impl RowLocation<'_> {
    /// A problem attached to this row.
    pub fn problem(&self, detail: RowProblemDetail) -> RowProblem {
        RowProblem::new(self.sheet_name, self.row_no, detail)
    }

    /// A business-rule problem attached to this row.
    pub fn business(&self, code: impl Into<String>, message: impl Into<String>) -> RowProblem {
        RowProblem::business(self.sheet_name, self.row_no, code, message)
    }
}

/// One mapped row: the record plus its diagnostics.
///
/// A context moves through `created → mapped → submitted`. Once submitted it is owned by the
/// [`super::ImportSession`] and is read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct RowContext<T> {
    import_index: usize,
    sheet_name: String,
    sheet_index: usize,
    row_no: usize,
    record: T,
    problems: Vec<RowProblem>,
    submitted: bool,
}

impl<T> RowContext<T> {
    pub(crate) fn new(import_index: usize, sheet_name: &str, sheet_index: usize, row_no: usize, record: T) -> Self {
        Self {
            import_index,
            sheet_name: sheet_name.to_string(),
            sheet_index,
            row_no,
            record,
            problems: Vec::new(),
            submitted: false,
        }
    }

    /// One-based, gap-free position across the whole import.
    pub fn import_index(&self) -> usize {
        self.import_index
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn sheet_index(&self) -> usize {
        self.sheet_index
    }

    /// Zero-based row index inside the sheet.
    pub fn row_no(&self) -> usize {
        self.row_no
    }

    pub fn record(&self) -> &T {
        &self.record
    }

    pub fn into_record(self) -> T {
        self.record
    }

    pub fn problems(&self) -> &[RowProblem] {
        &self.problems
    }

    /// `true` exactly when the row carries no problems.
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn location(&self) -> RowLocation<'_> {
        RowLocation {
            sheet_name: &self.sheet_name,
            sheet_index: self.sheet_index,
            row_no: self.row_no,
            import_index: self.import_index,
        }
    }

    pub(crate) fn record_mut(&mut self) -> &mut T {
        &mut self.record
    }

    /// # Panics
    ///
    /// Panics if the context was already submitted.
    pub(crate) fn add_problem(&mut self, problem: RowProblem) {
        assert!(
            !self.submitted,
            "row {} of sheet '{}' was already submitted",
            self.row_no + 1,
            self.sheet_name
        );
        self.problems.push(problem);
    }

    pub(crate) fn add_detail(&mut self, detail: RowProblemDetail) {
        let problem = RowProblem::new(self.sheet_name.clone(), self.row_no, detail);
        self.add_problem(problem);
    }

    pub(crate) fn mark_submitted(&mut self) {
        self.submitted = true;
    }
}
