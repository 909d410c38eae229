//! The result of one import.

use std::fmt;

use super::observability::ImportStats;
use super::row::RowContext;
use crate::problems::{Problem, ProblemKind, RowProblem};

/// Everything one `process*` call produced: submitted rows, their diagnostics and the
/// import-scope problems (file, sheet and column level).
///
/// Sessions are never shared between imports.
#[derive(Debug, Clone)]
pub struct ImportSession<T> {
    rows: Vec<RowContext<T>>,
    problems: Vec<Problem>,
    sheet_count: usize,
    next_import_index: usize,
}

impl<T> Default for ImportSession<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            problems: Vec::new(),
            sheet_count: 0,
            next_import_index: 1,
        }
    }
}

impl<T> ImportSession<T> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Hand out the next import index. Indices start at 1 and never skip.
    pub(crate) fn next_import_index(&mut self) -> usize {
        let idx = self.next_import_index;
        self.next_import_index += 1;
        idx
    }

    /// Record an import-scope problem. Returns `false` when an equal problem was already present.
    pub(crate) fn add_problem(&mut self, problem: Problem) -> bool {
        if self.problems.contains(&problem) {
            return false;
        }
        self.problems.push(problem);
        true
    }

    pub(crate) fn count_sheet(&mut self) {
        self.sheet_count += 1;
    }

    /// Freeze the context and append it. Returns the stored context.
    pub(crate) fn submit(&mut self, mut ctx: RowContext<T>) -> &RowContext<T> {
        ctx.mark_submitted();
        let idx = self.rows.len();
        self.rows.push(ctx);
        &self.rows[idx]
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn valid_row_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_valid()).count()
    }

    pub fn invalid_row_count(&self) -> usize {
        self.total_rows() - self.valid_row_count()
    }

    /// Number of sheets actually scanned (including sheets whose columns did not resolve).
    pub fn sheet_count(&self) -> usize {
        self.sheet_count
    }

    /// `true` when there are no import-scope problems and every row is valid.
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty() && self.rows.iter().all(RowContext::is_valid)
    }

    /// Submitted row contexts, in import order.
    pub fn rows(&self) -> &[RowContext<T>] {
        &self.rows
    }

    pub fn all_rows(&self) -> Vec<&T> {
        self.rows.iter().map(RowContext::record).collect()
    }

    pub fn valid_rows(&self) -> Vec<&T> {
        self.rows.iter().filter(|r| r.is_valid()).map(RowContext::record).collect()
    }

    pub fn invalid_rows(&self) -> Vec<&T> {
        self.rows.iter().filter(|r| !r.is_valid()).map(RowContext::record).collect()
    }

    /// Invalid rows carrying at least one problem of `kind` or one of its sub-kinds.
    pub fn invalid_rows_with(&self, kind: ProblemKind) -> Vec<&T> {
        self.rows
            .iter()
            .filter(|r| r.problems().iter().any(|p| p.kind().is_a(kind)))
            .map(RowContext::record)
            .collect()
    }

    /// Import-scope problems first, then row problems in row order.
    pub fn problems(&self) -> Vec<Problem> {
        self.problems
            .iter()
            .cloned()
            .chain(
                self.rows
                    .iter()
                    .flat_map(|r| r.problems().iter().cloned().map(Problem::Row)),
            )
            .collect()
    }

    /// File, sheet and column level problems.
    pub fn import_problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Problems whose kind is exactly `kind`.
    pub fn problems_of(&self, kind: ProblemKind) -> Vec<Problem> {
        self.problems().into_iter().filter(|p| p.kind() == kind).collect()
    }

    /// Problems of `kind` or any of its sub-kinds.
    pub fn problems_in(&self, kind: ProblemKind) -> Vec<Problem> {
        self.problems().into_iter().filter(|p| p.kind().is_a(kind)).collect()
    }

    /// Row problems of the first row whose record equals `record`.
    pub fn problems_for(&self, record: &T) -> &[RowProblem]
    where
        T: PartialEq,
    {
        self.rows
            .iter()
            .find(|r| r.record() == record)
            .map(RowContext::problems)
            .unwrap_or(&[])
    }

    /// Row context by its one-based import index.
    pub fn row_by_import_index(&self, import_index: usize) -> Option<&RowContext<T>> {
        import_index
            .checked_sub(1)
            .and_then(|i| self.rows.get(i))
            .filter(|r| r.import_index() == import_index)
    }

    pub fn summary(&self) -> ImportStats {
        let valid = self.valid_row_count();
        ImportStats {
            rows: self.total_rows(),
            valid,
            invalid: self.total_rows() - valid,
            sheets: self.sheet_count,
            import_problems: self.problems.len(),
        }
    }

    /// Consume the session, keeping only the records.
    pub fn into_records(self) -> Vec<T> {
        self.rows.into_iter().map(RowContext::into_record).collect()
    }
}

impl<T> fmt::Display for ImportSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())?;
        for p in &self.problems {
            write!(f, "\n  {p}")?;
        }
        for row in self.rows.iter().filter(|r| !r.is_valid()) {
            for p in row.problems() {
                write!(f, "\n  #{} {p}", row.import_index())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::RowProblemDetail;

    fn session() -> ImportSession<u32> {
        let mut s = ImportSession::new();
        s.count_sheet();
        for (record, bad) in [(10, false), (20, true), (30, false)] {
            let idx = s.next_import_index();
            let mut ctx = RowContext::new(idx, "S", 0, idx, record);
            if bad {
                ctx.add_detail(RowProblemDetail::business("LOW", "too low"));
            }
            s.submit(ctx);
        }
        s
    }

    #[test]
    fn partitions_rows_by_validity() {
        let s = session();
        assert_eq!(s.total_rows(), 3);
        assert_eq!(s.valid_rows(), vec![&10, &30]);
        assert_eq!(s.invalid_rows(), vec![&20]);
        assert_eq!(s.invalid_rows_with(ProblemKind::Row), vec![&20]);
        assert!(s.invalid_rows_with(ProblemKind::Value).is_empty());
        assert!(!s.is_valid());
        assert!(s.rows().iter().all(RowContext::is_submitted));
    }

    #[test]
    fn import_problems_are_deduplicated_and_listed_first() {
        let mut s = session();
        let missing = Problem::SheetNotPresent { sheet: "#4".to_string() };
        assert!(s.add_problem(missing.clone()));
        assert!(!s.add_problem(missing.clone()));
        let all = s.problems();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], missing);
        assert_eq!(s.problems_of(ProblemKind::Sheet).len(), 0);
        assert_eq!(s.problems_in(ProblemKind::Sheet).len(), 1);
        assert_eq!(s.problems_of(ProblemKind::Business).len(), 1);
    }

    #[test]
    fn into_records_keeps_import_order() {
        let mut s = session();
        s.add_problem(Problem::File);
        assert_eq!(s.into_records(), vec![10, 20, 30]);
    }

    #[test]
    fn looks_up_rows() {
        let s = session();
        assert_eq!(s.row_by_import_index(2).map(|r| *r.record()), Some(20));
        assert!(s.row_by_import_index(0).is_none());
        assert!(s.row_by_import_index(4).is_none());
        assert_eq!(s.problems_for(&20).len(), 1);
        assert!(s.problems_for(&10).is_empty());
        assert!(s.problems_for(&99).is_empty());
    }

    #[test]
    fn summary_counts() {
        let s = session();
        let stats = s.summary();
        assert_eq!((stats.rows, stats.valid, stats.invalid, stats.sheets), (3, 2, 1, 1));
        assert!(s.to_string().starts_with("rows=3 valid=2 invalid=1 sheets=1"));
        assert!(ImportSession::<u32>::new().is_valid());
    }
}
