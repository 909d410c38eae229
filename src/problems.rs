//! Diagnostics collected during an import.
//!
//! Problems are plain values. They are grouped by blast radius:
//!
//! - [`Problem::File`]: the source could not be read at all (zero rows are produced)
//! - [`Problem::SheetNotPresent`]: sheet selection failed
//! - [`Problem::ColumnNotPresent`]: a sheet lacks a declared column (its rows are skipped)
//! - [`Problem::Row`]: a single row is invalid but still produced
//!
//! [`ProblemKind`] flattens the hierarchy into a tag tree so callers can ask either for an exact
//! kind or for a kind and everything below it (see [`ProblemKind::is_a`]).

use std::fmt;

use serde::Serialize;

/// Tag for every problem variant, arranged as a tree via [`ProblemKind::parent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProblemKind {
    File,
    Sheet,
    SheetNotPresent,
    Row,
    /// Sheet-scoped: carries no row number.
    ColumnNotPresent,
    Value,
    ValueNull,
    ValueFormat,
    ValueFormatRegex,
    ValueFormatEnum,
    ValueRange,
    ValueFormulaNotAllowed,
    /// Raised by user validators, self-validating records or custom field types.
    Business,
}

impl ProblemKind {
    pub fn parent(self) -> Option<ProblemKind> {
        match self {
            Self::File | Self::Sheet | Self::Row => None,
            Self::SheetNotPresent => Some(Self::Sheet),
            Self::ColumnNotPresent | Self::Value | Self::Business => Some(Self::Row),
            Self::ValueNull | Self::ValueFormat | Self::ValueRange | Self::ValueFormulaNotAllowed => {
                Some(Self::Value)
            }
            Self::ValueFormatRegex | Self::ValueFormatEnum => Some(Self::ValueFormat),
        }
    }

    /// `true` when `self` equals `ancestor` or descends from it.
    pub fn is_a(self, ancestor: ProblemKind) -> bool {
        let mut cur = Some(self);
        while let Some(kind) = cur {
            if kind == ancestor {
                return true;
            }
            cur = kind.parent();
        }
        false
    }
}

/// Any diagnostic produced by an import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Problem {
    /// The whole file could not be read.
    File,
    /// No sheet matched the declared selector. `sheet` holds the joined patterns or `#index`.
    SheetNotPresent { sheet: String },
    /// A declared field matched a number of columns outside its multiplicity bounds.
    ColumnNotPresent { sheet_name: String, column_key: String },
    /// A problem attached to one row.
    Row(RowProblem),
}

impl Problem {
    pub fn kind(&self) -> ProblemKind {
        match self {
            Self::File => ProblemKind::File,
            Self::SheetNotPresent { .. } => ProblemKind::SheetNotPresent,
            Self::ColumnNotPresent { .. } => ProblemKind::ColumnNotPresent,
            Self::Row(row) => row.kind(),
        }
    }

    /// Sheet the problem refers to, if any.
    pub fn sheet_name(&self) -> Option<&str> {
        match self {
            Self::File => None,
            Self::ColumnNotPresent { sheet_name, .. } => Some(sheet_name),
            Self::SheetNotPresent { sheet } => Some(sheet),
            Self::Row(row) => Some(&row.sheet_name),
        }
    }

    pub fn as_row(&self) -> Option<&RowProblem> {
        match self {
            Self::Row(row) => Some(row),
            _ => None,
        }
    }
}

impl From<RowProblem> for Problem {
    fn from(value: RowProblem) -> Self {
        Self::Row(value)
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "the file could not be read as a spreadsheet"),
            Self::SheetNotPresent { sheet } => write!(f, "no sheet matching '{sheet}' is present"),
            Self::ColumnNotPresent {
                sheet_name,
                column_key,
            } => write!(
                f,
                "sheet '{sheet_name}': column '{column_key}' is missing or present an unexpected number of times"
            ),
            Self::Row(row) => fmt::Display::fmt(row, f),
        }
    }
}

/// A problem attached to a single row.
///
/// `row_no` is the zero-based row index inside the sheet; messages print it one-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowProblem {
    pub sheet_name: String,
    pub row_no: usize,
    pub detail: RowProblemDetail,
}

/// What is wrong with a row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RowProblemDetail {
    /// The row is invalid without a more specific reason (e.g. a validator failed).
    Generic,
    /// A cell could not be coerced.
    Value(ValueProblem),
    /// A business rule rejected the row.
    Business { code: String, message: String },
}

impl RowProblemDetail {
    /// Convenience constructor for business-rule rejections.
    pub fn business(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Business {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl RowProblem {
    pub fn new(sheet_name: impl Into<String>, row_no: usize, detail: RowProblemDetail) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            row_no,
            detail,
        }
    }

    pub fn generic(sheet_name: impl Into<String>, row_no: usize) -> Self {
        Self::new(sheet_name, row_no, RowProblemDetail::Generic)
    }

    pub fn business(
        sheet_name: impl Into<String>,
        row_no: usize,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(sheet_name, row_no, RowProblemDetail::business(code, message))
    }

    pub fn kind(&self) -> ProblemKind {
        match &self.detail {
            RowProblemDetail::Generic => ProblemKind::Row,
            RowProblemDetail::Value(v) => v.kind.tag(),
            RowProblemDetail::Business { .. } => ProblemKind::Business,
        }
    }

    pub fn as_value(&self) -> Option<&ValueProblem> {
        match &self.detail {
            RowProblemDetail::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Business code, for problems raised by validators.
    pub fn business_code(&self) -> Option<&str> {
        match &self.detail {
            RowProblemDetail::Business { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl fmt::Display for RowProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sheet '{}', row {}: ", self.sheet_name, self.row_no + 1)?;
        match &self.detail {
            RowProblemDetail::Generic => write!(f, "the row is invalid"),
            RowProblemDetail::Value(v) => fmt::Display::fmt(v, f),
            RowProblemDetail::Business { code, message } => write!(f, "{message} [{code}]"),
        }
    }
}

/// A cell-level coercion problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueProblem {
    /// Display name of the column, when one is known.
    pub column_name: Option<String>,
    /// Zero-based column index.
    pub column_index: usize,
    /// Offending text (formatted value, or the formula for [`ValueProblemKind::FormulaNotAllowed`]).
    pub raw_value: Option<String>,
    pub kind: ValueProblemKind,
}

/// Specific reason a cell was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ValueProblemKind {
    /// Unparseable date/time or another value defect without a finer category.
    Generic,
    /// A required value is missing.
    Null,
    /// The value could not be parsed into the target type.
    Format,
    /// The value does not fully match the column's pattern.
    FormatRegex { regex: String },
    /// The value is not one of the declared symbols.
    FormatEnum { allowed_values: Vec<String> },
    /// The value does not fit the target numeric type.
    Range,
    /// The cell holds a formula but the column forbids them.
    FormulaNotAllowed,
}

impl ValueProblemKind {
    pub fn tag(&self) -> ProblemKind {
        match self {
            Self::Generic => ProblemKind::Value,
            Self::Null => ProblemKind::ValueNull,
            Self::Format => ProblemKind::ValueFormat,
            Self::FormatRegex { .. } => ProblemKind::ValueFormatRegex,
            Self::FormatEnum { .. } => ProblemKind::ValueFormatEnum,
            Self::Range => ProblemKind::ValueRange,
            Self::FormulaNotAllowed => ProblemKind::ValueFormulaNotAllowed,
        }
    }
}

impl ValueProblem {
    pub fn new(
        kind: ValueProblemKind,
        column_name: Option<&str>,
        column_index: usize,
        raw_value: Option<String>,
    ) -> Self {
        Self {
            column_name: column_name.map(str::to_owned),
            column_index,
            raw_value,
            kind,
        }
    }
}

impl fmt::Display for ValueProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column = self.column_name.as_deref().unwrap_or("");
        let idx = self.column_index;
        let raw = self.raw_value.as_deref().unwrap_or("");
        match &self.kind {
            ValueProblemKind::Generic => write!(f, "invalid value '{raw}' in column '{column}' (#{idx})"),
            ValueProblemKind::Null => write!(f, "column '{column}' (#{idx}) requires a value"),
            ValueProblemKind::Format => {
                write!(f, "value '{raw}' in column '{column}' (#{idx}) has an invalid format")
            }
            ValueProblemKind::FormatRegex { regex } => write!(
                f,
                "value '{raw}' in column '{column}' (#{idx}) does not match '{regex}'"
            ),
            ValueProblemKind::FormatEnum { allowed_values } => write!(
                f,
                "value '{raw}' in column '{column}' (#{idx}) is not one of: {}",
                allowed_values.join(";")
            ),
            ValueProblemKind::Range => {
                write!(f, "value '{raw}' in column '{column}' (#{idx}) is out of range")
            }
            ValueProblemKind::FormulaNotAllowed => write!(
                f,
                "column '{column}' (#{idx}) does not accept formulas (found '{raw}')"
            ),
        }
    }
}
