//! Cell coercion: one cell (or one group of cells) in, one typed [`Value`] plus problems out.
//!
//! Coercion never fails. Missing, malformed or out-of-range input yields [`Value::Null`] and the
//! reasons are returned next to it as [`ValueProblem`]s, so a row always maps completely.
//!
//! Text goes through a fixed pipeline: formatted cell text → pre-processors (in order) → trim →
//! empty check → full-match pattern. Numeric and date cells bypass the pipeline and are read as
//! numbers directly.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use tracing::warn;

use super::columns::ResolvedColumn;
use crate::problems::{ValueProblem, ValueProblemKind};
use crate::schema::{ColumnOptions, Field};
use crate::types::{FieldKind, MapKey, MapKeyKind, ScalarType, Value};
use crate::workbook::{
    format_number, serial_to_date_time, Cell, EvaluatedValue, FormulaCell, FormulaEvaluator, Row,
    Sheet,
};

const TRUE_ALIASES: [&str; 5] = ["TRUE", "1", "T", "Y", "YES"];
const FALSE_ALIASES: [&str; 5] = ["FALSE", "0", "F", "N", "NO"];

const DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];
const DATE_FORMATS: [&str; 1] = ["%Y-%m-%d"];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

/// 2^63, the first value past `i64::MAX`. `i64::MAX as f64` rounds up to it, so it cannot be
/// an inclusive bound.
const LONG_UPPER_EXCLUSIVE: f64 = 9_223_372_036_854_775_808.0;

/// A coerced value and everything that went wrong producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    pub value: Value,
    pub problems: Vec<ValueProblem>,
}

impl Coerced {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

/// A field's options bound to one matched column.
#[derive(Debug, Clone, Copy)]
pub struct BoundColumn<'a> {
    pub options: &'a ColumnOptions,
    /// Compiled `options.matches`, when it is a value pattern.
    pub value_regex: Option<&'a Regex>,
    /// Display name used in diagnostics.
    pub column_name: Option<&'a str>,
    pub index: usize,
}

/// What a cell yielded before type-specific conversion.
struct Fetched {
    /// Numeric payload of numeric cells and numeric formula results.
    number: Option<f64>,
    /// Formatted text.
    text: String,
    from_formula: bool,
}

/// A number read from a cell.
enum Parsed {
    /// Integer text, parsed without going through `f64`.
    Exact(i64),
    Float(f64),
}

/// Coerces the cells of one row.
pub struct CellCoercer<'a> {
    sheet: &'a Sheet,
    row: &'a Row,
    evaluator: &'a dyn FormulaEvaluator,
}

impl<'a> CellCoercer<'a> {
    pub fn new(sheet: &'a Sheet, row: &'a Row, evaluator: &'a dyn FormulaEvaluator) -> Self {
        Self {
            sheet,
            row,
            evaluator,
        }
    }

    /// Coerce every matched column of `field`.
    ///
    /// Lists keep one entry per column (including nulls); maps are keyed as the field declares.
    /// Single-valued kinds read the first (only) column.
    pub fn coerce_field(&self, field: &Field, columns: &[ResolvedColumn]) -> Coerced {
        let mut problems = Vec::new();
        let value = match field.kind() {
            FieldKind::List(_) => Value::List(
                columns
                    .iter()
                    .map(|col| self.coerce_into(field.kind(), &bind_column(field, col), &mut problems))
                    .collect(),
            ),
            FieldKind::Map { key, .. } => Value::Map(
                columns
                    .iter()
                    .map(|col| {
                        let map_key = match key {
                            MapKeyKind::Name => MapKey::Name(
                                col.display_name.clone().unwrap_or_else(|| col.index.to_string()),
                            ),
                            MapKeyKind::Index => MapKey::Index(col.index),
                        };
                        let value =
                            self.coerce_into(field.kind(), &bind_column(field, col), &mut problems);
                        (map_key, value)
                    })
                    .collect(),
            ),
            _ => match columns.first() {
                Some(col) => self.coerce_into(field.kind(), &bind_column(field, col), &mut problems),
                None => Value::Null,
            },
        };
        Coerced { value, problems }
    }

    /// Coerce a single cell as `kind` (collections coerce as their element type).
    pub fn coerce(&self, kind: &FieldKind, column: &BoundColumn<'_>) -> Coerced {
        let mut problems = Vec::new();
        let value = self.coerce_into(kind, column, &mut problems);
        Coerced { value, problems }
    }

    fn coerce_into(&self, kind: &FieldKind, col: &BoundColumn<'_>, problems: &mut Vec<ValueProblem>) -> Value {
        match kind {
            FieldKind::Scalar(ty) | FieldKind::List(ty) | FieldKind::Map { value: ty, .. } => {
                self.scalar(*ty, col, problems)
            }
            FieldKind::Enum { allowed } => self.enumeration(allowed, col, problems),
            FieldKind::Custom => self.text(col, problems).map_or(Value::Null, Value::String),
        }
    }

    fn scalar(&self, ty: ScalarType, col: &BoundColumn<'_>, problems: &mut Vec<ValueProblem>) -> Value {
        match ty {
            ScalarType::String => self.text(col, problems).map_or(Value::Null, Value::String),
            ScalarType::Boolean => self.boolean(col, problems),
            ScalarType::DateTime | ScalarType::Date | ScalarType::Time => self.temporal(ty, col, problems),
            _ => self.number(ty, col, problems),
        }
    }

    /// Read the cell, evaluating formulas. `None` means absent or rejected; problems are recorded.
    fn fetch(&self, col: &BoundColumn<'_>, problems: &mut Vec<ValueProblem>) -> Option<Fetched> {
        let fetched = match self.row.cell(col.index) {
            None | Some(Cell::Blank) => None,
            Some(Cell::Formula { formula, cached }) => {
                if !col.options.formula_allowed {
                    problems.push(problem(ValueProblemKind::FormulaNotAllowed, col, Some(formula.clone())));
                    return None;
                }
                self.evaluate(col, formula, cached)
            }
            Some(Cell::Numeric { value, .. }) => Some(Fetched {
                number: Some(*value),
                text: self.cell_text(col.index),
                from_formula: false,
            }),
            Some(_) => Some(Fetched {
                number: None,
                text: self.cell_text(col.index),
                from_formula: false,
            }),
        };

        match fetched {
            Some(f) if !f.text.is_empty() => Some(f),
            _ => {
                absent(col, problems);
                None
            }
        }
    }

    fn cell_text(&self, index: usize) -> String {
        self.row.cell(index).map(Cell::formatted).unwrap_or_default()
    }

    fn evaluate(&self, col: &BoundColumn<'_>, formula: &str, cached: &EvaluatedValue) -> Option<Fetched> {
        let cell = FormulaCell {
            sheet: self.sheet,
            row_no: self.row.row_no,
            column: col.index,
            formula,
            cached,
        };
        match self.evaluator.evaluate(cell) {
            Ok(EvaluatedValue::Blank | EvaluatedValue::Error(_)) => None,
            Ok(value) => Some(Fetched {
                number: match value {
                    EvaluatedValue::Numeric(n) => Some(n),
                    _ => None,
                },
                text: value.formatted(),
                from_formula: true,
            }),
            Err(err) => {
                warn!(
                    sheet = self.sheet.name(),
                    row = self.row.row_no,
                    column = col.index,
                    error = %err,
                    "formula evaluation failed"
                );
                None
            }
        }
    }

    /// Formatted text after pre-processing and trimming. Empty text counts as absent.
    fn pipeline(&self, text: String, col: &BoundColumn<'_>, problems: &mut Vec<ValueProblem>) -> Option<String> {
        let mut text = col.options.pre_process_text(text);
        if col.options.trim {
            text = text.trim().to_string();
        }
        if text.is_empty() {
            absent(col, problems);
            return None;
        }
        Some(text)
    }

    /// The full text pipeline including the pattern check.
    fn text(&self, col: &BoundColumn<'_>, problems: &mut Vec<ValueProblem>) -> Option<String> {
        let fetched = self.fetch(col, problems)?;
        self.refine(fetched.text, col, problems)
    }

    fn refine(&self, text: String, col: &BoundColumn<'_>, problems: &mut Vec<ValueProblem>) -> Option<String> {
        let text = self.pipeline(text, col, problems)?;
        if col.value_regex.is_some_and(|re| !re.is_match(&text)) {
            let regex = col.options.matches.clone().unwrap_or_default();
            problems.push(problem(ValueProblemKind::FormatRegex { regex }, col, Some(text)));
            return None;
        }
        Some(text)
    }

    fn number(&self, ty: ScalarType, col: &BoundColumn<'_>, problems: &mut Vec<ValueProblem>) -> Value {
        let (n, exact) = match self.fetch_number(col, problems) {
            Some(Parsed::Exact(i)) => (i as f64, Some(i)),
            Some(Parsed::Float(n)) => (n, None),
            None => return Value::Null,
        };
        if let (ScalarType::Long, Some(i)) = (ty, exact) {
            return Value::Long(i);
        }
        let in_range = match ty {
            ScalarType::Byte => fits(n, f64::from(i8::MIN), f64::from(i8::MAX)),
            ScalarType::Short => fits(n, f64::from(i16::MIN), f64::from(i16::MAX)),
            ScalarType::Int => fits(n, f64::from(i32::MIN), f64::from(i32::MAX)),
            ScalarType::Long => n.is_finite() && n >= i64::MIN as f64 && n < LONG_UPPER_EXCLUSIVE,
            ScalarType::Float => fits(n, -f64::from(f32::MAX), f64::from(f32::MAX)),
            _ => true,
        };
        if !in_range {
            problems.push(problem(ValueProblemKind::Range, col, Some(format_number(n))));
            return Value::Null;
        }
        match ty {
            ScalarType::Byte => Value::Byte(n as i8),
            ScalarType::Short => Value::Short(n as i16),
            ScalarType::Int => Value::Int(n as i32),
            ScalarType::Long => Value::Long(n as i64),
            ScalarType::Float => Value::Float(n as f32),
            _ => Value::Double(n),
        }
    }

    /// Numeric cells and numeric formula results are taken as-is; anything else is parsed.
    fn fetch_number(&self, col: &BoundColumn<'_>, problems: &mut Vec<ValueProblem>) -> Option<Parsed> {
        let fetched = self.fetch(col, problems)?;
        if let Some(n) = fetched.number {
            return Some(Parsed::Float(n));
        }
        let text = self.refine(fetched.text, col, problems)?;
        parse_number(&text, col, problems)
    }

    fn boolean(&self, col: &BoundColumn<'_>, problems: &mut Vec<ValueProblem>) -> Value {
        let Some(text) = self.text(col, problems) else {
            return Value::Null;
        };
        let upper = text.to_uppercase();
        if TRUE_ALIASES.contains(&upper.as_str()) {
            Value::Boolean(true)
        } else if FALSE_ALIASES.contains(&upper.as_str()) {
            Value::Boolean(false)
        } else {
            problems.push(problem(ValueProblemKind::Format, col, Some(text)));
            Value::Null
        }
    }

    fn temporal(&self, ty: ScalarType, col: &BoundColumn<'_>, problems: &mut Vec<ValueProblem>) -> Value {
        let Some(fetched) = self.fetch(col, problems) else {
            return Value::Null;
        };

        if let Some(serial) = fetched.number {
            return match serial_to_date_time(serial) {
                Some(dt) => project(ty, dt),
                None => {
                    problems.push(problem(ValueProblemKind::Generic, col, Some(fetched.text)));
                    Value::Null
                }
            };
        }
        if fetched.from_formula {
            problems.push(problem(ValueProblemKind::Generic, col, Some(fetched.text)));
            return Value::Null;
        }

        let Some(text) = self.pipeline(fetched.text, col, problems) else {
            return Value::Null;
        };
        let format = col.options.matches.as_deref().filter(|f| !f.is_empty());
        match parse_temporal(ty, &text, format) {
            Some(v) => v,
            None => {
                problems.push(problem(ValueProblemKind::Generic, col, Some(text)));
                Value::Null
            }
        }
    }

    fn enumeration(&self, allowed: &[String], col: &BoundColumn<'_>, problems: &mut Vec<ValueProblem>) -> Value {
        let Some(text) = self.text(col, problems) else {
            return Value::Null;
        };
        if allowed.iter().any(|a| *a == text) {
            Value::Enum(text)
        } else {
            let kind = ValueProblemKind::FormatEnum {
                allowed_values: allowed.to_vec(),
            };
            problems.push(problem(kind, col, Some(text)));
            Value::Null
        }
    }
}

fn bind_column<'f>(field: &'f Field, col: &'f ResolvedColumn) -> BoundColumn<'f> {
    BoundColumn {
        options: field.options(),
        value_regex: field.value_regex(),
        column_name: col.display_name.as_deref(),
        index: col.index,
    }
}

fn problem(kind: ValueProblemKind, col: &BoundColumn<'_>, raw: Option<String>) -> ValueProblem {
    ValueProblem::new(kind, col.column_name, col.index, raw)
}

fn absent(col: &BoundColumn<'_>, problems: &mut Vec<ValueProblem>) {
    if col.options.required {
        problems.push(problem(ValueProblemKind::Null, col, None));
    }
}

fn fits(n: f64, min: f64, max: f64) -> bool {
    n.is_finite() && n >= min && n <= max
}

/// Integer text is kept exact so 64-bit values survive beyond `f64` precision.
fn parse_number(text: &str, col: &BoundColumn<'_>, problems: &mut Vec<ValueProblem>) -> Option<Parsed> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(Parsed::Exact(i));
    }
    match text.parse::<f64>() {
        Ok(n) => Some(Parsed::Float(n)),
        Err(_) => {
            problems.push(problem(ValueProblemKind::Format, col, Some(text.to_string())));
            None
        }
    }
}

fn project(ty: ScalarType, dt: NaiveDateTime) -> Value {
    match ty {
        ScalarType::Date => Value::Date(dt.date()),
        ScalarType::Time => Value::Time(dt.time()),
        _ => Value::DateTime(dt),
    }
}

fn parse_temporal(ty: ScalarType, text: &str, format: Option<&str>) -> Option<Value> {
    match ty {
        ScalarType::Date => first_parse(text, format, &DATE_FORMATS, NaiveDate::parse_from_str).map(Value::Date),
        ScalarType::Time => first_parse(text, format, &TIME_FORMATS, NaiveTime::parse_from_str).map(Value::Time),
        _ => first_parse(text, format, &DATE_TIME_FORMATS, NaiveDateTime::parse_from_str)
            .map(Value::DateTime),
    }
}

fn first_parse<T>(
    text: &str,
    format: Option<&str>,
    defaults: &[&str],
    parse: fn(&str, &str) -> chrono::ParseResult<T>,
) -> Option<T> {
    match format {
        Some(f) => parse(text, f).ok(),
        None => defaults.iter().find_map(|f| parse(text, f).ok()),
    }
}
