//! Schema descriptors: which sheets to read, how columns are located and how each field is coerced.
//!
//! A [`SchemaDescriptor`] is built once, validated up front, and then shared read-only (typically
//! behind an `Arc`) by every import that uses it. Build one in code with
//! [`SchemaDescriptor::builder`] or load it from JSON with [`SchemaDescriptor::from_json_str`].
//!
//! ```rust
//! use sheet_import::schema::{ColumnOptions, FieldSpec, SchemaDescriptor};
//! use sheet_import::types::{FieldKind, ScalarType};
//!
//! # fn main() -> Result<(), sheet_import::ImportError> {
//! let schema = SchemaDescriptor::builder()
//!     .sheet_names(["Employees.*"])
//!     .field(FieldSpec::named("name", "(?i)name", FieldKind::scalar(ScalarType::String))
//!         .with_options(ColumnOptions::default().required()))
//!     .field(FieldSpec::named("bonus", "Bonus \\d+", FieldKind::List(ScalarType::Double))
//!         .with_multiplicity(1, usize::MAX))
//!     .build()?;
//! assert_eq!(schema.fields().len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod options;

use std::collections::HashSet;

use regex::Regex;
use serde::Deserialize;

use crate::error::{ImportError, ImportResult};
use crate::types::{FieldKind, MapKeyKind};

pub use options::{ColumnOptions, PreProcessor};

/// Which sheets of a workbook are imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelection {
    /// Sheets whose name fully matches one of these patterns.
    Names(Vec<String>),
    /// Sheets at these zero-based positions.
    Indices(Vec<usize>),
}

/// How a field finds its column(s).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnLocator {
    /// Header text must fully match this regex (named mode).
    Pattern(String),
    /// Fixed zero-based column index (ordinal mode).
    Ordinal(usize),
}

/// Record fields filled from import state instead of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectKind {
    /// One-based position of the row across the whole import (`Value::Long`).
    ImportIndex,
    /// Zero-based row index inside its sheet (`Value::Long`).
    RowNumber,
    /// Name of the sheet the row comes from (`Value::String`).
    SheetName,
    /// Zero-based index of the sheet the row comes from (`Value::Long`).
    SheetIndex,
    /// Cells of columns no field claimed, keyed by header text (`Value::Map`).
    UnmatchedColumns,
}

/// Declaration of a single field, before validation.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    key: String,
    locator: ColumnLocator,
    min_matches: usize,
    max_matches: usize,
    kind: FieldKind,
    options: ColumnOptions,
}

impl FieldSpec {
    /// A field located by header pattern, matching exactly one column.
    pub fn named(key: impl Into<String>, pattern: impl Into<String>, kind: FieldKind) -> Self {
        Self::new(key, ColumnLocator::Pattern(pattern.into()), kind)
    }

    /// A field located at a fixed column index.
    pub fn ordinal(key: impl Into<String>, index: usize, kind: FieldKind) -> Self {
        Self::new(key, ColumnLocator::Ordinal(index), kind)
    }

    fn new(key: impl Into<String>, locator: ColumnLocator, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            locator,
            min_matches: 1,
            max_matches: 1,
            kind,
            options: ColumnOptions::default(),
        }
    }

    /// Allowed number of matched columns. Use `usize::MAX` for "unbounded".
    pub fn with_multiplicity(mut self, min: usize, max: usize) -> Self {
        self.min_matches = min;
        self.max_matches = max;
        self
    }

    pub fn with_options(mut self, options: ColumnOptions) -> Self {
        self.options = options;
        self
    }
}

/// A validated field of a [`SchemaDescriptor`].
#[derive(Debug, Clone)]
pub struct Field {
    spec: FieldSpec,
    column_regex: Option<Regex>,
    value_regex: Option<Regex>,
}

impl Field {
    pub fn key(&self) -> &str {
        &self.spec.key
    }

    pub fn locator(&self) -> &ColumnLocator {
        &self.spec.locator
    }

    pub fn min_matches(&self) -> usize {
        self.spec.min_matches
    }

    pub fn max_matches(&self) -> usize {
        self.spec.max_matches
    }

    pub fn kind(&self) -> &FieldKind {
        &self.spec.kind
    }

    pub fn options(&self) -> &ColumnOptions {
        &self.spec.options
    }

    /// Anchored header pattern (named mode only).
    pub(crate) fn column_regex(&self) -> Option<&Regex> {
        self.column_regex.as_ref()
    }

    /// Anchored value pattern (non-temporal kinds with `matches` set).
    pub(crate) fn value_regex(&self) -> Option<&Regex> {
        self.value_regex.as_ref()
    }

    pub(crate) fn multiplicity_ok(&self, count: usize) -> bool {
        (self.spec.min_matches..=self.spec.max_matches).contains(&count)
    }
}

/// Immutable, validated description of how to import one record type.
#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    has_header: bool,
    is_named: bool,
    sheets: SheetSelection,
    sheet_regexes: Vec<Regex>,
    fields: Vec<Field>,
    injected: Vec<(String, InjectKind)>,
}

impl SchemaDescriptor {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn has_header(&self) -> bool {
        self.has_header
    }

    /// `true` when columns are located by header pattern, `false` for fixed positions.
    pub fn is_named(&self) -> bool {
        self.is_named
    }

    pub fn sheet_selection(&self) -> &SheetSelection {
        &self.sheets
    }

    pub(crate) fn sheet_regexes(&self) -> &[Regex] {
        &self.sheet_regexes
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key() == key)
    }

    pub fn injected(&self) -> &[(String, InjectKind)] {
        &self.injected
    }
}

/// Builder for [`SchemaDescriptor`]. Defaults to named mode with a header row.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    has_header: bool,
    is_named: bool,
    sheet_names: Vec<String>,
    sheet_indices: Vec<usize>,
    fields: Vec<FieldSpec>,
    injected: Vec<(String, InjectKind)>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self {
            has_header: true,
            is_named: true,
            sheet_names: Vec::new(),
            sheet_indices: Vec::new(),
            fields: Vec::new(),
            injected: Vec::new(),
        }
    }
}

impl SchemaBuilder {
    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Switch between named (header pattern) and ordinal (fixed index) column location.
    pub fn named(mut self, is_named: bool) -> Self {
        self.is_named = is_named;
        self
    }

    pub fn sheet_names<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sheet_names.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn sheet_indices(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.sheet_indices.extend(indices);
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn inject(mut self, key: impl Into<String>, kind: InjectKind) -> Self {
        self.injected.push((key.into(), kind));
        self
    }

    /// Validate the declarations and compile every pattern.
    pub fn build(self) -> ImportResult<SchemaDescriptor> {
        if self.is_named && !self.has_header {
            return Err(ImportError::schema("named columns require a header row"));
        }

        let sheets = match (self.sheet_names.is_empty(), self.sheet_indices.is_empty()) {
            (false, true) => SheetSelection::Names(self.sheet_names),
            (true, false) => SheetSelection::Indices(self.sheet_indices),
            (false, false) => {
                return Err(ImportError::schema(
                    "sheet names and sheet indices are mutually exclusive",
                ));
            }
            (true, true) => return Err(ImportError::schema("no sheet selected")),
        };
        let sheet_regexes = match &sheets {
            SheetSelection::Names(patterns) => patterns
                .iter()
                .map(|p| full_match_regex(p))
                .collect::<ImportResult<Vec<_>>>()?,
            SheetSelection::Indices(_) => Vec::new(),
        };

        let mut keys = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        for spec in self.fields {
            if !keys.insert(spec.key.clone()) {
                return Err(ImportError::schema(format!("duplicate field key '{}'", spec.key)));
            }
            fields.push(compile_field(spec, self.is_named)?);
        }
        for (key, _) in &self.injected {
            if !keys.insert(key.clone()) {
                return Err(ImportError::schema(format!("duplicate field key '{key}'")));
            }
        }

        Ok(SchemaDescriptor {
            has_header: self.has_header,
            is_named: self.is_named,
            sheets,
            sheet_regexes,
            fields,
            injected: self.injected,
        })
    }
}

fn compile_field(spec: FieldSpec, is_named: bool) -> ImportResult<Field> {
    let key = &spec.key;
    if spec.min_matches == 0 || spec.max_matches < spec.min_matches {
        return Err(ImportError::schema(format!(
            "field '{key}': multiplicity must satisfy 1 <= min <= max"
        )));
    }
    if spec.max_matches > 1 && !spec.kind.is_collection() {
        return Err(ImportError::schema(format!(
            "field '{key}': only list and map fields may bind more than one column"
        )));
    }

    let column_regex = match (&spec.locator, is_named) {
        (ColumnLocator::Pattern(p), true) => Some(full_match_regex(p)?),
        (ColumnLocator::Ordinal(_), false) => {
            if (spec.min_matches, spec.max_matches) != (1, 1) {
                return Err(ImportError::schema(format!(
                    "field '{key}': ordinal fields bind exactly one column"
                )));
            }
            if matches!(spec.kind, FieldKind::Map { key: MapKeyKind::Name, .. }) {
                return Err(ImportError::schema(format!(
                    "field '{key}': maps keyed by column name need named columns"
                )));
            }
            None
        }
        (ColumnLocator::Ordinal(_), true) => {
            return Err(ImportError::schema(format!(
                "field '{key}': named schemas locate columns by pattern"
            )));
        }
        (ColumnLocator::Pattern(_), false) => {
            return Err(ImportError::schema(format!(
                "field '{key}': ordinal schemas locate columns by index"
            )));
        }
    };

    let temporal = spec.kind.element_type().is_some_and(|t| t.is_temporal());
    let value_regex = match &spec.options.matches {
        Some(p) if !p.is_empty() && !temporal => Some(full_match_regex(p)?),
        _ => None,
    };

    Ok(Field {
        spec,
        column_regex,
        value_regex,
    })
}

/// Compile `pattern` so that it only accepts whole-string matches.
pub(crate) fn full_match_regex(pattern: &str) -> ImportResult<Regex> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| ImportError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
