//! Import orchestration: sheet selection → column resolution → row mapping → validation →
//! submission → consumers.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use sheet_import::schema::{ColumnOptions, FieldSpec, SchemaDescriptor};
//! use sheet_import::types::{FieldKind, ScalarType, Value};
//! use sheet_import::workbook::{Cell, Sheet, Workbook};
//! use sheet_import::{FieldError, Importable, Importer};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Person {
//!     name: Option<String>,
//!     age: Option<i32>,
//! }
//!
//! impl Importable for Person {
//!     fn set_field(&mut self, key: &str, value: Value) -> Result<(), FieldError> {
//!         match key {
//!             "name" => self.name = value.into_string(),
//!             "age" => self.age = value.as_i64().map(|v| v as i32),
//!             _ => {}
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), sheet_import::ImportError> {
//! let schema = Arc::new(
//!     SchemaDescriptor::builder()
//!         .sheet_names(["People"])
//!         .field(FieldSpec::named("name", "Name", FieldKind::scalar(ScalarType::String))
//!             .with_options(ColumnOptions::default().required()))
//!         .field(FieldSpec::named("age", "Age", FieldKind::scalar(ScalarType::Int)))
//!         .build()?,
//! );
//! let workbook = Workbook::new(vec![Sheet::new("People")
//!     .with_row(vec![Cell::from("Name"), Cell::from("Age")])
//!     .with_row(vec![Cell::from("Ada"), Cell::from(36.0)])
//!     .with_row(vec![Cell::Blank, Cell::from("old")])]);
//!
//! let session = Importer::<Person>::builder(schema).build().process_workbook(&workbook);
//! assert_eq!(session.total_rows(), 2);
//! assert_eq!(session.valid_row_count(), 1);
//! assert_eq!(session.invalid_rows()[0].age, None);
//! # Ok(())
//! # }
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "excel")]
use std::{io::Read, path::Path};

use thiserror::Error;
use tracing::{debug, error, trace, warn};

use super::coercion::{BoundColumn, CellCoercer};
use super::columns::{resolve_columns, ResolvedColumns};
use super::observability::{ImportContext, ImportObserver, ImportSeverity, ImportSource};
use super::row::{RowContext, RowLocation};
use super::session::ImportSession;
use super::sheets::select_sheets;
use crate::error::ImportResult;
use crate::problems::{Problem, RowProblem, RowProblemDetail, ValueProblem, ValueProblemKind};
use crate::schema::{ColumnOptions, InjectKind, SchemaDescriptor};
use crate::types::{FieldKind, MapKey, ScalarType, Value};
use crate::workbook::{CachedValueEvaluator, Cell, FormulaEvaluator, Row, Sheet, Workbook};

/// Boxed error returned by validators and record construction.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Why a record refused a field value.
#[derive(Debug, Error)]
pub enum FieldError {
    /// The value is unacceptable; the details are attached to the row.
    #[error("value rejected ({} problem(s))", .0.len())]
    Rejected(Vec<RowProblemDetail>),
    /// Setting the field failed unexpectedly. Logged, then reported as a format problem.
    #[error("field could not be set: {0}")]
    Failed(#[source] BoxError),
}

impl FieldError {
    pub fn failed(err: impl Into<BoxError>) -> Self {
        Self::Failed(err.into())
    }

    /// Reject with a single business problem.
    pub fn business(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected(vec![RowProblemDetail::business(code, message)])
    }
}

/// A record type that rows can be imported into.
///
/// Records start from [`Default`] and receive every declared and injected field through
/// [`Importable::set_field`], absent values included (as [`Value::Null`]). Custom field kinds
/// receive the cell text as [`Value::String`] and are expected to parse it themselves.
pub trait Importable: Default {
    fn set_field(&mut self, key: &str, value: Value) -> Result<(), FieldError>;

    /// Row-level checks run after all fields are set, before registered validators.
    fn validate(&self, _location: &RowLocation<'_>) -> Vec<RowProblem> {
        Vec::new()
    }
}

/// Options controlling how an [`Importer`] runs.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct ImportOptions {
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn ImportObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: ImportSeverity,
    /// Resolves formula cells.
    pub evaluator: Arc<dyn FormulaEvaluator>,
}

impl fmt::Debug for ImportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportOptions")
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish_non_exhaustive()
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            observer: None,
            alert_at_or_above: ImportSeverity::Critical,
            evaluator: Arc::new(CachedValueEvaluator),
        }
    }
}

type Validator<'a, T> = Box<dyn Fn(&T, &RowLocation<'_>) -> Result<Vec<RowProblem>, BoxError> + 'a>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsumerScope {
    Always,
    Valid,
    Invalid,
}

struct Consumer<'a, T> {
    scope: ConsumerScope,
    sink: Box<dyn FnMut(&T, &[RowProblem]) + 'a>,
}

/// Builder for [`Importer`]. Validators and consumers run in registration order.
pub struct ImporterBuilder<'a, T> {
    schema: Arc<SchemaDescriptor>,
    validators: Vec<Validator<'a, T>>,
    consumers: Vec<Consumer<'a, T>>,
    options: ImportOptions,
}

impl<'a, T: Importable> ImporterBuilder<'a, T> {
    /// Add a validator. Returning `Err` marks the row invalid with a generic problem.
    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&T, &RowLocation<'_>) -> Result<Vec<RowProblem>, BoxError> + 'a,
    {
        self.validators.push(Box::new(validator));
        self
    }

    /// Called for every submitted row.
    pub fn consumer(self, mut sink: impl FnMut(&T) + 'a) -> Self {
        self.push_consumer(ConsumerScope::Always, move |r, _| sink(r))
    }

    /// Called for every submitted row, with its problems.
    pub fn consumer_with_problems(self, sink: impl FnMut(&T, &[RowProblem]) + 'a) -> Self {
        self.push_consumer(ConsumerScope::Always, sink)
    }

    /// Called for rows without problems.
    pub fn valid_consumer(self, mut sink: impl FnMut(&T) + 'a) -> Self {
        self.push_consumer(ConsumerScope::Valid, move |r, _| sink(r))
    }

    /// Called for rows with at least one problem.
    pub fn invalid_consumer(self, mut sink: impl FnMut(&T) + 'a) -> Self {
        self.push_consumer(ConsumerScope::Invalid, move |r, _| sink(r))
    }

    /// Called for rows with at least one problem, with those problems.
    pub fn invalid_consumer_with_problems(self, sink: impl FnMut(&T, &[RowProblem]) + 'a) -> Self {
        self.push_consumer(ConsumerScope::Invalid, sink)
    }

    pub fn options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Importer<'a, T> {
        Importer {
            schema: self.schema,
            validators: self.validators,
            consumers: self.consumers,
            options: self.options,
            unmatched_options: ColumnOptions::default(),
        }
    }

    fn push_consumer(mut self, scope: ConsumerScope, sink: impl FnMut(&T, &[RowProblem]) + 'a) -> Self {
        self.consumers.push(Consumer {
            scope,
            sink: Box::new(sink),
        });
        self
    }
}

/// Imports workbooks into records of type `T` according to a [`SchemaDescriptor`].
///
/// An importer can be reused; every `process*` call returns a fresh [`ImportSession`].
pub struct Importer<'a, T> {
    schema: Arc<SchemaDescriptor>,
    validators: Vec<Validator<'a, T>>,
    consumers: Vec<Consumer<'a, T>>,
    options: ImportOptions,
    unmatched_options: ColumnOptions,
}

impl<T> fmt::Debug for Importer<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Importer")
            .field("fields", &self.schema.fields().len())
            .field("validators", &self.validators.len())
            .field("consumers", &self.consumers.len())
            .field("options", &self.options)
            .finish()
    }
}

impl<'a, T: Importable> Importer<'a, T> {
    pub fn builder(schema: Arc<SchemaDescriptor>) -> ImporterBuilder<'a, T> {
        ImporterBuilder {
            schema,
            validators: Vec::new(),
            consumers: Vec::new(),
            options: ImportOptions::default(),
        }
    }

    /// Import an in-memory workbook.
    pub fn process_workbook(&mut self, workbook: &Workbook) -> ImportSession<T> {
        self.run(ImportSource::Workbook, workbook)
    }

    /// Import a workbook file. A file that cannot be opened yields one `File` problem and no rows.
    #[cfg(feature = "excel")]
    pub fn process_path(&mut self, path: impl AsRef<Path>) -> ImportSession<T> {
        let path = path.as_ref();
        let loaded = crate::workbook::excel::open_path(path);
        self.process_loaded(ImportSource::Path(path.to_path_buf()), loaded)
    }

    /// Import a workbook held in memory.
    #[cfg(feature = "excel")]
    pub fn process_bytes(&mut self, bytes: Vec<u8>) -> ImportSession<T> {
        let source = ImportSource::Bytes(bytes.len());
        let loaded = crate::workbook::excel::open_bytes(bytes);
        self.process_loaded(source, loaded)
    }

    /// Import a workbook read from a stream.
    #[cfg(feature = "excel")]
    pub fn process_reader(&mut self, reader: impl Read) -> ImportSession<T> {
        let loaded = crate::workbook::excel::open_reader(reader);
        self.process_loaded(ImportSource::Reader, loaded)
    }

    #[cfg_attr(not(feature = "excel"), allow(dead_code))]
    fn process_loaded(&mut self, source: ImportSource, loaded: ImportResult<Workbook>) -> ImportSession<T> {
        match loaded {
            Ok(workbook) => self.run(source, &workbook),
            Err(err) => {
                warn!(source = %source, error = %err, "workbook could not be opened");
                let ctx = self.context(source);
                let mut session = ImportSession::new();
                self.report(&ctx, &mut session, Problem::File);
                session
            }
        }
    }

    fn context(&self, source: ImportSource) -> ImportContext {
        ImportContext {
            source,
            record_type: std::any::type_name::<T>(),
        }
    }

    fn run(&mut self, source: ImportSource, workbook: &Workbook) -> ImportSession<T> {
        let ctx = self.context(source);
        let mut session = ImportSession::new();

        let selected = select_sheets(&self.schema, workbook);
        for problem in selected.problems {
            self.report(&ctx, &mut session, problem);
        }
        for index in selected.indices {
            // Out-of-range indices were already reported by the selector.
            let Some(sheet) = workbook.sheet(index) else {
                continue;
            };
            session.count_sheet();
            self.process_sheet(&ctx, sheet, &mut session);
        }

        let stats = session.summary();
        debug!(source = %ctx.source, %stats, "import complete");
        if let Some(obs) = self.options.observer.as_ref() {
            obs.on_success(&ctx, stats);
        }
        session
    }

    fn process_sheet(&mut self, ctx: &ImportContext, sheet: &Sheet, session: &mut ImportSession<T>) {
        let header = if self.schema.has_header() {
            sheet.rows().first()
        } else {
            None
        };
        let mut columns = resolve_columns(&self.schema, header);
        let missing = columns.check_required(&self.schema, sheet.name());
        if !missing.is_empty() {
            debug!(sheet = sheet.name(), missing = missing.len(), "sheet skipped: columns not resolved");
            for problem in missing {
                self.report(ctx, session, problem);
            }
            return;
        }

        let data_rows = match header {
            Some(_) => &sheet.rows()[1..],
            None => sheet.rows(),
        };
        debug!(sheet = sheet.name(), index = sheet.index(), rows = data_rows.len(), "importing sheet");
        for row in data_rows {
            if row.is_blank() {
                trace!(sheet = sheet.name(), row = row.row_no, "blank row skipped");
                continue;
            }
            self.process_row(sheet, row, &columns, session);
        }
    }

    fn process_row(&mut self, sheet: &Sheet, row: &Row, columns: &ResolvedColumns, session: &mut ImportSession<T>) {
        let import_index = session.next_import_index();
        let mut ctx = RowContext::new(import_index, sheet.name(), sheet.index(), row.row_no, T::default());
        let coercer = CellCoercer::new(sheet, row, self.options.evaluator.as_ref());

        for (key, kind) in self.schema.injected() {
            let value = match kind {
                InjectKind::ImportIndex => Value::Long(import_index as i64),
                InjectKind::RowNumber => Value::Long(row.row_no as i64),
                InjectKind::SheetName => Value::String(sheet.name().to_string()),
                InjectKind::SheetIndex => Value::Long(sheet.index() as i64),
                InjectKind::UnmatchedColumns => self.unmatched_value(&coercer, columns, &mut ctx),
            };
            set_field(&mut ctx, key, value, None);
        }

        for field in self.schema.fields() {
            let matched = columns.columns(field.key());
            let coerced = coercer.coerce_field(field, matched);
            for problem in coerced.problems {
                ctx.add_detail(RowProblemDetail::Value(problem));
            }
            let origin = matched.first().map(|col| {
                let raw = received_text(&coerced.value, row.cell(col.index), field.options());
                ValueProblem::new(ValueProblemKind::Format, col.display_name.as_deref(), col.index, raw)
            });
            set_field(&mut ctx, field.key(), coerced.value, origin);
        }

        let own = ctx.record().validate(&ctx.location());
        for problem in own {
            ctx.add_problem(problem);
        }
        for validator in &self.validators {
            match validator(ctx.record(), &ctx.location()) {
                Ok(problems) => {
                    for problem in problems {
                        ctx.add_problem(problem);
                    }
                }
                Err(err) => {
                    error!(
                        sheet = ctx.sheet_name(),
                        row = ctx.row_no(),
                        error = %err,
                        "validator failed"
                    );
                    ctx.add_detail(RowProblemDetail::Generic);
                }
            }
        }

        let stored = session.submit(ctx);
        trace!(
            sheet = stored.sheet_name(),
            row = stored.row_no(),
            import_index = stored.import_index(),
            valid = stored.is_valid(),
            "row submitted"
        );
        let scope = if stored.is_valid() {
            ConsumerScope::Valid
        } else {
            ConsumerScope::Invalid
        };
        for consumer in self.consumers.iter_mut().filter(|c| c.scope == ConsumerScope::Always) {
            (consumer.sink)(stored.record(), stored.problems());
        }
        for consumer in self.consumers.iter_mut().filter(|c| c.scope == scope) {
            (consumer.sink)(stored.record(), stored.problems());
        }
    }

    fn unmatched_value(&self, coercer: &CellCoercer<'_>, columns: &ResolvedColumns, ctx: &mut RowContext<T>) -> Value {
        let kind = FieldKind::Scalar(ScalarType::String);
        let mut entries = Vec::with_capacity(columns.unmatched().len());
        for col in columns.unmatched() {
            let bound = BoundColumn {
                options: &self.unmatched_options,
                value_regex: None,
                column_name: col.display_name.as_deref(),
                index: col.index,
            };
            let coerced = coercer.coerce(&kind, &bound);
            for problem in coerced.problems {
                ctx.add_detail(RowProblemDetail::Value(problem));
            }
            let key = col.display_name.clone().unwrap_or_else(|| col.index.to_string());
            entries.push((MapKey::Name(key), coerced.value));
        }
        Value::Map(entries)
    }

    fn report(&self, ctx: &ImportContext, session: &mut ImportSession<T>, problem: Problem) {
        let severity = ImportSeverity::for_problem(&problem);
        if let Some(obs) = self.options.observer.as_ref() {
            obs.on_problem(ctx, severity, &problem);
            if severity >= self.options.alert_at_or_above {
                obs.on_alert(ctx, severity, &problem);
            }
        }
        session.add_problem(problem);
    }
}

/// Hand a value to the record, converting refusals into row problems.
///
/// `origin` describes the source cell; without one (injected fields) failures become generic.
fn set_field<T: Importable>(ctx: &mut RowContext<T>, key: &str, value: Value, origin: Option<ValueProblem>) {
    match ctx.record_mut().set_field(key, value) {
        Ok(()) => {}
        Err(FieldError::Rejected(details)) => {
            for detail in details {
                ctx.add_detail(detail);
            }
        }
        Err(FieldError::Failed(err)) => {
            error!(
                sheet = ctx.sheet_name(),
                row = ctx.row_no(),
                field = key,
                error = %err,
                "record rejected field value"
            );
            let detail = origin.map_or(RowProblemDetail::Generic, RowProblemDetail::Value);
            ctx.add_detail(detail);
        }
    }
}

/// The text a failing setter was handed: the coerced string itself, or the cell text run through
/// the same pre-processing and trimming.
fn received_text(value: &Value, cell: Option<&Cell>, options: &ColumnOptions) -> Option<String> {
    if let Value::String(text) = value {
        return Some(text.clone());
    }
    cell.map(|c| {
        let text = options.pre_process_text(c.formatted());
        if options.trim { text.trim().to_string() } else { text }
    })
}
