use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::problems::{Problem, ProblemKind};

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ImportSeverity {
    /// Warning-level event (the import continued).
    Warning,
    /// A sheet or some of its columns could not be imported.
    Error,
    /// The source could not be read at all.
    Critical,
}

impl ImportSeverity {
    /// Severity of an import-scope problem.
    pub fn for_problem(problem: &Problem) -> Self {
        match problem.kind() {
            ProblemKind::File => Self::Critical,
            ProblemKind::SheetNotPresent | ProblemKind::ColumnNotPresent => Self::Error,
            _ => Self::Warning,
        }
    }
}

/// Where the imported workbook came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    /// An in-memory [`crate::workbook::Workbook`].
    Workbook,
    /// A file path.
    Path(PathBuf),
    /// An in-memory byte buffer of the given length.
    Bytes(usize),
    /// A caller-supplied reader.
    Reader,
}

impl fmt::Display for ImportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workbook => write!(f, "<workbook>"),
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Bytes(len) => write!(f, "<{len} bytes>"),
            Self::Reader => write!(f, "<reader>"),
        }
    }
}

/// Context about an import attempt.
#[derive(Debug, Clone)]
pub struct ImportContext {
    pub source: ImportSource,
    /// Rust type name of the imported record.
    pub record_type: &'static str,
}

/// Counters reported when an import completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    /// Rows mapped (valid + invalid).
    pub rows: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Sheets actually scanned.
    pub sheets: usize,
    /// Import-scope problems (file, sheet and column level).
    pub import_problems: usize,
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows={} valid={} invalid={} sheets={} import_problems={}",
            self.rows, self.valid, self.invalid, self.sheets, self.import_problems
        )
    }
}

/// Observer interface for import outcomes.
///
/// Import-scope problems are reported one by one through [`Self::on_problem`]; row problems are
/// only counted in the final [`ImportStats`].
pub trait ImportObserver: Send + Sync {
    /// Called when the workbook was read, whatever the validity of its rows.
    fn on_success(&self, _ctx: &ImportContext, _stats: ImportStats) {}

    /// Called for every import-scope problem.
    fn on_problem(&self, _ctx: &ImportContext, _severity: ImportSeverity, _problem: &Problem) {}

    /// Called when a problem meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_problem`].
    fn on_alert(&self, ctx: &ImportContext, severity: ImportSeverity, problem: &Problem) {
        self.on_problem(ctx, severity, problem)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ImportObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn ImportObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ImportObserver for CompositeObserver {
    fn on_success(&self, ctx: &ImportContext, stats: ImportStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_problem(&self, ctx: &ImportContext, severity: ImportSeverity, problem: &Problem) {
        for o in &self.observers {
            o.on_problem(ctx, severity, problem);
        }
    }

    fn on_alert(&self, ctx: &ImportContext, severity: ImportSeverity, problem: &Problem) {
        for o in &self.observers {
            o.on_alert(ctx, severity, problem);
        }
    }
}

/// Emits import events as `tracing` events under the `sheet_import` target.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ImportObserver for TracingObserver {
    fn on_success(&self, ctx: &ImportContext, stats: ImportStats) {
        info!(
            target: "sheet_import",
            source = %ctx.source,
            record = ctx.record_type,
            rows = stats.rows,
            valid = stats.valid,
            invalid = stats.invalid,
            sheets = stats.sheets,
            "import finished"
        );
    }

    fn on_problem(&self, ctx: &ImportContext, severity: ImportSeverity, problem: &Problem) {
        match severity {
            ImportSeverity::Warning => {
                warn!(target: "sheet_import", source = %ctx.source, ?severity, "{problem}")
            }
            ImportSeverity::Error | ImportSeverity::Critical => {
                error!(target: "sheet_import", source = %ctx.source, ?severity, "{problem}")
            }
        }
    }

    fn on_alert(&self, ctx: &ImportContext, severity: ImportSeverity, problem: &Problem) {
        error!(target: "sheet_import", source = %ctx.source, ?severity, alert = true, "{problem}");
    }
}
