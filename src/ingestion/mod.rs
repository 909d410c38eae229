//! The import engine.
//!
//! Most callers only need [`Importer`] (from [`importer`]) which:
//!
//! - selects sheets ([`sheets`]) and resolves their columns ([`columns`])
//! - coerces every cell of every non-blank row ([`coercion`]) into an [`Importable`] record
//! - runs validators and consumers, and collects everything into an [`ImportSession`]
//! - optionally reports outcomes/alerts to an [`ImportObserver`]

pub mod coercion;
pub mod columns;
pub mod importer;
pub mod observability;
pub mod row;
pub mod session;
pub mod sheets;

pub use columns::{resolve_columns, ResolvedColumn, ResolvedColumns};
pub use importer::{BoxError, FieldError, ImportOptions, Importable, Importer, ImporterBuilder};
pub use observability::{
    CompositeObserver, ImportContext, ImportObserver, ImportSeverity, ImportSource, ImportStats,
    TracingObserver,
};
pub use row::{RowContext, RowLocation};
pub use session::ImportSession;
pub use sheets::{select_sheets, SelectedSheets};
