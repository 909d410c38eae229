//! `sheet-import` imports spreadsheet rows into strongly-typed records, collecting precise
//! diagnostics for defective cells instead of aborting on the first error.
//!
//! The primary entrypoint is [`Importer`], driven by a [`schema::SchemaDescriptor`] that says
//! which sheets to read, how columns are located and how every field is coerced.
//!
//! ## What an import does
//!
//! 1. **Sheet selection**: sheets are picked by name pattern or by position.
//! 2. **Column resolution**: header texts are matched against each field's pattern (named mode),
//!    or fields sit at fixed positions (ordinal mode). Fields may bind several columns (lists and
//!    maps), and headers no field claims are kept as "unmatched columns".
//! 3. **Row mapping**: every non-blank row becomes a record. Each cell is coerced to its field's
//!    [`types::Value`] (numbers with range checks, booleans, dates, enums, text with pre-processing
//!    and pattern checks, formulas).
//! 4. **Validation and consumers**: user validators run per row, then consumers receive rows by
//!    validity.
//!
//! ## Failure model
//!
//! - An unreadable file yields one [`problems::Problem::File`] and no rows.
//! - A missing sheet or a missing required column yields a problem and no rows for that sheet.
//! - A bad cell marks its row invalid; the row is still produced and the import continues.
//!
//! Misconfigured schemas are rejected up front with an [`ImportError`].
//!
//! ## Quick example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use sheet_import::problems::ProblemKind;
//! use sheet_import::schema::{FieldSpec, SchemaDescriptor};
//! use sheet_import::types::{FieldKind, ScalarType, Value};
//! use sheet_import::workbook::{Cell, Sheet, Workbook};
//! use sheet_import::{FieldError, Importable, Importer};
//!
//! #[derive(Debug, Default)]
//! struct Salary {
//!     amount: Option<i32>,
//! }
//!
//! impl Importable for Salary {
//!     fn set_field(&mut self, key: &str, value: Value) -> Result<(), FieldError> {
//!         if key == "amount" {
//!             self.amount = value.as_i64().map(|v| v as i32);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), sheet_import::ImportError> {
//! let schema = Arc::new(
//!     SchemaDescriptor::builder()
//!         .sheet_indices([0])
//!         .field(FieldSpec::named("amount", "(?i)salary", FieldKind::scalar(ScalarType::Int)))
//!         .build()?,
//! );
//! let workbook = Workbook::new(vec![Sheet::new("Payroll")
//!     .with_row(vec![Cell::from("Salary")])
//!     .with_row(vec![Cell::from(4200.0)])
//!     .with_row(vec![Cell::from("lots")])]);
//!
//! let session = Importer::<Salary>::builder(schema).build().process_workbook(&workbook);
//! assert_eq!(session.valid_row_count(), 1);
//! assert_eq!(session.problems_in(ProblemKind::ValueFormat).len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! With the default `excel` feature, [`Importer::process_path`] and friends read `.xlsx`, `.xlsm`,
//! `.xlsb`, `.xls` and `.ods` files through `calamine`.
//!
//! ## Modules
//!
//! - [`schema`]: schema descriptors, column options and JSON configuration
//! - [`ingestion`]: the import engine and its session/observer types
//! - [`workbook`]: the in-memory workbook model (and the `calamine` loader)
//! - [`problems`]: diagnostics
//! - [`types`]: field kinds and coerced values
//! - [`error`]: setup errors

pub mod error;
pub mod ingestion;
pub mod problems;
pub mod schema;
pub mod types;
pub mod workbook;

pub use error::{ImportError, ImportResult};
pub use ingestion::{FieldError, ImportOptions, ImportSession, Importable, Importer};
