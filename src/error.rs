use thiserror::Error;

/// Convenience result type for schema construction and workbook loading.
pub type ImportResult<T> = Result<T, ImportError>;

/// Error type returned when an import cannot even be set up.
///
/// Defects in the imported *data* never surface as an `ImportError`; they are collected as
/// [`crate::problems::Problem`]s on the [`crate::ingestion::ImportSession`] instead. This enum
/// covers misconfigured schemas, unreadable configuration files and workbooks that fail to open.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Workbook parsing error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// A schema configuration document could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// The schema descriptor is inconsistent (conflicting sheet selectors, bad multiplicity, ...).
    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    /// A sheet, column or value pattern is not a valid regular expression.
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl ImportError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }
}
