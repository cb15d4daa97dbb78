use thiserror::Error;

/// Convenience result type for ingestion and analysis operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Error type returned by the ingestion pipeline and the analyses built on it.
///
/// Every per-file variant carries the offending file name so callers can report it as-is.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error while reading a file into memory.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The file's suffix is not a supported format, or its content could not be decoded.
    #[error("unsupported or undecodable file '{file}': {message}")]
    Format { file: String, message: String },

    /// One or more required columns are absent from a file.
    #[error("invalid format in '{file}': missing required columns {missing:?}")]
    SchemaMismatch { file: String, missing: Vec<String> },

    /// A numeric column held a value that is not a number.
    #[error("non-numeric value in '{file}' at row {row} column '{column}': {message} (raw='{raw}')")]
    Type {
        file: String,
        column: String,
        row: usize,
        raw: String,
        message: String,
    },

    /// An operation referenced a column the table does not have.
    #[error("unknown column '{column}'")]
    UnknownColumn { column: String },
}

impl IngestionError {
    /// Name of the file this error is about, if it is file-scoped.
    pub fn file(&self) -> Option<&str> {
        match self {
            IngestionError::Format { file, .. }
            | IngestionError::SchemaMismatch { file, .. }
            | IngestionError::Type { file, .. } => Some(file.as_str()),
            IngestionError::Io(_) | IngestionError::UnknownColumn { .. } => None,
        }
    }

    pub(crate) fn format(file: &str, message: impl Into<String>) -> Self {
        IngestionError::Format {
            file: file.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn unknown_column(column: &str) -> Self {
        IngestionError::UnknownColumn {
            column: column.to_string(),
        }
    }
}
