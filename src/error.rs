// ⚠️ Error taxonomy for the categorization engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Resource (file, table) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed tabular content or a cell that is not the expected kind of value
    #[error("Could not parse {resource}: {message}")]
    Parse { resource: String, message: String },

    /// Date cell that does not follow YYYY-MM-DD
    #[error("Invalid date '{value}' on row {row}: expected YYYY-MM-DD")]
    Format { row: usize, value: String },

    #[error("Required column '{column}' not found in {resource}")]
    Schema { column: String, resource: String },

    #[error("Failed to persist mapping to {resource}: {message}")]
    Persist { resource: String, message: String },

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn schema(column: &str, resource: &str) -> Self {
        Error::Schema {
            column: column.to_string(),
            resource: resource.to_string(),
        }
    }

    pub fn parse(resource: &str, message: impl Into<String>) -> Self {
        Error::Parse {
            resource: resource.to_string(),
            message: message.into(),
        }
    }

    /// Structural failures abort the whole run; the rest are reported and tolerated
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::Parse { .. } | Error::Format { .. } | Error::Schema { .. }
        )
    }
}

/// Failure to reach or use the relational sink, classified by cause
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Certificate error: {0}")]
    Certificate(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for ConnectionError {
    fn from(err: rusqlite::Error) -> Self {
        crate::db::classify_connection_error(&err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Connection(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
