pub mod config;
pub mod protocol;
pub mod query;
pub mod session;
pub mod statement;
pub mod translator;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MySqliteError {
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Feature not supported: {0}")]
    NotSupported(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No database selected")]
    NoDatabaseSelected,

    #[error("Invalid database name: {0:?}")]
    InvalidDatabaseName(String),

    #[error("Database {current} already selected, cannot switch to {requested}")]
    DatabaseAlreadySelected { current: String, requested: String },

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Unknown prepared statement handler ({0})")]
    UnknownStatement(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MySqliteError>;

impl MySqliteError {
    /// Get the MySQL server error number for this error
    pub fn mysql_error_code(&self) -> u16 {
        match self {
            MySqliteError::Protocol(_) => 1105,                      // ER_UNKNOWN_ERROR
            MySqliteError::Sqlite(_) => 1105,                        // ER_UNKNOWN_ERROR
            MySqliteError::NotSupported(_) => 1235,                  // ER_NOT_SUPPORTED_YET
            MySqliteError::InvalidParameter(_) => 1210,              // ER_WRONG_ARGUMENTS
            MySqliteError::NoDatabaseSelected => 1046,               // ER_NO_DB_ERROR
            MySqliteError::InvalidDatabaseName(_) => 1049,           // ER_BAD_DB_ERROR
            MySqliteError::DatabaseAlreadySelected { .. } => 1049,   // ER_BAD_DB_ERROR
            MySqliteError::Transaction(_) => 1179,                   // ER_CANT_DO_THIS_DURING_AN_TRANSACTION
            MySqliteError::UnknownStatement(_) => 1243,              // ER_UNKNOWN_STMT_HANDLER
            MySqliteError::Io(_) => 1105,                            // ER_UNKNOWN_ERROR
        }
    }
}
