use sea_orm::{sqlx, DbErr, RuntimeErr, SqlErr};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum IngestError {
    #[error("{source_name} unavailable: {message}")]
    SourceUnavailable {
        source_name: &'static str,
        message: String,
    },

    #[error("Malformed {source_name} response: {message}")]
    MalformedResponse {
        source_name: &'static str,
        message: String,
    },

    #[error("Error converting data, {value:?} on {key}")]
    DataCoercion { key: String, value: String },

    #[error("Database error: {0}")]
    Persistence(#[from] DbErr),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    pub fn unavailable(source_name: &'static str, message: impl ToString) -> Self {
        IngestError::SourceUnavailable {
            source_name,
            message: message.to_string(),
        }
    }

    pub fn malformed(source_name: &'static str, message: impl ToString) -> Self {
        IngestError::MalformedResponse {
            source_name,
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

/// SQLSTATE `numeric_value_out_of_range`
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Postgres messages for SQLSTATE 22003, used when no code is available
const RANGE_OVERFLOW_MARKERS: [&str; 3] = [
    "is out of range for type",
    "numeric field overflow",
    "greater than maximum value",
];

/// SQLSTATE reported by the database driver, if any
fn sqlstate(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(e))) => {
            e.code().map(|code| code.into_owned())
        }
        _ => None,
    }
}

/// True when the insert failed because a numeric value exceeds the column's range
pub fn is_range_overflow(err: &DbErr) -> bool {
    if let Some(code) = sqlstate(err) {
        return code == NUMERIC_OUT_OF_RANGE;
    }
    let message = err.to_string().to_lowercase();
    RANGE_OVERFLOW_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// True when the insert collided with an existing natural key
pub fn is_unique_violation(err: &DbErr) -> bool {
    if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
        return true;
    }
    let message = err.to_string();
    message.contains("duplicate key value") || message.contains("UNIQUE constraint failed")
}
