use thiserror::Error;

use crate::ledger::Period;

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("Duplicate canonical field name in catalog: '{0}'")]
    DuplicateField(String),

    #[error("Alias '{alias}' is claimed by both '{first}' and '{second}'")]
    AliasCollision {
        alias: String,
        first: String,
        second: String,
    },

    #[error("Catalog profile contains no field definitions")]
    EmptyCatalog,

    #[error("Catalog contains an empty field name or alias")]
    EmptyFieldName,

    #[error("Field pattern failed to compile: {0}")]
    Regex(#[from] regex::Error),

    #[error("Document unreadable: {0}")]
    DocumentUnreadable(String),

    #[error("A record for period {period} already exists; re-run with overwrite to replace it")]
    AlreadyExists { period: Period },

    #[error("Invalid period '{value}': {details}")]
    InvalidPeriod { value: String, details: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StatementError>;
