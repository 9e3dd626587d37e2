//! Errors of the local ledger.
//!
//! - [`KeyNotFound`] a record id that is not stored.
//! - [`InvalidAmount`] an amount, name or numeric field out of range.
//! - [`InvalidRecord`] a stored or imported record that cannot be read back.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidRecord`]: EngineError::InvalidRecord
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("record \"{0}\" not found")]
    KeyNotFound(String),
    #[error("invalid value: {0}")]
    InvalidAmount(String),
    #[error("unreadable record: {0}")]
    InvalidRecord(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Database errors compare by message, `DbErr` has no equality.
impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        use EngineError::*;
        match (self, other) {
            (KeyNotFound(a), KeyNotFound(b))
            | (InvalidAmount(a), InvalidAmount(b))
            | (InvalidRecord(a), InvalidRecord(b)) => a == b,
            (Database(a), Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
