use sea_orm::{DbErr, SqlErr};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Storage error: {0}")]
    Storage(DbErr),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<DbErr> for RegistryError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => Self::ConstraintViolation(msg),
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => Self::ConstraintViolation(msg),
            _ => Self::Storage(err),
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
