use thiserror::Error;

/// Error del dominio: un draft que no puede proyectarse a documento.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("unknown content type: {0}")]
    UnknownContentType(String),
    #[error("title '{0}' produces an empty slug")]
    EmptySlug(String),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),
}
