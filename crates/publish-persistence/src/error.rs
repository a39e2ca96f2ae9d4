//! Errores de persistencia.
//! Mapea errores de Diesel / conexión a variantes semánticas y, en el borde
//! del `EventStore`, a `CoreEngineError::StorageError`.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use publish_core::CoreEngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("not found")]
    NotFound,
    #[error("serialization conflict (retryable)")]
    SerializationConflict,
    #[error("transient IO / connection pool error: {0}")]
    TransientIo(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("configuration: {0}")]
    Config(String),
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl PersistenceError {
    /// Fallos transitorios (recomendado reintentar con backoff).
    ///
    /// Algunos mensajes de desconexión llegan como `Unknown` con texto; se
    /// reconocen sin acoplar a SQLSTATE.
    pub fn is_retryable(&self) -> bool {
        match self {
            PersistenceError::SerializationConflict | PersistenceError::TransientIo(_) => true,
            PersistenceError::Unknown(msg) => {
                let m = msg.to_lowercase();
                m.contains("deadlock detected")
                || m.contains("could not serialize access")
                || m.contains("terminating connection")
                || m.contains("connection closed")
                || m.contains("connection refused")
                || m.contains("timeout")
            }
            _ => false,
        }
    }
}

impl From<DieselError> for PersistenceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(info.message().to_string()),
                DatabaseErrorKind::CheckViolation => Self::CheckViolation(info.message().to_string()),
                DatabaseErrorKind::SerializationFailure => Self::SerializationConflict,
                DatabaseErrorKind::ClosedConnection => Self::TransientIo(info.message().to_string()),
                other => Self::Unknown(format!("db error kind {:?}: {}", other, info.message())),
            },
            DieselError::DeserializationError(e) => Self::Corrupt(format!("deser: {e}")),
            DieselError::SerializationError(e) => Self::Unknown(format!("ser: {e}")),
            DieselError::BrokenTransactionManager => Self::TransientIo("broken transaction manager".into()),
            other => Self::Unknown(format!("unhandled diesel error: {other:?}")),
        }
    }
}

impl From<PersistenceError> for CoreEngineError {
    fn from(e: PersistenceError) -> Self {
        CoreEngineError::StorageError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failures_are_retryable() {
        assert!(PersistenceError::TransientIo("pool".into()).is_retryable());
        assert!(PersistenceError::Unknown("server: Connection refused".into()).is_retryable());
        assert!(!PersistenceError::CheckViolation("event_type".into()).is_retryable());
    }

    #[test]
    fn maps_to_storage_error() {
        let e: CoreEngineError = PersistenceError::NotFound.into();
        assert_eq!(e, CoreEngineError::StorageError("not found".into()));
    }
}
