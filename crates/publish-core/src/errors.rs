//! Errores del core y su clasificación.
//!
//! Un único enum cubre dos familias:
//! - La taxonomía de fallos de step (`NotFound`, `InvalidDraft`,
//!   `Unauthorized`, `TransientIo`, `Conflict`). Los steps clasifican sus
//!   errores en el borde y el engine decide retry vs fallo terminal.
//! - Errores propios del motor (flujo terminado, store, internos).
//!
//! El enum es serializable porque se guarda tal cual dentro de los eventos
//! `StepFailed` / `RunFailed`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum CoreEngineError {
    #[error("not found: {0}")] NotFound(String),
    #[error("invalid draft: {0}")] InvalidDraft(String),
    #[error("unauthorized: {0}")] Unauthorized(String),
    #[error("transient io: {0}")] TransientIo(String),
    #[error("version conflict: {0}")] Conflict(String),
    #[error("run not found: {0}")] RunNotFound(Uuid),
    #[error("flow definition has no steps")] EmptyDefinition,
    #[error("missing memoized artifact: {0}")] ArtifactMissing(String),
    #[error("storage error: {0}")] StorageError(String),
    #[error("internal: {0}")] Internal(String),
}

/// Clase gruesa de un error, usada para decidir reintentos y para auditar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Hipo de red/almacenamiento o conflicto de versión: reintentable.
    Transient,
    /// Input malformado o no soportado.
    Validation,
    /// Rechazo definitivo (credenciales, recurso ausente).
    Permanent,
    /// Errores del propio motor.
    Runtime,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Transient => "transient",
            ErrorClass::Validation => "validation",
            ErrorClass::Permanent => "permanent",
            ErrorClass::Runtime => "runtime",
        }
    }
}

pub fn classify_error(err: &CoreEngineError) -> ErrorClass {
    match err {
        CoreEngineError::TransientIo(_) | CoreEngineError::Conflict(_) => ErrorClass::Transient,
        CoreEngineError::InvalidDraft(_) => ErrorClass::Validation,
        CoreEngineError::NotFound(_) | CoreEngineError::Unauthorized(_) => ErrorClass::Permanent,
        _ => ErrorClass::Runtime,
    }
}

impl CoreEngineError {
    /// Sólo los errores transitorios consumen presupuesto de reintentos;
    /// el resto lleva el run a `Failed` directamente.
    pub fn is_retryable(&self) -> bool {
        matches!(classify_error(self), ErrorClass::Transient)
    }

    /// Nombre estable de la variante, apto para mostrar al usuario
    /// ("Publish failed at commit-to-store: Conflict").
    pub fn kind(&self) -> &'static str {
        match self {
            CoreEngineError::NotFound(_) => "NotFound",
            CoreEngineError::InvalidDraft(_) => "InvalidDraft",
            CoreEngineError::Unauthorized(_) => "Unauthorized",
            CoreEngineError::TransientIo(_) => "TransientIO",
            CoreEngineError::Conflict(_) => "Conflict",
            CoreEngineError::RunNotFound(_) => "RunNotFound",
            CoreEngineError::EmptyDefinition => "EmptyDefinition",
            CoreEngineError::ArtifactMissing(_) => "ArtifactMissing",
            CoreEngineError::StorageError(_) => "StorageError",
            CoreEngineError::Internal(_) => "Internal",
        }
    }
}
