//! Puertos hacia los colaboradores externos.
//!
//! Los errores ya vienen clasificados en la taxonomía del core; los steps los
//! devuelven tal cual y el engine decide reintento o fallo.
use std::sync::Arc;

use async_trait::async_trait;
use publish_core::CoreEngineError;
use publish_domain::{Draft, DraftStatus, VersionToken};

#[async_trait]
pub trait DraftStore: Send + Sync {
    /// `NotFound` si no hay registro con ese id.
    async fn fetch_draft(&self, draft_id: &str) -> Result<Draft, CoreEngineError>;

    async fn update_status(&self,
                           draft_id: &str,
                           status: DraftStatus,
                           published_at: Option<i64>)
                           -> Result<(), CoreEngineError>;
}

/// Respuesta de una escritura condicional aceptada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub version: VersionToken,
    pub commit_id: Option<String>,
}

#[async_trait]
pub trait VersionedStore: Send + Sync {
    /// Token actual del path; `None` si no existe.
    async fn read_version(&self, path: &str) -> Result<Option<VersionToken>, CoreEngineError>;

    /// Escribe `content` sólo si el token vigente coincide con `expected`
    /// (`None` = el path no debe existir). Un token obsoleto es `Conflict`.
    async fn write(&self,
                   path: &str,
                   content: &str,
                   message: &str,
                   expected: Option<&VersionToken>)
                   -> Result<WriteReceipt, CoreEngineError>;
}

#[async_trait]
impl<T: DraftStore + ?Sized> DraftStore for Arc<T> {
    async fn fetch_draft(&self, draft_id: &str) -> Result<Draft, CoreEngineError> {
        (**self).fetch_draft(draft_id).await
    }

    async fn update_status(&self,
                           draft_id: &str,
                           status: DraftStatus,
                           published_at: Option<i64>)
                           -> Result<(), CoreEngineError> {
        (**self).update_status(draft_id, status, published_at).await
    }
}

#[async_trait]
impl<T: VersionedStore + ?Sized> VersionedStore for Arc<T> {
    async fn read_version(&self, path: &str) -> Result<Option<VersionToken>, CoreEngineError> {
        (**self).read_version(path).await
    }

    async fn write(&self,
                   path: &str,
                   content: &str,
                   message: &str,
                   expected: Option<&VersionToken>)
                   -> Result<WriteReceipt, CoreEngineError> {
        (**self).write(path, content, message, expected).await
    }
}
