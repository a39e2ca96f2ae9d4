//! `VersionedStore` sobre un directorio local de contenido.
//!
//! El token es el blake3 de los bytes del archivo. La precondición se
//! verifica contra el disco bajo un lock del proceso, y la escritura pasa
//! por un archivo temporal renombrado para no dejar archivos a medias.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use log::debug;
use publish_core::hashing::hash_bytes;
use publish_core::CoreEngineError;
use publish_domain::VersionToken;
use tokio::sync::Mutex;

use crate::ports::{VersionedStore, WriteReceipt};

pub struct FsVersionedStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

fn io_error(path: &Path, e: std::io::Error) -> CoreEngineError {
    match e.kind() {
        ErrorKind::PermissionDenied => CoreEngineError::Unauthorized(format!("{}: {e}", path.display())),
        _ => CoreEngineError::TransientIo(format!("{}: {e}", path.display())),
    }
}

impl FsVersionedStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(),
               write_lock: Mutex::new(()) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resuelve `path` dentro de la raíz; rechaza rutas absolutas o con `..`.
    fn resolve(&self, path: &str) -> Result<PathBuf, CoreEngineError> {
        let rel = Path::new(path);
        if rel.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(CoreEngineError::InvalidDraft(format!("path escapes content root: {path}")));
        }
        Ok(self.root.join(rel))
    }

    async fn current(&self, full: &Path) -> Result<Option<VersionToken>, CoreEngineError> {
        match tokio::fs::read(full).await {
            Ok(bytes) => Ok(Some(VersionToken::new(hash_bytes(&bytes)))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(full, e)),
        }
    }
}

#[async_trait]
impl VersionedStore for FsVersionedStore {
    async fn read_version(&self, path: &str) -> Result<Option<VersionToken>, CoreEngineError> {
        let full = self.resolve(path)?;
        self.current(&full).await
    }

    async fn write(&self,
                   path: &str,
                   content: &str,
                   message: &str,
                   expected: Option<&VersionToken>)
                   -> Result<WriteReceipt, CoreEngineError> {
        let full = self.resolve(path)?;
        let _guard = self.write_lock.lock().await;
        let current = self.current(&full).await?;
        if current.as_ref() != expected {
            return Err(CoreEngineError::Conflict(format!("{path}: expected {}, found {}",
                                                         expected.map(|t| t.as_str()).unwrap_or("absent"),
                                                         current.as_ref().map(|t| t.as_str()).unwrap_or("absent"))));
        }
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| io_error(parent, e))?;
        }
        let tmp = full.with_extension("md.tmp");
        tokio::fs::write(&tmp, content.as_bytes()).await.map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &full).await.map_err(|e| io_error(&full, e))?;
        debug!("fs:write path={path} message={message:?}");
        Ok(WriteReceipt { version: VersionToken::new(hash_bytes(content.as_bytes())),
                          commit_id: None })
    }
}
