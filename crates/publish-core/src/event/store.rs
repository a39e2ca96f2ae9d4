use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{FlowEvent, FlowEventKind};
use crate::errors::CoreEngineError;
use crate::model::Artifact;

/// Almacenamiento de eventos append-only más el store de artifacts
/// direccionado por contenido.
///
/// Las implementaciones deben ser seguras para compartir entre runs
/// concurrentes (`&self` + `Send + Sync`).
pub trait EventStore: Send + Sync {
    /// Agrega un evento y devuelve el evento completo (con seq y ts).
    fn append_kind(&self, run_id: Uuid, kind: FlowEventKind) -> Result<FlowEvent, CoreEngineError>;

    /// Lista eventos de un run (orden ascendente por seq).
    fn list(&self, run_id: Uuid) -> Result<Vec<FlowEvent>, CoreEngineError>;

    /// Guarda un artifact ya hasheado (idempotente por hash).
    fn put_artifact(&self, artifact: &Artifact) -> Result<(), CoreEngineError>;

    fn get_artifact(&self, hash: &str) -> Result<Option<Artifact>, CoreEngineError>;

    /// Guarda artifacts y agrega el evento que los referencia. Backends con
    /// transacciones lo sobreescriben para hacerlo atómico.
    fn append_with_artifacts(&self,
                             run_id: Uuid,
                             kind: FlowEventKind,
                             artifacts: &[Artifact])
                             -> Result<FlowEvent, CoreEngineError> {
        for a in artifacts {
            self.put_artifact(a)?;
        }
        self.append_kind(run_id, kind)
    }
}

impl<S: EventStore + ?Sized> EventStore for Arc<S> {
    fn append_kind(&self, run_id: Uuid, kind: FlowEventKind) -> Result<FlowEvent, CoreEngineError> {
        (**self).append_kind(run_id, kind)
    }

    fn list(&self, run_id: Uuid) -> Result<Vec<FlowEvent>, CoreEngineError> {
        (**self).list(run_id)
    }

    fn put_artifact(&self, artifact: &Artifact) -> Result<(), CoreEngineError> {
        (**self).put_artifact(artifact)
    }

    fn get_artifact(&self, hash: &str) -> Result<Option<Artifact>, CoreEngineError> {
        (**self).get_artifact(hash)
    }

    fn append_with_artifacts(&self,
                             run_id: Uuid,
                             kind: FlowEventKind,
                             artifacts: &[Artifact])
                             -> Result<FlowEvent, CoreEngineError> {
        (**self).append_with_artifacts(run_id, kind, artifacts)
    }
}

#[derive(Default)]
pub struct InMemoryEventStore {
    pub inner: DashMap<Uuid, Vec<FlowEvent>>,
    pub artifacts: DashMap<String, Artifact>,
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&self, run_id: Uuid, kind: FlowEventKind) -> Result<FlowEvent, CoreEngineError> {
        let mut vec = self.inner.entry(run_id).or_default();
        let seq = vec.len() as u64;
        let ev = FlowEvent { seq,
                             run_id,
                             kind,
                             ts: Utc::now() };
        vec.push(ev.clone());
        Ok(ev)
    }

    fn list(&self, run_id: Uuid) -> Result<Vec<FlowEvent>, CoreEngineError> {
        Ok(self.inner.get(&run_id).map(|v| v.clone()).unwrap_or_default())
    }

    fn put_artifact(&self, artifact: &Artifact) -> Result<(), CoreEngineError> {
        self.artifacts
            .entry(artifact.hash.clone())
            .or_insert_with(|| artifact.clone());
        Ok(())
    }

    fn get_artifact(&self, hash: &str) -> Result<Option<Artifact>, CoreEngineError> {
        Ok(self.artifacts.get(hash).map(|a| a.clone()))
    }
}
