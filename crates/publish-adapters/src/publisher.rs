//! Superficie de disparo y resultado del pipeline.
//!
//! `trigger` registra el run y lo lanza en una tarea tokio, devolviendo un
//! acuse de inmediato. El resultado se reconstruye siempre desde el log de
//! eventos, así que cualquier proceso que comparta el store puede leerlo o
//! retomar el run con `redeliver`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{error, info};
use publish_core::{ArtifactSpec, CoreEngineError, EventStore, FlowEngine, InMemoryFlowRepository, RetryPolicy,
                   RunReport, RunState};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::artifacts::CommitArtifact;
use crate::ports::{DraftStore, VersionedStore};
use crate::steps::{CommitToStoreStep, FetchDraftStep, GenerateMarkdownStep, UpdateStatusStep, COMMIT_TO_STORE};
use publish_domain::CommitResult;

pub type PublishEngine<E> = FlowEngine<E, InMemoryFlowRepository>;

/// Arma el engine con los cuatro steps en su orden fijo.
pub fn publish_pipeline<E: EventStore>(event_store: E,
                                       drafts: Arc<dyn DraftStore>,
                                       store: Arc<dyn VersionedStore>,
                                       policy: RetryPolicy)
                                       -> PublishEngine<E> {
    FlowEngine::builder(event_store, InMemoryFlowRepository::new()).first_step(FetchDraftStep::new(drafts.clone()))
                                                                   .add_step(GenerateMarkdownStep)
                                                                   .add_step(CommitToStoreStep::new(store))
                                                                   .add_step(UpdateStatusStep::new(drafts))
                                                                   .retry_policy(policy)
                                                                   .build()
}

/// Acuse devuelto al disparar una publicación.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishAck {
    pub run_id: Uuid,
    pub draft_id: String,
    pub accepted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum PublishOutcome {
    Completed { path: String, commit: CommitResult },
    /// Primer step que falló y la clase de error.
    Failed { step: String, kind: String, message: String },
    InProgress,
}

impl PublishOutcome {
    pub fn from_report(report: &RunReport) -> Result<Self, CoreEngineError> {
        match &report.state {
            RunState::Completed => {
                let art = report.output_of(COMMIT_TO_STORE)
                                .ok_or_else(|| CoreEngineError::ArtifactMissing(COMMIT_TO_STORE.to_string()))?;
                let CommitArtifact { commit } = CommitArtifact::from_artifact(art)?;
                Ok(PublishOutcome::Completed { path: commit.path.clone(),
                                               commit })
            }
            RunState::Failed { step_id, error } => Ok(PublishOutcome::Failed { step: step_id.clone(),
                                                                               kind: error.kind().to_string(),
                                                                               message: error.to_string() }),
            RunState::Pending | RunState::Running { .. } => Ok(PublishOutcome::InProgress),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PublishOutcome::InProgress)
    }
}

pub struct Publisher<E: EventStore + 'static> {
    engine: Arc<PublishEngine<E>>,
}

impl<E: EventStore + 'static> Clone for Publisher<E> {
    fn clone(&self) -> Self {
        Self { engine: self.engine.clone() }
    }
}

impl<E: EventStore + 'static> Publisher<E> {
    pub fn new(engine: PublishEngine<E>) -> Self {
        Self { engine: Arc::new(engine) }
    }

    pub fn engine(&self) -> &PublishEngine<E> {
        &self.engine
    }

    /// Registra un run para `draft_id` y lo ejecuta en segundo plano.
    /// Debe llamarse dentro de un runtime tokio.
    pub fn trigger(&self, draft_id: &str) -> Result<PublishAck, CoreEngineError> {
        let draft_id = draft_id.trim();
        if draft_id.is_empty() {
            return Err(CoreEngineError::InvalidDraft("empty draftId".into()));
        }
        let run_id = Uuid::new_v4();
        self.engine.init_run(run_id, json!({ "draftId": draft_id }))?;
        info!("publish:accepted run_id={run_id} draft_id={draft_id}");

        let engine = self.engine.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.run(run_id).await {
                error!("publish:run error run_id={run_id} err={e}");
            }
        });
        Ok(PublishAck { run_id,
                        draft_id: draft_id.to_string(),
                        accepted_at: Utc::now() })
    }

    /// Re-entrega del evento disparador: retoma el run en el primer step sin
    /// éxito memoizado, o devuelve el resultado ya registrado.
    pub async fn redeliver(&self, run_id: Uuid) -> Result<PublishOutcome, CoreEngineError> {
        let report = self.engine.run(run_id).await?;
        PublishOutcome::from_report(&report)
    }

    /// Espera a que el run llegue a un estado terminal. Si nadie lo está
    /// ejecutando en este proceso, lo retoma.
    pub async fn wait(&self, run_id: Uuid) -> Result<PublishOutcome, CoreEngineError> {
        self.redeliver(run_id).await
    }

    /// Foto actual del run sin ejecutar nada.
    pub fn outcome(&self, run_id: Uuid) -> Result<PublishOutcome, CoreEngineError> {
        PublishOutcome::from_report(&self.engine.report(run_id)?)
    }
}
