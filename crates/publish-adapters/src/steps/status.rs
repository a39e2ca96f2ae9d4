//! UpdateStatusStep: marca el draft como publicado.
//!
//! Best-effort: el engine lo ejecuta una sola vez tras un commit exitoso y
//! un fallo queda como señal en el historial sin afectar el run.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use publish_core::{Artifact, ArtifactSpec, CoreEngineError, ExecutionContext, FailureMode, StepDefinition,
                   StepKind, StepRunResult};
use publish_domain::DraftStatus;

use super::{memoized, FETCH_DRAFT, UPDATE_STATUS};
use crate::artifacts::{DraftArtifact, StatusArtifact};
use crate::ports::DraftStore;

pub struct UpdateStatusStep {
    drafts: Arc<dyn DraftStore>,
}

impl UpdateStatusStep {
    pub fn new(drafts: Arc<dyn DraftStore>) -> Self {
        Self { drafts }
    }

    async fn update(&self, ctx: &ExecutionContext) -> Result<Artifact, CoreEngineError> {
        let DraftArtifact { draft } = memoized(ctx, FETCH_DRAFT)?;
        let published_at = Utc::now().timestamp_millis();
        self.drafts
            .update_status(&draft.id, DraftStatus::Published, Some(published_at))
            .await?;
        Ok(StatusArtifact { draft_id: draft.id,
                            status: DraftStatus::Published.as_str().to_string(),
                            published_at }.into_artifact()?)
    }
}

#[async_trait]
impl StepDefinition for UpdateStatusStep {
    fn id(&self) -> &str {
        UPDATE_STATUS
    }

    fn kind(&self) -> StepKind {
        StepKind::Sink
    }

    fn failure_mode(&self) -> FailureMode {
        FailureMode::BestEffort
    }

    async fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
        self.update(ctx).await.into()
    }
}
