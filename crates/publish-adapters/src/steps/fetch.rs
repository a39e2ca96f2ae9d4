//! FetchDraftStep (Source): lee el draft disparador del store externo.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use publish_core::{ArtifactSpec, CoreEngineError, ExecutionContext, StepDefinition, StepKind, StepRunResult};

use super::FETCH_DRAFT;
use crate::artifacts::DraftArtifact;
use crate::ports::DraftStore;

pub struct FetchDraftStep {
    drafts: Arc<dyn DraftStore>,
}

impl FetchDraftStep {
    pub fn new(drafts: Arc<dyn DraftStore>) -> Self {
        Self { drafts }
    }

    async fn fetch(&self, ctx: &ExecutionContext) -> Result<publish_core::Artifact, CoreEngineError> {
        let draft_id = ctx.trigger_str("draftId")
                          .filter(|id| !id.is_empty())
                          .ok_or_else(|| CoreEngineError::InvalidDraft("trigger without draftId".into()))?;
        debug!("step:fetch run_id={} draft_id={draft_id} attempt={}", ctx.run_id, ctx.attempt);
        let draft = self.drafts.fetch_draft(draft_id).await?;
        Ok(DraftArtifact { draft }.into_artifact()?)
    }
}

#[async_trait]
impl StepDefinition for FetchDraftStep {
    fn id(&self) -> &str {
        FETCH_DRAFT
    }

    fn kind(&self) -> StepKind {
        StepKind::Source
    }

    async fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
        self.fetch(ctx).await.into()
    }
}
