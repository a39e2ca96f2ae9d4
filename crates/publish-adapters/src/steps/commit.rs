//! CommitToStoreStep: escritura condicional del documento proyectado.
//!
//! Único step con efecto externo no idempotente. Cada ejecución relee el
//! token vigente, así que un `Conflict` reintentado por el engine vuelve a
//! escribir contra la versión fresca.

use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use publish_core::{Artifact, ArtifactSpec, CoreEngineError, ExecutionContext, StepDefinition, StepKind,
                   StepRunResult};
use publish_domain::CommitResult;

use super::{memoized, COMMIT_TO_STORE, GENERATE_MARKDOWN};
use crate::artifacts::{CommitArtifact, DocumentArtifact};
use crate::ports::VersionedStore;

pub struct CommitToStoreStep {
    store: Arc<dyn VersionedStore>,
}

impl CommitToStoreStep {
    pub fn new(store: Arc<dyn VersionedStore>) -> Self {
        Self { store }
    }

    async fn commit(&self, ctx: &ExecutionContext) -> Result<Artifact, CoreEngineError> {
        let DocumentArtifact { document } = memoized(ctx, GENERATE_MARKDOWN)?;
        let prior = self.store.read_version(&document.path).await?;
        let receipt = self.store
                          .write(&document.path, &document.body, &document.message, prior.as_ref())
                          .await?;
        info!("step:commit run_id={} path={} prior={} new={}",
              ctx.run_id,
              document.path,
              prior.as_ref().map(|t| t.as_str()).unwrap_or("-"),
              receipt.version);
        let commit = CommitResult { path: document.path,
                                    prior_version_token: prior,
                                    new_version_token: receipt.version,
                                    commit_id: receipt.commit_id };
        Ok(CommitArtifact { commit }.into_artifact()?)
    }
}

#[async_trait]
impl StepDefinition for CommitToStoreStep {
    fn id(&self) -> &str {
        COMMIT_TO_STORE
    }

    fn kind(&self) -> StepKind {
        StepKind::Sink
    }

    async fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
        self.commit(ctx).await.into()
    }
}
