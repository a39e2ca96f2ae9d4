//! GenerateMarkdownStep (Transform puro): draft → documento con frontmatter.

use async_trait::async_trait;
use publish_core::{Artifact, ArtifactSpec, CoreEngineError, ExecutionContext, StepDefinition, StepKind,
                   StepRunResult};
use publish_domain::project;

use super::{memoized, FETCH_DRAFT, GENERATE_MARKDOWN};
use crate::artifacts::{DocumentArtifact, DraftArtifact};
use crate::error::domain_error;

#[derive(Debug, Default, Clone, Copy)]
pub struct GenerateMarkdownStep;

impl GenerateMarkdownStep {
    fn generate(ctx: &ExecutionContext) -> Result<Artifact, CoreEngineError> {
        let DraftArtifact { draft } = memoized(ctx, FETCH_DRAFT)?;
        let document = project(&draft).map_err(domain_error)?;
        Ok(DocumentArtifact { document }.into_artifact()?)
    }
}

#[async_trait]
impl StepDefinition for GenerateMarkdownStep {
    fn id(&self) -> &str {
        GENERATE_MARKDOWN
    }

    fn kind(&self) -> StepKind {
        StepKind::Transform
    }

    async fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
        Self::generate(ctx).into()
    }
}
