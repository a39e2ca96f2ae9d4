//! Steps del pipeline, en orden fijo de ejecución.

mod commit;
mod fetch;
mod generate;
mod status;

pub use commit::CommitToStoreStep;
pub use fetch::FetchDraftStep;
pub use generate::GenerateMarkdownStep;
pub use status::UpdateStatusStep;

use publish_core::{ArtifactSpec, CoreEngineError, ExecutionContext};

pub const FETCH_DRAFT: &str = "fetch-draft";
pub const GENERATE_MARKDOWN: &str = "generate-markdown";
pub const COMMIT_TO_STORE: &str = "commit-to-store";
pub const UPDATE_STATUS: &str = "update-status";

/// Ids de los steps en orden de ejecución.
pub const PIPELINE_STEPS: [&str; 4] = [FETCH_DRAFT, GENERATE_MARKDOWN, COMMIT_TO_STORE, UPDATE_STATUS];

/// Decodifica el output memoizado de un step anterior.
fn memoized<T: ArtifactSpec>(ctx: &ExecutionContext, step_id: &str) -> Result<T, CoreEngineError> {
    let art = ctx.output_of(step_id)
                 .ok_or_else(|| CoreEngineError::ArtifactMissing(step_id.to_string()))?;
    Ok(T::from_artifact(art)?)
}
