//! Artifacts tipados que fluyen entre los steps del pipeline.
//!
//! Envuelven los tipos de dominio en payloads JSON con `schema_version`
//! estable; el engine calcula el hash sobre el payload canónico.
use publish_core::ArtifactSpec;
use publish_domain::{CommitResult, Draft, ProjectedDocument};
use serde::{Deserialize, Serialize};

/// Output de `fetch-draft`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftArtifact {
    pub draft: Draft,
}

impl ArtifactSpec for DraftArtifact {}

/// Output de `generate-markdown`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentArtifact {
    pub document: ProjectedDocument,
}

impl ArtifactSpec for DocumentArtifact {
    fn validate(&self) -> Result<(), String> {
        if self.document.path.is_empty() {
            return Err("empty document path".into());
        }
        Ok(())
    }
}

/// Output de `commit-to-store`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitArtifact {
    pub commit: CommitResult,
}

impl ArtifactSpec for CommitArtifact {}

/// Output de `update-status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusArtifact {
    pub draft_id: String,
    pub status: String,
    pub published_at: i64,
}

impl ArtifactSpec for StatusArtifact {}
