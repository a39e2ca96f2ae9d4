//! publish-adapters: capa Dominio ↔ Core del pipeline de publicación.
//!
//! Este crate provee:
//! - Puertos hacia los colaboradores externos (`DraftStore`,
//!   `VersionedStore`) y sus implementaciones HTTP, en disco y en memoria.
//! - Artifacts tipados que transportan `Draft`, `ProjectedDocument` y
//!   `CommitResult` entre steps.
//! - Los cuatro steps del pipeline (fetch → project → commit → status).
//! - `Publisher`: disparo asíncrono de runs y lectura de su resultado.

pub mod artifacts;
pub mod error;
pub mod fs_store;
pub mod github;
pub mod http;
pub mod instantdb;
pub mod memory;
pub mod ports;
pub mod publisher;
pub mod steps;

pub use fs_store::FsVersionedStore;
pub use github::{GitHubConfig, GitHubContentsStore};
pub use instantdb::{InstantDbConfig, InstantDbDraftStore};
pub use memory::{CommitRecord, InMemoryDraftStore, InMemoryVersionedStore};
pub use ports::{DraftStore, VersionedStore, WriteReceipt};
pub use publisher::{publish_pipeline, PublishAck, PublishOutcome, Publisher};
