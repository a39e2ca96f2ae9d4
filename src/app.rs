//! Cableado de clientes y stores a partir de `AppConfig`.
//!
//! Los clientes se construyen una vez y se comparten (`Arc`) entre los
//! steps; no hay handles globales.
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use publish_adapters::{publish_pipeline, DraftStore, FsVersionedStore, GitHubContentsStore, InMemoryDraftStore,
                       InMemoryVersionedStore, InstantDbDraftStore, Publisher, VersionedStore};
use publish_core::{EventStore, InMemoryEventStore, RetryPolicy};
use publish_domain::{project, Draft, ProjectedDocument};
use publish_persistence::{build_pool, PgEventStore, PoolProvider};
use tracing::info;

use crate::config::{AppConfig, StoreTarget};

pub type SharedEventStore = Arc<dyn EventStore>;
pub type AppPublisher = Publisher<SharedEventStore>;

/// Postgres si hay `DATABASE_URL`; si no, un log en memoria que sólo vive
/// lo que dura el proceso.
pub fn event_store(cfg: &AppConfig) -> Result<SharedEventStore> {
    match &cfg.database {
        Some(db) => {
            let pool = build_pool(&db.url, db.min_connections, db.max_connections).context("building postgres pool")?;
            info!(max_connections = db.max_connections, "event store: postgres");
            Ok(Arc::new(PgEventStore::new(PoolProvider { pool })))
        }
        None => {
            info!("event store: in-memory (set DATABASE_URL for durable runs)");
            Ok(Arc::new(InMemoryEventStore::default()))
        }
    }
}

pub fn draft_store(cfg: &AppConfig) -> Result<Arc<dyn DraftStore>> {
    let instantdb = cfg.require_instantdb()?;
    Ok(Arc::new(InstantDbDraftStore::new(instantdb.clone())?))
}

pub fn versioned_store(cfg: &AppConfig) -> Result<Arc<dyn VersionedStore>> {
    match cfg.require_store_target()? {
        StoreTarget::LocalDir(dir) => {
            info!(dir = %dir.display(), "versioned store: local directory");
            Ok(Arc::new(FsVersionedStore::new(dir)))
        }
        StoreTarget::GitHub(gh) => {
            info!(repo = %gh.repo, branch = %gh.branch, "versioned store: github");
            Ok(Arc::new(GitHubContentsStore::new(gh)?))
        }
    }
}

/// Publisher completo para `publish` / `redeliver`.
pub fn publisher(cfg: &AppConfig) -> Result<AppPublisher> {
    Ok(publisher_with(event_store(cfg)?, draft_store(cfg)?, versioned_store(cfg)?))
}

pub fn publisher_with(events: SharedEventStore,
                      drafts: Arc<dyn DraftStore>,
                      store: Arc<dyn VersionedStore>)
                      -> AppPublisher {
    Publisher::new(publish_pipeline(events, drafts, store, RetryPolicy::default()))
}

/// Publisher de sólo lectura: los steps nunca se ejecutan al consultar el
/// estado, así que no requiere credenciales de los stores externos.
pub fn status_publisher(cfg: &AppConfig) -> Result<AppPublisher> {
    Ok(publisher_with(event_store(cfg)?,
                      Arc::new(InMemoryDraftStore::new()),
                      Arc::new(InMemoryVersionedStore::new())))
}

/// Proyección offline de un draft guardado como JSON.
pub fn preview(path: &Path) -> Result<ProjectedDocument> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let draft: Draft = serde_json::from_str(&raw).with_context(|| format!("parsing draft {}", path.display()))?;
    Ok(project(&draft)?)
}
