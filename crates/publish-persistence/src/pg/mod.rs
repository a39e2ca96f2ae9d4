//! Implementación Postgres (Diesel) de `EventStore`.
//!
//! - Event log append-only con orden total por `seq` (BIGSERIAL); lectura
//!   por `run_id` ordenada por `seq`, equivalente al backend en memoria.
//! - Los artifacts de un `StepFinished` se insertan en la MISMA transacción
//!   que el evento: el memo nunca referencia un payload ausente.
//! - Artifacts deduplicados por hash (`ON CONFLICT DO NOTHING`).
//! - Errores transitorios de conexión se reintentan con backoff lineal corto.

use std::time::Duration;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use log::{debug, warn};
use publish_core::{Artifact, ArtifactKind, CoreEngineError, EventStore, FlowEvent, FlowEventKind};
use serde_json::Value;
use uuid::Uuid;

use crate::config::DbConfig;
use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{publish_event_log, publish_step_artifacts};

pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;
type PooledConn = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

const MAX_STORE_RETRIES: u32 = 3;
const STORE_RETRY_STEP_MS: u64 = 15;

/// Proveedor abstracto de conexiones (pool real o uno de test).
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PooledConn, PersistenceError>;
}

pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PooledConn, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = publish_event_log)]
struct NewEventRow<'a> {
    run_id: &'a Uuid,
    event_type: &'a str,
    payload: &'a Value,
}

#[derive(Queryable, Debug)]
struct EventRow {
    seq: i64,
    run_id: Uuid,
    ts: DateTime<Utc>,
    #[allow(dead_code)]
    event_type: String,
    payload: Value,
}

#[derive(Insertable, Queryable, Debug)]
#[diesel(table_name = publish_step_artifacts)]
struct ArtifactRow {
    artifact_hash: String,
    kind: String,
    payload: Value,
    metadata: Option<Value>,
}

impl ArtifactRow {
    fn from_artifact(a: &Artifact) -> Self {
        Self { artifact_hash: a.hash.clone(),
               kind: a.kind.as_str().to_string(),
               payload: a.payload.clone(),
               metadata: a.metadata.clone() }
    }

    fn into_artifact(self) -> Result<Artifact, PersistenceError> {
        let kind = match self.kind.as_str() {
            "generic_json" => ArtifactKind::GenericJson,
            other => return Err(PersistenceError::Corrupt(format!("artifact kind '{other}'"))),
        };
        Ok(Artifact { kind,
                      hash: self.artifact_hash,
                      payload: self.payload,
                      metadata: self.metadata })
    }
}

/// Repite `f` ante errores transitorios (15ms, 30ms, 45ms).
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if e.is_retryable() && attempts < MAX_STORE_RETRIES => {
                attempts += 1;
                let delay_ms = STORE_RETRY_STEP_MS * attempts as u64;
                warn!("store:retry attempt={attempts} delay_ms={delay_ms} err={e}");
                std::thread::sleep(Duration::from_millis(delay_ms));
            }
            r => return r,
        }
    }
}

fn row_to_event(row: EventRow) -> Result<FlowEvent, PersistenceError> {
    let kind: FlowEventKind =
        serde_json::from_value(row.payload).map_err(|e| PersistenceError::Corrupt(format!("event seq={}: {e}", row.seq)))?;
    Ok(FlowEvent { seq: row.seq as u64,
                   run_id: row.run_id,
                   kind,
                   ts: row.ts })
}

pub struct PgEventStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgEventStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Inserta artifacts (dedupe por hash) y el evento en una transacción.
    fn insert(&self, run_id: Uuid, kind: &FlowEventKind, artifacts: &[Artifact]) -> Result<(i64, DateTime<Utc>), PersistenceError> {
        let payload = serde_json::to_value(kind).map_err(|e| PersistenceError::Unknown(format!("serialize event: {e}")))?;
        let rows: Vec<ArtifactRow> = artifacts.iter().map(ArtifactRow::from_artifact).collect();
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction()
                .read_write()
                .run(|tx| {
                    for row in &rows {
                        diesel::insert_into(publish_step_artifacts::table).values(row)
                                                                          .on_conflict_do_nothing()
                                                                          .execute(tx)?;
                    }
                    diesel::insert_into(publish_event_log::table).values(NewEventRow { run_id: &run_id,
                                                                                       event_type: kind.event_type(),
                                                                                       payload: &payload })
                                                                 .returning((publish_event_log::seq, publish_event_log::ts))
                                                                 .get_result::<(i64, DateTime<Utc>)>(tx)
                })
                .map_err(PersistenceError::from)
        })
    }
}

impl<P: ConnectionProvider> EventStore for PgEventStore<P> {
    fn append_kind(&self, run_id: Uuid, kind: FlowEventKind) -> Result<FlowEvent, CoreEngineError> {
        self.append_with_artifacts(run_id, kind, &[])
    }

    fn append_with_artifacts(&self,
                             run_id: Uuid,
                             kind: FlowEventKind,
                             artifacts: &[Artifact])
                             -> Result<FlowEvent, CoreEngineError> {
        let (seq, ts) = self.insert(run_id, &kind, artifacts)?;
        debug!("append:done run_id={run_id} seq={seq} type={} artifacts={}",
               kind.event_type(),
               artifacts.len());
        Ok(FlowEvent { seq: seq as u64,
                       run_id,
                       kind,
                       ts })
    }

    fn list(&self, run_id: Uuid) -> Result<Vec<FlowEvent>, CoreEngineError> {
        let rows: Vec<EventRow> = with_retry(|| {
                                      let mut conn = self.provider.connection()?;
                                      publish_event_log::table.filter(publish_event_log::run_id.eq(run_id))
                                                              .order(publish_event_log::seq.asc())
                                                              .load(&mut conn)
                                                              .map_err(PersistenceError::from)
                                  })?;
        let events = rows.into_iter()
                         .map(row_to_event)
                         .collect::<Result<Vec<_>, _>>()?;
        debug!("list:done run_id={run_id} count={}", events.len());
        Ok(events)
    }

    fn put_artifact(&self, artifact: &Artifact) -> Result<(), CoreEngineError> {
        let row = ArtifactRow::from_artifact(artifact);
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(publish_step_artifacts::table).values(&row)
                                                              .on_conflict_do_nothing()
                                                              .execute(&mut conn)
                                                              .map_err(PersistenceError::from)
        })?;
        Ok(())
    }

    fn get_artifact(&self, hash: &str) -> Result<Option<Artifact>, CoreEngineError> {
        let row: Option<ArtifactRow> = with_retry(|| {
                                           let mut conn = self.provider.connection()?;
                                           publish_step_artifacts::table.find(hash)
                                                                        .first(&mut conn)
                                                                        .optional()
                                                                        .map_err(PersistenceError::from)
                                       })?;
        Ok(row.map(ArtifactRow::into_artifact).transpose()?)
    }
}

/// Construye un pool r2d2 y corre las migraciones pendientes.
///
/// `min_size > max_size` se ajusta a `min = max`; tamaños 0 se elevan a 1.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let max = max_size.max(1);
    let min = min_size.max(1);
    if min > max {
        warn!("pool:min_size > max_size ({min} > {max}), using min=max");
    }
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(min.min(max)))
                                    .max_size(max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Pool según `DATABASE_URL` y `DATABASE_{MIN,MAX}_CONNECTIONS`.
pub fn build_pool_from_env() -> Result<PgPool, PersistenceError> {
    let cfg = DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
