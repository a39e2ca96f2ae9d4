//! publish-persistence
//!
//! `EventStore` durable sobre Postgres (Diesel + r2d2): el memo de steps
//! sobrevive a reinicios del proceso y cualquier proceso que comparta la
//! base puede leer el resultado de un run o retomarlo.
//!
//! Módulos:
//! - `pg`: event log append-only y store de artifacts.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_pool, build_pool_from_env, ConnectionProvider, PgEventStore, PgPool, PoolProvider};
