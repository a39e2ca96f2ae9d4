#![allow(dead_code)]

use publish_persistence::{build_pool, DbConfig, PgEventStore, PgPool, PoolProvider};
use once_cell::sync::Lazy;

pub static TEST_POOL: Lazy<Option<PgPool>> = Lazy::new(|| {
    let cfg = DbConfig::from_env().ok()?;
    match build_pool(&cfg.url, 1, 2) {
        Ok(p) => Some(p),
        Err(e) => {
            eprintln!("could not build test pool: {e}");
            None
        }
    }
});

/// Store sobre el pool compartido; `None` (test omitido) sin DATABASE_URL.
pub fn pg_store(test: &str) -> Option<PgEventStore<PoolProvider>> {
    match TEST_POOL.as_ref() {
        Some(pool) => Some(PgEventStore::new(PoolProvider { pool: pool.clone() })),
        None => {
            eprintln!("skip {test} (no DATABASE_URL)");
            None
        }
    }
}
