//! Carga de configuración de conexión desde variables de entorno.
//! Usa convención `DATABASE_URL` y parámetros opcionales de pool.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

use crate::error::PersistenceError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

pub const DEFAULT_MIN_CONNECTIONS: u32 = 2;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

fn parse_or(var: &str, default: u32) -> u32 {
    env::var(var).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl DbConfig {
    pub fn from_env() -> Result<Self, PersistenceError> {
        Lazy::force(&DOTENV_LOADED);
        let url = env::var("DATABASE_URL").map_err(|_| PersistenceError::Config("DATABASE_URL not set".into()))?;
        Ok(Self { url,
                  min_connections: parse_or("DATABASE_MIN_CONNECTIONS", DEFAULT_MIN_CONNECTIONS),
                  max_connections: parse_or("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS) })
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
