//! Configuración central de la aplicación.
//!
//! Variables de entorno (opcionalmente desde `.env`, cargado una sola vez).
//! Cada sección es opcional; la que un comando necesita se exige con
//! `require_*`, que devuelve `ConfigError` en lugar de abortar.
use std::env;
use std::path::PathBuf;

use publish_adapters::github::{DEFAULT_GITHUB_API_URL, DEFAULT_GITHUB_BRANCH};
use publish_adapters::instantdb::DEFAULT_INSTANTDB_API_URL;
use publish_adapters::{GitHubConfig, InstantDbConfig};
use publish_persistence::config::{DEFAULT_MAX_CONNECTIONS, DEFAULT_MIN_CONNECTIONS};
use publish_persistence::DbConfig;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Destino de los commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    GitHub(GitHubConfig),
    LocalDir(PathBuf),
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub instantdb: Option<InstantDbConfig>,
    pub github: Option<GitHubConfig>,
    pub content_dir: Option<PathBuf>,
    pub database: Option<DbConfig>,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_u32(var: &'static str, raw: Option<String>, default: u32) -> Result<u32, ConfigError> {
    match non_empty(raw) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid { var,
                                                                                          reason: e.to_string() }),
    }
}

/// Exige ambas variables de un par o ninguna.
fn pair(a: (&'static str, Option<String>),
        b: (&'static str, Option<String>))
        -> Result<Option<(String, String)>, ConfigError> {
    match (a.1, b.1) {
        (Some(x), Some(y)) => Ok(Some((x, y))),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::Missing(b.0)),
        (None, Some(_)) => Err(ConfigError::Missing(a.0)),
    }
}

impl AppConfig {
    /// Lee el entorno del proceso (cargando `.env` la primera vez).
    pub fn from_env() -> Result<Self, ConfigError> {
        publish_persistence::init_dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la configuración desde una función de búsqueda arbitraria.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
        where F: Fn(&str) -> Option<String>
    {
        let get = |key: &str| non_empty(lookup(key));

        let instantdb = pair(("INSTANTDB_ADMIN_TOKEN", get("INSTANTDB_ADMIN_TOKEN")),
                             ("INSTANTDB_APP_ID", get("INSTANTDB_APP_ID")))?.map(|(admin_token, app_id)| {
                                 InstantDbConfig { admin_token,
                                                   app_id,
                                                   api_url: get("INSTANTDB_API_URL").unwrap_or_else(|| {
                                                                                        DEFAULT_INSTANTDB_API_URL.into()
                                                                                    }) }
                             });

        let github = pair(("GITHUB_TOKEN", get("GITHUB_TOKEN")), ("GITHUB_REPO", get("GITHUB_REPO")))?;
        let github = match github {
            Some((token, repo)) => {
                if repo.split('/').filter(|s| !s.is_empty()).count() != 2 {
                    return Err(ConfigError::Invalid { var: "GITHUB_REPO",
                                                      reason: format!("expected owner/repo, got '{repo}'") });
                }
                Some(GitHubConfig { token,
                                    repo,
                                    branch: get("GITHUB_BRANCH").unwrap_or_else(|| DEFAULT_GITHUB_BRANCH.into()),
                                    api_url: get("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_GITHUB_API_URL.into()) })
            }
            None => None,
        };

        let database = match get("DATABASE_URL") {
            Some(url) => Some(DbConfig { url,
                                         min_connections: parse_u32("DATABASE_MIN_CONNECTIONS",
                                                                    lookup("DATABASE_MIN_CONNECTIONS"),
                                                                    DEFAULT_MIN_CONNECTIONS)?,
                                         max_connections: parse_u32("DATABASE_MAX_CONNECTIONS",
                                                                    lookup("DATABASE_MAX_CONNECTIONS"),
                                                                    DEFAULT_MAX_CONNECTIONS)? }),
            None => None,
        };

        Ok(Self { instantdb,
                  github,
                  content_dir: get("PUBLISH_CONTENT_DIR").map(PathBuf::from),
                  database })
    }

    pub fn require_instantdb(&self) -> Result<&InstantDbConfig, ConfigError> {
        self.instantdb.as_ref().ok_or(ConfigError::Missing("INSTANTDB_ADMIN_TOKEN"))
    }

    /// Un directorio local tiene prioridad sobre GitHub.
    pub fn require_store_target(&self) -> Result<StoreTarget, ConfigError> {
        if let Some(dir) = &self.content_dir {
            return Ok(StoreTarget::LocalDir(dir.clone()));
        }
        self.github
            .clone()
            .map(StoreTarget::GitHub)
            .ok_or(ConfigError::Missing("GITHUB_TOKEN"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn empty_environment_has_no_sections() {
        let cfg = AppConfig::from_lookup(|_| None).unwrap();
        assert!(cfg.database.is_none());
        assert_eq!(cfg.require_instantdb().unwrap_err(), ConfigError::Missing("INSTANTDB_ADMIN_TOKEN"));
        assert_eq!(cfg.require_store_target().unwrap_err(), ConfigError::Missing("GITHUB_TOKEN"));
    }

    #[test]
    fn defaults_fill_optional_values() {
        let cfg = AppConfig::from_lookup(lookup(&[("GITHUB_TOKEN", "t"),
                                                  ("GITHUB_REPO", "me/blog"),
                                                  ("INSTANTDB_ADMIN_TOKEN", "a"),
                                                  ("INSTANTDB_APP_ID", "app"),
                                                  ("DATABASE_URL", "postgres://x")])).unwrap();
        let gh = cfg.github.unwrap();
        assert_eq!(gh.branch, "main");
        assert_eq!(gh.api_url, "https://api.github.com");
        assert_eq!(cfg.instantdb.unwrap().api_url, "https://api.instantdb.com");
        let db = cfg.database.unwrap();
        assert_eq!((db.min_connections, db.max_connections), (2, 16));
    }

    #[test]
    fn half_configured_pairs_and_bad_values_are_errors() {
        assert_eq!(AppConfig::from_lookup(lookup(&[("GITHUB_TOKEN", "t")])).unwrap_err(),
                   ConfigError::Missing("GITHUB_REPO"));
        assert_eq!(AppConfig::from_lookup(lookup(&[("INSTANTDB_APP_ID", "app")])).unwrap_err(),
                   ConfigError::Missing("INSTANTDB_ADMIN_TOKEN"));
        assert!(matches!(AppConfig::from_lookup(lookup(&[("GITHUB_TOKEN", "t"), ("GITHUB_REPO", "blog")])),
                         Err(ConfigError::Invalid { var: "GITHUB_REPO", .. })));
        assert!(matches!(AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x"),
                                                         ("DATABASE_MAX_CONNECTIONS", "many")])),
                         Err(ConfigError::Invalid { var: "DATABASE_MAX_CONNECTIONS", .. })));
    }

    #[test]
    fn local_content_dir_wins_over_github() {
        let cfg = AppConfig::from_lookup(lookup(&[("GITHUB_TOKEN", "t"),
                                                  ("GITHUB_REPO", "me/blog"),
                                                  ("PUBLISH_CONTENT_DIR", "/tmp/site")])).unwrap();
        assert_eq!(cfg.require_store_target().unwrap(), StoreTarget::LocalDir(PathBuf::from("/tmp/site")));
    }
}
