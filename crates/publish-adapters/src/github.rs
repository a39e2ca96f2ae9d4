//! Cliente del contents API de GitHub como `VersionedStore`.
//!
//! El token de versión es el `sha` del blob. `GET` lee el sha vigente en la
//! rama configurada; `PUT` escribe con ese sha como precondición (sin sha =
//! creación). GitHub responde 409 o 422 cuando el sha no coincide o cuando
//! el path fue creado entre la lectura y la escritura: ambos son `Conflict`.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::debug;
use publish_core::CoreEngineError;
use publish_domain::VersionToken;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{status_error, transport_error};
use crate::http::{http_client, DEFAULT_REQUEST_TIMEOUT};
use crate::ports::{VersionedStore, WriteReceipt};

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_BRANCH: &str = "main";

#[derive(Clone, PartialEq, Eq)]
pub struct GitHubConfig {
    pub token: String,
    /// `owner/repo`.
    pub repo: String,
    pub branch: String,
    pub api_url: String,
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
         .field("token", &"***")
         .field("repo", &self.repo)
         .field("branch", &self.branch)
         .field("api_url", &self.api_url)
         .finish()
    }
}

pub struct GitHubContentsStore {
    client: Client,
    config: GitHubConfig,
    owner: String,
    repo: String,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: ContentEntry,
    commit: Option<ContentEntry>,
}

impl GitHubContentsStore {
    pub fn new(config: GitHubConfig) -> Result<Self, CoreEngineError> {
        Self::with_timeout(config, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(config: GitHubConfig, timeout: Duration) -> Result<Self, CoreEngineError> {
        let (owner, repo) = match config.repo.split_once('/') {
            Some((o, r)) if !o.is_empty() && !r.is_empty() && !r.contains('/') => (o.to_string(), r.to_string()),
            _ => {
                return Err(CoreEngineError::Internal(format!("GITHUB_REPO must be owner/repo, got '{}'",
                                                             config.repo)))
            }
        };
        Ok(Self { client: http_client(timeout)?,
                  config,
                  owner,
                  repo })
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}/contents/{}",
                self.config.api_url.trim_end_matches('/'),
                self.owner,
                self.repo,
                path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.config.token)
               .header("Accept", "application/vnd.github.v3+json")
               .header("User-Agent", "publishflow")
    }
}

/// Status de un `GET` no exitoso (404 se trata antes como ausencia).
pub fn read_status_error(status: StatusCode, body: &str) -> CoreEngineError {
    status_error("github get", status, body)
}

/// Status de un `PUT` rechazado.
pub fn write_status_error(status: StatusCode, body: &str) -> CoreEngineError {
    match status {
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            CoreEngineError::Conflict(format!("github put: HTTP {} {}", status.as_u16(), body.trim()))
        }
        _ => status_error("github put", status, body),
    }
}

/// Cuerpo del `PUT`: contenido en base64 y sha previo si existe.
pub fn put_body(content: &str, message: &str, branch: &str, expected: Option<&VersionToken>) -> Value {
    let mut body = json!({
        "message": message,
        "content": STANDARD.encode(content.as_bytes()),
        "branch": branch,
    });
    if let Some(sha) = expected {
        body["sha"] = Value::from(sha.as_str());
    }
    body
}

#[async_trait]
impl VersionedStore for GitHubContentsStore {
    async fn read_version(&self, path: &str) -> Result<Option<VersionToken>, CoreEngineError> {
        let request = self.client
                          .get(self.contents_url(path))
                          .query(&[("ref", self.config.branch.as_str())]);
        let response = self.authorized(request)
                           .send()
                           .await
                           .map_err(|e| transport_error("github get", e))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("github:get path={path} absent");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(read_status_error(status, &body));
        }
        let entry: ContentEntry = response.json().await.map_err(|e| transport_error("github get", e))?;
        debug!("github:get path={path} sha={}", entry.sha);
        Ok(Some(VersionToken::new(entry.sha)))
    }

    async fn write(&self,
                   path: &str,
                   content: &str,
                   message: &str,
                   expected: Option<&VersionToken>)
                   -> Result<WriteReceipt, CoreEngineError> {
        let body = put_body(content, message, &self.config.branch, expected);
        let response = self.authorized(self.client.put(self.contents_url(path)))
                           .json(&body)
                           .send()
                           .await
                           .map_err(|e| transport_error("github put", e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(write_status_error(status, &text));
        }
        let put: PutResponse = response.json().await.map_err(|e| transport_error("github put", e))?;
        Ok(WriteReceipt { version: VersionToken::new(put.content.sha),
                          commit_id: put.commit.map(|c| c.sha) })
    }
}
