//! Cliente del admin API de InstantDB como `DraftStore`.
//!
//! - `POST {base}/admin/query` con una consulta `drafts where id = ?`.
//! - `POST {base}/admin/transact` con un paso `update` sobre el draft.
//! Ambos con `Authorization: Bearer <token>` y `App-Id`.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use publish_core::CoreEngineError;
use publish_domain::{Draft, DraftStatus};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Map, Value};

use crate::error::{status_error, transport_error};
use crate::http::{http_client, DEFAULT_REQUEST_TIMEOUT};
use crate::ports::DraftStore;

pub const DEFAULT_INSTANTDB_API_URL: &str = "https://api.instantdb.com";

#[derive(Clone, PartialEq, Eq)]
pub struct InstantDbConfig {
    pub admin_token: String,
    pub app_id: String,
    pub api_url: String,
}

impl std::fmt::Debug for InstantDbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstantDbConfig")
         .field("admin_token", &"***")
         .field("app_id", &self.app_id)
         .field("api_url", &self.api_url)
         .finish()
    }
}

pub struct InstantDbDraftStore {
    client: Client,
    config: InstantDbConfig,
}

impl InstantDbDraftStore {
    pub fn new(config: InstantDbConfig) -> Result<Self, CoreEngineError> {
        Self::with_timeout(config, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(config: InstantDbConfig, timeout: Duration) -> Result<Self, CoreEngineError> {
        Ok(Self { client: http_client(timeout)?,
                  config })
    }

    fn post(&self, endpoint: &str) -> RequestBuilder {
        let url = format!("{}/admin/{endpoint}", self.config.api_url.trim_end_matches('/'));
        self.client
            .post(url)
            .bearer_auth(&self.config.admin_token)
            .header("App-Id", &self.config.app_id)
    }

    async fn send(&self, context: &str, request: RequestBuilder) -> Result<Value, CoreEngineError> {
        let response = request.send().await.map_err(|e| transport_error(context, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(context, status, &body));
        }
        response.json::<Value>().await.map_err(|e| transport_error(context, e))
    }
}

/// Cuerpo de la consulta de un draft por id.
pub fn draft_query(draft_id: &str) -> Value {
    json!({ "query": { "drafts": { "$": { "where": { "id": draft_id } } } } })
}

/// Cuerpo de la transacción que actualiza el estado del draft.
pub fn status_transaction(draft_id: &str, status: DraftStatus, published_at: Option<i64>) -> Value {
    let mut fields = Map::new();
    fields.insert("status".into(), Value::from(status.as_str()));
    if let Some(ts) = published_at {
        fields.insert("publishedAt".into(), Value::from(ts));
    }
    json!({ "steps": [["update", "drafts", draft_id, Value::Object(fields)]] })
}

/// Extrae el primer draft de la respuesta `{ "drafts": [...] }`.
pub fn parse_draft_response(draft_id: &str, body: Value) -> Result<Draft, CoreEngineError> {
    let first = body.get("drafts")
                    .and_then(Value::as_array)
                    .and_then(|drafts| drafts.first())
                    .cloned()
                    .ok_or_else(|| CoreEngineError::NotFound(format!("draft {draft_id}")))?;
    serde_json::from_value(first).map_err(|e| CoreEngineError::TransientIo(format!("decode draft {draft_id}: {e}")))
}

#[async_trait]
impl DraftStore for InstantDbDraftStore {
    async fn fetch_draft(&self, draft_id: &str) -> Result<Draft, CoreEngineError> {
        debug!("instantdb:query draft_id={draft_id}");
        let body = self.send("instantdb query", self.post("query").json(&draft_query(draft_id)))
                       .await?;
        parse_draft_response(draft_id, body)
    }

    async fn update_status(&self,
                           draft_id: &str,
                           status: DraftStatus,
                           published_at: Option<i64>)
                           -> Result<(), CoreEngineError> {
        debug!("instantdb:transact draft_id={draft_id} status={}", status.as_str());
        let tx = status_transaction(draft_id, status, published_at);
        self.send("instantdb transact", self.post("transact").json(&tx)).await?;
        Ok(())
    }
}
