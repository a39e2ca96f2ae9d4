//! Construcción del cliente HTTP compartido por los adaptadores remotos.
//!
//! Toda petición lleva timeout: un servidor que acepta la conexión y no
//! responde termina en `TransientIo` (vía `transport_error`) y el engine
//! decide el reintento.
use std::time::Duration;

use publish_core::CoreEngineError;
use reqwest::Client;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Cliente con timeout total `timeout`; el de conexión nunca lo supera.
pub fn http_client(timeout: Duration) -> Result<Client, CoreEngineError> {
    Client::builder().timeout(timeout)
                     .connect_timeout(timeout.min(DEFAULT_CONNECT_TIMEOUT))
                     .build()
                     .map_err(|e| CoreEngineError::Internal(format!("http client: {e}")))
}
