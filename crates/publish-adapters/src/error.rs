//! Mapeo de fallos de los clientes HTTP a la taxonomía del core.
use publish_core::CoreEngineError;
use publish_domain::DomainError;
use reqwest::StatusCode;

/// Un draft que no proyecta es input inválido: nunca se reintenta.
pub fn domain_error(e: DomainError) -> CoreEngineError {
    CoreEngineError::InvalidDraft(e.to_string())
}

/// Errores de transporte (conexión, timeout, cuerpo ilegible).
pub fn transport_error(context: &str, e: reqwest::Error) -> CoreEngineError {
    CoreEngineError::TransientIo(format!("{context}: {e}"))
}

/// Clasificación base de un status HTTP no exitoso: credenciales
/// rechazadas son definitivas; el resto (5xx, 429, otros 4xx) transitorio.
pub fn status_error(context: &str, status: StatusCode, body: &str) -> CoreEngineError {
    let detail = format!("{context}: HTTP {} {}", status.as_u16(), body.trim());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CoreEngineError::Unauthorized(detail),
        _ => CoreEngineError::TransientIo(detail),
    }
}
