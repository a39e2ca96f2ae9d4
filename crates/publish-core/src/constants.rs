//! Constantes del motor core.
//!
//! `ENGINE_VERSION` forma parte del input de los fingerprints: cambiarla
//! invalida de forma determinista todos los fingerprints previos aunque la
//! definición y los datos no cambien.

pub const ENGINE_VERSION: &str = "P1.0";

/// Presupuesto de reintentos por run (intentos totales con fallo transitorio).
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

/// Backoff exponencial: base * 2^(attempt-1), acotado por el máximo.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 500;
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 10_000;

/// Señal emitida cuando un step `BestEffort` falla y su error se descarta.
pub const SIGNAL_BEST_EFFORT_FAILURE: &str = "best_effort_failure";
