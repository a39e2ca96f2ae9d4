//! Tipos de evento del run y estructura `FlowEvent`.
//!
//! Rol en el flujo:
//! - Cada ejecución del `FlowEngine` emite eventos a un `EventStore`
//!   append-only, indexado por `run_id`.
//! - El `FlowRepository` reconstruye el estado del run (memo de steps,
//!   contador de intentos, estado terminal) haciendo replay de estos eventos,
//!   de modo que un reintento en otro proceso retoma donde quedó.
//! - `FlowEventKind` es el contrato observable y estable del motor.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreEngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FlowEventKind {
    /// Primer evento de un `run_id`: fija el payload disparador, la
    /// `definition_hash` y la cantidad de steps.
    RunInitialized {
        trigger: serde_json::Value,
        definition_hash: String,
        step_count: usize,
    },
    /// Un step comenzó su ejecución. No implica éxito.
    StepStarted { step_index: usize, step_id: String, attempt: u32 },
    /// Éxito memoizado: outputs (hashes) y fingerprint. Una vez emitido, el
    /// step no vuelve a ejecutarse para este run.
    StepFinished {
        step_index: usize,
        step_id: String,
        outputs: Vec<String>,
        fingerprint: String,
    },
    /// El step falló. Le sigue `RetryScheduled` o `RunFailed`.
    StepFailed {
        step_index: usize,
        step_id: String,
        attempt: u32,
        error: CoreEngineError,
        fingerprint: String,
    },
    /// Reintento del mismo step tras un error transitorio. `attempt` es el
    /// nuevo valor del contador del run.
    RetryScheduled {
        step_index: usize,
        step_id: String,
        attempt: u32,
        delay_ms: u64,
    },
    /// Hito ligero que no altera el estado principal (p.ej. un fallo
    /// descartado de un step best-effort).
    StepSignal {
        step_index: usize,
        step_id: String,
        signal: String,
        data: serde_json::Value,
    },
    /// Cierre exitoso con fingerprint agregado de los steps.
    RunCompleted { run_fingerprint: String },
    /// Cierre fallido (stop-on-failure): ningún step posterior se ejecuta.
    RunFailed { step_id: String, error: CoreEngineError },
}

impl FlowEventKind {
    /// Nombre estable en minúsculas de la variante (columna `event_type`).
    pub fn event_type(&self) -> &'static str {
        match self {
            FlowEventKind::RunInitialized { .. } => "runinitialized",
            FlowEventKind::StepStarted { .. } => "stepstarted",
            FlowEventKind::StepFinished { .. } => "stepfinished",
            FlowEventKind::StepFailed { .. } => "stepfailed",
            FlowEventKind::RetryScheduled { .. } => "retryscheduled",
            FlowEventKind::StepSignal { .. } => "stepsignal",
            FlowEventKind::RunCompleted { .. } => "runcompleted",
            FlowEventKind::RunFailed { .. } => "runfailed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowEventKind::RunCompleted { .. } | FlowEventKind::RunFailed { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEvent {
    pub seq: u64, // asignado por el EventStore (orden append)
    pub run_id: Uuid,
    pub kind: FlowEventKind,
    pub ts: DateTime<Utc>, // metadato (no entra en fingerprint)
}
