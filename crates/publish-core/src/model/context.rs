use indexmap::IndexMap;
use serde_json::Value;
use uuid::Uuid;

use super::Artifact;

/// Contexto de ejecución entregado a `StepDefinition::run`.
///
/// `memo` contiene los outputs ya memoizados del run, en orden de
/// definición, indexados por `step_id`. Un step sólo ve outputs de steps
/// anteriores a él.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub run_id: Uuid,
    /// Payload del evento disparador (p.ej. `{"draftId": "d1"}`).
    pub trigger: Value,
    /// Contador de reintentos del run al momento de ejecutar.
    pub attempt: u32,
    /// Primer output del step inmediatamente anterior (None para el primero).
    pub input: Option<Artifact>,
    pub memo: IndexMap<String, Vec<Artifact>>,
}

impl ExecutionContext {
    /// Primer output memoizado de `step_id`.
    pub fn output_of(&self, step_id: &str) -> Option<&Artifact> {
        self.memo.get(step_id).and_then(|outs| outs.first())
    }

    /// Campo string del payload disparador.
    pub fn trigger_str(&self, field: &str) -> Option<&str> {
        self.trigger.get(field).and_then(Value::as_str)
    }
}
