use async_trait::async_trait;
use serde_json::Value;

use super::run_result::StepRunResult;
use crate::model::ExecutionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Source,
    Transform,
    Sink,
}

/// Cómo trata el engine un fallo del step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// El error se clasifica: reintento o fallo terminal del run.
    #[default]
    Fatal,
    /// Se ejecuta una sola vez; el error se registra como señal y se
    /// descarta, y el step queda memoizado sin outputs.
    BestEffort,
}

#[async_trait]
pub trait StepDefinition: Send + Sync {
    /// Identificador estable y único dentro del flujo (clave de memo).
    fn id(&self) -> &str;

    /// Nombre opcional amigable.
    fn name(&self) -> &str {
        self.id()
    }

    /// Parámetros deterministas del step; entran al fingerprint.
    fn base_params(&self) -> Value {
        Value::Null
    }

    fn kind(&self) -> StepKind;

    fn failure_mode(&self) -> FailureMode {
        FailureMode::Fatal
    }

    /// Ejecuta el step. No debe reintentar internamente: el engine es el
    /// único que decide reintentos.
    async fn run(&self, ctx: &ExecutionContext) -> StepRunResult;
}
