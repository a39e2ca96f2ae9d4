/// Estado de un Step reconstruido a partir de eventos.
///
/// Transiciones válidas:
/// - `Pending` -> `Running`
/// - `Running` -> `FinishedOk` | `Failed`
/// - `Failed` -> `Pending` (sólo vía `RetryScheduled`)
///
/// `FinishedOk` es absorbente: un éxito memoizado nunca se revierte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Running,
    FinishedOk,
    Failed,
}
