//! Definiciones relacionadas a Steps.
//!
//! Un Step es una unidad de trabajo con nombre estable dentro del run. Su
//! resultado exitoso se memoiza contra `(run_id, step_id)`; este módulo
//! define:
//! - `StepDefinition`: interfaz (async) usada por el engine.
//! - `StepRunResult` y señales (`StepSignal`).
//! - `StepStatus`: estado de un step reconstruido por replay.

pub mod definition;
mod run_result;
mod status;

pub use definition::{FailureMode, StepDefinition, StepKind};
pub use run_result::{StepRunResult, StepSignal};
pub use status::StepStatus;
