//! publish-core: motor de steps memoizados con reintentos.
//!
//! Un run es el replay de un log de eventos append-only; el éxito de cada
//! step queda memoizado contra `(run_id, step_id)` y un reintento (o una
//! re-entrega del evento disparador) retoma en el primer step sin éxito.
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod model;
pub mod policy;
pub mod repo;
pub mod step;

pub use engine::{FlowEngine, RunReport, StepAdvance};
pub use errors::{classify_error, CoreEngineError, ErrorClass};
pub use event::{EventStore, FlowEvent, FlowEventKind, InMemoryEventStore};
pub use model::{Artifact, ArtifactKind, ArtifactSpec, ExecutionContext};
pub use policy::RetryPolicy;
pub use repo::{build_flow_definition, FlowDefinition, FlowRepository, InMemoryFlowRepository, RunInstance, RunState};
pub use step::{FailureMode, StepDefinition, StepKind, StepRunResult, StepSignal, StepStatus};
