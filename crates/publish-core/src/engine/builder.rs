//! Builder para `FlowEngine`.
//!
//! Obliga a declarar el primer paso (fuente) antes de encadenar el resto; el
//! orden de declaración es el orden fijo de ejecución. La política de
//! reintentos se fija aquí y no cambia durante la vida del engine.
//!
//! ```ignore
//! let engine = FlowEngine::in_memory()
//!     .first_step(FetchDraftStep::new(drafts))
//!     .add_step(GenerateMarkdownStep)
//!     .build();
//! ```

use crate::engine::FlowEngine;
use crate::event::EventStore;
use crate::policy::RetryPolicy;
use crate::repo::{build_flow_definition_auto, FlowRepository};
use crate::step::StepDefinition;

/// Estado inicial del builder: stores presentes, sin pasos.
#[derive(Debug)]
pub struct EngineBuilderInit<E: EventStore, R: FlowRepository> {
    pub event_store: E,
    pub repository: R,
}

impl<E: EventStore, R: FlowRepository> EngineBuilderInit<E, R> {
    /// Define el primer paso del flujo y transiciona al builder completo.
    #[inline]
    pub fn first_step<S>(self, step: S) -> EngineBuilder<E, R>
        where S: StepDefinition + 'static
    {
        debug_assert!(matches!(step.kind(), crate::step::StepKind::Source),
                      "El primer paso debe ser de tipo Source");

        EngineBuilder { event_store: self.event_store,
                        repository: self.repository,
                        steps: vec![Box::new(step)],
                        policy: RetryPolicy::default() }
    }
}

pub struct EngineBuilder<E: EventStore, R: FlowRepository> {
    event_store: E,
    repository: R,
    steps: Vec<Box<dyn StepDefinition>>,
    policy: RetryPolicy,
}

impl<E: EventStore, R: FlowRepository> EngineBuilder<E, R> {
    #[inline]
    pub fn add_step<N>(mut self, next: N) -> Self
        where N: StepDefinition + 'static
    {
        self.steps.push(Box::new(next));
        self
    }

    #[inline]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Construye el `FlowEngine`; la definición (y su hash) se deriva de los
    /// ids de los pasos en orden.
    pub fn build(self) -> FlowEngine<E, R> {
        let definition = build_flow_definition_auto(self.steps);
        // `first_step` garantiza al menos un paso.
        FlowEngine::from_parts(self.event_store, self.repository, definition, self.policy)
    }
}
