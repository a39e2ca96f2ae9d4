//! Engine module for FlowEngine implementation
//!
//! Provides the core engine and the builder used to declare the fixed,
//! ordered list of steps a run executes.

pub mod builder;
pub mod core;

pub use builder::{EngineBuilder, EngineBuilderInit};
pub use core::{FlowEngine, RunReport, StepAdvance};

pub use crate::event::{EventStore, FlowEvent, FlowEventKind, InMemoryEventStore};
pub use crate::repo::{FlowDefinition, FlowRepository, InMemoryFlowRepository, RunState};
pub use crate::step::{StepRunResult, StepStatus};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CoreEngineError;
    use crate::model::{Artifact, ArtifactKind, ExecutionContext};
    use crate::policy::RetryPolicy;
    use crate::step::{FailureMode, StepDefinition, StepKind};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2))
    }

    fn art(v: serde_json::Value) -> Artifact {
        Artifact::new_unhashed(ArtifactKind::GenericJson, v, None)
    }

    // Paso fuente que cuenta sus ejecuciones.
    struct SourceStep {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl StepDefinition for SourceStep {
        fn id(&self) -> &str {
            "source"
        }
        fn kind(&self) -> StepKind {
            StepKind::Source
        }
        async fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            StepRunResult::single(art(json!({ "data": ctx.trigger["value"] })))
        }
    }

    // Falla con `error` las primeras `failures` ejecuciones.
    struct FlakyStep {
        calls: Arc<AtomicU32>,
        failures: u32,
        error: CoreEngineError,
        mode: FailureMode,
    }

    #[async_trait]
    impl StepDefinition for FlakyStep {
        fn id(&self) -> &str {
            "flaky"
        }
        fn kind(&self) -> StepKind {
            StepKind::Transform
        }
        fn failure_mode(&self) -> FailureMode {
            self.mode
        }
        async fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return StepRunResult::failure(self.error.clone());
            }
            let input = ctx.input.as_ref().map(|a| a.payload.clone()).unwrap_or_default();
            StepRunResult::single(art(json!({ "transformed": input["data"] })))
        }
    }

    struct SinkStep {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl StepDefinition for SinkStep {
        fn id(&self) -> &str {
            "sink"
        }
        fn kind(&self) -> StepKind {
            StepKind::Sink
        }
        async fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match ctx.output_of("source") {
                Some(_) => StepRunResult::empty(),
                None => StepRunResult::failure(CoreEngineError::Internal("sink ran before source".into())),
            }
        }
    }

    struct Counters {
        source: Arc<AtomicU32>,
        flaky: Arc<AtomicU32>,
        sink: Arc<AtomicU32>,
    }

    fn engine_with(failures: u32,
                   error: CoreEngineError,
                   mode: FailureMode)
                   -> (FlowEngine<InMemoryEventStore, InMemoryFlowRepository>, Counters) {
        let c = Counters { source: Arc::default(),
                           flaky: Arc::default(),
                           sink: Arc::default() };
        let engine = FlowEngine::in_memory()
            .first_step(SourceStep { calls: c.source.clone() })
            .add_step(FlakyStep { calls: c.flaky.clone(),
                                  failures,
                                  error,
                                  mode })
            .add_step(SinkStep { calls: c.sink.clone() })
            .retry_policy(fast_policy())
            .build();
        (engine, c)
    }

    #[tokio::test]
    async fn run_completes_and_memoizes_every_step() {
        let (engine, c) = engine_with(0, CoreEngineError::TransientIo("x".into()), FailureMode::Fatal);
        let report = engine.start(json!({"value": 7})).await.unwrap();
        assert_eq!(report.state, RunState::Completed);
        assert!(report.run_fingerprint.is_some());
        assert_eq!(report.output_of("flaky").unwrap().payload, json!({"transformed": 7}));
        assert_eq!(engine.event_variants(report.run_id).unwrap(),
                   vec!["I", "S", "F", "S", "F", "S", "F", "C"]);
        assert_eq!(c.source.load(Ordering::SeqCst), 1);
        assert_eq!(c.sink.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failure_retries_only_the_failed_step() {
        let (engine, c) = engine_with(2, CoreEngineError::TransientIo("reset".into()), FailureMode::Fatal);
        let report = engine.start(json!({"value": 1})).await.unwrap();
        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.attempt, 2);
        assert_eq!(c.source.load(Ordering::SeqCst), 1, "memoized source must not rerun");
        assert_eq!(c.flaky.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_budget_fails_the_run_and_skips_later_steps() {
        let (engine, c) = engine_with(10, CoreEngineError::Conflict("stale".into()), FailureMode::Fatal);
        let report = engine.start(json!({"value": 1})).await.unwrap();
        match &report.state {
            RunState::Failed { step_id, error } => {
                assert_eq!(step_id, "flaky");
                assert_eq!(error.kind(), "Conflict");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(c.flaky.load(Ordering::SeqCst), 3);
        assert_eq!(c.sink.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_retryable_error_fails_immediately() {
        let (engine, c) = engine_with(1, CoreEngineError::Unauthorized("401".into()), FailureMode::Fatal);
        let report = engine.start(json!({})).await.unwrap();
        assert!(matches!(report.state, RunState::Failed { .. }));
        assert_eq!(report.attempt, 0);
        assert_eq!(c.flaky.load(Ordering::SeqCst), 1);
        assert_eq!(engine.event_variants(report.run_id).unwrap(),
                   vec!["I", "S", "F", "S", "X", "E"]);
    }

    #[tokio::test]
    async fn best_effort_failure_is_signalled_and_run_completes() {
        let (engine, c) = engine_with(5, CoreEngineError::TransientIo("down".into()), FailureMode::BestEffort);
        let report = engine.start(json!({})).await.unwrap();
        assert_eq!(report.state, RunState::Completed);
        assert_eq!(c.flaky.load(Ordering::SeqCst), 1, "best-effort steps run exactly once");
        let events = engine.events_for(report.run_id).unwrap();
        assert!(events.iter().any(|e| matches!(&e.kind,
            FlowEventKind::StepSignal { signal, .. } if signal == crate::constants::SIGNAL_BEST_EFFORT_FAILURE)));
    }

    #[tokio::test]
    async fn rerunning_a_terminal_run_executes_nothing() {
        let (engine, c) = engine_with(0, CoreEngineError::TransientIo("x".into()), FailureMode::Fatal);
        let first = engine.start(json!({})).await.unwrap();
        let before = engine.events_for(first.run_id).unwrap().len();
        let second = engine.run(first.run_id).await.unwrap();
        assert_eq!(second.run_fingerprint, first.run_fingerprint);
        assert_eq!(engine.events_for(first.run_id).unwrap().len(), before);
        assert_eq!(c.sink.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_run_is_reported() {
        let (engine, _) = engine_with(0, CoreEngineError::TransientIo("x".into()), FailureMode::Fatal);
        let id = uuid::Uuid::new_v4();
        assert_eq!(engine.run(id).await.unwrap_err(), CoreEngineError::RunNotFound(id));
    }

    #[tokio::test]
    async fn step_by_step_advance() {
        let (engine, _) = engine_with(1, CoreEngineError::TransientIo("x".into()), FailureMode::Fatal);
        let run_id = uuid::Uuid::new_v4();
        engine.init_run(run_id, json!({})).unwrap();
        assert!(matches!(engine.step(run_id).await.unwrap(), StepAdvance::Executed { .. }));
        assert!(matches!(engine.step(run_id).await.unwrap(), StepAdvance::RetryScheduled { attempt: 1, .. }));
        assert!(matches!(engine.step(run_id).await.unwrap(), StepAdvance::Executed { .. }));
        assert!(matches!(engine.step(run_id).await.unwrap(), StepAdvance::Executed { .. }));
        assert_eq!(engine.step(run_id).await.unwrap(), StepAdvance::Completed);
    }
}
