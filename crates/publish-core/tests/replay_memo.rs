use std::sync::Arc;

use chrono::Utc;
use publish_core::repo::build_flow_definition_auto;
use publish_core::{CoreEngineError, EventStore, ExecutionContext, FlowEvent, FlowEventKind, FlowRepository,
                   InMemoryEventStore, InMemoryFlowRepository, RunState, StepDefinition, StepKind, StepRunResult,
                   StepStatus};
use serde_json::json;
use uuid::Uuid;

struct Noop(&'static str, StepKind);

#[async_trait::async_trait]
impl StepDefinition for Noop {
    fn id(&self) -> &str {
        self.0
    }
    fn kind(&self) -> StepKind {
        self.1
    }
    async fn run(&self, _ctx: &ExecutionContext) -> StepRunResult {
        StepRunResult::empty()
    }
}

fn ev(seq: u64, run_id: Uuid, kind: FlowEventKind) -> FlowEvent {
    FlowEvent { seq,
                run_id,
                kind,
                ts: Utc::now() }
}

#[test]
fn memoized_success_is_absorbing_under_replay() {
    let def = build_flow_definition_auto(vec![Box::new(Noop("a", StepKind::Source)),
                                              Box::new(Noop("b", StepKind::Sink))]);
    let run_id = Uuid::new_v4();
    let events = vec![ev(0, run_id, FlowEventKind::RunInitialized { trigger: json!({"draftId": "d1"}),
                                                                    definition_hash: def.definition_hash.clone(),
                                                                    step_count: 2 }),
                      ev(1, run_id, FlowEventKind::StepStarted { step_index: 0,
                                                                 step_id: "a".into(),
                                                                 attempt: 0 }),
                      ev(2, run_id, FlowEventKind::StepFinished { step_index: 0,
                                                                  step_id: "a".into(),
                                                                  outputs: vec!["h1".into()],
                                                                  fingerprint: "fp1".into() }),
                      // Un evento tardío de fallo no revierte el memo.
                      ev(3, run_id, FlowEventKind::StepFailed { step_index: 0,
                                                                step_id: "a".into(),
                                                                attempt: 0,
                                                                error: CoreEngineError::TransientIo("late".into()),
                                                                fingerprint: "x".into() }),
                      ev(4, run_id, FlowEventKind::StepStarted { step_index: 1,
                                                                 step_id: "b".into(),
                                                                 attempt: 0 })];
    let inst = InMemoryFlowRepository::new().load(run_id, &events, &def);
    assert_eq!(inst.steps[0].status, StepStatus::FinishedOk);
    assert_eq!(inst.memo("a"), Some(&["h1".to_string()][..]));
    assert_eq!(inst.cursor, 1);
    assert_eq!(inst.state, RunState::Running { step_id: "b".into() });
}

#[test]
fn retry_scheduled_reopens_failed_slot_and_bumps_attempt() {
    let def = build_flow_definition_auto(vec![Box::new(Noop("a", StepKind::Source))]);
    let run_id = Uuid::new_v4();
    let events = vec![ev(0, run_id, FlowEventKind::RunInitialized { trigger: json!({}),
                                                                    definition_hash: def.definition_hash.clone(),
                                                                    step_count: 1 }),
                      ev(1, run_id, FlowEventKind::StepStarted { step_index: 0,
                                                                 step_id: "a".into(),
                                                                 attempt: 0 }),
                      ev(2, run_id, FlowEventKind::StepFailed { step_index: 0,
                                                                step_id: "a".into(),
                                                                attempt: 0,
                                                                error: CoreEngineError::Conflict("sha".into()),
                                                                fingerprint: "x".into() }),
                      ev(3, run_id, FlowEventKind::RetryScheduled { step_index: 0,
                                                                    step_id: "a".into(),
                                                                    attempt: 1,
                                                                    delay_ms: 10 })];
    let inst = InMemoryFlowRepository::new().load(run_id, &events, &def);
    assert_eq!(inst.attempt, 1);
    assert_eq!(inst.steps[0].status, StepStatus::Pending);
    assert_eq!(inst.steps[0].executions, 1);
    assert!(matches!(inst.steps[0].last_error, Some(CoreEngineError::Conflict(_))));
}

#[test]
fn seq_is_contiguous_inmemory() {
    let store = InMemoryEventStore::default();
    let run_id = Uuid::new_v4();
    for i in 0..5 {
        store.append_kind(run_id,
                          FlowEventKind::StepStarted { step_index: i,
                                                       step_id: format!("s{i}"),
                                                       attempt: 0 })
             .unwrap();
    }
    let events = store.list(run_id).unwrap();
    for (expected_seq, e) in (0u64..).zip(events.iter()) {
        assert_eq!(e.seq, expected_seq);
    }
}

#[test]
fn shared_store_handles_see_the_same_log() {
    let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::default());
    let writer = store.clone();
    let run_id = Uuid::new_v4();
    writer.append_kind(run_id,
                       FlowEventKind::StepStarted { step_index: 0,
                                                    step_id: "s0".into(),
                                                    attempt: 0 })
          .unwrap();
    let by_ref: &dyn EventStore = &store;
    assert_eq!(by_ref.list(run_id).unwrap().len(), 1);
    assert_eq!(EventStore::list(&writer, run_id).unwrap()[0].seq, 0);
}
