//! Core FlowEngine implementation

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::constants::{ENGINE_VERSION, SIGNAL_BEST_EFFORT_FAILURE};
use crate::engine::EngineBuilderInit;
use crate::errors::CoreEngineError;
use crate::event::{EventStore, FlowEvent, FlowEventKind, InMemoryEventStore};
use crate::hashing::hash_value;
use crate::model::{Artifact, ExecutionContext, RunFingerprintInput, StepFingerprintInput};
use crate::policy::RetryPolicy;
use crate::repo::{FlowDefinition, FlowRepository, InMemoryFlowRepository, RunInstance, RunState};
use crate::step::{FailureMode, StepDefinition, StepRunResult, StepSignal};

/// Resultado de avanzar un run una transición.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAdvance {
    /// Se ejecutó el step y su éxito quedó memoizado.
    Executed { step_id: String },
    /// Fallo transitorio: el mismo step se reintentará.
    RetryScheduled { step_id: String, attempt: u32, delay: Duration },
    Completed,
    Failed { step_id: String, error: CoreEngineError },
}

/// Vista del run reconstruida desde el store: estado, intentos y outputs
/// memoizados por step (en orden de definición).
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub trigger: Option<Value>,
    pub state: RunState,
    pub attempt: u32,
    pub outputs: IndexMap<String, Vec<Artifact>>,
    pub run_fingerprint: Option<String>,
}

impl RunReport {
    pub fn output_of(&self, step_id: &str) -> Option<&Artifact> {
        self.outputs.get(step_id).and_then(|o| o.first())
    }
}

/// Motor de ejecución de runs.
///
/// Ejecuta los steps de una definición fija en orden estricto, memoizando el
/// éxito de cada uno contra `(run_id, step_id)` en el `EventStore`. Es el
/// único punto que decide reintento vs fallo terminal. Runs distintos
/// avanzan en paralelo; dos entregas del mismo `run_id` en un mismo proceso
/// se serializan.
pub struct FlowEngine<E, R>
    where E: EventStore,
          R: FlowRepository
{
    event_store: E,
    repository: R,
    definition: FlowDefinition,
    policy: RetryPolicy,
    run_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl<E, R> std::fmt::Debug for FlowEngine<E, R>
    where E: EventStore,
          R: FlowRepository
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowEngine")
         .field("definition", &self.definition)
         .field("policy", &self.policy)
         .finish()
    }
}

impl FlowEngine<InMemoryEventStore, InMemoryFlowRepository> {
    /// Builder con stores en memoria.
    #[inline]
    pub fn in_memory() -> EngineBuilderInit<InMemoryEventStore, InMemoryFlowRepository> {
        EngineBuilderInit { event_store: InMemoryEventStore::default(),
                            repository: InMemoryFlowRepository::new() }
    }
}

impl<E, R> FlowEngine<E, R>
    where E: EventStore,
          R: FlowRepository
{
    #[inline]
    pub fn builder(event_store: E, repository: R) -> EngineBuilderInit<E, R> {
        EngineBuilderInit { event_store, repository }
    }

    pub fn new_with(event_store: E,
                    repository: R,
                    definition: FlowDefinition,
                    policy: RetryPolicy)
                    -> Result<Self, CoreEngineError> {
        if definition.is_empty() {
            return Err(CoreEngineError::EmptyDefinition);
        }
        Ok(Self::from_parts(event_store, repository, definition, policy))
    }

    pub(crate) fn from_parts(event_store: E, repository: R, definition: FlowDefinition, policy: RetryPolicy) -> Self {
        Self { event_store,
               repository,
               definition,
               policy,
               run_locks: DashMap::new() }
    }

    pub fn event_store(&self) -> &E {
        &self.event_store
    }

    pub fn definition(&self) -> &FlowDefinition {
        &self.definition
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Registra el run (idempotente) con su payload disparador.
    pub fn init_run(&self, run_id: Uuid, trigger: Value) -> Result<RunInstance, CoreEngineError> {
        let events = self.event_store.list(run_id)?;
        if events.iter()
                 .any(|e| matches!(e.kind, FlowEventKind::RunInitialized { .. }))
        {
            return self.load(run_id);
        }
        self.event_store.append_kind(run_id,
                                     FlowEventKind::RunInitialized { trigger,
                                                                     definition_hash: self.definition
                                                                                          .definition_hash
                                                                                          .clone(),
                                                                     step_count: self.definition.len() })?;
        info!("run:init run_id={run_id} steps={}", self.definition.len());
        self.load(run_id)
    }

    /// Crea un run nuevo y lo ejecuta hasta un estado terminal.
    pub async fn start(&self, trigger: Value) -> Result<RunReport, CoreEngineError> {
        let run_id = Uuid::new_v4();
        self.init_run(run_id, trigger)?;
        self.run(run_id).await
    }

    /// Ejecuta (o retoma) un run ya inicializado hasta `Completed`/`Failed`.
    /// Los steps con éxito memoizado no se re-ejecutan; si el run ya es
    /// terminal se devuelve el resultado registrado sin ejecutar nada.
    pub async fn run(&self, run_id: Uuid) -> Result<RunReport, CoreEngineError> {
        let lock = self.run_lock(run_id);
        let result = {
            let _guard = lock.lock().await;
            self.drive(run_id).await
        };
        drop(lock);
        self.run_locks.remove_if(&run_id, |_, l| Arc::strong_count(l) == 1);
        result
    }

    /// Avanza una única transición del run.
    pub async fn step(&self, run_id: Uuid) -> Result<StepAdvance, CoreEngineError> {
        let lock = self.run_lock(run_id);
        let _guard = lock.lock().await;
        self.next_with(run_id).await
    }

    fn run_lock(&self, run_id: Uuid) -> Arc<Mutex<()>> {
        self.run_locks.entry(run_id).or_default().clone()
    }

    async fn drive(&self, run_id: Uuid) -> Result<RunReport, CoreEngineError> {
        loop {
            match self.next_with(run_id).await? {
                StepAdvance::Executed { .. } | StepAdvance::RetryScheduled { .. } => continue,
                StepAdvance::Completed | StepAdvance::Failed { .. } => return self.report(run_id),
            }
        }
    }

    fn load(&self, run_id: Uuid) -> Result<RunInstance, CoreEngineError> {
        let events = self.event_store.list(run_id)?;
        Ok(self.repository.load(run_id, &events, &self.definition))
    }

    pub(crate) async fn next_with(&self, run_id: Uuid) -> Result<StepAdvance, CoreEngineError> {
        let instance = self.load(run_id)?;
        if !instance.is_initialized() {
            return Err(CoreEngineError::RunNotFound(run_id));
        }
        if instance.definition_hash.as_deref() != Some(self.definition.definition_hash.as_str()) {
            return Err(CoreEngineError::Internal(format!("run {run_id} was initialized with a different flow definition")));
        }

        match &instance.state {
            RunState::Completed => return Ok(StepAdvance::Completed),
            RunState::Failed { step_id, error } => {
                return Ok(StepAdvance::Failed { step_id: step_id.clone(),
                                                error: error.clone() })
            }
            RunState::Pending | RunState::Running { .. } => {}
        }

        let cursor = instance.cursor;
        if cursor >= self.definition.len() {
            // Todos los steps memoizados pero falta el cierre.
            self.complete_run(run_id, &instance, None)?;
            return Ok(StepAdvance::Completed);
        }

        let step_def = self.definition.steps[cursor].as_ref();
        let ctx = self.build_context(&instance, cursor)?;

        self.event_store.append_kind(run_id,
                                     FlowEventKind::StepStarted { step_index: cursor,
                                                                  step_id: step_def.id().to_string(),
                                                                  attempt: instance.attempt })?;
        debug!("step:start run_id={run_id} step={} attempt={}", step_def.id(), instance.attempt);

        match step_def.run(&ctx).await {
            StepRunResult::Success { outputs } => self.handle_step_success(run_id, &instance, step_def, outputs, vec![]),
            StepRunResult::SuccessWithSignals { outputs, signals } => {
                self.handle_step_success(run_id, &instance, step_def, outputs, signals)
            }
            StepRunResult::Failure { error } => self.handle_step_failure(run_id, &instance, step_def, error).await,
        }
    }

    fn build_context(&self, instance: &RunInstance, cursor: usize) -> Result<ExecutionContext, CoreEngineError> {
        let mut memo: IndexMap<String, Vec<Artifact>> = IndexMap::new();
        for slot in instance.steps.iter().take(cursor) {
            let mut arts = Vec::with_capacity(slot.outputs.len());
            for h in &slot.outputs {
                let art = self.event_store
                              .get_artifact(h)?
                              .ok_or_else(|| CoreEngineError::ArtifactMissing(h.clone()))?;
                arts.push(art);
            }
            memo.insert(slot.step_id.clone(), arts);
        }
        let input = memo.values().last().and_then(|outs| outs.first()).cloned();
        Ok(ExecutionContext { run_id: instance.id,
                              trigger: instance.trigger.clone().unwrap_or(Value::Null),
                              attempt: instance.attempt,
                              input,
                              memo })
    }

    fn handle_step_success(&self,
                           run_id: Uuid,
                           instance: &RunInstance,
                           step_def: &dyn StepDefinition,
                           outputs: Vec<Artifact>,
                           signals: Vec<StepSignal>)
                           -> Result<StepAdvance, CoreEngineError> {
        let cursor = instance.cursor;
        let outputs: Vec<Artifact> = outputs.into_iter().map(Artifact::hashed).collect();
        let output_hashes: Vec<String> = outputs.iter().map(|a| a.hash.clone()).collect();

        for s in signals {
            self.event_store.append_kind(run_id,
                                         FlowEventKind::StepSignal { step_index: cursor,
                                                                     step_id: step_def.id().to_string(),
                                                                     signal: s.signal,
                                                                     data: s.data })?;
        }

        let fp = self.step_fingerprint(cursor, step_def, &output_hashes);
        self.event_store.append_with_artifacts(run_id,
                                               FlowEventKind::StepFinished { step_index: cursor,
                                                                             step_id: step_def.id().to_string(),
                                                                             outputs: output_hashes,
                                                                             fingerprint: fp.clone() },
                                               &outputs)?;
        debug!("step:finished run_id={run_id} step={} outputs={}", step_def.id(), outputs.len());

        if cursor + 1 == self.definition.len() {
            self.complete_run(run_id, instance, Some(fp))?;
        }
        Ok(StepAdvance::Executed { step_id: step_def.id().to_string() })
    }

    async fn handle_step_failure(&self,
                                 run_id: Uuid,
                                 instance: &RunInstance,
                                 step_def: &dyn StepDefinition,
                                 error: CoreEngineError)
                                 -> Result<StepAdvance, CoreEngineError> {
        let cursor = instance.cursor;
        let step_id = step_def.id().to_string();

        if step_def.failure_mode() == FailureMode::BestEffort {
            warn!("step:best_effort_failure run_id={run_id} step={step_id} err={error}");
            let signal = StepSignal { signal: SIGNAL_BEST_EFFORT_FAILURE.to_string(),
                                      data: json!({ "kind": error.kind(), "error": error }) };
            return self.handle_step_success(run_id, instance, step_def, vec![], vec![signal]);
        }

        let fp = hash_value(&json!({
                                "engine_version": ENGINE_VERSION,
                                "definition_hash": self.definition.definition_hash,
                                "step_index": cursor,
                                "step_id": step_id,
                                "params": step_def.base_params(),
                            }));
        self.event_store.append_kind(run_id,
                                     FlowEventKind::StepFailed { step_index: cursor,
                                                                 step_id: step_id.clone(),
                                                                 attempt: instance.attempt,
                                                                 error: error.clone(),
                                                                 fingerprint: fp })?;

        if error.is_retryable() {
            let next_attempt = instance.attempt + 1;
            if self.policy.allows(next_attempt) {
                let delay = self.policy.backoff_for(next_attempt);
                self.event_store.append_kind(run_id,
                                             FlowEventKind::RetryScheduled { step_index: cursor,
                                                                             step_id: step_id.clone(),
                                                                             attempt: next_attempt,
                                                                             delay_ms: delay.as_millis() as u64 })?;
                warn!("step:retry run_id={run_id} step={step_id} attempt={next_attempt} delay_ms={} err={error}",
                      delay.as_millis());
                tokio::time::sleep(delay).await;
                return Ok(StepAdvance::RetryScheduled { step_id,
                                                        attempt: next_attempt,
                                                        delay });
            }
            warn!("step:retry_budget_exhausted run_id={run_id} step={step_id} budget={}", self.policy.budget);
        }

        self.event_store.append_kind(run_id,
                                     FlowEventKind::RunFailed { step_id: step_id.clone(),
                                                                error: error.clone() })?;
        error!("run:failed run_id={run_id} step={step_id} kind={} err={error}", error.kind());
        Ok(StepAdvance::Failed { step_id, error })
    }

    fn step_fingerprint(&self, cursor: usize, step_def: &dyn StepDefinition, output_hashes: &[String]) -> String {
        let params = step_def.base_params();
        let input = StepFingerprintInput { engine_version: ENGINE_VERSION,
                                           definition_hash: &self.definition.definition_hash,
                                           step_index: cursor,
                                           step_id: step_def.id(),
                                           output_hashes,
                                           params: &params };
        hash_value(&json!(input))
    }

    /// Emite `RunCompleted`. `last_fp` es el fingerprint recién calculado del
    /// último step cuando aún no está en `instance`.
    fn complete_run(&self, run_id: Uuid, instance: &RunInstance, last_fp: Option<String>) -> Result<(), CoreEngineError> {
        let mut step_fps: Vec<String> = instance.steps
                                                .iter()
                                                .filter_map(|s| {
                                                    s.fingerprint
                                                     .clone()
                                                     .filter(|_| s.status == crate::step::StepStatus::FinishedOk)
                                                })
                                                .collect();
        if let Some(fp) = last_fp {
            step_fps.push(fp);
        }
        let input = RunFingerprintInput { engine_version: ENGINE_VERSION,
                                          definition_hash: &self.definition.definition_hash,
                                          step_fingerprints: &step_fps };
        let run_fingerprint = hash_value(&json!(input));
        self.event_store
            .append_kind(run_id, FlowEventKind::RunCompleted { run_fingerprint })?;
        info!("run:completed run_id={run_id}");
        Ok(())
    }

    /// Estado actual del run y sus outputs memoizados.
    pub fn report(&self, run_id: Uuid) -> Result<RunReport, CoreEngineError> {
        let instance = self.load(run_id)?;
        if !instance.is_initialized() {
            return Err(CoreEngineError::RunNotFound(run_id));
        }
        let mut outputs = IndexMap::new();
        for slot in instance.steps
                            .iter()
                            .filter(|s| s.status == crate::step::StepStatus::FinishedOk)
        {
            let mut arts = Vec::with_capacity(slot.outputs.len());
            for h in &slot.outputs {
                if let Some(a) = self.event_store.get_artifact(h)? {
                    arts.push(a);
                }
            }
            outputs.insert(slot.step_id.clone(), arts);
        }
        Ok(RunReport { run_id,
                       trigger: instance.trigger,
                       state: instance.state,
                       attempt: instance.attempt,
                       outputs,
                       run_fingerprint: instance.run_fingerprint })
    }

    pub fn events_for(&self, run_id: Uuid) -> Result<Vec<FlowEvent>, CoreEngineError> {
        self.event_store.list(run_id)
    }

    /// Variante compacta de eventos (útil en tests y diagnósticos).
    pub fn event_variants(&self, run_id: Uuid) -> Result<Vec<&'static str>, CoreEngineError> {
        Ok(self.events_for(run_id)?
               .iter()
               .map(|e| match e.kind {
                   FlowEventKind::RunInitialized { .. } => "I",
                   FlowEventKind::StepStarted { .. } => "S",
                   FlowEventKind::StepFinished { .. } => "F",
                   FlowEventKind::StepFailed { .. } => "X",
                   FlowEventKind::RetryScheduled { .. } => "R",
                   FlowEventKind::StepSignal { .. } => "G",
                   FlowEventKind::RunCompleted { .. } => "C",
                   FlowEventKind::RunFailed { .. } => "E",
               })
               .collect())
    }
}
