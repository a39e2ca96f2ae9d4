//! Tipos de repositorio: estado reconstruido (`RunInstance`) y definición
//! (`FlowDefinition`).
//!
//! El repositorio aplica un replay lineal: consume los eventos de un run en
//! orden y construye su `RunInstance`. El memo de steps es exactamente el
//! conjunto de slots en `FinishedOk`; sólo guarda hashes de outputs, los
//! payloads viven en el store de artifacts.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::CoreEngineError;
use crate::event::{FlowEvent, FlowEventKind};
use crate::step::{StepDefinition, StepStatus};

/// Estado observable de un run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunState {
    /// Sin eventos de ejecución todavía.
    Pending,
    /// En curso (o interrumpido) en `step_id`.
    Running { step_id: String },
    Completed,
    Failed { step_id: String, error: CoreEngineError },
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct RunInstance {
    pub id: Uuid,
    pub trigger: Option<Value>,
    pub definition_hash: Option<String>,
    pub steps: Vec<StepSlot>,
    /// Índice del primer step sin éxito memoizado.
    pub cursor: usize,
    /// Contador monotónico de reintentos del run.
    pub attempt: u32,
    pub state: RunState,
    pub run_fingerprint: Option<String>,
}

impl RunInstance {
    pub fn is_initialized(&self) -> bool {
        self.trigger.is_some()
    }

    /// Hashes memoizados de `step_id`, si el step terminó con éxito.
    pub fn memo(&self, step_id: &str) -> Option<&[String]> {
        self.steps
            .iter()
            .find(|s| s.step_id == step_id && s.status == StepStatus::FinishedOk)
            .map(|s| s.outputs.as_slice())
    }
}

/// Estado de un step en la instancia.
#[derive(Debug, Clone)]
pub struct StepSlot {
    pub step_id: String,
    pub status: StepStatus,
    pub fingerprint: Option<String>,
    pub outputs: Vec<String>, // sólo hashes
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Ejecuciones iniciadas de este step (StepStarted vistos).
    pub executions: u32,
    pub last_error: Option<CoreEngineError>,
    pub signals: Vec<String>,
}

/// Trait para reconstruir (`replay`) el estado de un run a partir de eventos.
pub trait FlowRepository: Send + Sync {
    fn load(&self, run_id: Uuid, events: &[FlowEvent], definition: &FlowDefinition) -> RunInstance;
}

/// Definición inmutable del flujo: steps en orden fijo.
pub struct FlowDefinition {
    pub steps: Vec<Box<dyn StepDefinition>>,
    pub definition_hash: String,
}

impl std::fmt::Debug for FlowDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowDefinition")
         .field("steps", &self.step_ids())
         .field("definition_hash", &self.definition_hash)
         .finish()
    }
}

impl FlowDefinition {
    pub fn new(steps: Vec<Box<dyn StepDefinition>>, definition_hash: String) -> Self {
        Self { steps, definition_hash }
    }
    pub fn len(&self) -> usize {
        self.steps.len()
    }
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id()).collect()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryFlowRepository;

impl InMemoryFlowRepository {
    pub fn new() -> Self {
        Self
    }
}

impl FlowRepository for InMemoryFlowRepository {
    fn load(&self, run_id: Uuid, events: &[FlowEvent], definition: &FlowDefinition) -> RunInstance {
        let mut steps: Vec<StepSlot> = definition.steps
                                                 .iter()
                                                 .map(|s| StepSlot { step_id: s.id().to_string(),
                                                                     status: StepStatus::Pending,
                                                                     fingerprint: None,
                                                                     outputs: vec![],
                                                                     started_at: None,
                                                                     finished_at: None,
                                                                     executions: 0,
                                                                     last_error: None,
                                                                     signals: vec![] })
                                                 .collect();
        let mut trigger = None;
        let mut definition_hash = None;
        let mut attempt = 0u32;
        let mut terminal: Option<RunState> = None;
        let mut run_fingerprint = None;
        let mut last_started: Option<usize> = None;

        for ev in events {
            match &ev.kind {
                FlowEventKind::RunInitialized { trigger: t,
                                                definition_hash: h,
                                                .. } => {
                    trigger = Some(t.clone());
                    definition_hash = Some(h.clone());
                }
                FlowEventKind::StepStarted { step_index, .. } => {
                    if let Some(slot) = steps.get_mut(*step_index) {
                        if slot.status != StepStatus::FinishedOk {
                            slot.status = StepStatus::Running;
                            slot.started_at = Some(ev.ts);
                        }
                        slot.executions += 1;
                        last_started = Some(*step_index);
                    }
                }
                FlowEventKind::StepFinished { step_index,
                                              fingerprint,
                                              outputs,
                                              .. } => {
                    if let Some(slot) = steps.get_mut(*step_index) {
                        // El primer éxito gana: el memo nunca se reescribe.
                        if slot.status != StepStatus::FinishedOk {
                            slot.status = StepStatus::FinishedOk;
                            slot.fingerprint = Some(fingerprint.clone());
                            slot.outputs = outputs.clone();
                            slot.finished_at = Some(ev.ts);
                        }
                    }
                }
                FlowEventKind::StepFailed { step_index,
                                            fingerprint,
                                            error,
                                            .. } => {
                    if let Some(slot) = steps.get_mut(*step_index) {
                        if slot.status != StepStatus::FinishedOk {
                            slot.status = StepStatus::Failed;
                            slot.fingerprint = Some(fingerprint.clone());
                            slot.finished_at = Some(ev.ts);
                        }
                        slot.last_error = Some(error.clone());
                    }
                }
                FlowEventKind::RetryScheduled { step_index,
                                                attempt: a,
                                                .. } => {
                    attempt = attempt.max(*a);
                    if let Some(slot) = steps.get_mut(*step_index) {
                        if slot.status == StepStatus::Failed {
                            slot.status = StepStatus::Pending;
                        }
                    }
                }
                FlowEventKind::StepSignal { step_index, signal, .. } => {
                    if let Some(slot) = steps.get_mut(*step_index) {
                        slot.signals.push(signal.clone());
                    }
                }
                FlowEventKind::RunCompleted { run_fingerprint: fp } => {
                    run_fingerprint = Some(fp.clone());
                    terminal = Some(RunState::Completed);
                }
                FlowEventKind::RunFailed { step_id, error } => {
                    terminal = Some(RunState::Failed { step_id: step_id.clone(),
                                                       error: error.clone() });
                }
            }
        }

        let cursor = steps.iter()
                          .position(|s| s.status != StepStatus::FinishedOk)
                          .unwrap_or(steps.len());
        let state = match terminal {
            Some(t) => t,
            None => match (last_started, steps.get(cursor)) {
                (None, _) => RunState::Pending,
                (Some(_), Some(slot)) => RunState::Running { step_id: slot.step_id.clone() },
                // Todos los steps memoizados pero sin cierre (p.ej. caída antes
                // de `RunCompleted`): el engine emitirá el cierre al retomar.
                (Some(i), None) => RunState::Running { step_id: steps[i].step_id.clone() },
            },
        };

        RunInstance { id: run_id,
                      trigger,
                      definition_hash,
                      steps,
                      cursor,
                      attempt,
                      state,
                      run_fingerprint }
    }
}

pub fn build_flow_definition(step_ids: &[&str], steps: Vec<Box<dyn StepDefinition>>) -> FlowDefinition {
    use crate::hashing::hash_value;
    use serde_json::json;
    let definition_hash = hash_value(&json!({
                                         "engine_version": crate::constants::ENGINE_VERSION,
                                         "steps": step_ids,
                                     }));
    FlowDefinition::new(steps, definition_hash)
}

/// Variante que extrae los ids directamente de los steps, en orden.
pub fn build_flow_definition_auto(steps: Vec<Box<dyn StepDefinition>>) -> FlowDefinition {
    let ids: Vec<String> = steps.iter().map(|s| s.id().to_string()).collect();
    let id_refs: Vec<&str> = ids.iter().map(|s| s.as_str()).collect();
    build_flow_definition(&id_refs, steps)
}
