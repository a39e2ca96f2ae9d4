use crate::{errors::CoreEngineError, model::Artifact};

/// Señal ligera que un step puede adjuntar a su éxito.
#[derive(Debug, Clone)]
pub struct StepSignal {
    pub signal: String,
    pub data: serde_json::Value,
}

/// Resultado abstracto de ejecutar un step.
#[derive(Debug)]
pub enum StepRunResult {
    Success { outputs: Vec<Artifact> },
    SuccessWithSignals { outputs: Vec<Artifact>, signals: Vec<StepSignal> },
    Failure { error: CoreEngineError },
}

impl StepRunResult {
    pub fn single(output: Artifact) -> Self {
        StepRunResult::Success { outputs: vec![output] }
    }

    pub fn empty() -> Self {
        StepRunResult::Success { outputs: vec![] }
    }

    pub fn failure(error: CoreEngineError) -> Self {
        StepRunResult::Failure { error }
    }
}

impl From<Result<Artifact, CoreEngineError>> for StepRunResult {
    fn from(r: Result<Artifact, CoreEngineError>) -> Self {
        match r {
            Ok(a) => StepRunResult::single(a),
            Err(error) => StepRunResult::Failure { error },
        }
    }
}
