pub mod types;

pub use types::{build_flow_definition, build_flow_definition_auto, FlowDefinition, FlowRepository, InMemoryFlowRepository,
                RunInstance, RunState, StepSlot};
