//! Pipeline control flow: stage orchestration and recurring runs

pub mod orchestrator;
pub mod schedule;

pub use orchestrator::{ConnectorReport, Orchestrator, OrchestratorBuilder, RunSummary, StageFailure};
pub use schedule::Schedule;
