pub mod config;
mod orchestrator;
mod types;

pub use orchestrator::{analyze, run_analysis};
pub use types::{AnalysisOutput, NoOpReporter, PipelineStage, ProgressReporter, RunOutput};
