pub mod confirm;
pub mod runner;
pub mod tools;

pub use confirm::{is_affirmative, Confirm, ConsoleConfirm};
pub use runner::{
    ArtifactPaths, ExportReport, ExportRequest, ExtractionPipeline, PipelineEvent, PipelineState,
};
pub use tools::{SystemToolRunner, ToolExit, ToolInvocation, ToolRunner};
