pub mod runner;
pub mod trigger;

pub use runner::{PipelineConfig, PipelineRunner, PipelineState, RunOutcome, Stage};
pub use trigger::{drive, DriveSummary, IntervalTrigger, ManualTrigger, Trigger};
