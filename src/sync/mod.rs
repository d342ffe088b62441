pub mod orchestrator;
pub mod run;

pub use orchestrator::{ExportArtifact, Orchestrator, StageReport, SyncOptions, SyncReport};
pub use run::{Stage, StageState, SyncRun, SyncStatus};
