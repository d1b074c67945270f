// Workflow orchestration module - checkpointed, resumable stage graph
pub mod checkpoint;
pub mod executor;
pub mod progress;
pub mod retry;
pub mod scene;
pub mod state;

pub use checkpoint::{JobStore, StoreRegistry};
pub use executor::{ExecutorConfig, JobInput, RunReport, StageStatus, WorkflowExecutor};
pub use state::{AudioTrack, JobState, SceneState, StoryboardState};
