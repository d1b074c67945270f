// lib.rs - Main library file that exports all modules
pub mod capabilities;
pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod source;
pub mod types;
pub mod workflow;

// Re-export commonly used types for convenience
pub use config::PipelineConfig;
pub use error::{PipelineError, SceneError, StageError, StepError};
pub use types::*;
