// Checkpointing - Persist and resume job state as a single JSON document
use super::state::{JobState, SceneState};
use crate::error::PersistenceError;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Store for one job id. Owns the state document path and the job's scratch
/// directory. All writes go through `write_lock`, so concurrent scene
/// completions never lose each other's updates.
#[derive(Debug)]
pub struct JobStore {
    job_id: String,
    state_file: PathBuf,
    data_dir: PathBuf,
    temp_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JobStore {
    pub fn new(job_id: &str, state_dir: &Path, output_dir: &Path) -> Self {
        let data_dir = output_dir.join(job_id);
        Self {
            job_id: job_id.to_string(),
            state_file: state_dir.join(format!("{}_state.json", job_id)),
            temp_dir: data_dir.join("temp"),
            data_dir,
            write_lock: Mutex::new(()),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Working directory owned by a single scene.
    pub fn scene_dir(&self, scene_id: &str) -> PathBuf {
        self.temp_dir.join(format!("scene_{}", scene_id))
    }

    /// Load the document. A missing or unreadable document yields a fresh,
    /// empty state; corruption is logged and never propagated.
    pub async fn load(&self) -> JobState {
        match self.read_document().await {
            Ok(Some(mut state)) => {
                if state.storyboard.as_ref().is_some_and(|b| b.scenes.is_empty()) {
                    warn!("Storyboard for project {} has no scenes, discarding it", self.job_id);
                    state.storyboard = None;
                }
                let steps = state.completed_steps();
                info!(
                    "📂 State loaded for project {}. Completed steps: {}",
                    self.job_id,
                    if steps.is_empty() { "none".to_string() } else { steps.join(", ") }
                );
                state
            }
            Ok(None) => {
                info!("No existing state found for project {}. Creating new state.", self.job_id);
                JobState::default()
            }
            Err(e) => {
                error!("❌ Error loading state for project {}: {}. Starting fresh.", self.job_id, e);
                JobState::default()
            }
        }
    }

    /// Persist the whole document.
    pub async fn save(&self, state: &JobState) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        self.write_document(state).await
    }

    /// Read-modify-write of a single scene: replaces the scene with the same
    /// id, or appends it when absent.
    pub async fn save_scene_state(&self, scene: &SceneState) -> Result<(), PersistenceError> {
        debug!("Saving processed scene with ID: {}", scene.id);
        let _guard = self.write_lock.lock().await;

        let mut state = match self.read_document().await {
            Ok(Some(state)) => state,
            Ok(None) => JobState::default(),
            Err(e) => {
                warn!("State document unreadable while saving scene {}: {}", scene.id, e);
                JobState::default()
            }
        };

        let storyboard = state
            .storyboard
            .as_mut()
            .ok_or(PersistenceError::MissingStoryboard)?;
        storyboard.upsert(scene.clone());

        self.write_document(&state).await
    }

    /// Delete the state document and every file under the job's data
    /// directory, scratch directory included.
    pub async fn clear(&self) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;

        match tokio::fs::remove_file(&self.state_file).await {
            Ok(()) => info!("🧹 State cleared for project {}", self.job_id),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No state file found to clear for project {}", self.job_id)
            }
            Err(e) => return Err(PersistenceError::io(&self.state_file, e)),
        }

        match tokio::fs::remove_dir_all(&self.data_dir).await {
            Ok(()) => debug!("Removed data directory: {}", self.data_dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(PersistenceError::io(&self.data_dir, e)),
        }

        Ok(())
    }

    /// Remove the scratch directory after a successful composition.
    pub async fn clear_temp_dir(&self) -> Result<(), PersistenceError> {
        info!("Clearing temporary directory");
        match tokio::fs::remove_dir_all(&self.temp_dir).await {
            Ok(()) => {
                debug!("Removed temporary directory: {}", self.temp_dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::io(&self.temp_dir, e)),
        }
    }

    async fn read_document(&self) -> Result<Option<JobState>, PersistenceError> {
        let bytes = match tokio::fs::read(&self.state_file).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PersistenceError::io(&self.state_file, e)),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Write to a sibling temp file, fsync, then rename over the document.
    /// A crash mid-write leaves either the old document or the new one.
    async fn write_document(&self, state: &JobState) -> Result<(), PersistenceError> {
        let mut stamped = state.clone();
        stamped.updated_at = Some(Utc::now());
        let json = serde_json::to_vec_pretty(&stamped)?;

        let dir = self
            .state_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PersistenceError::io(&dir, e))?;

        let tmp_path = dir.join(format!(".{}_state.{}.tmp", self.job_id, Uuid::new_v4()));
        let result = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(&json).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp_path, &self.state_file).await
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(PersistenceError::io(&self.state_file, e));
        }
        Ok(())
    }
}

/// Hands out one [`JobStore`] per job id. Repeated lookups for the same id
/// return the same store, so every handle shares one write lock.
#[derive(Debug)]
pub struct StoreRegistry {
    state_dir: PathBuf,
    output_dir: PathBuf,
    stores: StdMutex<HashMap<String, Arc<JobStore>>>,
}

impl StoreRegistry {
    pub fn new(state_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            output_dir: output_dir.into(),
            stores: StdMutex::new(HashMap::new()),
        }
    }

    pub fn open(&self, job_id: &str) -> Arc<JobStore> {
        let mut stores = self
            .stores
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        stores
            .entry(job_id.to_string())
            .or_insert_with(|| Arc::new(JobStore::new(job_id, &self.state_dir, &self.output_dir)))
            .clone()
    }
}
