//! Recording store - the persisted step log
//!
//! An ordered list of recordings at a configurable `.json` path. Every save
//! rewrites the file to exactly the completed steps: the content goes to a
//! temp file in the same directory first, then renames over the log, so a
//! torn write can never corrupt previously completed steps.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use playword_core::{Error, Recording, Result};

/// Ordered, persisted recording log
#[derive(Debug)]
pub struct RecordingStore {
    path: PathBuf,
    recordings: Vec<Recording>,
}

impl RecordingStore {
    /// Create a store over a log path; the path must end in `.json`
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            return Err(Error::InvalidLogPath(path));
        }
        Ok(Self {
            path,
            recordings: Vec::new(),
        })
    }

    /// The log path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the log from disk; a missing file is an empty log
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&mut self) -> Result<()> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                self.recordings = serde_json::from_slice(&bytes)?;
                debug!(steps = self.recordings.len(), "Loaded recording log");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.recordings.clear();
                debug!("No recording log yet; starting empty");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Rewrite the log to exactly the current steps
    #[instrument(skip(self), fields(path = %self.path.display(), steps = self.recordings.len()))]
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(&self.recordings)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Recording log written");
        Ok(())
    }

    /// All recordings, in canonical order
    #[must_use]
    pub fn recordings(&self) -> &[Recording] {
        &self.recordings
    }

    /// The recording at a step, if present
    #[must_use]
    pub fn get(&self, step: usize) -> Option<&Recording> {
        self.recordings.get(step)
    }

    /// Mutable access to the recording at a step (dry-run stamping)
    pub fn get_mut(&mut self, step: usize) -> Option<&mut Recording> {
        self.recordings.get_mut(step)
    }

    /// Append or overwrite the recording at a step
    pub fn set(&mut self, step: usize, recording: Recording) {
        if step < self.recordings.len() {
            self.recordings[step] = recording;
        } else {
            self.recordings.push(recording);
        }
    }

    /// Append a recording at the next free step, returning its index
    pub fn push(&mut self, recording: Recording) -> usize {
        self.recordings.push(recording);
        self.recordings.len() - 1
    }

    /// Remove the recording at a step; later steps re-index down by one
    pub fn remove(&mut self, step: usize) -> Option<Recording> {
        if step < self.recordings.len() {
            Some(self.recordings.remove(step))
        } else {
            None
        }
    }

    /// Number of completed steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }
}
