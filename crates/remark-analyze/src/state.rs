use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use remark_core::{Annotation, RemarkError};
use serde::{Deserialize, Serialize};

use crate::batch::BatchStats;
use crate::export::ReportDocument;

const STATE_DIR: &str = ".remark";
const STATE_FILE: &str = "last-analysis.json";

/// Results of the last `analyze` run, kept so `report` and `export` can work
/// without calling the model again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisState {
    /// The survey file that was analyzed.
    pub source: String,

    /// When the analysis finished.
    pub timestamp: DateTime<Utc>,

    /// Columns that were analyzed, in order.
    #[serde(default)]
    pub columns: Vec<String>,

    /// Counters from the run.
    #[serde(default)]
    pub stats: BatchStats,

    /// Every annotation, in processing order.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl AnalysisState {
    /// Path of the state file under `root`.
    pub fn path(root: &Path) -> PathBuf {
        root.join(STATE_DIR).join(STATE_FILE)
    }

    /// Load the state from `root/.remark`.
    ///
    /// Returns `Ok(None)` if the state file does not exist.
    pub fn load(root: &Path) -> Result<Option<Self>, RemarkError> {
        let state_path = Self::path(root);
        if !state_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&state_path).map_err(|e| {
            RemarkError::Config(format!(
                "failed to read analysis state from {}: {e}",
                state_path.display()
            ))
        })?;
        let state = serde_json::from_str(&content)
            .map_err(|e| RemarkError::Config(format!("failed to parse analysis state: {e}")))?;
        Ok(Some(state))
    }

    /// Save the state to `root/.remark`, creating the directory if needed.
    pub fn save(&self, root: &Path) -> Result<(), RemarkError> {
        let dir = root.join(STATE_DIR);
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                RemarkError::Config(format!("failed to create {STATE_DIR} directory: {e}"))
            })?;
        }

        let state_path = dir.join(STATE_FILE);
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RemarkError::Config(format!("failed to serialize analysis state: {e}")))?;
        std::fs::write(&state_path, content).map_err(|e| {
            RemarkError::Config(format!(
                "failed to write analysis state to {}: {e}",
                state_path.display()
            ))
        })?;
        Ok(())
    }

    /// Report document for the stored annotations, stamped with the
    /// analysis time.
    pub fn to_document(&self) -> ReportDocument {
        ReportDocument::at(self.annotations.clone(), self.timestamp)
    }
}
