//! Per-job working directory on disk.
//!
//! Every execution attempt gets `<data_dir>/jobs/<id>/` with the serialized
//! YAML input at a deterministic path and an `output/` directory for the
//! tool. The tree is owned exclusively by the executor handling the job and
//! is never cleaned up automatically: result files are served from it after
//! completion.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::types::DbId;

/// File the job's `inputs` document is serialized to.
pub const INPUT_FILE_NAME: &str = "input.yaml";

/// Directory the tool writes into, passed via `--out_dir`.
pub const OUTPUT_DIR_NAME: &str = "output";

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("I/O error preparing workspace: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize inputs to YAML: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

/// A job's directory tree, rooted at `<data_dir>/jobs/<id>`.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    root: PathBuf,
}

impl JobWorkspace {
    /// Create the workspace directories for one execution attempt.
    pub fn create(data_dir: &Path, job_id: DbId) -> Result<Self, WorkspaceError> {
        let root = data_dir.join("jobs").join(job_id.to_string());
        std::fs::create_dir_all(root.join(OUTPUT_DIR_NAME))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic path of the serialized input file.
    pub fn input_path(&self) -> PathBuf {
        self.root.join(INPUT_FILE_NAME)
    }

    /// Directory handed to the tool as `--out_dir`.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR_NAME)
    }

    /// Base name of the input file without extension; the tool names its
    /// prediction subdirectory after it.
    pub fn input_stem(&self) -> &'static str {
        "input"
    }

    /// Serialize the job's opaque `inputs` document to the YAML file the
    /// tool consumes.
    pub fn write_inputs(&self, inputs: &Value) -> Result<(), WorkspaceError> {
        let yaml = serde_yaml::to_string(inputs)?;
        std::fs::write(self.input_path(), yaml)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
