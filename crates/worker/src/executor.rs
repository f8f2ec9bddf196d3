//! Drives one job through its lifecycle for one execution attempt.
//!
//! The attempt starts with a compare-and-swap to `running`. From that point
//! on every error (parameter validation, workspace setup, launch failure,
//! nonzero exit, extraction) maps to the `failed` state with the captured
//! logs preserved and an error line appended. A single job's failure never
//! takes the worker down.

use std::sync::Arc;

use async_trait::async_trait;
use boltzq_core::command::ToolCommand;
use boltzq_core::error::CoreError;
use boltzq_core::extract::{self, ExtractError};
use boltzq_core::params::parse_params;
use boltzq_core::process::{self, RunError, RunOptions};
use boltzq_core::types::DbId;
use boltzq_core::workspace::{JobWorkspace, WorkspaceError};
use boltzq_db::models::job::Job;
use boltzq_db::store::JobStore;
use serde_json::Value;

use crate::config::ExecutorConfig;
use crate::dispatcher::JobHandler;

/// Everything that can terminate an attempt in the `failed` state.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("invalid job parameters: {0}")]
    Params(CoreError),

    #[error("workspace setup failed: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("failed to launch prediction tool: {0}")]
    Launch(std::io::Error),

    #[error("I/O error while supervising prediction tool: {0}")]
    Io(std::io::Error),

    #[error("prediction tool killed after exceeding timeout ({elapsed_ms}ms)")]
    Timeout { elapsed_ms: u64 },

    #[error("prediction tool killed by shutdown")]
    Cancelled,

    #[error("prediction tool exited with status {exit_code}")]
    ToolFailed { exit_code: i32 },

    #[error("result extraction failed: {0}")]
    Extract(#[from] ExtractError),
}

/// Result of one attempt, before the terminal state is persisted.
enum Attempt {
    Completed {
        logs: String,
        metrics: Option<Value>,
        results_path: String,
    },
    Failed {
        logs: String,
        error: ExecError,
    },
}

impl Attempt {
    fn failed(logs: impl Into<String>, error: ExecError) -> Self {
        Self::Failed {
            logs: logs.into(),
            error,
        }
    }
}

/// Executes one job per invocation against the shared store.
pub struct JobExecutor {
    store: Arc<dyn JobStore>,
    config: Arc<ExecutorConfig>,
}

impl JobExecutor {
    pub fn new(store: Arc<dyn JobStore>, config: Arc<ExecutorConfig>) -> Self {
        Self { store, config }
    }

    /// Run one execution attempt for `job_id`.
    ///
    /// If the job is missing or not pending, the attempt is skipped without
    /// mutating any state; the compare-and-swap in the store is what makes
    /// re-dispatch of the same identifier safe.
    pub async fn execute(&self, job_id: DbId) {
        let job = match self.store.try_start(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::warn!(job_id, "Job missing or not pending; skipping execution");
                return;
            }
            Err(e) => {
                tracing::error!(job_id, error = %e, "Failed to claim job; skipping execution");
                return;
            }
        };

        tracing::info!(job_id, name = %job.name, "Job running");

        match self.run_attempt(&job).await {
            Attempt::Completed {
                logs,
                metrics,
                results_path,
            } => {
                match self
                    .store
                    .complete(job.id, &logs, metrics.as_ref(), &results_path)
                    .await
                {
                    Ok(()) => tracing::info!(job_id, "Job completed"),
                    Err(e) => {
                        // The job is left stale in the store; nothing more
                        // this attempt can do.
                        tracing::error!(job_id, error = %e, "Failed to persist completed state");
                    }
                }
            }
            Attempt::Failed { mut logs, error } => {
                if !logs.is_empty() && !logs.ends_with('\n') {
                    logs.push('\n');
                }
                logs.push_str(&format!("Error: {error}\n"));

                match self.store.fail(job.id, &logs).await {
                    Ok(()) => tracing::warn!(job_id, error = %error, "Job failed"),
                    Err(e) => {
                        tracing::error!(job_id, error = %e, "Failed to persist failed state");
                    }
                }
            }
        }
    }

    /// The fallible middle of an attempt: workspace, serialization, tool
    /// run, extraction. Always returns the logs captured so far alongside
    /// the outcome.
    async fn run_attempt(&self, job: &Job) -> Attempt {
        let params = match parse_params(&job.params) {
            Ok(params) => params,
            Err(e) => return Attempt::failed("", ExecError::Params(e)),
        };

        let workspace = match JobWorkspace::create(&self.config.data_dir, job.id) {
            Ok(ws) => ws,
            Err(e) => return Attempt::failed("", e.into()),
        };
        if let Err(e) = workspace.write_inputs(&job.inputs) {
            return Attempt::failed("", e.into());
        }

        let command = ToolCommand::predict(
            &self.config.tool_bin,
            &workspace.input_path(),
            &workspace.output_dir(),
            &params,
        );
        tracing::debug!(job_id = job.id, program = %command.program, args = ?command.args, "Invoking prediction tool");

        let options = RunOptions {
            timeout: self.config.job_timeout,
            ..Default::default()
        };
        let output = match process::run(&command, options).await {
            Ok(output) => output,
            Err(RunError::Launch(e)) => return Attempt::failed("", ExecError::Launch(e)),
            Err(RunError::Io(e)) => return Attempt::failed("", ExecError::Io(e)),
            Err(RunError::Timeout { elapsed_ms, logs }) => {
                return Attempt::failed(logs, ExecError::Timeout { elapsed_ms })
            }
            Err(RunError::Cancelled { logs }) => {
                return Attempt::failed(logs, ExecError::Cancelled)
            }
        };

        if output.exit_code != 0 {
            return Attempt::failed(
                output.logs,
                ExecError::ToolFailed {
                    exit_code: output.exit_code,
                },
            );
        }

        match extract::extract_results(&workspace.output_dir(), workspace.input_stem()) {
            Ok(extraction) => Attempt::Completed {
                logs: output.logs,
                metrics: extraction.metrics,
                results_path: extraction.results_path.display().to_string(),
            },
            Err(e) => Attempt::failed(output.logs, e.into()),
        }
    }
}

#[async_trait]
impl JobHandler for JobExecutor {
    async fn run(&self, job_id: DbId) {
        self.execute(job_id).await;
    }
}
