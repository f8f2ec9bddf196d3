//! Execution engine configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the executor and worker pool.
///
/// All fields have defaults suitable for local development; override via
/// environment variables in production.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Root directory for per-job workspaces (default: `./data`).
    pub data_dir: PathBuf,
    /// Prediction tool binary (default: `boltz`).
    pub tool_bin: String,
    /// Number of concurrent workers (default: `2`). Each running job
    /// occupies one worker for its whole duration.
    pub worker_count: usize,
    /// Optional wall-clock limit per job; unset means jobs run until the
    /// tool exits on its own.
    pub job_timeout: Option<Duration>,
}

impl ExecutorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var            | Default  |
    /// |--------------------|----------|
    /// | `DATA_DIR`         | `./data` |
    /// | `BOLTZ_BIN`        | `boltz`  |
    /// | `WORKER_COUNT`     | `2`      |
    /// | `JOB_TIMEOUT_SECS` | unset    |
    pub fn from_env() -> Self {
        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let tool_bin = std::env::var("BOLTZ_BIN").unwrap_or_else(|_| "boltz".into());

        let worker_count: usize = std::env::var("WORKER_COUNT")
            .unwrap_or_else(|_| "2".into())
            .parse()
            .expect("WORKER_COUNT must be a valid usize");

        let job_timeout = std::env::var("JOB_TIMEOUT_SECS")
            .ok()
            .map(|raw| {
                let secs: u64 = raw.parse().expect("JOB_TIMEOUT_SECS must be a valid u64");
                Duration::from_secs(secs)
            });

        Self {
            data_dir,
            tool_bin,
            worker_count,
            job_timeout,
        }
    }
}
