//! Shared helpers for the worker integration tests.
//!
//! The external prediction tool is faked with small shell scripts written
//! into a temp dir; the store is the in-memory implementation, so the
//! whole pipeline runs hermetically.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use boltzq_core::types::DbId;
use boltzq_db::models::job::{Job, NewJob};
use boltzq_db::store::{JobStore, MemoryJobStore};
use boltzq_worker::config::ExecutorConfig;
use boltzq_worker::executor::JobExecutor;
use serde_json::{json, Value};

/// Write an executable fake-tool script. The script receives the real
/// invocation: `predict <input.yaml> --out_dir <dir> [flags...]`, so `$2`
/// is the input file and `$4` the output directory.
pub fn write_tool(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-boltz");
    let script = format!("#!/bin/sh\n{body}\n");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A script that succeeds and writes one confidence artifact.
pub const SUCCESS_TOOL: &str = r#"
out="$4"
mkdir -p "$out/predictions/input"
printf '%s' '{"score": 0.9}' > "$out/predictions/input/confidence_input_model_0.json"
echo "prediction finished"
"#;

pub fn config(data_dir: &Path, tool_bin: &Path) -> Arc<ExecutorConfig> {
    Arc::new(ExecutorConfig {
        data_dir: data_dir.to_path_buf(),
        tool_bin: tool_bin.to_string_lossy().into_owned(),
        worker_count: 2,
        job_timeout: None,
    })
}

pub fn executor(store: Arc<MemoryJobStore>, config: Arc<ExecutorConfig>) -> Arc<JobExecutor> {
    Arc::new(JobExecutor::new(store, config))
}

pub async fn submit(store: &MemoryJobStore, name: &str, params: Value) -> Job {
    store
        .create(NewJob {
            name: name.to_string(),
            inputs: json!({
                "version": 1,
                "sequences": [{"protein": {"id": "A", "sequence": "MKTAYIAK"}}],
            }),
            params,
        })
        .await
        .unwrap()
}

/// Poll the store until every id reaches a terminal state (or panic after
/// ten seconds).
pub async fn wait_until_terminal(store: &MemoryJobStore, ids: &[DbId]) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let mut all_terminal = true;
        for id in ids {
            let job = store.get(*id).await.unwrap().unwrap();
            if !job.status.is_terminal() {
                all_terminal = false;
                break;
            }
        }
        if all_terminal {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "jobs did not reach a terminal state in time"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
