//! Structured extraction of prediction result artifacts.
//!
//! The tool writes its artifacts under `<out_dir>/predictions/<input_stem>/`,
//! including zero or more `confidence_*.json` and `affinity_*.json`
//! documents. Extraction builds one metrics record from those: the first
//! confidence document as the base, the first affinity document merged in
//! under an `affinity` key.
//!
//! Matches are sorted lexically before picking the first, so extraction is
//! deterministic regardless of the filesystem's directory ordering.

use std::path::{Path, PathBuf};

use serde_json::Value;

/// Subdirectory the tool writes predictions into.
pub const PREDICTIONS_DIR: &str = "predictions";

const CONFIDENCE_PREFIX: &str = "confidence_";
const AFFINITY_PREFIX: &str = "affinity_";

/// Outcome of scanning a finished run's output directory.
#[derive(Debug)]
pub struct Extraction {
    /// Merged metrics record; `None` when no artifacts were found.
    pub metrics: Option<Value>,
    /// The prediction subdirectory, recorded whether or not any metrics
    /// were found (result files are served from here later).
    pub results_path: PathBuf,
}

/// A matched artifact that cannot be used is a hard failure of the job:
/// partial success is never surfaced as success.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("I/O error reading results: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed result file {file}: {source}")]
    Malformed {
        file: String,
        source: serde_json::Error,
    },

    #[error("confidence document in {file} is not a JSON object")]
    NotAnObject { file: String },
}

/// Scan the prediction directory for `input_stem` and build the metrics
/// record. A missing prediction directory is not an error; the tool may
/// legitimately produce no artifacts.
pub fn extract_results(output_dir: &Path, input_stem: &str) -> Result<Extraction, ExtractError> {
    let pred_dir = output_dir.join(PREDICTIONS_DIR).join(input_stem);

    let confidence_file = matching_files(&pred_dir, CONFIDENCE_PREFIX)?.into_iter().next();
    let mut metrics = match &confidence_file {
        Some(file) => Some(parse_document(file)?),
        None => None,
    };

    if let Some(file) = matching_files(&pred_dir, AFFINITY_PREFIX)?.first() {
        let affinity = parse_document(file)?;
        match &mut metrics {
            Some(Value::Object(map)) => {
                map.insert("affinity".to_string(), affinity);
            }
            Some(_) => {
                // A scalar/array confidence document cannot carry the
                // affinity key.
                return Err(ExtractError::NotAnObject {
                    file: confidence_file
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                });
            }
            None => {
                metrics = Some(serde_json::json!({ "affinity": affinity }));
            }
        }
    }

    Ok(Extraction {
        metrics,
        results_path: pred_dir,
    })
}

/// List `<prefix>*.json` files in `dir`, lexically sorted by file name.
/// A missing directory yields no matches.
fn matching_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, ExtractError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut matches: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with(prefix) && name.ends_with(".json") && path.is_file() {
            matches.push(path);
        }
    }
    matches.sort();
    Ok(matches)
}

fn parse_document(file: &Path) -> Result<Value, ExtractError> {
    let raw = std::fs::read_to_string(file)?;
    serde_json::from_str(&raw).map_err(|source| ExtractError::Malformed {
        file: file.display().to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
