//! Construction of the external prediction tool's invocation.
//!
//! The tool contract is positional: `<program> predict <input.yaml>
//! --out_dir <dir>` followed by one flag group per parameter entry.

use std::path::Path;

use crate::params::ParamMap;

/// A fully assembled external command: program plus ordered arguments.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    /// Build a `predict` invocation for the given input file and output
    /// directory, appending the flag expansion of every parameter.
    pub fn predict(
        program: &str,
        input_path: &Path,
        out_dir: &Path,
        params: &ParamMap,
    ) -> Self {
        let mut args = vec![
            "predict".to_string(),
            input_path.to_string_lossy().into_owned(),
            "--out_dir".to_string(),
            out_dir.to_string_lossy().into_owned(),
        ];
        for (key, value) in params {
            args.extend(value.flag_args(key));
        }
        Self {
            program: program.to_string(),
            args,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
