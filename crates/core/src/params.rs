//! Prediction parameter values and their command-line flag expansion.
//!
//! A job's `params` column is a flat JSON object mapping option names to
//! scalar values. Each entry contributes flags to the external tool's
//! invocation: booleans gate a bare `--flag`, everything else becomes a
//! `--flag <value>` pair.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// A single prediction parameter value.
///
/// Deserialized untagged, so `3`, `true`, and `"fp32"` in the params object
/// all map to the right variant without any wrapper syntax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl ParamValue {
    /// Expand this value into the arguments it contributes for option `key`.
    ///
    /// - `Bool(true)` -> `["--key"]`
    /// - `Bool(false)` -> `[]`
    /// - anything else -> `["--key", "<value>"]`
    pub fn flag_args(&self, key: &str) -> Vec<String> {
        let flag = format!("--{key}");
        match self {
            Self::Bool(true) => vec![flag],
            Self::Bool(false) => Vec::new(),
            Self::Number(n) => vec![flag, n.to_string()],
            Self::Text(s) => vec![flag, s.clone()],
        }
    }
}

/// Ordered parameter map. `BTreeMap` keeps flag order stable across runs,
/// which makes invocations reproducible and logs diffable.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// Parse and validate a raw JSON params document into a [`ParamMap`].
///
/// The document must be an object and every value must be a scalar
/// (boolean, number, or string). Anything else is a submission error.
pub fn parse_params(raw: &Value) -> Result<ParamMap, CoreError> {
    let obj = raw.as_object().ok_or_else(|| {
        CoreError::Validation("params must be a JSON object".to_string())
    })?;

    let mut map = ParamMap::new();
    for (key, value) in obj {
        if key.is_empty() {
            return Err(CoreError::Validation(
                "param names must not be empty".to_string(),
            ));
        }
        let parsed = match value {
            Value::Bool(b) => ParamValue::Bool(*b),
            Value::Number(n) => ParamValue::Number(n.clone()),
            Value::String(s) => ParamValue::Text(s.clone()),
            other => {
                return Err(CoreError::Validation(format!(
                    "param \"{key}\" must be a boolean, number, or string, got {other}"
                )))
            }
        };
        map.insert(key.clone(), parsed);
    }
    Ok(map)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    // -- flag_args ------------------------------------------------------------

    #[test]
    fn bool_true_is_a_bare_flag() {
        let args = ParamValue::Bool(true).flag_args("use_msa");
        assert_eq!(args, vec!["--use_msa"]);
    }

    #[test]
    fn bool_false_contributes_nothing() {
        let args = ParamValue::Bool(false).flag_args("diffusion");
        assert!(args.is_empty());
    }

    #[test]
    fn integer_keeps_its_plain_formatting() {
        let args = ParamValue::Number(3.into()).flag_args("recycles");
        assert_eq!(args, vec!["--recycles", "3"]);
    }

    #[test]
    fn float_is_stringified() {
        let n = serde_json::Number::from_f64(0.5).unwrap();
        let args = ParamValue::Number(n).flag_args("step_scale");
        assert_eq!(args, vec!["--step_scale", "0.5"]);
    }

    #[test]
    fn text_becomes_flag_and_value() {
        let args = ParamValue::Text("fp32".to_string()).flag_args("precision");
        assert_eq!(args, vec!["--precision", "fp32"]);
    }

    // -- parse_params ---------------------------------------------------------

    #[test]
    fn parses_mixed_scalars() {
        let map = parse_params(&json!({
            "recycles": 3,
            "use_msa": true,
            "precision": "fp32",
        }))
        .unwrap();

        assert_eq!(map.get("recycles"), Some(&ParamValue::Number(3.into())));
        assert_eq!(map.get("use_msa"), Some(&ParamValue::Bool(true)));
        assert_eq!(
            map.get("precision"),
            Some(&ParamValue::Text("fp32".to_string()))
        );
    }

    #[test]
    fn empty_object_is_valid() {
        assert!(parse_params(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn rejects_non_object() {
        assert_matches!(parse_params(&json!([1, 2])), Err(CoreError::Validation(_)));
    }

    #[test]
    fn rejects_nested_value() {
        let err = parse_params(&json!({"grid": {"x": 1}}));
        assert_matches!(err, Err(CoreError::Validation(msg)) if msg.contains("grid"));
    }

    #[test]
    fn rejects_null_value() {
        assert_matches!(
            parse_params(&json!({"seed": null})),
            Err(CoreError::Validation(_))
        );
    }
}
