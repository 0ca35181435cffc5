//! Workflow template hydration.
//!
//! Turns a reusable parameterized workflow template (a ComfyUI-style node
//! graph in API format) plus concrete [`ShotParameters`] into a fully
//! resolved [`JobSpec`]. Hydration is a pure transform; stamping the
//! output-naming field happens later, at dispatch time, via
//! [`set_filename_prefix`].

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::CoreError;
use crate::generation::ShotParameters;

// ---------------------------------------------------------------------------
// Placeholder vocabulary
// ---------------------------------------------------------------------------

/// Placeholder keys recognised in templates, in substitution order.
///
/// Both `{{KEY}}` and `{KEY}` forms are replaced.
pub const PLACEHOLDER_KEYS: &[&str] =
    &["PROMPT", "NEGATIVE", "WIDTH", "HEIGHT", "LENGTH", "SEED"];

/// Input fields coerced to numbers after substitution, whatever their
/// origin. Templates often set these as direct numeric defaults rather
/// than placeholders, and older templates quote them.
pub const NUMERIC_INPUT_FIELDS: &[&str] =
    &["width", "height", "frames", "length", "seed", "noise_seed"];

/// Matches any surviving placeholder for the known keys, in either brace
/// form. Used for the post-substitution scan.
static RESIDUAL_PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{?(PROMPT|NEGATIVE|WIDTH|HEIGHT|LENGTH|SEED)\}?\}").expect("valid regex")
});

// ---------------------------------------------------------------------------
// JobSpec
// ---------------------------------------------------------------------------

/// A fully hydrated, validated workflow: a non-empty map of node id to
/// `{ class_type, inputs }`.
///
/// Serializes transparently as the node map, which is exactly the shape
/// the remote `/prompt` endpoint expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct JobSpec {
    nodes: Map<String, Value>,
}

impl JobSpec {
    /// Read-only view of the node map.
    pub fn nodes(&self) -> &Map<String, Value> {
        &self.nodes
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Consume into a plain JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.nodes)
    }
}

// ---------------------------------------------------------------------------
// Hydration
// ---------------------------------------------------------------------------

/// Hydrate `template` with `params`.
///
/// Steps: deep-clone, substitute `{{KEY}}`/`{KEY}` placeholders in every
/// string, repair nodes that arrived as one more level of encoded JSON
/// (single re-parse attempt), coerce the known numeric input fields, then
/// validate that no placeholder survived and the graph is a non-empty
/// node map. Any failure is fatal for this job and must be surfaced
/// before dispatch.
pub fn hydrate(template: &Value, params: &ShotParameters) -> Result<JobSpec, CoreError> {
    let mut value = template.clone();

    let replacements = placeholder_values(params);
    substitute_strings(&mut value, &replacements);

    let mut nodes = match value {
        Value::Object(map) => map,
        other => {
            return Err(CoreError::Validation(format!(
                "Workflow template must be a JSON object of nodes (got {})",
                json_kind(&other)
            )))
        }
    };
    if nodes.is_empty() {
        return Err(CoreError::Validation(
            "Workflow template must not be empty".to_string(),
        ));
    }

    for (node_id, node) in nodes.iter_mut() {
        reparse_string_node(node_id, node)?;
        coerce_numeric_inputs(node_id, node)?;
    }

    scan_for_residual_placeholders(&Value::Object(nodes.clone()))?;
    validate_node_shape(&nodes)?;

    Ok(JobSpec { nodes })
}

/// Stamp the encoded Address into every `filename_prefix` input.
///
/// Returns the number of nodes stamped. A template with no output-naming
/// field can never be reconciled, so zero matches is an error.
pub fn set_filename_prefix(spec: &mut JobSpec, prefix: &str) -> Result<usize, CoreError> {
    let mut stamped = 0;
    for node in spec.nodes.values_mut() {
        if let Some(inputs) = node.get_mut("inputs").and_then(Value::as_object_mut) {
            if inputs.contains_key("filename_prefix") {
                inputs.insert(
                    "filename_prefix".to_string(),
                    Value::String(prefix.to_string()),
                );
                stamped += 1;
            }
        }
    }
    if stamped == 0 {
        return Err(CoreError::Validation(
            "Workflow template has no filename_prefix input to carry the output name".to_string(),
        ));
    }
    Ok(stamped)
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Concrete replacement text per placeholder key.
fn placeholder_values(params: &ShotParameters) -> Vec<(&'static str, String)> {
    vec![
        ("PROMPT", params.prompt.clone()),
        ("NEGATIVE", params.negative_prompt.clone().unwrap_or_default()),
        ("WIDTH", params.width.to_string()),
        ("HEIGHT", params.height.to_string()),
        ("LENGTH", params.length_frames.to_string()),
        ("SEED", params.seed.to_string()),
    ]
}

/// Recursively replace placeholders in every string value.
///
/// The `{{KEY}}` form is replaced before `{KEY}` so the single-brace pass
/// never leaves stray braces behind.
fn substitute_strings(value: &mut Value, replacements: &[(&'static str, String)]) {
    match value {
        Value::String(s) => {
            for (key, replacement) in replacements {
                let double = format!("{{{{{key}}}}}");
                if s.contains(&double) {
                    *s = s.replace(&double, replacement);
                }
                let single = format!("{{{key}}}");
                if s.contains(&single) {
                    *s = s.replace(&single, replacement);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                substitute_strings(item, replacements);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                substitute_strings(item, replacements);
            }
        }
        _ => {}
    }
}

/// Repair a node that was serialized as one more level of encoded text.
///
/// A single re-parse attempt: the parsed value must itself be an object,
/// otherwise the template is unusable.
fn reparse_string_node(node_id: &str, node: &mut Value) -> Result<(), CoreError> {
    if let Value::String(encoded) = node {
        let parsed: Value = serde_json::from_str(encoded).map_err(|e| {
            CoreError::Validation(format!(
                "Node '{node_id}' is a string and does not re-parse as JSON: {e}"
            ))
        })?;
        if !parsed.is_object() {
            return Err(CoreError::Validation(format!(
                "Node '{node_id}' re-parsed to {} instead of an object",
                json_kind(&parsed)
            )));
        }
        *node = parsed;
    }
    Ok(())
}

/// Coerce the known numeric fields of a node's input map.
///
/// Only string values are touched: numbers pass through, and array values
/// are node-graph links (`[node_id, output_index]`) that must stay intact.
fn coerce_numeric_inputs(node_id: &str, node: &mut Value) -> Result<(), CoreError> {
    let Some(inputs) = node.get_mut("inputs").and_then(Value::as_object_mut) else {
        return Ok(());
    };
    for field in NUMERIC_INPUT_FIELDS {
        if let Some(Value::String(s)) = inputs.get(*field) {
            let number = parse_number(s).ok_or_else(|| {
                CoreError::Validation(format!(
                    "Node '{node_id}' input '{field}' is not numeric: '{s}'"
                ))
            })?;
            inputs.insert((*field).to_string(), Value::Number(number));
        }
    }
    Ok(())
}

/// Parse a decimal string as an integer first, falling back to float.
fn parse_number(s: &str) -> Option<Number> {
    if let Ok(n) = s.trim().parse::<i64>() {
        return Some(Number::from(n));
    }
    s.trim().parse::<f64>().ok().and_then(Number::from_f64)
}

/// Fail if any string still contains a `{KEY}`/`{{KEY}}` placeholder.
fn scan_for_residual_placeholders(value: &Value) -> Result<(), CoreError> {
    match value {
        Value::String(s) => {
            if let Some(m) = RESIDUAL_PLACEHOLDER_RE.find(s) {
                return Err(CoreError::Validation(format!(
                    "Unresolved placeholder '{}' after hydration",
                    m.as_str()
                )));
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(scan_for_residual_placeholders),
        Value::Object(map) => map.values().try_for_each(scan_for_residual_placeholders),
        _ => Ok(()),
    }
}

/// Assert every node is `{ class_type: <non-empty string>, inputs: <object> }`.
fn validate_node_shape(nodes: &Map<String, Value>) -> Result<(), CoreError> {
    for (node_id, node) in nodes {
        let Some(obj) = node.as_object() else {
            return Err(CoreError::Validation(format!(
                "Node '{node_id}' is {} instead of an object",
                json_kind(node)
            )));
        };
        match obj.get("class_type").and_then(Value::as_str) {
            Some(class_type) if !class_type.is_empty() => {}
            _ => {
                return Err(CoreError::Validation(format!(
                    "Node '{node_id}' is missing a class_type tag"
                )))
            }
        }
        if !obj.get("inputs").is_some_and(Value::is_object) {
            return Err(CoreError::Validation(format!(
                "Node '{node_id}' is missing an inputs map"
            )));
        }
    }
    Ok(())
}

/// Human-readable JSON kind for error messages.
fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::ShotParameters;
    use serde_json::json;

    fn params() -> ShotParameters {
        ShotParameters {
            prompt: "neon city flyover".into(),
            negative_prompt: Some("blurry".into()),
            width: 720,
            height: 480,
            length_frames: 81,
            seed: 42,
            fps: 24,
            start_frame: 0,
            duration_frames: 81,
            target_placement_id: None,
        }
    }

    fn template() -> Value {
        json!({
            "3": {
                "class_type": "CLIPTextEncode",
                "inputs": { "text": "{{PROMPT}}", "clip": ["1", 0] }
            },
            "4": {
                "class_type": "CLIPTextEncode",
                "inputs": { "text": "{NEGATIVE}", "clip": ["1", 0] }
            },
            "5": {
                "class_type": "EmptyLatentVideo",
                "inputs": { "width": "{WIDTH}", "height": "{HEIGHT}", "length": "{LENGTH}" }
            },
            "6": {
                "class_type": "KSampler",
                "inputs": { "seed": "{{SEED}}", "steps": 20, "latent": ["5", 0] }
            },
            "9": {
                "class_type": "SaveVideo",
                "inputs": { "filename_prefix": "shotforge", "video": ["6", 0] }
            }
        })
    }

    // -- hydrate --

    #[test]
    fn resolves_both_brace_forms() {
        let spec = hydrate(&template(), &params()).expect("hydrates");
        let nodes = spec.nodes();
        assert_eq!(nodes["3"]["inputs"]["text"], "neon city flyover");
        assert_eq!(nodes["4"]["inputs"]["text"], "blurry");
        assert_eq!(nodes["6"]["inputs"]["seed"], 42);
    }

    #[test]
    fn coerces_placeholder_numeric_fields() {
        let spec = hydrate(&template(), &params()).expect("hydrates");
        let inputs = &spec.nodes()["5"]["inputs"];
        assert_eq!(inputs["width"], 720);
        assert_eq!(inputs["height"], 480);
        assert_eq!(inputs["length"], 81);
    }

    #[test]
    fn coerces_quoted_numeric_defaults() {
        // Direct quoted defaults, no placeholder involved.
        let template = json!({
            "1": {
                "class_type": "KSampler",
                "inputs": { "noise_seed": "1234", "frames": "16.5" }
            }
        });
        let spec = hydrate(&template, &params()).expect("hydrates");
        let inputs = &spec.nodes()["1"]["inputs"];
        assert_eq!(inputs["noise_seed"], 1234);
        assert_eq!(inputs["frames"], 16.5);
    }

    #[test]
    fn leaves_link_valued_fields_untouched() {
        let template = json!({
            "1": {
                "class_type": "LatentUpscale",
                "inputs": { "width": ["2", 0], "samples": ["3", 0] }
            }
        });
        let spec = hydrate(&template, &params()).expect("hydrates");
        assert_eq!(spec.nodes()["1"]["inputs"]["width"], json!(["2", 0]));
    }

    #[test]
    fn non_numeric_coercion_target_fails() {
        let template = json!({
            "1": { "class_type": "KSampler", "inputs": { "seed": "not-a-number" } }
        });
        let err = hydrate(&template, &params()).unwrap_err();
        assert!(err.to_string().contains("not numeric"));
    }

    #[test]
    fn replaces_placeholders_inside_larger_strings() {
        let template = json!({
            "1": {
                "class_type": "Note",
                "inputs": { "text": "render at {WIDTH}x{HEIGHT}, seed {SEED}" }
            }
        });
        let spec = hydrate(&template, &params()).expect("hydrates");
        assert_eq!(
            spec.nodes()["1"]["inputs"]["text"],
            "render at 720x480, seed 42"
        );
    }

    #[test]
    fn missing_negative_prompt_becomes_empty() {
        let mut p = params();
        p.negative_prompt = None;
        let spec = hydrate(&template(), &p).expect("hydrates");
        assert_eq!(spec.nodes()["4"]["inputs"]["text"], "");
    }

    #[test]
    fn detects_placeholder_reintroduced_by_substitution() {
        // A prompt containing its own placeholder survives one replace
        // pass and must be caught by the residual scan.
        let mut p = params();
        p.prompt = "echo {PROMPT} forever".into();
        let err = hydrate(&template(), &p).unwrap_err();
        assert!(err.to_string().contains("Unresolved placeholder"));
    }

    #[test]
    fn reparses_string_encoded_node() {
        let mut t = template();
        t["6"] = json!(r#"{"class_type":"KSampler","inputs":{"seed":"{SEED}","steps":20}}"#);
        let spec = hydrate(&t, &params()).expect("hydrates");
        assert_eq!(spec.nodes()["6"]["class_type"], "KSampler");
        assert_eq!(spec.nodes()["6"]["inputs"]["seed"], 42);
    }

    #[test]
    fn string_node_reparsing_to_non_object_fails() {
        let mut t = template();
        t["6"] = json!(r#""just text""#);
        let err = hydrate(&t, &params()).unwrap_err();
        assert!(err.to_string().contains("instead of an object"));
    }

    #[test]
    fn string_node_that_is_not_json_fails() {
        let mut t = template();
        t["6"] = json!("definitely not json");
        let err = hydrate(&t, &params()).unwrap_err();
        assert!(err.to_string().contains("does not re-parse"));
    }

    #[test]
    fn top_level_array_rejected() {
        let err = hydrate(&json!([1, 2, 3]), &params()).unwrap_err();
        assert!(err.to_string().contains("must be a JSON object"));
    }

    #[test]
    fn empty_template_rejected() {
        let err = hydrate(&json!({}), &params()).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn node_without_class_type_rejected() {
        let t = json!({ "1": { "inputs": {} } });
        let err = hydrate(&t, &params()).unwrap_err();
        assert!(err.to_string().contains("missing a class_type"));
    }

    #[test]
    fn node_without_inputs_rejected() {
        let t = json!({ "1": { "class_type": "KSampler" } });
        let err = hydrate(&t, &params()).unwrap_err();
        assert!(err.to_string().contains("missing an inputs map"));
    }

    #[test]
    fn hydration_output_has_no_placeholder_substrings() {
        let spec = hydrate(&template(), &params()).expect("hydrates");
        let rendered = serde_json::to_string(&spec).expect("serializes");
        for key in PLACEHOLDER_KEYS {
            assert!(!rendered.contains(&format!("{{{key}}}")));
            assert!(!rendered.contains(&format!("{{{{{key}}}}}")));
        }
    }

    // -- set_filename_prefix --

    #[test]
    fn stamps_filename_prefix_on_save_nodes() {
        let mut spec = hydrate(&template(), &params()).expect("hydrates");
        let stamped =
            set_filename_prefix(&mut spec, "u1_p1_g7f3_s2_sf48_df60_fps24").expect("stamps");
        assert_eq!(stamped, 1);
        assert_eq!(
            spec.nodes()["9"]["inputs"]["filename_prefix"],
            "u1_p1_g7f3_s2_sf48_df60_fps24"
        );
    }

    #[test]
    fn missing_output_naming_field_is_an_error() {
        let t = json!({
            "1": { "class_type": "KSampler", "inputs": { "seed": 1 } }
        });
        let mut spec = hydrate(&t, &params()).expect("hydrates");
        let err = set_filename_prefix(&mut spec, "u1_p1_gx_s0_sf0_df1_fps24").unwrap_err();
        assert!(err.to_string().contains("no filename_prefix"));
    }
}
