//! Transform script protocol
//!
//! A transform script has a single entry point. The requested action and its
//! payload are passed as external variables, each one JSON-encoded. The
//! script answers with a JSON object keyed by the action name.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::VarMap;

/// Action names on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformAction {
    Metadata,
    VarsDefault,
    VarsOverride,
    DockerOverride,
}

impl TransformAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformAction::Metadata => "metadata",
            TransformAction::VarsDefault => "vars_default",
            TransformAction::VarsOverride => "vars_override",
            TransformAction::DockerOverride => "docker_override",
        }
    }
}

/// A request sent to a transform script
#[derive(Debug, Clone, PartialEq)]
pub enum TransformRequest {
    /// Describe the tag
    Metadata,

    /// Propose default variables
    DefaultVars { user_data: VarMap },

    /// Propose variable overrides
    OverrideVars { user_data: VarMap },

    /// Rewrite the compose document
    Transform { user_data: VarMap, document: Value },
}

impl TransformRequest {
    pub fn action(&self) -> TransformAction {
        match self {
            TransformRequest::Metadata => TransformAction::Metadata,
            TransformRequest::DefaultVars { .. } => TransformAction::VarsDefault,
            TransformRequest::OverrideVars { .. } => TransformAction::VarsOverride,
            TransformRequest::Transform { .. } => TransformAction::DockerOverride,
        }
    }

    /// External variables for the interpreter, each value JSON-encoded
    pub fn ext_vars(&self) -> Vec<(String, String)> {
        let mut vars = vec![(
            "action".to_string(),
            Value::String(self.action().as_str().to_string()).to_string(),
        )];

        match self {
            TransformRequest::Metadata => {}
            TransformRequest::DefaultVars { user_data }
            | TransformRequest::OverrideVars { user_data } => {
                vars.push(("user_data".to_string(), encode_map(user_data)));
            }
            TransformRequest::Transform {
                user_data,
                document,
            } => {
                vars.push(("user_data".to_string(), encode_map(user_data)));
                vars.push(("docker_file".to_string(), document.to_string()));
            }
        }

        vars
    }
}

fn encode_map(map: &VarMap) -> String {
    Value::Object(map.clone()).to_string()
}

/// Self-description returned by the `metadata` action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A decoded script answer
#[derive(Debug, Clone, PartialEq)]
pub enum TransformResponse {
    Metadata(TagMetadata),
    DefaultVars(VarMap),
    OverrideVars(VarMap),
    Transform(Value),
}

/// Decodes raw script output for `action`
///
/// Errors are plain messages; the caller attaches the script path.
pub fn decode_response(action: TransformAction, raw: &str) -> Result<TransformResponse, String> {
    let parsed: Value =
        serde_json::from_str(raw).map_err(|e| format!("output is not valid JSON: {}", e))?;

    let Value::Object(mut root) = parsed else {
        return Err("output is not a JSON object".to_string());
    };

    let payload = root
        .remove(action.as_str())
        .ok_or_else(|| format!("output has no '{}' key", action.as_str()))?;

    let vars = |payload: Value| match payload {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(VarMap::new()),
        other => Err(format!(
            "'{}' must be an object, got: {}",
            action.as_str(),
            other
        )),
    };

    match action {
        TransformAction::Metadata => serde_json::from_value(payload)
            .map(TransformResponse::Metadata)
            .map_err(|e| format!("invalid metadata: {}", e)),
        TransformAction::VarsDefault => vars(payload).map(TransformResponse::DefaultVars),
        TransformAction::VarsOverride => vars(payload).map(TransformResponse::OverrideVars),
        TransformAction::DockerOverride => Ok(TransformResponse::Transform(payload)),
    }
}
