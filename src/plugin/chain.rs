//! Document transform chain

use std::path::Path;

use anyhow::Result;
use serde_json::Value;
use tracing::info;

use super::interpreter::Interpreter;
use super::protocol::{TransformRequest, TransformResponse};
use crate::domain::{expand_value, Tag, VarMap};
use crate::error::PaasifyError;

/// One script invocation of the chain
#[derive(Debug, Clone, Copy)]
pub struct TransformStep<'a> {
    pub tag: &'a Tag,
    pub script: &'a Path,
}

/// Variables sent to a tag's script: its override data over the cascade
///
/// String values of the override data are templated against the cascade.
pub fn tag_user_data(tag: &Tag, vars: &VarMap) -> VarMap {
    let mut data = vars.clone();
    for (key, value) in &tag.vars {
        data.insert(key.clone(), expand_value(key, value, vars));
    }
    data
}

/// Threads a compose document through transform scripts, in order
pub struct TransformChain<'a> {
    interpreter: &'a dyn Interpreter,
}

impl<'a> TransformChain<'a> {
    pub fn new(interpreter: &'a dyn Interpreter) -> Self {
        Self { interpreter }
    }

    /// Runs every step; the first failure aborts the chain
    pub fn run(&self, steps: &[TransformStep<'_>], vars: &VarMap, document: Value) -> Result<Value> {
        let mut document = document;

        for step in steps {
            info!("  Transform: {}", step.script.display());

            let request = TransformRequest::Transform {
                user_data: tag_user_data(step.tag, vars),
                document,
            };

            document = match self.interpreter.evaluate(step.script, &request)? {
                TransformResponse::Transform(next) => next,
                other => {
                    return Err(PaasifyError::TransformFailed {
                        script: step.script.to_path_buf(),
                        reason: format!("unexpected response: {:?}", other),
                    }
                    .into())
                }
            };
        }

        Ok(document)
    }
}
