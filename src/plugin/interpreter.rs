//! Transform script interpreters

use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::trace;

use super::protocol::{decode_response, TransformRequest, TransformResponse};
use crate::engine::{CommandRunner, CommandSpec};
use crate::error::PaasifyError;

/// Evaluates transform scripts
pub trait Interpreter {
    fn evaluate(&self, script: &Path, request: &TransformRequest) -> Result<TransformResponse>;
}

/// Longest external variable passed on the command line
///
/// Larger values (usually the compose document) are written to a temporary
/// file and passed with `--ext-str-file`.
pub const INLINE_VALUE_MAX: usize = 32 * 1024;

/// Runs scripts with the external `jsonnet` binary
pub struct JsonnetInterpreter {
    runner: Rc<dyn CommandRunner>,
    binary: String,
}

impl JsonnetInterpreter {
    pub fn new(runner: Rc<dyn CommandRunner>, binary: impl Into<String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
        }
    }

    /// Builds the command line; the returned files must outlive the call
    fn command(
        &self,
        script: &Path,
        request: &TransformRequest,
    ) -> Result<(CommandSpec, Vec<NamedTempFile>)> {
        let mut spec = CommandSpec::new(&self.binary);
        let mut files = Vec::new();

        for (name, value) in request.ext_vars() {
            if value.len() <= INLINE_VALUE_MAX {
                spec = spec.arg("--ext-str").arg(format!("{}={}", name, value));
                continue;
            }

            let mut file = tempfile::Builder::new()
                .prefix("paasify-")
                .suffix(".json")
                .tempfile()
                .context("Failed to create external variable file")?;
            file.write_all(value.as_bytes())
                .and_then(|_| file.flush())
                .with_context(|| format!("Failed to write external variable '{}'", name))?;

            spec = spec
                .arg("--ext-str-file")
                .arg(format!("{}={}", name, file.path().display()));
            files.push(file);
        }

        Ok((spec.arg(script.display().to_string()), files))
    }
}

impl Interpreter for JsonnetInterpreter {
    fn evaluate(&self, script: &Path, request: &TransformRequest) -> Result<TransformResponse> {
        let action = request.action();
        trace!("Process jsonnet: {} (action={})", script.display(), action.as_str());

        let failed = |reason: String| PaasifyError::TransformFailed {
            script: script.to_path_buf(),
            reason,
        };

        let (spec, _files) = self
            .command(script, request)
            .map_err(|e| failed(format!("{:#}", e)))?;
        let output = self.runner.output(&spec).map_err(|e| failed(format!("{:#}", e)))?;
        if !output.is_success() {
            return Err(failed(output.stderr.trim_end().to_string()).into());
        }

        Ok(decode_response(action, &output.stdout).map_err(failed)?)
    }
}
