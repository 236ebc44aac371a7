//! Test doubles for the compose engine and the transform interpreter

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::Result;
use paasify::engine::{CommandOutput, CommandRunner, CommandSpec};
use paasify::error::PaasifyError;
use paasify::plugin::{Interpreter, TagMetadata, TransformAction, TransformRequest, TransformResponse};
use paasify::stack::Toolchain;
use paasify::VarMap;
use regex::Regex;
use serde_json::Value;

/// Writes a file, creating parent directories
pub fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Reads a generated compose file
pub fn read_yaml(path: &Path) -> Value {
    let content = fs::read_to_string(path).unwrap();
    serde_yaml::from_str(&content).unwrap()
}

// =============================================================================
// Compose engine
// =============================================================================

/// A compose binary that merges files itself
///
/// `--version` reports the configured version. `config` merges every
/// `--file` argument (maps recursively, everything else replaced) and
/// substitutes `${NAME}` from the command environment. Other subcommands
/// succeed with no output; `ps` answers an empty JSON list.
pub struct FakeCompose {
    version: String,
    calls: RefCell<Vec<CommandSpec>>,
}

impl FakeCompose {
    pub fn new(version: &str) -> Rc<Self> {
        Rc::new(Self {
            version: version.to_string(),
            calls: RefCell::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Calls whose arguments contain `subcommand`
    pub fn calls_with(&self, subcommand: &str) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|c| c.args.iter().any(|a| a == subcommand))
            .collect()
    }

    /// Value following `flag` in a call
    pub fn flag_value<'a>(spec: &'a CommandSpec, flag: &str) -> Option<&'a str> {
        spec.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| spec.args.get(i + 1))
            .map(String::as_str)
    }

    fn config(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let mut merged = Value::Null;
        let mut args = spec.args.iter();
        while let Some(arg) = args.next() {
            if arg == "--file" {
                let file = args.next().expect("--file takes a value");
                let content = fs::read_to_string(file)?;
                let doc: Value = serde_yaml::from_str(&content)?;
                merge(&mut merged, doc);
            }
        }

        let substituted = substitute(merged, spec);
        Ok(CommandOutput::success(serde_yaml::to_string(&substituted)?))
    }
}

impl CommandRunner for FakeCompose {
    fn output(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(spec.clone());

        if spec.args.iter().any(|a| a == "--version") {
            return Ok(CommandOutput::success(format!(
                "docker-compose version {}, build 0000000\n",
                self.version
            )));
        }
        if spec.args.iter().any(|a| a == "config") {
            return self.config(spec);
        }
        if spec.args.iter().any(|a| a == "ps") {
            return Ok(CommandOutput::success("[]"));
        }
        Ok(CommandOutput::success(""))
    }

    fn interactive(&self, spec: &CommandSpec) -> Result<()> {
        self.calls.borrow_mut().push(spec.clone());
        Ok(())
    }
}

fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn substitute(value: Value, spec: &CommandSpec) -> Value {
    let pattern = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
    match value {
        Value::String(s) => Value::String(
            pattern
                .replace_all(&s, |caps: &regex::Captures| {
                    spec.env_var(&caps[1]).unwrap_or("").to_string()
                })
                .into_owned(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| substitute(v, spec)).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, substitute(v, spec)))
                .collect(),
        ),
        other => other,
    }
}

// =============================================================================
// Transform interpreter
// =============================================================================

type TransformFn = Box<dyn Fn(Value, &VarMap) -> Value>;

/// Behaviour of one fake script
#[derive(Default)]
pub struct FakeScript {
    pub description: Option<String>,
    pub defaults: VarMap,
    pub overrides: VarMap,
    pub transform: Option<TransformFn>,

    /// Reason reported when the script fails its transform step
    pub fails_with: Option<String>,
}

/// Interpreter answering from [`FakeScript`]s keyed by script file stem
#[derive(Default)]
pub struct FakeInterpreter {
    scripts: HashMap<String, FakeScript>,
    log: Rc<RefCell<Vec<(String, TransformAction)>>>,
}

impl FakeInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, name: &str, script: FakeScript) -> Self {
        self.scripts.insert(name.to_string(), script);
        self
    }

    /// Shared record of `(script stem, action)` calls
    pub fn log(&self) -> Rc<RefCell<Vec<(String, TransformAction)>>> {
        self.log.clone()
    }
}

impl Interpreter for FakeInterpreter {
    fn evaluate(&self, script: &Path, request: &TransformRequest) -> Result<TransformResponse> {
        let stem = script
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.log.borrow_mut().push((stem.clone(), request.action()));

        let behaviour = self.scripts.get(&stem);
        if let (TransformRequest::Transform { .. }, Some(reason)) =
            (request, behaviour.and_then(|b| b.fails_with.as_ref()))
        {
            return Err(PaasifyError::TransformFailed {
                script: script.to_path_buf(),
                reason: reason.clone(),
            }
            .into());
        }

        Ok(match request {
            TransformRequest::Metadata => TransformResponse::Metadata(TagMetadata {
                name: Some(stem.clone()),
                description: behaviour.and_then(|b| b.description.clone()),
                extra: Default::default(),
            }),
            TransformRequest::DefaultVars { .. } => TransformResponse::DefaultVars(
                behaviour.map(|b| b.defaults.clone()).unwrap_or_default(),
            ),
            TransformRequest::OverrideVars { .. } => TransformResponse::OverrideVars(
                behaviour.map(|b| b.overrides.clone()).unwrap_or_default(),
            ),
            TransformRequest::Transform {
                user_data,
                document,
            } => match behaviour.and_then(|b| b.transform.as_ref()) {
                Some(transform) => TransformResponse::Transform(transform(document.clone(), user_data)),
                None => TransformResponse::Transform(document.clone()),
            },
        })
    }
}

/// Toolchain backed by the fakes
pub fn toolchain(compose: &Rc<FakeCompose>, interpreter: FakeInterpreter) -> Toolchain {
    let runner: Rc<dyn CommandRunner> = compose.clone();
    Toolchain::new(runner, "docker-compose", Box::new(interpreter))
}
