//! External tools used by the pipeline

use std::rc::Rc;

use anyhow::Result;

use crate::domain::Stack;
use crate::engine::{split_binary, CommandRunner, ComposeEngine, EngineDetector, SystemRunner};
use crate::plugin::{Interpreter, JsonnetInterpreter};
use crate::storage::Project;

/// Default compose command line
pub const DEFAULT_COMPOSE_BIN: &str = "docker-compose";

/// Default interpreter binary
pub const DEFAULT_JSONNET_BIN: &str = "jsonnet";

/// Binaries to run
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    /// Compose command line, may hold a prefix such as `docker compose`
    pub compose_bin: String,
    pub jsonnet_bin: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            compose_bin: DEFAULT_COMPOSE_BIN.to_string(),
            jsonnet_bin: DEFAULT_JSONNET_BIN.to_string(),
        }
    }
}

/// Command runner, compose engine detection and interpreter for one run
pub struct Toolchain {
    runner: Rc<dyn CommandRunner>,
    compose_binary: Vec<String>,
    detector: EngineDetector,
    interpreter: Box<dyn Interpreter>,
}

impl Toolchain {
    pub fn new(
        runner: Rc<dyn CommandRunner>,
        compose_bin: &str,
        interpreter: Box<dyn Interpreter>,
    ) -> Self {
        let compose_binary = split_binary(compose_bin);
        Self {
            detector: EngineDetector::new(runner.clone(), compose_binary.clone()),
            runner,
            compose_binary,
            interpreter,
        }
    }

    /// Tools backed by real subprocesses
    pub fn system(settings: &ToolSettings) -> Self {
        let runner: Rc<dyn CommandRunner> = Rc::new(SystemRunner);
        let interpreter = JsonnetInterpreter::new(runner.clone(), settings.jsonnet_bin.clone());
        Self::new(runner, &settings.compose_bin, Box::new(interpreter))
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn interpreter(&self) -> &dyn Interpreter {
        self.interpreter.as_ref()
    }

    /// Compose engine bound to a stack, detecting the version on first use
    pub fn engine_for(&self, project: &Project, stack: &Stack) -> Result<ComposeEngine> {
        let descriptor = self.detector.resolve(project.engine())?;

        Ok(ComposeEngine::new(
            self.runner.clone(),
            self.compose_binary.clone(),
            descriptor,
            stack.compose_project_name(project.namespace()),
            stack.dir.clone(),
            stack.output_file(project.compose_output()),
        ))
    }
}
