//! Compose engine operations
//!
//! A [`ComposeEngine`] is bound to one stack: every call is scoped by the
//! stack's compose project name and directory.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::detect::{EngineDescriptor, PsStyle};
use super::exec::{CommandRunner, CommandSpec};
use crate::domain::{cast_compose_value, VarMap};
use crate::error::PaasifyError;

/// Stderr text of a `down` whose network was already removed
const BENIGN_DOWN_ERROR: &str = "has active endpoints";

/// Casts variables to the environment passed to the compose binary
///
/// Null values are left out.
pub fn compose_env(vars: &VarMap) -> Vec<(String, String)> {
    vars.iter()
        .filter_map(|(k, v)| cast_compose_value(v).map(|s| (k.clone(), s)))
        .collect()
}

/// Splits a compose command line such as `docker compose` into words
pub fn split_binary(binary: &str) -> Vec<String> {
    let words: Vec<String> = binary.split_whitespace().map(str::to_string).collect();
    if words.is_empty() {
        vec!["docker-compose".to_string()]
    } else {
        words
    }
}

/// A published port of a service
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Publisher {
    #[serde(rename = "URL", default)]
    url: String,
    #[serde(default)]
    target_port: u64,
    #[serde(default)]
    published_port: u64,
    #[serde(default)]
    protocol: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawService {
    #[serde(default)]
    project: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    service: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    publishers: Option<Vec<Publisher>>,
}

/// Status of one container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub project: String,
    pub name: String,
    pub service: String,
    pub state: String,
    pub ports: Vec<String>,
}

impl From<RawService> for ServiceStatus {
    fn from(raw: RawService) -> Self {
        let mut ports: Vec<String> = Vec::new();
        for port in raw.publishers.unwrap_or_default() {
            if port.published_port == 0 {
                continue;
            }
            let ip = if port.url == "0.0.0.0" {
                "::"
            } else {
                port.url.as_str()
            };
            let rendered = format!(
                "{}:{}->{}/{}",
                ip, port.published_port, port.target_port, port.protocol
            );
            if !ports.contains(&rendered) {
                ports.push(rendered);
            }
        }

        Self {
            project: raw.project,
            name: raw.name,
            service: raw.service,
            state: raw.state,
            ports,
        }
    }
}

/// Parses `ps --format json` output: one array, or one object per line
pub fn parse_ps_json(stdout: &str) -> Result<Vec<ServiceStatus>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let raw: Vec<RawService> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).context("Failed to parse compose ps output")?
    } else {
        trimmed
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).context("Failed to parse compose ps output"))
            .collect::<Result<_>>()?
    };

    Ok(raw.into_iter().map(ServiceStatus::from).collect())
}

/// Result of a `ps` call
#[derive(Debug, Clone, PartialEq)]
pub enum PsReport {
    Services(Vec<ServiceStatus>),
    /// Engines without JSON output report a plain table
    Table(String),
}

/// Compose engine bound to one stack
pub struct ComposeEngine {
    runner: Rc<dyn CommandRunner>,
    binary: Vec<String>,
    descriptor: EngineDescriptor,
    project_name: String,
    project_dir: PathBuf,
    output_file: PathBuf,
}

impl ComposeEngine {
    pub fn new(
        runner: Rc<dyn CommandRunner>,
        binary: Vec<String>,
        descriptor: EngineDescriptor,
        project_name: impl Into<String>,
        project_dir: impl Into<PathBuf>,
        output_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            binary,
            descriptor,
            project_name: project_name.into(),
            project_dir: project_dir.into(),
            output_file: output_file.into(),
        }
    }

    pub fn descriptor(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    fn command(&self) -> CommandSpec {
        let (program, prefix) = match self.binary.split_first() {
            Some((program, prefix)) => (program.as_str(), prefix),
            None => ("docker-compose", &[][..]),
        };
        CommandSpec::new(program).args(prefix.iter().cloned())
    }

    fn scoped(&self) -> CommandSpec {
        self.command()
            .arg("--project-name")
            .arg(&self.project_name)
    }

    fn require_output(&self) -> Result<(), PaasifyError> {
        if self.output_file.is_file() {
            Ok(())
        } else {
            Err(PaasifyError::BuildStackFirst(self.project_name.clone()))
        }
    }

    /// Merges compose files and returns the resulting document
    ///
    /// Variables are passed through the process environment only.
    pub fn assemble(
        &self,
        files: &[PathBuf],
        env_file: Option<&Path>,
        env: &VarMap,
    ) -> Result<Value> {
        let mut spec = self
            .scoped()
            .arg("--project-directory")
            .arg(self.project_dir.display().to_string());

        if let Some(env_file) = env_file {
            spec = spec.arg("--env-file").arg(env_file.display().to_string());
        }
        for file in files {
            spec = spec.arg("--file").arg(file.display().to_string());
        }
        let spec = spec.arg("config").envs(compose_env(env));

        debug!("Assembling {} compose files: {}", files.len(), spec);
        let output = self.runner.checked(&spec)?;

        let document: Value = serde_yaml::from_str(&output.stdout)
            .with_context(|| format!("Failed to parse output of: {}", spec))?;

        Ok(document)
    }

    /// Starts the stack from its generated compose file
    pub fn up(&self) -> Result<String> {
        self.require_output()?;

        let spec = self
            .scoped()
            .arg("--project-directory")
            .arg(self.project_dir.display().to_string())
            .arg("--file")
            .arg(self.output_file.display().to_string())
            .args(["up", "--detach"]);

        let output = self.runner.checked(&spec)?;
        Ok(combined(&output.stdout, &output.stderr))
    }

    /// Stops the stack and removes its containers
    ///
    /// A network still reported as having active endpoints is not an error.
    pub fn down(&self) -> Result<String> {
        let spec = self.scoped().args(["down", "--remove-orphans"]);

        let output = self.runner.output(&spec)?;
        if output.is_success() {
            return Ok(combined(&output.stdout, &output.stderr));
        }

        if output.stderr.contains(BENIGN_DOWN_ERROR) {
            info!(
                "Network of {} still has active endpoints, ignoring",
                self.project_name
            );
            return Ok(output.stderr);
        }

        Err(output.into_error(&spec).into())
    }

    /// Reports container status
    pub fn ps(&self) -> Result<PsReport> {
        match self.descriptor.ps_style {
            PsStyle::Json => {
                let spec = self.scoped().args(["ps", "--all", "--format", "json"]);
                let output = self.runner.checked(&spec)?;
                Ok(PsReport::Services(parse_ps_json(&output.stdout)?))
            }
            PsStyle::Table => {
                self.require_output()?;
                let spec = self
                    .scoped()
                    .arg("--file")
                    .arg(self.output_file.display().to_string())
                    .args(["ps", "--all"]);
                let output = self.runner.checked(&spec)?;
                Ok(PsReport::Table(output.stdout))
            }
        }
    }

    /// Returns logs, or streams them to the terminal when following
    pub fn logs(&self, follow: bool) -> Result<Option<String>> {
        let spec = self.scoped().arg("logs");

        if follow {
            self.runner.interactive(&spec.arg("-f"))?;
            return Ok(None);
        }

        let output = self.runner.checked(&spec)?;
        Ok(Some(output.stdout))
    }
}

fn combined(stdout: &str, stderr: &str) -> String {
    let mut text = stdout.trim_end().to_string();
    if !stderr.trim().is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stderr.trim_end());
    }
    text
}
