//! Subprocess execution
//!
//! Every external program (compose engine, interpreter, git) is started
//! through a [`CommandRunner`]. Tests substitute their own runner.

use std::fmt;
use std::process::{Command, Stdio};

use anyhow::Result;
use tracing::debug;

use crate::error::PaasifyError;

/// A command line to execute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,

    /// Variables added on top of the inherited environment
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.env.extend(vars);
        self
    }

    /// Value of an environment override, if set
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.env.iter().map(|(k, v)| (k, v)));
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }

    /// Converts a failed output into [`PaasifyError::ShellCommandFailed`]
    pub fn into_error(self, spec: &CommandSpec) -> PaasifyError {
        PaasifyError::ShellCommandFailed {
            command: spec.to_string(),
            status: self.status,
            stderr: self.stderr.trim_end().to_string(),
        }
    }
}

/// Runs external commands
pub trait CommandRunner {
    /// Runs a command to completion, capturing its output
    fn output(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Runs a command attached to the terminal
    fn interactive(&self, spec: &CommandSpec) -> Result<()>;

    /// Runs a command and fails on non-zero exit
    fn checked(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let output = self.output(spec)?;
        if output.is_success() {
            Ok(output)
        } else {
            Err(output.into_error(spec).into())
        }
    }
}

/// Runs commands with `std::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn spawn_error(spec: &CommandSpec, err: std::io::Error) -> PaasifyError {
        PaasifyError::ShellCommandFailed {
            command: spec.to_string(),
            status: None,
            stderr: format!("Failed to execute {}: {}", spec.program, err),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn output(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!("Run: {}", spec);

        let output = spec
            .to_command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Self::spawn_error(spec, e))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn interactive(&self, spec: &CommandSpec) -> Result<()> {
        debug!("Run attached: {}", spec);

        let status = spec
            .to_command()
            .status()
            .map_err(|e| Self::spawn_error(spec, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(PaasifyError::ShellCommandFailed {
                command: spec.to_string(),
                status: status.code(),
                stderr: String::new(),
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let spec = CommandSpec::new("docker")
            .args(["compose", "--project-directory"])
            .arg("/srv/my stack");
        assert_eq!(
            spec.to_string(),
            "docker compose --project-directory '/srv/my stack'"
        );
    }

    #[test]
    fn last_env_override_wins() {
        let spec = CommandSpec::new("env").envs(vec![
            ("A".to_string(), "1".to_string()),
            ("A".to_string(), "2".to_string()),
        ]);
        assert_eq!(spec.env_var("A"), Some("2"));
        assert_eq!(spec.env_var("B"), None);
    }

    #[test]
    fn failed_output_becomes_shell_error() {
        let spec = CommandSpec::new("docker-compose").arg("down");
        let err = CommandOutput::failure(1, "boom\n").into_error(&spec);
        match err {
            PaasifyError::ShellCommandFailed {
                command,
                status,
                stderr,
            } => {
                assert_eq!(command, "docker-compose down");
                assert_eq!(status, Some(1));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_captures_output() {
        let spec = CommandSpec::new("sh")
            .args(["-c", "echo out; echo err >&2; echo $PAASIFY_TEST_VAR"])
            .envs(vec![("PAASIFY_TEST_VAR".to_string(), "set".to_string())]);

        let output = SystemRunner.output(&spec).unwrap();
        assert!(output.is_success());
        assert_eq!(output.stdout, "out\nset\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_checked_reports_status() {
        let spec = CommandSpec::new("sh").args(["-c", "echo nope >&2; exit 3"]);
        let err = SystemRunner.checked(&spec).unwrap_err();
        assert_eq!(crate::error::exit_code(&err), 32);
    }

    #[test]
    fn missing_binary_is_a_shell_error() {
        let spec = CommandSpec::new("paasify-definitely-missing-binary");
        let err = SystemRunner.output(&spec).unwrap_err();
        assert_eq!(crate::error::exit_code(&err), 32);
    }
}
