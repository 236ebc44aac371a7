//! Error taxonomy
//!
//! Every pipeline failure carries a stable [`ErrorKind`] and an exit code.
//! Internal plumbing returns `anyhow::Result`; the binary looks for a
//! [`PaasifyError`] in the error chain to decide how to exit.

use std::path::PathBuf;

use thiserror::Error;

/// Stable error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ProjectNotFound,
    ConfigInvalid,
    StackNotFound,
    StackMissingOrigin,
    MissingTag,
    BuildStackFirst,
    FollowRequiresSingleStack,
    ShellCommandFailed,
    UnsupportedEngineVersion,
    TransformFailed,
}

#[derive(Debug, Error)]
pub enum PaasifyError {
    #[error("Could not find paasify.yml or paasify.yaml in {0} or any parent directory")]
    ProjectNotFound(PathBuf),

    #[error("Invalid project configuration: {0}")]
    ConfigInvalid(String),

    #[error("Source '{0}' is not installed and has no remote url")]
    SourceNotInstalled(String),

    #[error("No such stack(s): {}. Valid stacks are: {}", .missing.join(", "), .valid.join(", "))]
    StackNotFound {
        missing: Vec<String>,
        valid: Vec<String>,
    },

    #[error("Missing 'app', 'path' or 'name' option for stack: {0}")]
    StackMissingOrigin(String),

    #[error("Could not find docker-compose.yml for stack '{stack}' in: {}", join_paths(.dirs))]
    MissingComposeFile { stack: String, dirs: Vec<PathBuf> },

    #[error("Could not find tag '{tag}' for stack '{stack}' in: {}", join_paths(.dirs))]
    MissingTag {
        tag: String,
        stack: String,
        dirs: Vec<PathBuf>,
    },

    #[error("Stack '{0}' is not built yet, run 'paasify build' first")]
    BuildStackFirst(String),

    #[error("Cannot follow logs of {0} stacks at once, select a single stack")]
    FollowRequiresSingleStack(usize),

    #[error("Command failed ({}): {command}\n{stderr}", .status.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    ShellCommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Unsupported compose engine: {0}")]
    UnsupportedEngineVersion(String),

    #[error("Transform script {} failed: {reason}", .script.display())]
    TransformFailed { script: PathBuf, reason: String },
}

fn join_paths(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PaasifyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaasifyError::ProjectNotFound(_) => ErrorKind::ProjectNotFound,
            PaasifyError::ConfigInvalid(_) | PaasifyError::SourceNotInstalled(_) => {
                ErrorKind::ConfigInvalid
            }
            PaasifyError::StackNotFound { .. } => ErrorKind::StackNotFound,
            PaasifyError::StackMissingOrigin(_) | PaasifyError::MissingComposeFile { .. } => {
                ErrorKind::StackMissingOrigin
            }
            PaasifyError::MissingTag { .. } => ErrorKind::MissingTag,
            PaasifyError::BuildStackFirst(_) => ErrorKind::BuildStackFirst,
            PaasifyError::FollowRequiresSingleStack(_) => ErrorKind::FollowRequiresSingleStack,
            PaasifyError::ShellCommandFailed { .. } => ErrorKind::ShellCommandFailed,
            PaasifyError::UnsupportedEngineVersion(_) => ErrorKind::UnsupportedEngineVersion,
            PaasifyError::TransformFailed { .. } => ErrorKind::TransformFailed,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::ProjectNotFound => 17,
            ErrorKind::ConfigInvalid => 18,
            ErrorKind::StackNotFound => 19,
            ErrorKind::StackMissingOrigin => 20,
            ErrorKind::MissingTag => 21,
            ErrorKind::BuildStackFirst => 22,
            ErrorKind::FollowRequiresSingleStack => 23,
            ErrorKind::ShellCommandFailed => 32,
            ErrorKind::UnsupportedEngineVersion => 33,
            ErrorKind::TransformFailed => 34,
        }
    }
}

/// Finds the first [`PaasifyError`] in an error chain
pub fn find_error(err: &anyhow::Error) -> Option<&PaasifyError> {
    err.chain().find_map(|cause| cause.downcast_ref::<PaasifyError>())
}

/// Exit code for any error bubbling up to `main`
pub fn exit_code(err: &anyhow::Error) -> u8 {
    find_error(err).map(PaasifyError::exit_code).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn exit_code_found_through_context() {
        let err = Err::<(), _>(PaasifyError::MissingTag {
            tag: "traefik".to_string(),
            stack: "wordpress".to_string(),
            dirs: vec![PathBuf::from("/prj/wordpress")],
        })
        .context("Failed to assemble stack 'wordpress'")
        .unwrap_err();

        assert_eq!(exit_code(&err), 21);
        assert_eq!(find_error(&err).unwrap().kind(), ErrorKind::MissingTag);
    }

    #[test]
    fn foreign_errors_exit_with_one() {
        let err = anyhow::anyhow!("boom");
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn stack_not_found_lists_valid_names() {
        let err = PaasifyError::StackNotFound {
            missing: vec!["nope".to_string()],
            valid: vec!["traefik".to_string(), "minio".to_string()],
        };

        let msg = err.to_string();
        assert!(msg.contains("nope"));
        assert!(msg.contains("traefik, minio"));
    }

    #[test]
    fn source_not_installed_is_a_config_error() {
        let err = PaasifyError::SourceNotInstalled("default".to_string());
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(err.exit_code(), 18);
    }
}
