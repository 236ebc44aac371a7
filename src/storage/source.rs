//! App sources
//!
//! A source is a git-backed collection of apps, installed under the
//! collections directory as `<collections dir>/<name>`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::engine::{CommandRunner, CommandSpec};
use crate::error::PaasifyError;

/// A named collection of apps
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub name: String,
    pub alias: Option<String>,
    pub url: Option<String>,
    path: PathBuf,
}

impl Source {
    pub fn new(
        name: impl Into<String>,
        alias: Option<String>,
        url: Option<String>,
        collections_dir: &Path,
    ) -> Self {
        let name = name.into();
        let path = collections_dir.join(&name);
        Self {
            name,
            alias,
            url,
            path,
        }
    }

    /// Local install directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Plugins packaged with the source's apps
    pub fn plugins_dir(&self) -> PathBuf {
        self.path.join(".paasify").join("plugins")
    }

    pub fn is_installed(&self) -> bool {
        self.path.is_dir()
    }

    /// Returns true if `name` is this source's name or alias
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.alias.as_deref() == Some(name)
    }

    /// Clones the source if its directory is missing
    pub fn ensure_installed(&self, runner: &dyn CommandRunner) -> Result<()> {
        if self.is_installed() {
            return Ok(());
        }

        let url = self
            .url
            .as_deref()
            .ok_or_else(|| PaasifyError::SourceNotInstalled(self.name.clone()))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create collections directory: {}", parent.display())
            })?;
        }

        info!("Installing source {} from {}", self.name, url);
        let spec = CommandSpec::new("git")
            .arg("clone")
            .arg(url)
            .arg(self.path.display().to_string());
        runner.checked(&spec)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CommandOutput;
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl CommandRunner for Recorder {
        fn output(&self, spec: &CommandSpec) -> Result<CommandOutput> {
            let mut call = vec![spec.program.clone()];
            call.extend(spec.args.iter().cloned());
            self.calls.borrow_mut().push(call);
            Ok(CommandOutput::success(""))
        }

        fn interactive(&self, _spec: &CommandSpec) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn installed_source_is_left_alone() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("default")).unwrap();

        let source = Source::new("default", None, None, dir.path());
        let runner = Recorder::default();
        source.ensure_installed(&runner).unwrap();

        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn missing_source_is_cloned() {
        let dir = TempDir::new().unwrap();
        let source = Source::new(
            "community",
            None,
            Some("https://example.org/community.git".to_string()),
            dir.path(),
        );

        let runner = Recorder::default();
        source.ensure_installed(&runner).unwrap();

        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0], "git");
        assert_eq!(calls[0][1], "clone");
        assert_eq!(calls[0][2], "https://example.org/community.git");
        assert!(calls[0][3].ends_with("community"));
    }

    #[test]
    fn missing_source_without_url_fails() {
        let dir = TempDir::new().unwrap();
        let source = Source::new("private", None, None, dir.path());

        let err = source.ensure_installed(&Recorder::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PaasifyError>(),
            Some(PaasifyError::SourceNotInstalled(name)) if name == "private"
        ));
    }

    #[test]
    fn matches_name_or_alias() {
        let source = Source::new("community", Some("com".to_string()), None, Path::new("/c"));
        assert!(source.matches("community"));
        assert!(source.matches("com"));
        assert!(!source.matches("default"));
        assert_eq!(source.plugins_dir(), PathBuf::from("/c/community/.paasify/plugins"));
    }
}
