//! Project discovery and validation
//!
//! A project is a directory holding a `paasify.yml`. Loading a project turns
//! the raw configuration into validated [`Stack`] and [`Source`] records.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use super::config::{ProjectFile, DEFAULT_COMPOSE_OUTPUT};
use super::Source;
use crate::domain::{App, Stack, TagLists, VarDecls};
use crate::error::PaasifyError;

/// Accepted project file names, in lookup order
pub const PROJECT_FILENAMES: [&str; 2] = ["paasify.yml", "paasify.yaml"];

/// A Paasify project
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config_file: PathBuf,
    namespace: String,
    collections_dir: PathBuf,
    sources: Vec<Source>,
    stacks: Vec<Stack>,
    tags: TagLists,
    vars: VarDecls,
    compose_output: String,
    engine: Option<String>,
}

impl Project {
    /// Finds the project file in `start` or one of its parents
    ///
    /// A path to a file is returned as-is.
    pub fn find_config(start: &Path) -> Option<PathBuf> {
        if start.is_file() {
            return Some(start.to_path_buf());
        }

        let mut current = start.to_path_buf();
        loop {
            for name in PROJECT_FILENAMES {
                let candidate = current.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Discovers and opens the project containing `start`
    pub fn discover(start: &Path, collections_dir: Option<PathBuf>) -> Result<Self> {
        let config_file = Self::find_config(start)
            .ok_or_else(|| PaasifyError::ProjectNotFound(start.to_path_buf()))?;

        Self::open(config_file, collections_dir)
    }

    /// Opens the project described by `config_file`
    pub fn open(config_file: impl Into<PathBuf>, collections_dir: Option<PathBuf>) -> Result<Self> {
        let config_file = config_file.into();
        let config_file = if config_file.is_absolute() {
            config_file
        } else {
            std::env::current_dir()?.join(config_file)
        };
        let root = config_file
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| PaasifyError::ProjectNotFound(config_file.clone()))?;

        let content = std::fs::read_to_string(&config_file)
            .map_err(|e| PaasifyError::ConfigInvalid(format!("{}: {}", config_file.display(), e)))?;
        let file = ProjectFile::parse(&content, &config_file.display().to_string())
            .map_err(|e| PaasifyError::ConfigInvalid(e.to_string()))?;

        Self::from_file(root, config_file, file, collections_dir)
    }

    /// Builds a project from an already-parsed configuration
    pub fn from_file(
        root: PathBuf,
        config_file: PathBuf,
        file: ProjectFile,
        collections_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let namespace = match file.config.namespace.as_deref() {
            Some(ns) if !ns.trim().is_empty() => ns.to_string(),
            _ => root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "paasify".to_string()),
        };

        let collections_dir =
            collections_dir.unwrap_or_else(|| root.join(".paasify").join("collections"));

        let sources = file
            .sources
            .iter()
            .map(|(name, cfg)| {
                Source::new(name, cfg.alias.clone(), cfg.url.clone(), &collections_dir)
            })
            .collect();

        let mut stacks = Vec::new();
        for cfg in file.stack_configs() {
            let stack = Stack::from_decl(
                &root,
                cfg.name.as_deref(),
                cfg.path.as_deref(),
                cfg.app.as_deref(),
                cfg.tag_lists(),
                cfg.vars.clone(),
            )?;
            stacks.push(stack);
        }
        check_unique(&stacks)?;

        let compose_output = file
            .config
            .compose_output
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COMPOSE_OUTPUT.to_string());

        debug!(
            "Loaded project {} with {} stacks from {}",
            namespace,
            stacks.len(),
            config_file.display()
        );

        Ok(Self {
            tags: file.config.tag_lists(),
            vars: file.config.vars.clone(),
            engine: file.config.engine.clone(),
            root,
            config_file,
            namespace,
            collections_dir,
            sources,
            stacks,
            compose_output,
        })
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the local plugins directory
    pub fn plugins_dir(&self) -> PathBuf {
        self.root.join(".paasify").join("plugins")
    }

    pub fn collections_dir(&self) -> &Path {
        &self.collections_dir
    }

    /// Declared sources
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Looks up a source by name or alias
    ///
    /// A source referenced but not declared is implicit and has no URL.
    pub fn source(&self, name: &str) -> Source {
        self.sources
            .iter()
            .find(|s| s.matches(name))
            .cloned()
            .unwrap_or_else(|| Source::new(name, None, None, &self.collections_dir))
    }

    /// Directory of an app inside its source
    pub fn app_dir(&self, app: &App) -> PathBuf {
        self.source(&app.source).path().join(&app.path)
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name == name)
    }

    /// Project-level default tag lists
    pub fn tags(&self) -> &TagLists {
        &self.tags
    }

    /// Project-level variable declarations
    pub fn vars(&self) -> &VarDecls {
        &self.vars
    }

    /// File name of the generated compose file
    pub fn compose_output(&self) -> &str {
        &self.compose_output
    }

    /// Forced engine version, if configured
    pub fn engine(&self) -> Option<&str> {
        self.engine.as_deref()
    }

    /// Checks if a path is inside this project
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    /// Returns a relative path from the project root
    pub fn relative_path(&self, path: &Path) -> Option<PathBuf> {
        path.strip_prefix(&self.root).ok().map(|p| p.to_path_buf())
    }
}

fn check_unique(stacks: &[Stack]) -> Result<(), PaasifyError> {
    let mut names = HashSet::new();
    let mut paths = HashSet::new();

    for stack in stacks {
        if !paths.insert(stack.path.as_str()) {
            return Err(PaasifyError::ConfigInvalid(format!(
                "Duplicate stack directory '{}'",
                stack.path
            )));
        }
        if !names.insert(stack.name.as_str()) {
            return Err(PaasifyError::ConfigInvalid(format!(
                "Duplicate stack name '{}'",
                stack.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::find_error;
    use std::fs;
    use tempfile::TempDir;

    fn project_with(config: &str) -> (TempDir, Result<Project>) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("paasify.yml"), config).unwrap();
        let project = Project::discover(dir.path(), None);
        (dir, project)
    }

    #[test]
    fn discover_walks_up() {
        let (dir, _) = project_with("stacks:\n  - traefik\n");
        let nested = dir.path().join("traefik").join("conf");
        fs::create_dir_all(&nested).unwrap();

        let project = Project::discover(&nested, None).unwrap();
        assert_eq!(project.root(), dir.path());
        assert_eq!(project.stacks().len(), 1);
    }

    #[test]
    fn discover_accepts_yaml_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("paasify.yaml"), "").unwrap();

        let project = Project::discover(dir.path(), None).unwrap();
        assert!(project.config_file().ends_with("paasify.yaml"));
    }

    #[test]
    fn discover_outside_project_fails() {
        let dir = TempDir::new().unwrap();
        let err = Project::discover(dir.path(), None).unwrap_err();
        // A parent of the temp dir may hold a project file; only check the
        // error kind when nothing was found.
        if let Some(e) = find_error(&err) {
            assert!(matches!(
                e,
                PaasifyError::ProjectNotFound(_) | PaasifyError::ConfigInvalid(_)
            ));
        }
    }

    #[test]
    fn namespace_defaults_to_directory_name() {
        let (dir, project) = project_with("");
        let project = project.unwrap();
        let expected = dir.path().file_name().unwrap().to_string_lossy();
        assert_eq!(project.namespace(), expected);
        assert_eq!(project.compose_output(), DEFAULT_COMPOSE_OUTPUT);
    }

    #[test]
    fn explicit_namespace_and_output() {
        let (_dir, project) = project_with(
            "config:\n  namespace: home\n  compose_output: out.yml\n  engine: 2.6.1\n",
        );
        let project = project.unwrap();
        assert_eq!(project.namespace(), "home");
        assert_eq!(project.compose_output(), "out.yml");
        assert_eq!(project.engine(), Some("2.6.1"));
    }

    #[test]
    fn duplicate_stack_directories_are_rejected() {
        let (_dir, project) = project_with(
            r#"
stacks:
  - path: web
  - name: other
    path: web
"#,
        );

        let err = project.unwrap_err();
        assert!(matches!(
            find_error(&err),
            Some(PaasifyError::ConfigInvalid(msg)) if msg.contains("web")
        ));
    }

    #[test]
    fn duplicate_stack_names_are_rejected() {
        let (_dir, project) = project_with(
            r#"
stacks:
  - name: web
    path: a
  - name: web
    path: b
"#,
        );

        assert!(matches!(
            find_error(&project.unwrap_err()),
            Some(PaasifyError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn stack_without_origin_is_rejected() {
        let (_dir, project) = project_with("stacks:\n  - vars:\n      a: 1\n");
        assert!(matches!(
            find_error(&project.unwrap_err()),
            Some(PaasifyError::StackMissingOrigin(_))
        ));
    }

    #[test]
    fn invalid_yaml_is_config_invalid() {
        let (_dir, project) = project_with("stacks: [unclosed\n");
        assert!(matches!(
            find_error(&project.unwrap_err()),
            Some(PaasifyError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn sources_and_app_dirs() {
        let (dir, project) = project_with(
            r#"
sources:
  community:
    url: https://example.org/community.git
    alias: com
stacks:
  - com:wordpress
  - default:minio
"#,
        );
        let project = project.unwrap();
        let collections = dir.path().join(".paasify").join("collections");

        let wordpress = project.stack("wordpress").unwrap();
        let app = wordpress.app.as_ref().unwrap();
        assert_eq!(project.app_dir(app), collections.join("community").join("wordpress"));

        let implicit = project.source("default");
        assert!(implicit.url.is_none());
        assert_eq!(implicit.path(), collections.join("default"));
    }

    #[test]
    fn collections_dir_override() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("paasify.yml"), "").unwrap();
        let custom = dir.path().join("shared");

        let project = Project::discover(dir.path(), Some(custom.clone())).unwrap();
        assert_eq!(project.collections_dir(), custom);
        assert_eq!(project.source("default").path(), custom.join("default"));
    }

    #[test]
    fn relative_path() {
        let (dir, project) = project_with("");
        let project = project.unwrap();

        let abs_path = dir.path().join("sub").join("file.txt");
        assert_eq!(
            project.relative_path(&abs_path),
            Some(PathBuf::from("sub/file.txt"))
        );
        assert!(project.contains(&abs_path));
    }
}
