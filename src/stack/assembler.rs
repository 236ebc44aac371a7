//! Stack assembly
//!
//! `assemble` runs the whole pipeline for one stack and writes the generated
//! compose file. A failure at any step leaves the previous output in place.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::cascade::VariableCascade;
use super::plan::{TagPlan, TagResolver};
use super::toolchain::Toolchain;
use crate::domain::{Stack, VarMap};
use crate::plugin::{tag_user_data, TagMetadata, TransformChain, TransformRequest, TransformResponse};
use crate::storage::Project;

/// What `explain` reports for one tag
#[derive(Debug, Clone, Serialize)]
pub struct TagReport {
    pub name: String,
    pub compose_file: Option<PathBuf>,
    pub transform_script: Option<PathBuf>,
    pub transform_only: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TagMetadata>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<VarMap>,
}

/// What `explain` reports for one stack
#[derive(Debug, Clone, Serialize)]
pub struct StackReport {
    pub name: String,
    pub path: String,
    pub app: Option<String>,
    pub compose_project: String,
    pub compose_files: Vec<PathBuf>,
    pub search_dirs: Vec<PathBuf>,
    pub tags: Vec<TagReport>,
    pub vars: VarMap,
}

/// Runs the assembly pipeline against a project
pub struct StackAssembler<'a> {
    project: &'a Project,
    tools: &'a Toolchain,
}

impl<'a> StackAssembler<'a> {
    pub fn new(project: &'a Project, tools: &'a Toolchain) -> Self {
        Self { project, tools }
    }

    /// Installs the source of the stack's app, if needed
    pub fn ensure_source(&self, stack: &Stack) -> Result<()> {
        if let Some(app) = &stack.app {
            self.project
                .source(&app.source)
                .ensure_installed(self.tools.runner())?;
        }
        Ok(())
    }

    /// Resolves the tag plan of a stack
    pub fn plan(&self, stack: &Stack) -> Result<TagPlan> {
        Ok(TagResolver::new(self.project).resolve(stack)?)
    }

    /// Computes the variables of a stack
    pub fn vars(&self, stack: &Stack, plan: &TagPlan) -> Result<VarMap> {
        VariableCascade::new(self.project, stack, plan).build(self.tools.interpreter())
    }

    /// Builds the stack and writes its compose file
    pub fn assemble(&self, stack: &Stack) -> Result<PathBuf> {
        info!("Assemble stack: {}", stack.name);

        self.ensure_source(stack)?;

        let plan = self.plan(stack)?;
        plan.ensure_complete()?;
        for entry in &plan.entries {
            debug!(
                "  {}: compose={:?} transform={:?}",
                entry.name(),
                entry.compose_file,
                entry.transform_script
            );
        }

        let vars = self.vars(stack, &plan)?;

        let engine = self.tools.engine_for(self.project, stack)?;
        let env_file = plan
            .app_dir
            .as_ref()
            .map(|dir| dir.join(".env"))
            .filter(|f| f.is_file());
        let files = plan.compose_files();
        for file in &files {
            info!("  Insert: {}", file.display());
        }
        let document = engine.assemble(&files, env_file.as_deref(), &vars)?;

        let steps = plan.transform_steps();
        let document = TransformChain::new(self.tools.interpreter()).run(&steps, &vars, document)?;

        let output = engine.output_file().to_path_buf();
        write_document(&output, &document)?;
        info!("Stack {} written to {}", stack.name, output.display());

        Ok(output)
    }

    /// Describes the plan, script metadata and proposed overrides of a stack
    pub fn explain(&self, stack: &Stack) -> Result<StackReport> {
        let plan = self.plan(stack)?;
        let vars = self.vars(stack, &plan)?;
        let interpreter = self.tools.interpreter();

        let mut tags = Vec::new();
        for entry in plan.tags() {
            let (mut metadata, mut overrides) = (None, None);

            if let (Some(tag), Some(script)) = (&entry.tag, &entry.transform_script) {
                if let TransformResponse::Metadata(meta) =
                    interpreter.evaluate(script, &TransformRequest::Metadata)?
                {
                    metadata = Some(meta);
                }

                let request = TransformRequest::OverrideVars {
                    user_data: tag_user_data(tag, &vars),
                };
                if let TransformResponse::OverrideVars(proposed) =
                    interpreter.evaluate(script, &request)?
                {
                    overrides = Some(proposed);
                }
            }

            tags.push(TagReport {
                name: entry.name().to_string(),
                compose_file: entry.compose_file.clone(),
                transform_script: entry.transform_script.clone(),
                transform_only: entry.is_transform_only(),
                metadata,
                overrides,
            });
        }

        Ok(StackReport {
            name: stack.name.clone(),
            path: stack.path.clone(),
            app: stack.app.as_ref().map(|a| a.reference()),
            compose_project: stack.compose_project_name(self.project.namespace()),
            compose_files: plan.compose_files(),
            search_dirs: plan.search_dirs.clone(),
            tags,
            vars,
        })
    }
}

/// Writes a compose document, replacing any previous file atomically
pub fn write_document(path: &Path, document: &Value) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Invalid output path: {}", path.display()))?;
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create stack directory: {}", dir.display()))?;

    let content = serde_yaml::to_string(document).context("Failed to serialize compose document")?;

    let temp_path = path.with_extension("yml.tmp");
    fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn write_document_creates_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new/stack/docker-compose.run.yml");

        write_document(&path, &json!({"services": {"web": {"image": "nginx"}}})).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: Value = serde_yaml::from_str(&content).unwrap();
        assert_eq!(parsed["services"]["web"]["image"], json!("nginx"));
        assert!(!path.with_extension("yml.tmp").exists());
    }

    #[test]
    fn write_document_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docker-compose.run.yml");
        fs::write(&path, "old: true\n").unwrap();

        write_document(&path, &json!({"new": true})).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("old"));
    }
}
