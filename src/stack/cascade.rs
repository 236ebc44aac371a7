//! Variable cascade
//!
//! Layers, applied in order:
//!
//! 1. Derived variables (identity, paths, sniffed service and network names)
//! 2. `vars.yml` / `vars.yaml` of the app, then of the stack
//! 3. Default variables proposed by tag scripts, only for unset keys
//! 4. Project variables, templated in declaration order
//! 5. Stack variables, templated in declaration order

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use super::plan::TagPlan;
use crate::domain::{Stack, VarMap};
use crate::error::PaasifyError;
use crate::plugin::{tag_user_data, Interpreter, TransformRequest, TransformResponse};
use crate::storage::{lookup_candidates, Project};

/// Variable file names, in lookup order
pub const VAR_FILES: [&str; 2] = ["vars.yml", "vars.yaml"];

/// Builds the variables of one stack
pub struct VariableCascade<'a> {
    project: &'a Project,
    stack: &'a Stack,
    plan: &'a TagPlan,
}

impl<'a> VariableCascade<'a> {
    pub fn new(project: &'a Project, stack: &'a Stack, plan: &'a TagPlan) -> Self {
        Self {
            project,
            stack,
            plan,
        }
    }

    /// Variables computed from the stack identity and its base compose file
    pub fn derived(&self) -> Result<VarMap> {
        let project = self.project;
        let stack = self.stack;
        let compose_project = stack.compose_project_name(project.namespace());
        let base = load_document(self.plan.base_compose_file())?;

        let services: Vec<String> = keys_of(&base, "services");
        let networks: Vec<String> = keys_of(&base, "networks");

        let app_name = stack
            .app
            .as_ref()
            .and_then(|app| app.path.rsplit('/').find(|s| !s.is_empty()))
            .unwrap_or(stack.name.as_str())
            .to_string();
        let app_dir = self.plan.app_dir.as_deref().unwrap_or(&stack.dir);

        let mut vars = VarMap::new();
        let mut set = |key: &str, value: Value| {
            vars.insert(key.to_string(), value);
        };

        set("paasify_ns", project.namespace().into());
        set("paasify_prj_dir", path_value(project.root()));
        set("paasify_stack", stack.name.clone().into());
        set("paasify_stack_dir", path_value(&stack.dir));
        set("paasify_stack_project", compose_project.clone().into());
        set("app_name", app_name.into());
        set("app_dir", path_value(app_dir));
        set("app_dir_conf", "./conf".into());
        set("app_dir_data", "./data".into());
        set("app_dir_logs", "./logs".into());
        set(
            "app_service",
            services
                .first()
                .cloned()
                .unwrap_or_else(|| stack.name.clone())
                .into(),
        );
        set("app_services", services.join(",").into());
        set(
            "app_network_name",
            networks
                .first()
                .cloned()
                .unwrap_or_else(|| format!("{}_default", compose_project))
                .into(),
        );

        Ok(vars)
    }

    /// Existing variable files: app directory first, then stack directory
    pub fn var_files(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        dirs.extend(self.plan.app_dir.clone());
        if !dirs.contains(&self.stack.dir) {
            dirs.push(self.stack.dir.clone());
        }

        let patterns: Vec<String> = VAR_FILES.iter().map(|s| s.to_string()).collect();
        lookup_candidates(&dirs, &patterns)
    }

    /// Runs every layer of the cascade
    pub fn build(&self, interpreter: &dyn Interpreter) -> Result<VarMap> {
        let mut vars = self.derived()?;

        for file in self.var_files() {
            debug!("Loading vars file: {}", file.display());
            for (key, value) in load_var_file(&file)? {
                vars.insert(key, value);
            }
        }

        for (tag, script) in self.plan.scripts() {
            debug!("Loading default vars from: {}", script.display());
            let request = TransformRequest::DefaultVars {
                user_data: tag_user_data(tag, &vars),
            };
            let defaults = match interpreter.evaluate(script, &request)? {
                TransformResponse::DefaultVars(defaults) => defaults,
                other => {
                    return Err(PaasifyError::TransformFailed {
                        script: script.to_path_buf(),
                        reason: format!("unexpected response: {:?}", other),
                    }
                    .into())
                }
            };

            for (key, value) in defaults {
                if vars.get(&key).map_or(true, Value::is_null) {
                    vars.insert(key, value);
                }
            }
        }

        let vars = self.project.vars().expand(vars);
        let vars = self.stack.vars.expand(vars);

        info!("Resolved {} variables for stack {}", vars.len(), self.stack.name);
        for (key, value) in &vars {
            debug!("  {}: {}", key, value);
        }

        Ok(vars)
    }
}

fn path_value(path: &Path) -> Value {
    Value::String(path.display().to_string())
}

fn keys_of(document: &Value, section: &str) -> Vec<String> {
    document
        .get(section)
        .and_then(Value::as_object)
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}

/// Loads a YAML document; an empty file is `null`
pub fn load_document(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Loads a flat variable file
pub fn load_var_file(path: &Path) -> Result<VarMap> {
    match load_document(path)? {
        Value::Null => Ok(VarMap::new()),
        Value::Object(map) => Ok(map),
        _ => Err(PaasifyError::ConfigInvalid(format!(
            "{} must contain a map of variables",
            path.display()
        ))
        .into()),
    }
}
