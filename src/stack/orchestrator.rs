//! Stack set orchestration
//!
//! Commands run over a set of stacks, one stack at a time. Teardown runs in
//! reverse order.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use super::assembler::{StackAssembler, StackReport};
use super::toolchain::Toolchain;
use crate::domain::Stack;
use crate::engine::PsReport;
use crate::error::PaasifyError;
use crate::storage::Project;

/// Selects stacks by name, by working directory, or all of them
///
/// Every name must exist. Without names, a working directory inside a stack
/// directory selects that stack only.
pub fn select_stacks<'p>(
    project: &'p Project,
    names: &[String],
    cwd: Option<&Path>,
) -> Result<Vec<&'p Stack>, PaasifyError> {
    if !names.is_empty() {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| project.stack(name).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(PaasifyError::StackNotFound {
                missing,
                valid: project.stacks().iter().map(|s| s.name.clone()).collect(),
            });
        }

        let mut selected: Vec<&Stack> = Vec::new();
        for name in names {
            if let Some(stack) = project.stack(name) {
                if !selected.iter().any(|s| s.name == stack.name) {
                    selected.push(stack);
                }
            }
        }
        return Ok(selected);
    }

    if let Some(rel) = cwd.and_then(|dir| project.relative_path(dir)) {
        if rel.as_os_str().is_empty() {
            return Ok(project.stacks().iter().collect());
        }
        if let Some(stack) = project
            .stacks()
            .iter()
            .find(|s| rel.starts_with(Path::new(&s.path)))
        {
            return Ok(vec![stack]);
        }
    }

    Ok(project.stacks().iter().collect())
}

/// An ordered set of stacks and the tools to act on them
pub struct StackSet<'a> {
    project: &'a Project,
    tools: &'a Toolchain,
    stacks: Vec<&'a Stack>,
}

impl<'a> StackSet<'a> {
    /// Wraps an explicit list of stacks
    pub fn new(project: &'a Project, tools: &'a Toolchain, stacks: Vec<&'a Stack>) -> Self {
        Self {
            project,
            tools,
            stacks,
        }
    }

    /// Selects stacks with [`select_stacks`]
    pub fn select(
        project: &'a Project,
        tools: &'a Toolchain,
        names: &[String],
        cwd: Option<&Path>,
    ) -> Result<Self> {
        let stacks = select_stacks(project, names, cwd)?;
        Ok(Self::new(project, tools, stacks))
    }

    pub fn stacks(&self) -> &[&'a Stack] {
        &self.stacks
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    fn assembler(&self) -> StackAssembler<'a> {
        StackAssembler::new(self.project, self.tools)
    }

    /// Builds every stack, in order
    pub fn assemble(&self) -> Result<Vec<PathBuf>> {
        let assembler = self.assembler();
        self.stacks
            .iter()
            .map(|stack| {
                assembler
                    .assemble(stack)
                    .with_context(|| format!("Failed to assemble stack '{}'", stack.name))
            })
            .collect()
    }

    /// Starts every stack, in order
    pub fn up(&self) -> Result<()> {
        for stack in &self.stacks {
            self.up_one(stack)?;
        }
        Ok(())
    }

    fn up_one(&self, stack: &Stack) -> Result<()> {
        info!("Start stack: {}", stack.name);
        let engine = self.tools.engine_for(self.project, stack)?;
        let out = engine
            .up()
            .with_context(|| format!("Failed to start stack '{}'", stack.name))?;
        if !out.is_empty() {
            info!("{}", out);
        }
        Ok(())
    }

    /// Stops every stack, in reverse order
    pub fn down(&self) -> Result<()> {
        for stack in self.stacks.iter().rev() {
            info!("Stop stack: {}", stack.name);
            let engine = self.tools.engine_for(self.project, stack)?;
            let out = engine
                .down()
                .with_context(|| format!("Failed to stop stack '{}'", stack.name))?;
            if !out.is_empty() {
                info!("{}", out);
            }
        }
        Ok(())
    }

    /// Container status of every stack
    pub fn ps(&self) -> Result<Vec<(String, PsReport)>> {
        let mut reports = Vec::new();
        for stack in &self.stacks {
            let engine = self.tools.engine_for(self.project, stack)?;
            let report = engine
                .ps()
                .with_context(|| format!("Failed to list containers of '{}'", stack.name))?;
            reports.push((stack.name.clone(), report));
        }
        Ok(reports)
    }

    /// Logs of every stack; following requires a single stack
    pub fn logs(&self, follow: bool) -> Result<Vec<(String, Option<String>)>> {
        if follow && self.stacks.len() > 1 {
            return Err(PaasifyError::FollowRequiresSingleStack(self.stacks.len()).into());
        }

        let mut logs = Vec::new();
        for stack in &self.stacks {
            let engine = self.tools.engine_for(self.project, stack)?;
            logs.push((stack.name.clone(), engine.logs(follow)?));
        }
        Ok(logs)
    }

    /// Builds then starts each stack, in order
    pub fn apply(&self) -> Result<()> {
        let assembler = self.assembler();
        for stack in &self.stacks {
            assembler
                .assemble(stack)
                .with_context(|| format!("Failed to assemble stack '{}'", stack.name))?;
            self.up_one(stack)?;
        }
        Ok(())
    }

    /// Stops every stack in reverse order, then applies them in order
    pub fn recreate(&self) -> Result<()> {
        self.down()?;
        self.apply()
    }

    /// Explains every stack
    pub fn explain(&self) -> Result<Vec<StackReport>> {
        let assembler = self.assembler();
        self.stacks
            .iter()
            .map(|stack| {
                assembler
                    .explain(stack)
                    .with_context(|| format!("Failed to explain stack '{}'", stack.name))
            })
            .collect()
    }
}
