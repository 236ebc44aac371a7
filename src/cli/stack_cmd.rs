//! Stack commands: info, ls, explain, build, up, down, ps, logs, apply, recreate

use anyhow::Result;
use serde::Serialize;

use super::app::Session;
use super::output::Output;
use crate::domain::Tag;
use crate::engine::PsReport;
use crate::stack::{StackReport, StackSet, TagResolver};

fn select<'a>(session: &'a Session, names: &[String]) -> Result<StackSet<'a>> {
    StackSet::select(
        &session.project,
        &session.tools,
        names,
        session.cwd.as_deref(),
    )
}

fn tag_names(tags: &[Tag]) -> String {
    tags.iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Serialize)]
struct StackRow {
    name: String,
    path: String,
    app: Option<String>,
    tags: Vec<String>,
    output: String,
}

pub fn info(session: &Session, output: &Output) -> Result<()> {
    let project = &session.project;

    if output.is_json() {
        output.data(&serde_json::json!({
            "namespace": project.namespace(),
            "root": project.root(),
            "config_file": project.config_file(),
            "collections_dir": project.collections_dir(),
            "compose_output": project.compose_output(),
            "engine": project.engine(),
            "sources": project.sources().iter().map(|s| &s.name).collect::<Vec<_>>(),
            "stacks": project.stacks().len(),
        }));
        return Ok(());
    }

    println!("{:<18} {}", "Namespace:", project.namespace());
    println!("{:<18} {}", "Root:", project.root().display());
    println!("{:<18} {}", "Config:", project.config_file().display());
    println!("{:<18} {}", "Collections:", project.collections_dir().display());
    println!("{:<18} {}", "Compose output:", project.compose_output());
    if let Some(engine) = project.engine() {
        println!("{:<18} {}", "Engine:", engine);
    }

    let defaults = project.tags();
    let all: Vec<Tag> = defaults
        .prefix
        .iter()
        .chain(&defaults.tags)
        .chain(&defaults.suffix)
        .cloned()
        .collect();
    if !all.is_empty() {
        println!("{:<18} {}", "Default tags:", tag_names(&all));
    }
    println!("{:<18} {}", "Stacks:", project.stacks().len());

    Ok(())
}

pub fn list(session: &Session, output: &Output) -> Result<()> {
    let project = &session.project;
    let resolver = TagResolver::new(project);
    let rows: Vec<StackRow> = project
        .stacks()
        .iter()
        .map(|stack| StackRow {
            name: stack.name.clone(),
            path: stack.path.clone(),
            app: stack.app.as_ref().map(|a| a.reference()),
            tags: resolver.tags(stack).into_iter().map(|t| t.name).collect(),
            output: stack
                .output_file(project.compose_output())
                .display()
                .to_string(),
        })
        .collect();

    if output.is_json() {
        output.data(&rows);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No stacks declared");
        return Ok(());
    }

    println!("{:<20} {:<20} {:<24} {}", "NAME", "PATH", "APP", "TAGS");
    for row in &rows {
        println!(
            "{:<20} {:<20} {:<24} {}",
            row.name,
            row.path,
            row.app.as_deref().unwrap_or("-"),
            row.tags.join(", ")
        );
    }

    Ok(())
}

pub fn explain(session: &Session, output: &Output, names: &[String]) -> Result<()> {
    let reports = select(session, names)?.explain()?;

    if output.is_json() {
        output.data(&reports);
        return Ok(());
    }

    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            output.blank();
        }
        print_report(report);
    }

    Ok(())
}

fn print_report(report: &StackReport) {
    println!("Stack: {}", report.name);
    println!("  {:<16} {}", "Path:", report.path);
    println!("  {:<16} {}", "App:", report.app.as_deref().unwrap_or("-"));
    println!("  {:<16} {}", "Project:", report.compose_project);

    println!("  Search dirs:");
    for dir in &report.search_dirs {
        println!("    {}", dir.display());
    }

    println!("  Tags:");
    for tag in &report.tags {
        let compose = tag
            .compose_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        let script = tag
            .transform_script
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("    {:<20} compose={} transform={}", tag.name, compose, script);

        if let Some(meta) = &tag.metadata {
            if let Some(desc) = &meta.description {
                println!("      {}", desc);
            }
        }
        if let Some(overrides) = tag.overrides.as_ref().filter(|o| !o.is_empty()) {
            for (key, value) in overrides {
                println!("      {} = {}", key, value);
            }
        }
    }

    println!("  Vars:");
    for (key, value) in &report.vars {
        match value {
            serde_json::Value::String(s) => println!("    {} = {}", key, s),
            other => println!("    {} = {}", key, other),
        }
    }
}

pub fn build(session: &Session, output: &Output, names: &[String]) -> Result<()> {
    let files = select(session, names)?.assemble()?;

    if output.is_json() {
        output.data(&serde_json::json!({ "built": files }));
    } else {
        for file in &files {
            println!("Built {}", file.display());
        }
    }
    Ok(())
}

pub fn up(session: &Session, output: &Output, names: &[String]) -> Result<()> {
    let set = select(session, names)?;
    set.up()?;
    output.success(&format!("Started {} stack(s)", set.len()));
    Ok(())
}

pub fn down(session: &Session, output: &Output, names: &[String]) -> Result<()> {
    let set = select(session, names)?;
    set.down()?;
    output.success(&format!("Stopped {} stack(s)", set.len()));
    Ok(())
}

pub fn apply(session: &Session, output: &Output, names: &[String]) -> Result<()> {
    let set = select(session, names)?;
    set.apply()?;
    output.success(&format!("Applied {} stack(s)", set.len()));
    Ok(())
}

pub fn recreate(session: &Session, output: &Output, names: &[String]) -> Result<()> {
    let set = select(session, names)?;
    set.recreate()?;
    output.success(&format!("Recreated {} stack(s)", set.len()));
    Ok(())
}

#[derive(Serialize)]
struct PsRow<'a> {
    stack: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    services: Option<&'a [crate::engine::ServiceStatus]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    table: Option<&'a str>,
}

pub fn ps(session: &Session, output: &Output, names: &[String]) -> Result<()> {
    let reports = select(session, names)?.ps()?;

    if output.is_json() {
        let rows: Vec<PsRow> = reports
            .iter()
            .map(|(stack, report)| match report {
                PsReport::Services(services) => PsRow {
                    stack: stack.as_str(),
                    services: Some(services.as_slice()),
                    table: None,
                },
                PsReport::Table(table) => PsRow {
                    stack: stack.as_str(),
                    services: None,
                    table: Some(table.as_str()),
                },
            })
            .collect();
        output.data(&rows);
        return Ok(());
    }

    println!(
        "{:<20} {:<32} {:<16} {:<10} {}",
        "STACK", "NAME", "SERVICE", "STATE", "PORTS"
    );
    for (stack, report) in &reports {
        match report {
            PsReport::Services(services) if services.is_empty() => {
                println!("{:<20} (no containers)", stack);
            }
            PsReport::Services(services) => {
                for svc in services {
                    println!(
                        "{:<20} {:<32} {:<16} {:<10} {}",
                        stack,
                        svc.name,
                        svc.service,
                        svc.state,
                        svc.ports.join(", ")
                    );
                }
            }
            PsReport::Table(table) => {
                println!("{}", stack);
                println!("{}", table.trim_end());
            }
        }
    }

    Ok(())
}

pub fn logs(session: &Session, output: &Output, names: &[String], follow: bool) -> Result<()> {
    let logs = select(session, names)?.logs(follow)?;

    if output.is_json() {
        let map: serde_json::Map<String, serde_json::Value> = logs
            .into_iter()
            .filter_map(|(stack, text)| text.map(|t| (stack, serde_json::Value::String(t))))
            .collect();
        output.data(&map);
        return Ok(());
    }

    for (stack, text) in logs {
        if let Some(text) = text {
            output.header(&format!("==> {} <==", stack));
            println!("{}", text.trim_end());
        }
    }

    Ok(())
}
