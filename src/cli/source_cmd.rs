//! Source commands

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;

use super::app::Session;
use super::output::Output;
use crate::storage::Source;

#[derive(Subcommand)]
pub enum SourceCommands {
    /// List sources and their install state
    Ls,

    /// Install sources (all declared sources by default)
    Install {
        names: Vec<String>,
    },
}

#[derive(Serialize)]
struct SourceRow<'a> {
    name: &'a str,
    alias: Option<&'a str>,
    url: Option<&'a str>,
    path: String,
    installed: bool,
}

impl<'a> From<&'a Source> for SourceRow<'a> {
    fn from(source: &'a Source) -> Self {
        Self {
            name: &source.name,
            alias: source.alias.as_deref(),
            url: source.url.as_deref(),
            path: source.path().display().to_string(),
            installed: source.is_installed(),
        }
    }
}

pub fn run(cmd: SourceCommands, session: &Session, output: &Output) -> Result<()> {
    match cmd {
        SourceCommands::Ls => list(session, output),
        SourceCommands::Install { names } => install(session, output, &names),
    }
}

fn list(session: &Session, output: &Output) -> Result<()> {
    let rows: Vec<SourceRow> = session.project.sources().iter().map(SourceRow::from).collect();

    if output.is_json() {
        output.data(&rows);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No sources declared");
        return Ok(());
    }

    println!("{:<16} {:<10} {:<10} {}", "NAME", "ALIAS", "INSTALLED", "URL");
    for row in &rows {
        println!(
            "{:<16} {:<10} {:<10} {}",
            row.name,
            row.alias.unwrap_or("-"),
            if row.installed { "yes" } else { "no" },
            row.url.unwrap_or("-")
        );
    }

    Ok(())
}

fn install(session: &Session, output: &Output, names: &[String]) -> Result<()> {
    let project = &session.project;
    let sources: Vec<Source> = if names.is_empty() {
        project.sources().to_vec()
    } else {
        names.iter().map(|name| project.source(name)).collect()
    };

    let runner = session.tools.runner();
    for source in &sources {
        source
            .ensure_installed(runner)
            .with_context(|| format!("Failed to install source '{}'", source.name))?;
    }

    output.success(&format!("{} source(s) installed", sources.len()));
    Ok(())
}
