//! Compose engine version detection
//!
//! The compose binary is asked for its version once per run. The detected
//! version selects the registered engine with the largest minimum version not
//! exceeding it.

use std::cell::OnceCell;
use std::rc::Rc;
use std::sync::OnceLock;

use anyhow::Result;
use regex::Regex;
use tracing::debug;

use super::exec::{CommandRunner, CommandSpec};
use crate::domain::EngineVersion;
use crate::error::PaasifyError;

/// How an engine reports container status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsStyle {
    /// `ps --format json`
    Json,
    /// Plain table, shown as-is
    Table,
}

/// A registered compose engine implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineDescriptor {
    pub min_version: EngineVersion,
    pub ident: &'static str,
    pub ps_style: PsStyle,
}

/// Registered compose engines
pub const COMPOSE_ENGINES: [EngineDescriptor; 3] = [
    EngineDescriptor {
        min_version: EngineVersion::new(2, 6, 1),
        ident: "docker-compose-2.6",
        ps_style: PsStyle::Json,
    },
    EngineDescriptor {
        min_version: EngineVersion::new(1, 29, 0),
        ident: "docker-compose-1.29",
        ps_style: PsStyle::Table,
    },
    EngineDescriptor {
        min_version: EngineVersion::new(1, 6, 3),
        ident: "docker-compose-1.6",
        ps_style: PsStyle::Json,
    },
];

/// Picks the engine whose minimum version is the largest one `<= detected`
pub fn select_engine(
    table: &[EngineDescriptor],
    detected: EngineVersion,
) -> Result<EngineDescriptor, PaasifyError> {
    let mut sorted: Vec<&EngineDescriptor> = table.iter().collect();
    sorted.sort_by(|a, b| b.min_version.cmp(&a.min_version));

    sorted
        .into_iter()
        .find(|e| e.min_version <= detected)
        .copied()
        .ok_or_else(|| {
            PaasifyError::UnsupportedEngineVersion(format!(
                "detected version {} is older than every supported version ({})",
                detected,
                known_versions(table)
            ))
        })
}

/// Looks up a forced engine by its exact registered version
pub fn forced_engine(
    table: &[EngineDescriptor],
    version: &str,
) -> Result<EngineDescriptor, PaasifyError> {
    table
        .iter()
        .find(|e| e.min_version.to_string() == version.trim())
        .copied()
        .ok_or_else(|| {
            PaasifyError::UnsupportedEngineVersion(format!(
                "unknown engine '{}', select one of: {}",
                version,
                known_versions(table)
            ))
        })
}

fn known_versions(table: &[EngineDescriptor]) -> String {
    table
        .iter()
        .map(|e| e.min_version.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"version v?(\d+)\.(\d+)\.(\d+)").expect("version pattern is valid")
    })
}

/// Extracts the version from `docker-compose --version` output
pub fn parse_compose_version(output: &str) -> Option<EngineVersion> {
    let caps = version_re().captures(output)?;
    let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    Some(EngineVersion::new(part(1)?, part(2)?, part(3)?))
}

/// Resolves the compose engine once, then reuses it
pub struct EngineDetector {
    runner: Rc<dyn CommandRunner>,
    binary: Vec<String>,
    detected: OnceCell<EngineDescriptor>,
}

impl EngineDetector {
    /// `binary` is the compose command line prefix, e.g. `["docker", "compose"]`
    pub fn new(runner: Rc<dyn CommandRunner>, binary: Vec<String>) -> Self {
        Self {
            runner,
            binary,
            detected: OnceCell::new(),
        }
    }

    /// Returns the engine, detecting it on first use
    ///
    /// A forced version bypasses detection and must match a registered one.
    pub fn resolve(&self, forced: Option<&str>) -> Result<EngineDescriptor> {
        if let Some(version) = forced {
            return Ok(forced_engine(&COMPOSE_ENGINES, version)?);
        }

        if let Some(engine) = self.detected.get() {
            return Ok(*engine);
        }

        let engine = self.detect()?;
        debug!(
            "Detected compose engine {} (>= {})",
            engine.ident, engine.min_version
        );
        Ok(*self.detected.get_or_init(|| engine))
    }

    fn detect(&self) -> Result<EngineDescriptor> {
        let (program, prefix) = match self.binary.split_first() {
            Some((program, prefix)) => (program.clone(), prefix.to_vec()),
            None => ("docker-compose".to_string(), Vec::new()),
        };
        let spec = CommandSpec::new(program).args(prefix).arg("--version");

        let output = self.runner.checked(&spec)?;
        let version = parse_compose_version(&output.stdout).ok_or_else(|| {
            PaasifyError::UnsupportedEngineVersion(format!(
                "could not read a version from: {}",
                output.stdout.trim()
            ))
        })?;

        Ok(select_engine(&COMPOSE_ENGINES, version)?)
    }
}
