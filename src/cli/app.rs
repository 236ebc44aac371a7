//! Main CLI application structure

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{source_cmd, stack_cmd};
use crate::logging::{init_logging, LoggingConfig};
use crate::stack::{ToolSettings, Toolchain, DEFAULT_COMPOSE_BIN, DEFAULT_JSONNET_BIN};
use crate::storage::Project;

#[derive(Parser)]
#[command(name = "paasify")]
#[command(author, version, about = "Build and run docker-compose stacks from layered apps and tags")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project directory or paasify.yml path (defaults to the current directory)
    #[arg(long, short = 'c', global = true, env = "PAASIFY_PROJECT_DIR")]
    pub config: Option<PathBuf>,

    /// Directory where sources are installed
    #[arg(long, short = 'l', global = true, env = "PAASIFY_COLLECTIONS_DIR")]
    pub collections_dir: Option<PathBuf>,

    /// Compose command line, e.g. "docker compose"
    #[arg(long, global = true, env = "PAASIFY_COMPOSE_BIN", default_value = DEFAULT_COMPOSE_BIN)]
    pub compose_bin: String,

    /// Jsonnet interpreter binary
    #[arg(long, global = true, env = "PAASIFY_JSONNET_BIN", default_value = DEFAULT_JSONNET_BIN)]
    pub jsonnet_bin: String,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show project summary
    Info,

    /// List stacks
    Ls,

    /// Show tag plan, script metadata and proposed overrides
    Explain {
        /// Stack names (defaults to the current stack, or all)
        stacks: Vec<String>,
    },

    /// Generate the compose file of stacks
    Build {
        stacks: Vec<String>,
    },

    /// Start stacks
    Up {
        stacks: Vec<String>,
    },

    /// Stop stacks, in reverse order
    Down {
        stacks: Vec<String>,
    },

    /// Show stack containers
    Ps {
        stacks: Vec<String>,
    },

    /// Show stack logs
    Logs {
        stacks: Vec<String>,

        /// Follow log output (single stack only)
        #[arg(long, short = 'F')]
        follow: bool,
    },

    /// Build and start stacks
    Apply {
        stacks: Vec<String>,
    },

    /// Stop stacks, then build and start them again
    Recreate {
        stacks: Vec<String>,
    },

    /// Manage sources
    #[command(subcommand)]
    Src(source_cmd::SourceCommands),
}

/// Everything a command needs
pub struct Session {
    pub project: Project,
    pub tools: Toolchain,
    pub cwd: Option<PathBuf>,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().ok();
        let start = match (&cli.config, &cwd) {
            (Some(path), _) => path.clone(),
            (None, Some(dir)) => dir.clone(),
            (None, None) => PathBuf::from("."),
        };

        let project = Project::discover(&start, cli.collections_dir.clone())
            .with_context(|| format!("Failed to load project from {}", start.display()))?;

        let tools = Toolchain::system(&ToolSettings {
            compose_bin: cli.compose_bin.clone(),
            jsonnet_bin: cli.jsonnet_bin.clone(),
        });

        Ok(Self {
            project,
            tools,
            cwd,
        })
    }
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(LoggingConfig::from_flags(cli.verbose, cli.quiet, cli.log_json));

    let output = Output::new(cli.format);
    let session = Session::open(&cli)?;

    match cli.command {
        Commands::Info => stack_cmd::info(&session, &output)?,
        Commands::Ls => stack_cmd::list(&session, &output)?,
        Commands::Explain { stacks } => stack_cmd::explain(&session, &output, &stacks)?,
        Commands::Build { stacks } => stack_cmd::build(&session, &output, &stacks)?,
        Commands::Up { stacks } => stack_cmd::up(&session, &output, &stacks)?,
        Commands::Down { stacks } => stack_cmd::down(&session, &output, &stacks)?,
        Commands::Ps { stacks } => stack_cmd::ps(&session, &output, &stacks)?,
        Commands::Logs { stacks, follow } => stack_cmd::logs(&session, &output, &stacks, follow)?,
        Commands::Apply { stacks } => stack_cmd::apply(&session, &output, &stacks)?,
        Commands::Recreate { stacks } => stack_cmd::recreate(&session, &output, &stacks)?,
        Commands::Src(cmd) => source_cmd::run(cmd, &session, &output)?,
    }

    Ok(())
}
