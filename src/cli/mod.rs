//! # Command-Line Interface
//!
//! ## Commands
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Project | Inspect the project | `info`, `ls`, `explain` |
//! | Build | Generate compose files | `build` |
//! | Runtime | Drive the compose engine | `up`, `down`, `ps`, `logs`, `apply`, `recreate` |
//! | Sources | App collections | `src ls`, `src install` |
//!
//! Stack commands take stack names. Without names, running from inside a
//! stack directory selects that stack, anywhere else selects all stacks.
//!
//! ## Output Formats
//!
//! All commands support `--format`:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! Logs go to stderr; use `-v`/`-vv` for more, `-q` for less.
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod source_cmd;
mod stack_cmd;

pub use app::{run, Cli, Commands, Session};
pub use output::{Output, OutputFormat};
