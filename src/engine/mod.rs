//! External compose engine
//!
//! - [`CommandRunner`] - Subprocess seam shared by every external tool
//! - [`EngineDetector`] - Version detection against [`COMPOSE_ENGINES`]
//! - [`ComposeEngine`] - `config`, `up`, `down`, `ps` and `logs` for one stack

mod compose;
mod detect;
mod exec;

pub use compose::{compose_env, parse_ps_json, split_binary, ComposeEngine, PsReport, ServiceStatus};
pub use detect::{
    forced_engine, parse_compose_version, select_engine, EngineDescriptor, EngineDetector,
    PsStyle, COMPOSE_ENGINES,
};
pub use exec::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
