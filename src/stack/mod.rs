//! # Stack Assembly Pipeline
//!
//! For one stack, `assemble` runs:
//!
//! 1. Source installation
//! 2. Tag plan resolution ([`TagResolver`])
//! 3. Variable cascade ([`VariableCascade`])
//! 4. Compose merge through the detected engine
//! 5. Transform chain over transform-only tags
//! 6. Atomic write of the generated compose file
//!
//! [`StackSet`] sequences these steps, and the engine commands, across the
//! selected stacks.

mod assembler;
mod cascade;
mod orchestrator;
mod plan;
mod toolchain;

pub use assembler::{write_document, StackAssembler, StackReport, TagReport};
pub use cascade::{load_document, load_var_file, VariableCascade, VAR_FILES};
pub use orchestrator::{select_stacks, StackSet};
pub use plan::{
    compose_patterns, transform_patterns, TagPlan, TagPlanEntry, TagResolver, BASE_COMPOSE_FILES,
};
pub use toolchain::{ToolSettings, Toolchain, DEFAULT_COMPOSE_BIN, DEFAULT_JSONNET_BIN};
