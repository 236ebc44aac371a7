//! Paasify - build and run docker-compose stacks from layered apps and tags
//!
//! A project declares stacks. Each stack combines an app's base compose file
//! with tags: extra compose fragments merged by the compose engine, and
//! jsonnet scripts that contribute variables or rewrite the merged document.
//! The result is one generated compose file per stack, which the compose
//! engine then runs.

pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod logging;
pub mod plugin;
pub mod stack;
pub mod storage;

pub use domain::{App, EngineVersion, Stack, Tag, VarMap};
pub use error::PaasifyError;
pub use storage::Project;
