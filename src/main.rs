//! Paasify - build and run docker-compose stacks from layered apps and tags

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = paasify::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::from(paasify::error::exit_code(&e))
    } else {
        ExitCode::SUCCESS
    }
}
