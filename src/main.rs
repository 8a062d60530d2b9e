//! taskdeps - task dependency tracking with cycle prevention

use std::process::ExitCode;

fn main() -> ExitCode {
    match taskdeps::cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
