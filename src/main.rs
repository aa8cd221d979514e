use colored::*;
use env_matrix::{ConfigError, cli};
use std::process::ExitCode;

/// Exit status for configuration errors, distinct from a failed run.
const CONFIG_ERROR_EXIT: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            if e.chain().any(|cause| cause.downcast_ref::<ConfigError>().is_some()) {
                ExitCode::from(CONFIG_ERROR_EXIT)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
