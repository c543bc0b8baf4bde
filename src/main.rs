//! chart-image-mirror: point Helm chart images at a private ECR mirror
//!
//! Rewrites the image references of a chart's values file so an air-gapped
//! cluster pulls from the operator's own account and region.

use console::style;
use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", style(format!("Error: {err:#}")).red());
            ExitCode::FAILURE
        }
    }
}
