use std::process::ExitCode;

use clap::Parser;
use nadctl::{commands, error_tag, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match error_tag(&err) {
                Some(tag) => eprintln!("Error [{tag}]: {err:#}"),
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
