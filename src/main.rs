//! Kodbank CLI.
//!
//! Registers accounts, logs in, checks balances and logs out against the
//! backends configured in `kodbank.toml`. See [`kodbank_account::cli`].

use std::process::ExitCode;

use clap::Parser;
use kodbank_account::{AccountArgs, cli};

#[tokio::main]
async fn main() -> ExitCode {
    let args = AccountArgs::parse();

    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
