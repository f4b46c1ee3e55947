//! # Baht Invoice CLI Entry Point
//!
//! ## Application Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          baht (operator shell)                          │
//! │                                                                         │
//! │  main.rs ────► parse args, init logging, run one command, print notice │
//! │                                                                         │
//! │  lib.rs ─────► AppState setup and command dispatch                     │
//! │                                                                         │
//! │  commands/ ──► invoice, number, customer, history, settings, session,  │
//! │                sync                                                     │
//! │                                                                         │
//! │  state/ ─────► config file, database path, remote selection            │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  baht.db (SQLite, WAL)          spreadsheet remote (optional)    │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Startup Sequence
//! 1. Parse arguments
//! 2. Initialize tracing (stderr, so notices on stdout stay clean)
//! 3. Load `baht.toml` and open the database
//! 4. Run the command and print its notice

use std::process::ExitCode;

use clap::Parser;

use baht_cli::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    baht_cli::init_tracing(cli.verbose);

    match baht_cli::run(cli).await {
        Ok(notice) => {
            if !notice.is_empty() {
                println!("{}", notice);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
