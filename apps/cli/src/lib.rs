//! # Baht Invoice CLI Library
//!
//! Operator shell over the invoice store and the spreadsheet remote.
//!
//! ## Module Organization
//! ```text
//! baht_cli/
//! ├── lib.rs          ◄─── You are here (logging & dispatch)
//! ├── cli.rs          ◄─── clap argument tree
//! ├── state/
//! │   ├── mod.rs      ◄─── AppState (config + RecordSync + today)
//! │   ├── config.rs   ◄─── baht.toml, settings seeding, endpoint precedence
//! │   ├── db.rs       ◄─── database path & open
//! │   └── sync.rs     ◄─── remote selection (http / dry-run / none)
//! ├── commands/       ◄─── one handler per subcommand
//! └── error.rs        ◄─── ApiError shown on stderr
//! ```
//!
//! ## One Invocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cli ──► AppState::open ──► commands::<group>::run ──► notice (stdout)  │
//! │                                      │                                  │
//! │                                      └──► ApiError ──► "[CODE] message" │
//! │                                                         (stderr, exit 1)│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod state;

use chrono::Utc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use error::ApiError;
use state::AppState;

/// Initializes logging on stderr.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=baht_sync=trace` - Trace the remote layer only
/// - Default: INFO, or DEBUG with `--verbose`
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "debug,sqlx=warn,hyper=info,reqwest=info"
    } else {
        "info,baht=debug,sqlx=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second call (tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Runs one command and returns the notice for stdout.
pub async fn run(cli: Cli) -> Result<String, ApiError> {
    let today = chrono::Local::now().date_naive();
    let state = AppState::open(&cli, today).await?;
    debug!(mode = ?state.mode, %today, "Application state ready");

    let result = dispatch(&state, cli.command).await;
    state.db().close().await;
    result
}

/// Routes a parsed command to its handler.
pub async fn dispatch(state: &AppState, command: Command) -> Result<String, ApiError> {
    match command {
        Command::Invoice(command) => commands::invoice::run(state, command).await,
        Command::Number(command) => commands::number::run(state, command).await,
        Command::Customer(command) => commands::customer::run(state, command).await,
        Command::History(command) => commands::history::run(state, command).await,
        Command::Stats(args) => commands::history::stats(state, args).await,
        Command::Settings(command) => commands::settings::run(state, command).await,
        Command::Company(command) => commands::settings::run_company(state, command).await,
        Command::Login { username, password } => {
            commands::session::login(state, &username, &password, Utc::now()).await
        }
        Command::Logout => commands::session::logout(state).await,
        Command::Whoami => commands::session::whoami(state, Utc::now()).await,
        Command::Sync(command) => commands::sync::run(state, command).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn test_run_against_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("baht.db");
        let config = dir.path().join("baht.toml");
        std::fs::write(&config, "").unwrap();

        let args = |rest: &[&str]| {
            let mut argv = vec![
                "baht".to_string(),
                "--local".to_string(),
                "--config".to_string(),
                config.display().to_string(),
                "--db".to_string(),
                db.display().to_string(),
            ];
            argv.extend(rest.iter().map(|s| s.to_string()));
            Cli::try_parse_from(argv).unwrap()
        };

        let notice = run(args(&["invoice", "new", "--customer", "ร้านป้าแดง", "--item", "ค่าอาหาร:1:107"]))
            .await
            .unwrap();
        assert!(notice.starts_with("Saved invoice "));
        assert!(notice.contains("(local)"));

        // second process sees the first one's write
        let listed = run(args(&["invoice", "list"])).await.unwrap();
        assert!(listed.contains("ร้านป้าแดง"));

        let err = run(args(&["invoice", "show", "0000000000"])).await.unwrap_err();
        assert_eq!(err.code, error::ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_dry_run_touches_no_network() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "baht".to_string(),
            "--dry-run".to_string(),
            "--db".to_string(),
            dir.path().join("baht.db").display().to_string(),
            "number".to_string(),
            "sync".to_string(),
        ])
        .unwrap();

        let notice = run(cli).await.unwrap();
        assert!(notice.starts_with("Latest number for "));
    }
}
