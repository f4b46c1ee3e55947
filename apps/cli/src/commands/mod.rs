//! # Commands Module
//!
//! One handler per subcommand. Handlers take the [`AppState`](crate::state::AppState)
//! and their parsed arguments and return the notice printed on stdout.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (shared notice helpers)
//! ├── invoice.rs   ◄─── new / edit / cancel / restore / delete / list / show / purge / email
//! ├── number.rs    ◄─── preview / reserve / reset / sync
//! ├── customer.rs  ◄─── list / save / pull
//! ├── history.rs   ◄─── remote merge, CSV export, dashboard stats
//! ├── settings.rs  ◄─── VAT rate, remote endpoints, company profile
//! ├── session.rs   ◄─── login / logout / whoami
//! └── sync.rs      ◄─── outbox replay and status
//! ```
//!
//! ## Notice Format
//! Every mutating command ends with where the change landed:
//! ```text
//! Saved invoice 2601140001 (local+remote)
//! Saved invoice 2601140002 (local only: Connection failed: ...)
//! ```

pub mod customer;
pub mod history;
pub mod invoice;
pub mod number;
pub mod session;
pub mod settings;
pub mod sync;

use baht_sync::Persisted;

/// `"local"`, `"local+remote"` or `"local only: <reason>"`.
pub fn persisted_note<T>(persisted: &Persisted<T>) -> String {
    match persisted.remote_failure() {
        Some(reason) => format!("{}: {}", persisted.label(), reason),
        None => persisted.label().to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persisted_note() {
        assert_eq!(persisted_note(&Persisted::Local { value: () }), "local");
        assert_eq!(
            persisted_note(&Persisted::LocalAndRemote { value: () }),
            "local+remote"
        );
        assert_eq!(
            persisted_note(&Persisted::LocalOnly {
                value: (),
                reason: "timeout".into()
            }),
            "local only: timeout"
        );
    }
}
