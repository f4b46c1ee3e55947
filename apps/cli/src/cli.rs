//! Command-line surface.
//!
//! ```text
//! baht [--config PATH] [--db PATH] [--dry-run | --local] <command>
//!
//!   invoice  new | edit | cancel | restore | delete | list | show | purge | email
//!   number   preview | reserve | reset | sync
//!   customer list | save | pull
//!   history  sync | export
//!   stats
//!   settings show | set-vat | set-remote
//!   company  show | set | logo | signature
//!   login | logout | whoami
//!   sync     push | status
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "baht", version, about = "Thai tax invoices with spreadsheet sync")]
pub struct Cli {
    /// Config file (default: platform config dir / baht.toml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// SQLite database file. Overrides the config and BAHT_DB_PATH.
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Answer remote calls with an in-process spreadsheet instead of the network.
    #[arg(long, global = true, conflicts_with = "local")]
    pub dry_run: bool,

    /// Skip the remote entirely for this command.
    #[arg(long, global = true)]
    pub local: bool,

    /// Debug logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create, edit and browse tax invoices.
    #[command(subcommand)]
    Invoice(InvoiceCommand),

    /// Daily invoice number counter.
    #[command(subcommand)]
    Number(NumberCommand),

    /// Customer directory.
    #[command(subcommand)]
    Customer(CustomerCommand),

    /// Remote history merge and CSV export.
    #[command(subcommand)]
    History(HistoryCommand),

    /// Dashboard figures.
    Stats(StatsArgs),

    /// VAT rate and remote endpoints.
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Seller details printed on invoices.
    #[command(subcommand)]
    Company(CompanyCommand),

    /// Sign in.
    Login { username: String, password: String },

    /// Sign out.
    Logout,

    /// Show the signed-in user.
    Whoami,

    /// Remote writes that failed earlier.
    #[command(subcommand)]
    Sync(SyncCommand),
}

// =============================================================================
// Invoice
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum InvoiceCommand {
    /// Save a new invoice under the next number.
    New(InvoiceArgs),

    /// Edit an invoice; `--number` renames it.
    Edit {
        number: String,
        /// New invoice number.
        #[arg(long = "number", value_name = "NUMBER")]
        new_number: Option<String>,
        #[command(flatten)]
        fields: InvoiceArgs,
    },

    Cancel { number: String },
    Restore { number: String },

    /// Remove an invoice locally. The remote copy is kept.
    Delete { number: String },

    List {
        /// Matches invoice number or customer name.
        #[arg(long)]
        query: Option<String>,
        /// Inclusive YYYY-MM-DD.
        #[arg(long)]
        from: Option<String>,
        /// Inclusive YYYY-MM-DD.
        #[arg(long)]
        to: Option<String>,
    },

    Show {
        number: String,
        /// Print the stored record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete every local invoice.
    Purge {
        #[arg(long)]
        yes: bool,
    },

    /// Email an invoice through the remote.
    Email {
        number: String,
        #[arg(long)]
        to: String,
    },
}

/// Invoice fields. On `edit` every field is optional and only given ones change.
#[derive(Args, Debug, Clone, Default)]
pub struct InvoiceArgs {
    /// Fill the customer fields from a saved customer (id or tax ID).
    /// Explicit fields still win.
    #[arg(long = "customer-id", value_name = "ID|TAX_ID")]
    pub customer_id: Option<String>,
    #[arg(long)]
    pub customer: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub tax_id: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    /// Branch number; omit for head office.
    #[arg(long)]
    pub branch: Option<String>,
    /// Head office (clears `--branch` on edit).
    #[arg(long, conflicts_with = "branch")]
    pub hq: bool,
    /// YYYY-MM-DD (default: today).
    #[arg(long)]
    pub date: Option<String>,
    /// Line item "description:quantity:price", price VAT-inclusive. Repeatable.
    #[arg(long = "item", value_name = "DESC:QTY:PRICE")]
    pub items: Vec<String>,
    /// Cash received, in baht.
    #[arg(long)]
    pub cash: Option<f64>,
    /// Transfer received, in baht.
    #[arg(long)]
    pub transfer: Option<f64>,
}

// =============================================================================
// Numbering
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum NumberCommand {
    /// Next number, without reserving it.
    Preview,
    /// Reserve and print the next number.
    Reserve,
    /// Set the running number for today.
    Reset { start: i64 },
    /// Align the counter with the remote's latest number.
    Sync {
        /// YYYY-MM-DD (default: today).
        #[arg(long)]
        date: Option<String>,
    },
}

// =============================================================================
// Customers, History, Stats
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum CustomerCommand {
    /// List the cache, or search it by name, id or tax ID.
    List {
        #[arg(long)]
        query: Option<String>,
    },
    Save {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long, default_value = "")]
        tax_id: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        email: String,
    },
    /// Replace the local list with the remote one.
    Pull,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// Add remote invoices missing locally.
    Sync,
    /// Write the history as CSV.
    Export {
        /// Output file (default: invoice_history_<today>.csv).
        file: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
pub struct StatsArgs {
    #[arg(long)]
    pub year: Option<i32>,
    #[arg(long, requires = "year")]
    pub month: Option<u32>,
    #[arg(long, requires = "to", conflicts_with = "year")]
    pub from: Option<String>,
    #[arg(long, requires = "from")]
    pub to: Option<String>,
}

// =============================================================================
// Settings, Company, Sync
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    Show,
    SetVat { percent: f64 },
    SetRemote {
        #[arg(long)]
        script_url: Option<String>,
        #[arg(long)]
        sheets_url: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CompanyCommand {
    Show,
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        tax_id: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        branch: Option<String>,
        #[arg(long, conflicts_with = "branch")]
        hq: bool,
    },
    /// Shows, sets or clears the logo data-URL.
    Logo(ImageArgs),
    /// Shows, sets or clears the signature data-URL.
    Signature(ImageArgs),
}

#[derive(Args, Debug, Default)]
pub struct ImageArgs {
    /// `data:image/...;base64,...`
    #[arg(conflicts_with = "clear")]
    pub data_url: Option<String>,
    #[arg(long)]
    pub clear: bool,
}

#[derive(Subcommand, Debug)]
pub enum SyncCommand {
    /// Replay queued remote writes once each.
    Push {
        #[arg(long, default_value_t = baht_sync::DEFAULT_REPLAY_LIMIT)]
        limit: u32,
    },
    /// Count queued remote writes.
    Status,
}
