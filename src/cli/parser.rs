use crate::core::export::{ExportFormat, ExportScope};
use crate::models::actor::Role;
use crate::models::issue::{IssueStatus, Severity};
use crate::models::stream::LogStream;
use clap::{Parser, Subcommand};

/// Command-line interface definition for hydrolog
/// Collective hourly logs and inspection checklists for a hydro plant, on SQLite
#[derive(Parser)]
#[command(
    name = "hydrolog",
    version = env!("CARGO_PKG_VERSION"),
    about = "Collective hourly generator/transformer logs and session-gated inspection checklists",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    /// Evaluate clocks at this RFC 3339 instant instead of now
    #[arg(global = true, long = "at", value_name = "RFC3339")]
    pub at: Option<String>,

    /// Acting user (defaults to $USER)
    #[arg(global = true, long = "user")]
    pub user: Option<String>,

    /// Role of the acting user
    #[arg(global = true, long = "role", value_enum, default_value_t = Role::Operator)]
    pub role: Role,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Show or check the configuration file
    Config {
        #[arg(long = "print", help = "Print the current configuration")]
        print_config: bool,

        #[arg(long = "check", help = "Check configuration file for missing fields")]
        check: bool,
    },

    /// Manage the database (migrations, integrity checks, etc.)
    Db {
        #[arg(long = "migrate", help = "Run pending database migrations")]
        migrate: bool,

        #[arg(long = "check", help = "Check database integrity")]
        check: bool,

        #[arg(long = "vacuum", help = "Optimize the database using VACUUM")]
        vacuum: bool,

        #[arg(long = "info", help = "Show database information")]
        info: bool,
    },

    /// Print the internal audit log
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,

        #[arg(long = "op", help = "Only rows of this operation (e.g. finalize)")]
        operation: Option<String>,
    },

    /// Plant overview: hours logged per stream, session, checklist, open issues
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Hourly generator / transformer logs
    Hourlog {
        #[command(subcommand)]
        action: HourlogAction,
    },

    /// Freeze a complete day of one stream (admin)
    Finalize {
        #[arg(long, default_value = "generator", help = "generator or transformer-N")]
        stream: LogStream,

        #[arg(long, help = "Day to finalize (YYYY-MM-DD, default: today)")]
        date: Option<String>,
    },

    /// Daily inspection checklist
    Checklist {
        #[command(subcommand)]
        action: ChecklistAction,
    },

    /// Flagged issues
    Issue {
        #[command(subcommand)]
        action: IssueAction,
    },

    /// Call one tool of the JSON tool surface and print its result
    Tool {
        /// Tool name (use --list to see them)
        #[arg(required_unless_present = "list")]
        name: Option<String>,

        /// Arguments as a JSON object
        args: Option<String>,

        #[arg(long)]
        list: bool,
    },

    /// Export hour logs or issues to CSV / JSON
    Export {
        #[arg(long, value_enum, default_value_t = ExportScope::Generator)]
        scope: ExportScope,

        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        #[arg(long, value_name = "FILE", help = "Absolute path of the output file")]
        file: String,

        #[arg(
            long,
            help = "YYYY-MM-DD, YYYY-MM or YYYY-MM-DD:YYYY-MM-DD (default: today)"
        )]
        range: Option<String>,

        #[arg(long, help = "Only this transformer (with --scope transformer)")]
        transformer: Option<u8>,

        #[arg(long, help = "Overwrite an existing file without asking")]
        force: bool,
    },

    /// Create a backup copy of the database
    Backup {
        #[arg(long, value_name = "FILE")]
        file: String,

        #[arg(long)]
        compress: bool,

        #[arg(long, help = "Overwrite an existing file without asking")]
        force: bool,
    },

    /// Follow one log stream: autosave timers, hour rollover, remote updates
    Watch {
        #[arg(long, default_value = "generator")]
        stream: LogStream,

        #[arg(long, help = "Seconds between refreshes (default: refresh_interval_secs)")]
        interval: Option<u64>,

        #[arg(long, help = "Stop after this many refreshes")]
        iterations: Option<u32>,
    },
}

#[derive(Subcommand)]
pub enum HourlogAction {
    /// Show the slots of a day
    Show {
        #[arg(long, default_value = "generator")]
        stream: LogStream,

        #[arg(long, help = "Day (YYYY-MM-DD, default: today)")]
        date: Option<String>,

        #[arg(long, help = "Only this hour, with every field and its classification")]
        hour: Option<u32>,

        #[arg(long)]
        json: bool,
    },

    /// Edit and save the current hour
    Set {
        #[arg(long, default_value = "generator")]
        stream: LogStream,

        /// Measurements as field=value
        values: Vec<String>,

        #[arg(long)]
        remark: Option<String>,

        #[arg(long, value_name = "FIELD", help = "Flag an issue on this field after saving")]
        flag: Option<String>,

        #[arg(long, requires = "flag")]
        description: Option<String>,

        #[arg(long, value_enum, requires = "flag")]
        severity: Option<Severity>,
    },

    /// List the fields of a log with units and ranges
    Fields {
        #[arg(long, default_value = "generator")]
        stream: LogStream,
    },
}

#[derive(Subcommand)]
pub enum ChecklistAction {
    /// Module states of the working session and the day record
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Unlock a module by QR code and complete it with its form data
    Fill {
        /// Module number (1-4)
        module: u8,

        #[arg(long, help = "QR code posted at the equipment")]
        qr: String,

        #[arg(long, value_name = "REASON", help = "Bypass the session window once")]
        emergency: Option<String>,

        /// Form data: a JSON object or key=value pairs
        data: Vec<String>,
    },

    /// Submit the day (one-way)
    Submit,

    /// Recent checklist days
    List {
        #[arg(long, default_value_t = 7)]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum IssueAction {
    /// List issues, newest first
    List {
        #[arg(long, value_enum)]
        status: Option<IssueStatus>,

        #[arg(long, value_enum)]
        severity: Option<Severity>,

        #[arg(long)]
        module: Option<String>,

        #[arg(long, help = "Day (YYYY-MM-DD)")]
        date: Option<String>,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Flag an issue against today's checklist
    Flag {
        #[arg(long)]
        module: String,

        #[arg(long, default_value = "")]
        section: String,

        #[arg(long, default_value = "")]
        item: String,

        #[arg(long)]
        unit: Option<String>,

        #[arg(long, value_enum, default_value_t = Severity::Medium)]
        severity: Severity,

        #[arg(long)]
        description: String,
    },

    /// Move an issue forward (reported, in_progress, resolved)
    Status {
        code: String,

        #[arg(value_enum)]
        status: IssueStatus,
    },
}
