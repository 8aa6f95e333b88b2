use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use lifedesk_shared::{BlockKind, Section, TransactionKind};

/// Personal workspace kept on this machine
#[derive(Parser, Debug)]
#[command(name = "lifedesk", version)]
#[command(about = "Pages, tasks, finance and health in one local workspace")]
pub struct Cli {
    /// Directory holding the workspace (overrides LIFEDESK_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Summary of the stored workspace
    Show {
        /// Print the stored record as written
        #[arg(long)]
        raw: bool,
    },
    /// Page tree
    Tree,
    /// Report problems in the stored record before they are repaired
    Check,
    /// Store size and entity counts
    Stats,
    /// Forget the stored workspace
    Reset,
    /// Create a page
    NewPage {
        #[arg(num_args = 0..)]
        title: Vec<String>,
        /// Parent page id
        #[arg(long)]
        parent: Option<String>,
    },
    /// Change a page's title, content or icon
    EditPage {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Delete a page and everything below it
    DeletePage { id: String },
    /// Move a page; without --parent it goes to the root list
    MovePage {
        id: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Make a page the current page
    Select { id: String },
    /// Append a block to a page
    AddBlock {
        page: String,
        /// text, header, image, video or table
        kind: BlockKind,
        #[arg(num_args = 0..)]
        content: Vec<String>,
        /// Media URL, kept for this session only
        #[arg(long)]
        url: Option<String>,
    },
    /// Find pages by title or content
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Daily tasks
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Wallets
    Wallet {
        #[command(subcommand)]
        command: WalletCommand,
    },
    /// Transactions
    Tx {
        #[command(subcommand)]
        command: TxCommand,
    },
    /// Calendar events
    Event {
        #[command(subcommand)]
        command: EventCommand,
    },
    /// Health log
    Health {
        #[command(subcommand)]
        command: HealthCommand,
    },
    /// Switch section: dashboard, pages, tasks, calendar, finance or health
    Section { section: Section },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum TaskCommand {
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Toggle completion
    Done { id: String },
    #[command(name = "rm")]
    Remove { id: String },
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum WalletCommand {
    Add {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
        /// Defaults to the workspace currency
        #[arg(long)]
        currency: Option<String>,
    },
    List,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum TxCommand {
    Add {
        wallet: String,
        /// income or expense
        kind: TransactionKind,
        amount: f64,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    #[command(name = "rm")]
    Remove { id: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum EventCommand {
    /// Without --start the event lasts all day
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// HH:MM
        #[arg(long, value_parser = parse_time)]
        start: Option<NaiveTime>,
        /// HH:MM, defaults to one hour after start
        #[arg(long, value_parser = parse_time, requires = "start")]
        end: Option<NaiveTime>,
    },
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    #[command(name = "rm")]
    Remove { id: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum HealthCommand {
    Log {
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Glasses of water
        #[arg(long)]
        water: Option<u32>,
        /// Hours slept
        #[arg(long)]
        sleep: Option<f64>,
        #[arg(long)]
        steps: Option<u32>,
        /// Body weight
        #[arg(long)]
        weight: Option<f64>,
    },
}

fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| format!("invalid time '{}', expected HH:MM", raw))
}
