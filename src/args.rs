use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

/// Log spending and income by writing sentences, and export the ledger to Excel.
#[derive(Parser, Debug)]
pub struct Args {
    /// Config file, created by `init`
    #[clap(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Gemini API key, needed for `serve` and `add --via gemini`
    #[clap(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Anchor for relative dates like "어제" instead of the local date (YYYY-MM-DD)
    #[clap(long, global = true)]
    pub today: Option<NaiveDate>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a config file and an empty ledger in the local directory
    Init,

    /// Open the config file in an editor
    Config,

    /// Classify a sentence and add the transactions it mentions
    Add {
        /// e.g. "오늘 점심으로 만원짜리 김치찌개 먹었어"
        #[clap(required = true)]
        text: Vec<String>,

        /// Which classifier to use
        #[clap(long, value_enum, default_value_t = Via::Relay)]
        via: Via,
    },

    /// Add a transaction by filling in its fields
    AddManual,

    /// Print all transactions, newest first
    List,

    /// Print totals and the top expense categories
    Summary {
        /// Number of categories to show
        #[clap(long, default_value_t = 5)]
        top: usize,
    },

    /// Correct the fields of a transaction
    Edit {
        /// Id of the transaction, a unique prefix is enough
        id: String,
    },

    /// Write the ledger to an Excel workbook
    Export {
        /// Defaults to talk_ledger_<today>.xlsx
        #[clap(long, short)]
        output: Option<PathBuf>,

        /// Write CSV instead of a workbook
        #[clap(long)]
        csv: bool,

        /// Open the file after writing it
        #[clap(long)]
        open: bool,
    },

    /// Run the relay that forwards sentences to Gemini
    Serve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Via {
    /// The relay configured as `relay_url`
    Relay,
    /// Call Gemini directly with the local API key
    Gemini,
    /// Local keyword rules, no network
    Offline,
}

pub fn parse() -> Args {
    Args::parse()
}
