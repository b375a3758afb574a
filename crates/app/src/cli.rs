use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Flashdeck - review your flashcards from the terminal
#[derive(Parser, Debug)]
#[command(name = "flashdeck", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// SQLite database url or path
    #[arg(long, global = true, env = "FLASHDECK_DB_URL")]
    pub db: Option<String>,

    /// Id of the signed-in user (UUID)
    #[arg(long, global = true, env = "FLASHDECK_USER_ID")]
    pub user_id: Option<String>,

    /// Email shown for the signed-in user
    #[arg(long, global = true, env = "FLASHDECK_USER_EMAIL")]
    pub email: Option<String>,

    /// Path to a TOML config file (defaults to ./.flashdeck.toml)
    #[arg(long, global = true, env = "FLASHDECK_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a flashcard
    Add {
        #[arg(long)]
        question: String,
        #[arg(long)]
        answer: String,
    },

    /// List your flashcards, newest first
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive review session
    Review,
}
