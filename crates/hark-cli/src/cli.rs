//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// hark - ask questions about your editing session, keep the history
#[derive(Parser, Debug)]
#[command(name = "hark", version, about = "Conversation history and settings for the hark editor assistant")]
pub struct Cli {
    /// Override the hark home directory (default: $HARK_HOME or ~/.hark)
    #[arg(long, value_name = "DIR", global = true)]
    pub home: Option<PathBuf>,

    /// Enable debug logging (also enabled by the `debug` setting)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Browse and manage stored conversations
    #[command(subcommand)]
    History(HistoryCommand),

    /// Read and write settings
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Record a completed exchange
    Record {
        /// The question that was sent
        user: String,
        /// The reply that came back
        assistant: String,
        /// Start a new conversation instead of continuing the newest one
        #[arg(long)]
        new: bool,
    },

    /// Print the outbound message payload for a question as JSON
    Window {
        question: String,
        /// Build the payload for a new conversation (no history)
        #[arg(long)]
        new: bool,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum HistoryCommand {
    /// List conversations, newest first
    List,
    /// Show one conversation (1-based index) as JSON
    Show { index: usize },
    /// Delete one conversation (1-based index)
    Delete { index: usize },
    /// Delete every conversation
    Clear,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigCommand {
    /// Print the resolved value of a setting
    Get { key: String },
    /// Store a setting in the selected scope
    Set { key: String, value: String },
    /// Show or change the selected scope (global|project)
    Scope { scope: Option<String> },
    /// Print the configuration file locations
    Path,
}
