// hark-cli: command-line frontend for hark-core
// Argument parsing, logging setup, plain-text/JSON output

mod cli;
mod prompt;

use clap::Parser;
use cli::{Cli, Command, ConfigCommand, HistoryCommand};
use hark_core::{
    ConfigKey, ConfigResolver, ConfigStore, ConversationService, ConversationStore, HarkPaths,
    outbound_payload, record_exchange,
};
use log::LevelFilter;
use prompt::EnvironmentPrompt;
use std::error::Error;
use std::process::ExitCode;

type CliResult = Result<ExitCode, Box<dyn Error>>;

/// Install the logger before any state is read, so degraded-read warnings
/// are never lost.
///
/// The filter admits debug records; without `RUST_LOG`, the global max level
/// holds them back until [`enable_debug_logging`] raises it.
fn init_logging(debug: bool) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .format_timestamp(None)
        .init();
    if !debug && !rust_log_set() {
        log::set_max_level(LevelFilter::Warn);
    }
}

/// Raise verbosity once the `debug` setting is known. `RUST_LOG` wins.
fn enable_debug_logging() {
    if !rust_log_set() {
        log::set_max_level(LevelFilter::Debug);
    }
}

fn rust_log_set() -> bool {
    std::env::var_os(env_logger::DEFAULT_FILTER_ENV).is_some()
}

/// Point the service at the newest stored conversation unless `new` is set.
fn select_conversation(
    history: &mut ConversationService,
    new: bool,
) -> hark_core::error::Result<()> {
    if new || history.list().is_empty() {
        history.start_new();
    } else {
        history.resume(1)?;
    }
    Ok(())
}

fn run_history(history: &mut ConversationService, command: HistoryCommand) -> CliResult {
    match command {
        HistoryCommand::List => {
            for (i, conversation) in history.list().iter().enumerate() {
                println!(
                    "{}. {} ({} turns, {})",
                    i + 1,
                    conversation.summary,
                    conversation.turn_count(),
                    conversation.updated_at
                );
            }
        }
        HistoryCommand::Show { index } => {
            let conversation = history.get(index)?;
            println!("{}", serde_json::to_string_pretty(&conversation)?);
        }
        HistoryCommand::Delete { index } => {
            let removed = history.delete(index)?;
            println!("deleted: {}", removed.summary);
        }
        HistoryCommand::Clear => {
            history.clear_all()?;
            println!("history cleared");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_config(config: &mut ConfigResolver, command: ConfigCommand) -> CliResult {
    match command {
        ConfigCommand::Get { key } => {
            let key = key.parse::<ConfigKey>()?;
            match config.require_current(key) {
                Ok(value) => println!("{}", value),
                Err(e) if e.is_not_found() => return Ok(ExitCode::FAILURE),
                Err(e) => return Err(e.into()),
            }
        }
        ConfigCommand::Set { key, value } => {
            let key = key.parse::<ConfigKey>()?;
            config.set_current(key, &value)?;
        }
        ConfigCommand::Scope { scope: Some(name) } => {
            config.set_selected_scope_named(&name)?;
        }
        ConfigCommand::Scope { scope: None } => {
            println!("{}", config.get_selected_scope());
        }
        ConfigCommand::Path => {
            println!("global: {}", config.store().get_global_path().display());
            println!("project: {}", config.store().get_project_path().display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run(cli: Cli) -> CliResult {
    init_logging(cli.debug);

    let paths = HarkPaths::discover(cli.home.clone())?;
    let mut history = ConversationService::new(ConversationStore::from_paths(&paths), None);
    let mut config = ConfigResolver::new(ConfigStore::new(paths));

    if !cli.debug && config.debug_enabled() {
        enable_debug_logging();
    }
    log::debug!("hark {} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::History(command) => run_history(&mut history, command),
        Command::Config(command) => run_config(&mut config, command),
        Command::Record {
            user,
            assistant,
            new,
        } => {
            select_conversation(&mut history, new)?;
            record_exchange(&mut history, &mut config, &user, &assistant)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Window { question, new } => {
            select_conversation(&mut history, new)?;
            let prompt = EnvironmentPrompt::detect();
            let payload = outbound_payload(&mut history, &mut config, &prompt, &question);
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
