pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::search::SearchArgs;
use crate::commands::{CommandContext, CommandResult};

#[derive(Debug, Parser)]
#[command(
    name = "larder",
    about = "Larder recipe assistant CLI",
    long_about = "Search the recipe dataset, look up nutrition, ask the assistant, and check readiness.",
    after_help = "Examples:\n  larder search --ingredient chicken --max-calories 500\n  larder nutrition \"pumpkin soup\"\n  larder ask \"What can I cook with leeks?\"\n  larder doctor --json"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Config file to load instead of larder.toml"
    )]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH_OR_URL", help = "Dataset location override")]
    dataset: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Filter recipes by structured criteria and print the matches")]
    Search(SearchArgs),
    #[command(about = "Print nutrition facts for the first recipe whose name matches")]
    Nutrition {
        #[arg(help = "Recipe name, or part of it")]
        recipe_name: String,
    },
    #[command(about = "Ask the assistant a question using the recipe tools")]
    Ask {
        #[arg(help = "Question to answer")]
        question: String,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, dataset loading and column coverage, and agent setup")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let result = execute(cli);

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn execute(cli: Cli) -> CommandResult {
    let context = CommandContext { config_path: cli.config, dataset: cli.dataset };

    match cli.command {
        Command::Search(args) => commands::search::run(&context, &args),
        Command::Nutrition { recipe_name } => commands::nutrition::run(&context, &recipe_name),
        Command::Ask { question } => commands::ask::run(&context, &question),
        Command::Config => commands::config::run(&context),
        Command::Doctor { json } => commands::doctor::run(&context, json),
    }
}
