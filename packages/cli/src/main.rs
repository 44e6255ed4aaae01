mod commands;
mod config;
mod logging;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{eval, replay, state, variants, EvalArgs, ReplayArgs, StateArgs, VariantsArgs};
use config::Config;
use std::path::PathBuf;

/// Doenet CLI - evaluate and exercise DoenetML documents
#[derive(Parser, Debug)]
#[command(name = "doenet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (defaults to doenet.config.json in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a document and print its state
    Eval(EvalArgs),

    /// List the variants a document can take
    Variants(VariantsArgs),

    /// Run a script of actions against a document
    Replay(ReplayArgs),

    /// Load a saved state and print it
    State(StateArgs),
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = Config::load(&cwd, cli.config.as_deref())?;

    match cli.command {
        Command::Eval(args) => eval(args, &cwd, &config),
        Command::Variants(args) => variants(args, &cwd, &config),
        Command::Replay(args) => replay(args, &cwd, &config),
        Command::State(args) => state(args, &cwd, &config),
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["doenet", "eval", "doc.xml", "-vv", "--format", "json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Eval(args) => {
                assert_eq!(args.file, PathBuf::from("doc.xml"));
                assert_eq!(args.format, commands::eval::OutputFormat::Json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
