pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "correduria",
    about = "Correduria operator CLI",
    long_about = "Operate the correduria back office: migrations, demo seeds, config inspection, readiness checks, and the daily dispatch triggers.",
    after_help = "Examples:\n  correduria doctor --json\n  correduria config\n  correduria dispatch --kind renewals --date 2026-08-07"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DispatchKind {
    Renewals,
    Birthdays,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo dataset and verify its contract")]
    Seed,
    #[command(about = "Run end-to-end readiness checks with per-check timing details")]
    Smoke,
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
    #[command(about = "Validate config, database connectivity, and mail transport readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Run one dispatch pass (renewal notices or birthday greetings); this is the external daily trigger"
    )]
    Dispatch {
        #[arg(long, value_enum, help = "Which dispatch engine to run")]
        kind: DispatchKind,
        #[arg(long, help = "Process records due on this date (YYYY-MM-DD, defaults to today UTC)")]
        date: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Smoke => commands::smoke::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Dispatch { kind, date } => commands::dispatch::run(kind, date.as_deref()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
