pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "zen",
    about = "Zen support bot operator CLI",
    long_about = "Inspect configuration, manage the database, import legacy data files and read reviews.",
    after_help = "Examples:\n  zen doctor --json\n  zen import-legacy ./data\n  zen reviews --limit 5"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, bot token readiness, database and asset checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        name = "import-legacy",
        about = "Import config.json, emojis.json, ticket_count.txt and reviews.json from a directory"
    )]
    ImportLegacy {
        #[arg(help = "Directory holding the legacy data files")]
        dir: PathBuf,
    },
    #[command(about = "Print stored reviews, newest first, as JSON")]
    Reviews {
        #[arg(long, default_value_t = 20, help = "Maximum number of reviews to print")]
        limit: u32,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::ImportLegacy { dir } => commands::import_legacy::run(&dir),
        Command::Reviews { limit } => commands::reviews::run(limit),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
