//! Fieldpack CLI - prepare and manage offline map packages.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::packages::{self, PrepareArgs};
use error::CliError;

#[derive(Parser)]
#[command(name = "fieldpack")]
#[command(version, about = "Offline map packages for field crews", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.fieldpack/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the configuration file with defaults
    Init,

    /// Inspect the configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Download a package for offline use
    Prepare(PrepareArgs),

    /// List stored packages
    List {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one package in detail
    Show {
        package_id: String,

        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize how many packages are ready
    Status {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove a package and its map data
    Remove {
        package_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Re-check a package against the assets on disk
    Validate { package_id: String },

    /// Show what startup recovery settled
    Recover,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Init => commands::init::run(config),
        Commands::Config(command) => commands::config::run(config, command),
        Commands::Prepare(args) => packages::prepare(config, args),
        Commands::List { json } => packages::list(config, json),
        Commands::Show { package_id, json } => packages::show(config, &package_id, json),
        Commands::Status { json } => packages::status(config, json),
        Commands::Remove { package_id, yes } => packages::remove(config, &package_id, yes),
        Commands::Validate { package_id } => packages::validate(config, &package_id),
        Commands::Recover => packages::recover(config),
    }
}
